//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use rollcall_config::ConfigError;
use rollcall_core::CoreError;

/// Exit codes, stable for scripting.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const GPS: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach the attendance server")]
    #[diagnostic(
        code(rollcall::connection_failed),
        help("Check the server URL and that the server is running.\nDetail: {reason}")
    )]
    ConnectionFailed { reason: String },

    #[error("You appear to be offline")]
    #[diagnostic(
        code(rollcall::offline),
        help("Check your network connection and try again. Nothing was submitted.")
    )]
    Offline { detail: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(rollcall::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(rollcall::auth_failed),
        help("Verify your bearer token. Set ROLLCALL_TOKEN or run: rollcall config init")
    )]
    AuthFailed { message: String },

    #[error("No bearer token configured for profile '{profile}'")]
    #[diagnostic(
        code(rollcall::no_credentials),
        help("Set the ROLLCALL_TOKEN environment variable, pass --token, or add\nbearer_token_env to the profile.")
    )]
    NoCredentials { profile: String },

    // ── Sessions ─────────────────────────────────────────────────────
    #[error("No attendance session found")]
    #[diagnostic(
        code(rollcall::session_not_found),
        help("The session may have ended or the token may have rotated past this code.")
    )]
    SessionNotFound,

    #[error("Session expired: {message}")]
    #[diagnostic(
        code(rollcall::session_expired),
        help("Ask the lecturer to show the current QR code and scan again.")
    )]
    SessionExpired { message: String },

    // ── GPS ──────────────────────────────────────────────────────────
    #[error("GPS lock not stable yet")]
    #[diagnostic(
        code(rollcall::gps_not_stable),
        help("Keep the device still with a clear view of the sky, then retry.")
    )]
    GpsNotStable { best_accuracy_m: Option<f64> },

    #[error("Geolocation unavailable: {reason}")]
    #[diagnostic(code(rollcall::no_geolocation))]
    GeolocationUnavailable { reason: String },

    // ── Server rejection ─────────────────────────────────────────────
    #[error("Rejected by server: {message}")]
    #[diagnostic(code(rollcall::rejected))]
    Rejected {
        message: String,
        code: Option<String>,
    },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rollcall::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(rollcall::no_config),
        help("Create one with: rollcall config init --server <URL>\nExpected at: {path}")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(rollcall::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(rollcall::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    ConfirmationRequired { action: String },

    // ── IO / internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(rollcall::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Offline { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::SessionNotFound | Self::SessionExpired { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::GpsNotStable { .. } | Self::GeolocationUnavailable { .. } => exit_code::GPS,
            Self::Validation { .. } | Self::ConfirmationRequired { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::GeolocationUnavailable { reason } => {
                CliError::GeolocationUnavailable { reason }
            }

            CoreError::PermissionDenied { reason } => CliError::GeolocationUnavailable {
                reason: format!("permission denied: {reason}"),
            },

            CoreError::GpsNotStable { best_accuracy_m } => {
                CliError::GpsNotStable { best_accuracy_m }
            }

            CoreError::InvalidPhase { operation, phase } => CliError::Internal(format!(
                "operation '{operation}' attempted in phase {phase:?}"
            )),

            CoreError::SessionNotFound => CliError::SessionNotFound,

            CoreError::SessionExpired { message } => CliError::SessionExpired { message },

            CoreError::Offline { detail } => CliError::Offline { detail },

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Rejected { message, code } => match code.as_deref() {
                Some("unauthorized") => CliError::AuthFailed { message },
                _ => CliError::Rejected { message, code },
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Internal(format!(
                "failed to serialize configuration: {e}"
            )),
        }
    }
}
