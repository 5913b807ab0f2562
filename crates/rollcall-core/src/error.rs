// ── Core error types ──
//
// User-facing errors from rollcall-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<rollcall_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants, and keeps the two distinctions the
// protocol cares about intact: offline vs server-rejection, and
// expired vs any-other-failure.

use thiserror::Error;

use crate::model::SessionPhase;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Capability errors (fatal to the current flow) ────────────────
    #[error("Geolocation unavailable: {reason}")]
    GeolocationUnavailable { reason: String },

    #[error("Location permission denied: {reason}")]
    PermissionDenied { reason: String },

    // ── Signal-quality errors (retriable) ────────────────────────────
    #[error("GPS not stable yet -- keep the device still with a clear view of the sky")]
    GpsNotStable {
        /// Best accuracy observed so far, if any fix was accepted.
        best_accuracy_m: Option<f64>,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Operation '{operation}' is not valid in phase {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: SessionPhase,
    },

    #[error("No attendance session found")]
    SessionNotFound,

    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    // ── Network errors ───────────────────────────────────────────────
    #[error("You appear to be offline -- check your connection and try again")]
    Offline { detail: String },

    #[error("Cannot reach the attendance server: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Server-authoritative rejection ───────────────────────────────
    #[error("Rejected by server: {message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the user can fix this by retrying (as opposed to a
    /// terminal rejection or capability failure).
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::GpsNotStable { .. }
                | Self::Offline { .. }
                | Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rollcall_api::Error> for CoreError {
    fn from(err: rollcall_api::Error) -> Self {
        // Offline must be detected before any status-based mapping so a
        // dead network never masquerades as an "invalid token" message.
        if err.is_offline() {
            return CoreError::Offline {
                detail: err.to_string(),
            };
        }

        match err {
            rollcall_api::Error::SessionNotFound => CoreError::SessionNotFound,
            rollcall_api::Error::SessionExpired { message } => {
                CoreError::SessionExpired { message }
            }
            rollcall_api::Error::Unauthorized { message } => CoreError::Rejected {
                message,
                code: Some("unauthorized".into()),
            },
            rollcall_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            rollcall_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ref e @ rollcall_api::Error::Api { .. } if e.is_expired() => {
                CoreError::SessionExpired {
                    message: e.to_string(),
                }
            }
            rollcall_api::Error::Api {
                message,
                code,
                status: _,
            } => CoreError::Rejected { message, code },
            rollcall_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            rollcall_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
