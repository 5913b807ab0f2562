use thiserror::Error;

/// Top-level error type for the `rollcall-api` crate.
///
/// Covers every failure mode of the attendance API surface.
/// `rollcall-core` maps these into domain-level verdicts -- in
/// particular, it relies on [`Error::is_offline`] to distinguish a
/// dead network from a server-side rejection, and on
/// [`Error::is_expired`] to route rejections to the `Expired` UI state
/// rather than a generic error.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Authentication ──────────────────────────────────────────────
    /// Bearer token missing or rejected by the server.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Session lifecycle ───────────────────────────────────────────
    /// No session exists for the given token or id.
    #[error("Session not found")]
    SessionNotFound,

    /// The session or token has expired (server-authoritative).
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    // ── Structured server rejection ─────────────────────────────────
    /// Structured `{code, message}` error from the API.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the device is offline
    /// (connect-class transport failure), as opposed to a reachable
    /// server rejecting the request.
    pub fn is_offline(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the server signalled token/session expiry.
    ///
    /// Besides the dedicated variant, some deployments report expiry
    /// through the structured envelope; the code and message are both
    /// consulted so the caller never misroutes an expiry to `Error`.
    pub fn is_expired(&self) -> bool {
        match self {
            Self::SessionExpired { .. } => true,
            Self::Api { code, message, .. } => {
                code.as_deref().is_some_and(|c| c.contains("expired"))
                    || message.to_ascii_lowercase().contains("expired")
                    || message.to_ascii_lowercase().contains("invalid token")
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::SessionNotFound => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the structured API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
