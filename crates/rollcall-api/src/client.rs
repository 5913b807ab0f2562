// Attendance API HTTP client
//
// Wraps `reqwest::Client` with rollcall-specific URL construction and
// error-envelope handling. Endpoint methods stay thin: build URL, send,
// decode, map rejection envelopes to typed errors.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    ActiveSessionResponse, ApiErrorBody, CreateSessionRequest, MessageDto, RotatedTokenDto,
    SessionCreatedDto, SessionDto, SubmitScanRequest,
};

/// Raw HTTP client for the attendance server.
///
/// Handles the `{code, message}` rejection envelope and versioned path
/// construction. All methods return decoded payloads -- callers never
/// see HTTP status codes directly.
#[derive(Clone)]
pub struct AttendanceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AttendanceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` should be the server root (e.g. `https://attendance.example.edu`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/v1/courses/{course}/active-session`
    ///
    /// Returns `None` when no session is currently active for the course.
    pub async fn active_session(&self, course_id: &str) -> Result<Option<SessionDto>, Error> {
        let url = self.api_url(&format!("courses/{course_id}/active-session"))?;
        let resp: ActiveSessionResponse = self.get(url).await?;
        Ok(if resp.active { resp.session } else { None })
    }

    /// `POST /api/v1/courses/{course}/sessions` -- create a session.
    pub async fn create_session(
        &self,
        course_id: &str,
        req: &CreateSessionRequest,
    ) -> Result<SessionCreatedDto, Error> {
        let url = self.api_url(&format!("courses/{course_id}/sessions"))?;
        self.post(url, req).await
    }

    /// `POST /api/v1/sessions/{id}/rotate` -- mint a fresh token.
    pub async fn rotate_token(&self, session_id: &Uuid) -> Result<RotatedTokenDto, Error> {
        let url = self.api_url(&format!("sessions/{session_id}/rotate"))?;
        self.post(url, &serde_json::json!({})).await
    }

    /// `POST /api/v1/sessions/{id}/end` -- terminate a session.
    pub async fn end_session(&self, session_id: &Uuid) -> Result<MessageDto, Error> {
        let url = self.api_url(&format!("sessions/{session_id}/end"))?;
        self.post(url, &serde_json::json!({})).await
    }

    /// `GET /api/v1/sessions/by-token/{token}` -- session metadata lookup.
    ///
    /// A missing or already-expired session surfaces as
    /// [`Error::SessionNotFound`] / [`Error::SessionExpired`].
    pub async fn session_by_token(&self, token: &str) -> Result<SessionDto, Error> {
        let url = self.api_url(&format!("sessions/by-token/{token}"))?;
        self.get(url).await
    }

    /// `POST /api/v1/scans` -- submit a scanned token to mark attendance.
    pub async fn submit_scan(&self, token: &str) -> Result<MessageDto, Error> {
        let url = self.api_url("scans")?;
        self.post(
            url,
            &SubmitScanRequest {
                token: token.to_owned(),
            },
        )
        .await
    }

    // ── URL builder ─────────────────────────────────────────────────

    /// Build a full URL under the versioned API prefix.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/api/v1/{path}",
            self.base_url.as_str().trim_end_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ─────────────────────────────────────────────

    /// Send a GET request and decode the response.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::decode(resp).await
    }

    /// Send a POST request with a JSON body and decode the response.
    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::decode(resp).await
    }

    /// Decode a response body, mapping non-success statuses to typed
    /// errors via the `{code, message}` envelope where present.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }

        // Rejection path: try the structured envelope first.
        let envelope: Option<ApiErrorBody> = serde_json::from_str(&body).ok();

        match status.as_u16() {
            401 | 403 => Err(Error::Unauthorized {
                message: envelope.map_or_else(|| status.to_string(), |e| e.message),
            }),
            404 => Err(Error::SessionNotFound),
            410 => Err(Error::SessionExpired {
                message: envelope
                    .map_or_else(|| "session has expired".into(), |e| e.message),
            }),
            code => {
                let (err_code, message) = envelope
                    .map(|e| (e.code, e.message))
                    .unwrap_or_else(|| (None, format!("HTTP {status}")));

                // Some deployments report expiry as a 4xx with an
                // "expired" code rather than 410.
                if err_code.as_deref().is_some_and(|c| c.contains("expired")) {
                    return Err(Error::SessionExpired { message });
                }

                Err(Error::Api {
                    message,
                    code: err_code,
                    status: code,
                })
            }
        }
    }
}
