// ── Student scan verifier ──
//
// Explicit state machine for the student flow:
//
//   Loading → Valid → Marked | Expired | Error
//           → Expired                       (session missing/expired on load)
//
// The camera decode loop is single-shot: the first decoded payload
// stops the camera before the submission is sent, so a slow network
// can never produce a double submission. The server's verdict is
// authoritative; everything the verifier computes locally (countdown,
// geofence distance) is feedback only.

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rollcall_api::AttendanceClient;

use crate::error::CoreError;
use crate::geo::{evaluate, GeofenceVerdict};
use crate::model::{
    AttendanceSession, GeoPoint, ScanAttempt, ScanOutcome, ScanPhase,
};

/// Camera/QR-decode seam. Implementations own the media stream and
/// must release it when dropped; `next_decode` resolves with the first
/// successfully decoded payload.
pub trait QrSource: Send + 'static {
    fn next_decode(&mut self) -> impl Future<Output = Result<String, ScanError>> + Send;
}

/// Failures of the camera/decode capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable { reason: String },

    #[error("Camera permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Scan cancelled")]
    Cancelled,
}

/// Student-side verifier for one scan flow.
pub struct ScanVerifier {
    api: AttendanceClient,
    phase: watch::Sender<ScanPhase>,
    session: Option<AttendanceSession>,
    cancel: CancellationToken,
}

impl ScanVerifier {
    pub fn new(api: AttendanceClient) -> Self {
        let (phase, _) = watch::channel(ScanPhase::Loading);
        Self {
            api,
            phase,
            session: None,
            cancel: CancellationToken::new(),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn phase(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    pub fn current_phase(&self) -> ScanPhase {
        self.phase.borrow().clone()
    }

    /// Session metadata once loaded.
    pub fn session(&self) -> Option<&AttendanceSession> {
        self.session.as_ref()
    }

    /// Advisory countdown from the loaded metadata. Never authorizes
    /// anything -- the server decides validity.
    pub fn seconds_remaining(&self) -> i64 {
        self.session
            .as_ref()
            .map_or(0, |s| (s.expires_at - Utc::now()).num_seconds().max(0))
    }

    /// Live geofence feedback for the given position against the
    /// session's fence. Presentation-only.
    pub fn geofence_feedback(&self, position: GeoPoint) -> Option<GeofenceVerdict> {
        self.session
            .as_ref()
            .map(|s| evaluate(s.geofence.center, position, s.geofence.radius_m))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Fetch session metadata for the token embedded in the scanned
    /// URL. Resolves the phase: `Valid`, `Expired` (missing or expired
    /// session), or `Error` (offline/other).
    pub async fn load(&mut self, url_token: &str) -> ScanPhase {
        match self.api.session_by_token(url_token).await {
            Ok(dto) => {
                let session = AttendanceSession::from(dto);
                debug!(session_id = %session.id, "session metadata loaded");
                self.session = Some(session);
                self.set_phase(ScanPhase::Valid)
            }
            Err(e) if e.is_expired() || e.is_not_found() => {
                info!("session missing or expired on load");
                self.set_phase(ScanPhase::Expired)
            }
            Err(e) => {
                warn!(error = %e, "session metadata load failed");
                let reason = CoreError::from(e).to_string();
                self.set_phase(ScanPhase::Error(reason))
            }
        }
    }

    /// Run the decode-and-submit flow. Requires `Valid`.
    ///
    /// The camera source is consumed and dropped (releasing its media
    /// stream) as soon as the first payload decodes; only then is the
    /// token submitted.
    pub async fn run<Q: QrSource>(&mut self, mut qr: Q) -> Result<ScanAttempt, CoreError> {
        if self.current_phase() != ScanPhase::Valid {
            return Err(CoreError::Internal(format!(
                "scan attempted in phase {:?}",
                self.current_phase()
            )));
        }

        let decoded = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ScanError::Cancelled),
            decoded = qr.next_decode() => decoded,
        };

        // Single-shot: release the camera before touching the network.
        drop(qr);

        let token = match decoded {
            Ok(token) => token,
            Err(e) => {
                let reason = e.to_string();
                self.set_phase(ScanPhase::Error(reason.clone()));
                return Ok(ScanAttempt {
                    token: String::new(),
                    submitted_at: Utc::now(),
                    outcome: ScanOutcome::Failed,
                    message: reason,
                });
            }
        };

        debug!("QR decoded -- submitting");
        Ok(self.submit(&token).await)
    }

    /// Submit a decoded token and map the server's verdict.
    pub async fn submit(&mut self, token: &str) -> ScanAttempt {
        let submitted_at = Utc::now();

        let (outcome, message) = match self.api.submit_scan(token).await {
            Ok(ack) => {
                info!("attendance marked");
                self.set_phase(ScanPhase::Marked);
                (ScanOutcome::Accepted, ack.message)
            }
            Err(e) if e.is_offline() => {
                // Offline is its own failure class: no retry spam, no
                // misleading "invalid token" message.
                let message = CoreError::from(e).to_string();
                self.set_phase(ScanPhase::Error(message.clone()));
                (ScanOutcome::Offline, message)
            }
            Err(e) if e.is_expired() => {
                info!("token rejected as expired");
                self.set_phase(ScanPhase::Expired);
                (ScanOutcome::Expired, e.to_string())
            }
            Err(e) if e.is_not_found() => {
                info!("token rejected as unknown");
                self.set_phase(ScanPhase::Expired);
                (ScanOutcome::Invalid, e.to_string())
            }
            Err(e) => {
                warn!(error = %e, "scan submission failed");
                let message = CoreError::from(e).to_string();
                self.set_phase(ScanPhase::Error(message.clone()));
                (ScanOutcome::Failed, message)
            }
        };

        ScanAttempt {
            token: token.to_owned(),
            submitted_at,
            outcome,
            message,
        }
    }

    /// Cancel an in-flight decode. Idempotent; safe from any state.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn set_phase(&self, phase: ScanPhase) -> ScanPhase {
        debug!(?phase, "scan phase transition");
        // send_replace: the value must stick even with no subscriber
        // attached (plain send drops it when the receiver count is 0).
        self.phase.send_replace(phase.clone());
        phase
    }
}
