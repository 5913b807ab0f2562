// ── Lecturer session controller ──
//
// Explicit state machine for the attendance-session lifecycle:
//
//   Idle → Restoring → Active                 (pre-existing session adopted)
//                    → AwaitingLock → Creating → Active → Ending → Ended
//
// Active drives two concerns off the SessionClock: token rotation
// (sequence-tagged, last-write-wins so a stale in-flight response never
// regresses the displayed QR) and automatic end on expiry. Manual end
// tears down local timers before awaiting the network so the caller is
// never stuck behind a slow end call.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rollcall_api::types::{CreateLocationDto, CreateSessionRequest};
use rollcall_api::AttendanceClient;

use crate::clock::{ClockEvent, SessionClock, DEFAULT_ROTATION_INTERVAL};
use crate::error::CoreError;
use crate::geo::{GeoSampler, LocationSource, SamplerHandle, SamplerPolicy};
use crate::model::{QrPayload, SessionPhase, DEFAULT_RADIUS_M};

/// Tunables for a session being created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub duration: Duration,
    pub radius_m: f64,
    pub rotation_interval: Duration,
    /// Reported accuracy is capped at this value before being sent to
    /// the server, so one optimistic GPS reading can't tighten the
    /// server-side tolerance unrealistically.
    pub accuracy_clamp_m: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(600),
            radius_m: DEFAULT_RADIUS_M,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            accuracy_clamp_m: 100.0,
        }
    }
}

// ── Token sequencing ─────────────────────────────────────────────────

/// Holds the current rotating token under last-write-wins ordering.
///
/// Each rotation request takes a sequence number from [`issue`];
/// responses are applied through [`apply`], which discards anything at
/// or below the last applied sequence. Network reordering therefore
/// can't roll the displayed token back.
///
/// [`issue`]: TokenCell::issue
/// [`apply`]: TokenCell::apply
#[derive(Debug, Default)]
pub struct TokenCell {
    next_seq: u64,
    last_applied: Option<u64>,
    token: Option<String>,
}

impl TokenCell {
    /// Seed the initial token (from create or restore). Sequence 0, so
    /// every subsequent rotation outranks it.
    pub fn seed(&mut self, token: String) {
        self.last_applied = Some(0);
        self.token = Some(token);
    }

    /// Take a sequence number for an outgoing rotation request.
    pub fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Apply a rotation response. Returns `true` if the token advanced,
    /// `false` if the response was stale and discarded.
    pub fn apply(&mut self, seq: u64, token: String) -> bool {
        if self.last_applied.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_applied = Some(seq);
        self.token = Some(token);
        true
    }

    pub fn current(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// The lecturer-side entry point.
///
/// Cheaply cloneable via `Arc`. State is observable through watch
/// channels so presentation layers (CLI, screen) stay passive.
#[derive(Clone)]
pub struct AttendanceSessionController {
    inner: Arc<Inner>,
}

struct Inner {
    api: AttendanceClient,
    course_id: String,
    policy: SamplerPolicy,
    options: SessionOptions,

    phase: watch::Sender<SessionPhase>,
    qr: watch::Sender<Option<QrPayload>>,

    /// Guards the Active loop; cancelled on any end path.
    loop_cancel: CancellationToken,

    sampler: Mutex<Option<SamplerHandle>>,
    clock: Mutex<Option<SessionClock>>,
    session: Mutex<Option<LiveSession>>,
    tokens: Mutex<TokenCell>,
}

#[derive(Debug, Clone)]
struct LiveSession {
    id: Uuid,
    expires_at: DateTime<Utc>,
}

impl AttendanceSessionController {
    pub fn new(
        api: AttendanceClient,
        course_id: impl Into<String>,
        policy: SamplerPolicy,
        options: SessionOptions,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        let (qr, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                api,
                course_id: course_id.into(),
                policy,
                options,
                phase,
                qr,
                loop_cancel: CancellationToken::new(),
                sampler: Mutex::new(None),
                clock: Mutex::new(None),
                session: Mutex::new(None),
                tokens: Mutex::new(TokenCell::default()),
            }),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    pub fn current_phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    /// The QR payload to display, updated on every applied rotation.
    pub fn qr_payload(&self) -> watch::Receiver<Option<QrPayload>> {
        self.inner.qr.subscribe()
    }

    /// Countdown to expiry; 0 when no clock is running.
    pub fn seconds_remaining(&self) -> i64 {
        self.inner
            .clock
            .lock()
            .expect("clock mutex poisoned")
            .as_ref()
            .map_or(0, SessionClock::seconds_remaining)
    }

    /// The sampler's live state, for "stabilizing" feedback.
    pub fn location(&self) -> Option<crate::model::LockedLocation> {
        self.inner
            .sampler
            .lock()
            .expect("sampler mutex poisoned")
            .as_ref()
            .map(SamplerHandle::current)
    }

    /// Wait for the GPS lock (or a capability failure).
    pub async fn wait_for_lock(&self) -> Result<crate::model::LockedLocation, CoreError> {
        let handle = self
            .inner
            .sampler
            .lock()
            .expect("sampler mutex poisoned")
            .clone();
        match handle {
            Some(h) => h.wait_for_lock().await.map_err(CoreError::from),
            None => Err(CoreError::InvalidPhase {
                operation: "wait_for_lock",
                phase: self.current_phase(),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Begin the lifecycle: check for an adoptable session, otherwise
    /// start GPS sampling.
    ///
    /// `Idle → Restoring → Active` when the server already has a live
    /// session for this course; `Idle → Restoring → AwaitingLock`
    /// otherwise. A failed restore query is logged and treated as "no
    /// session" -- the server will still refuse a duplicate create.
    pub async fn start<S: LocationSource>(&self, source: S) -> Result<(), CoreError> {
        self.expect_phase(SessionPhase::Idle, "start")?;
        self.set_phase(SessionPhase::Restoring);

        match self.inner.api.active_session(&self.inner.course_id).await {
            Ok(Some(dto)) => {
                info!(session_id = %dto.id, "adopting already-active session");
                self.adopt(dto.id, dto.expires_at, dto.token);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "active-session query failed -- proceeding to GPS lock");
            }
        }

        let handle = GeoSampler::start(source, self.inner.policy);
        *self.inner.sampler.lock().expect("sampler mutex poisoned") = Some(handle);
        self.set_phase(SessionPhase::AwaitingLock);
        Ok(())
    }

    /// Create the session. Guarded: refuses without a GPS lock at
    /// usable accuracy, before any network call is made.
    pub async fn create(&self) -> Result<(), CoreError> {
        self.expect_phase(SessionPhase::AwaitingLock, "create")?;

        let snapshot = self.location().unwrap_or_default();
        let usable = snapshot.locked
            && snapshot.point.is_some()
            && snapshot
                .best_accuracy_m
                .is_some_and(|a| a <= self.inner.policy.lock_accuracy_m);
        if !usable {
            return Err(CoreError::GpsNotStable {
                best_accuracy_m: snapshot.best_accuracy_m,
            });
        }

        let point = snapshot.point.expect("checked above");
        let accuracy = snapshot
            .best_accuracy_m
            .expect("checked above")
            .min(self.inner.options.accuracy_clamp_m);

        self.set_phase(SessionPhase::Creating);

        let req = CreateSessionRequest {
            duration_secs: self.inner.options.duration.as_secs(),
            location: CreateLocationDto {
                lat: point.lat,
                lng: point.lng,
                accuracy,
                radius: self.inner.options.radius_m,
            },
        };

        match self
            .inner
            .api
            .create_session(&self.inner.course_id, &req)
            .await
        {
            Ok(created) => {
                info!(
                    session_id = %created.session_id,
                    expires_at = %created.expires_at,
                    "session created"
                );
                self.adopt(created.session_id, created.expires_at, created.token);
                Ok(())
            }
            Err(e) => {
                // Create failed: back to AwaitingLock, the lock is intact.
                self.set_phase(SessionPhase::AwaitingLock);
                Err(e.into())
            }
        }
    }

    /// End the session manually.
    ///
    /// Valid from any phase after [`start`]: before `Active` there is
    /// no server session yet, so ending just tears down the sampler and
    /// reaches `Ended` locally. Local timers always stop before the
    /// network call is awaited, and the phase reaches `Ended`
    /// regardless of the call's outcome -- a slow or failed end must
    /// never leave the caller stuck.
    ///
    /// [`start`]: AttendanceSessionController::start
    pub async fn end(&self) -> Result<String, CoreError> {
        match self.current_phase() {
            SessionPhase::Ended | SessionPhase::Ending => {
                return Ok("session already ended".into())
            }
            SessionPhase::Idle => {
                return Err(CoreError::InvalidPhase {
                    operation: "end",
                    phase: SessionPhase::Idle,
                })
            }
            _ => {}
        }

        self.set_phase(SessionPhase::Ending);
        self.teardown_local();

        let session = self
            .inner
            .session
            .lock()
            .expect("session mutex poisoned")
            .clone();

        let result = match session {
            Some(live) => self
                .inner
                .api
                .end_session(&live.id)
                .await
                .map(|m| m.message)
                .map_err(CoreError::from),
            None => Ok("session ended".into()),
        };

        self.set_phase(SessionPhase::Ended);
        if let Err(ref e) = result {
            warn!(error = %e, "end-session call failed (session ended locally)");
        }
        result
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Adopt a live session (from create or restore): seed the token,
    /// publish the QR, start the clock, spawn the active loop.
    fn adopt(&self, id: Uuid, expires_at: DateTime<Utc>, token: String) {
        *self.inner.session.lock().expect("session mutex poisoned") =
            Some(LiveSession { id, expires_at });

        {
            let mut tokens = self.inner.tokens.lock().expect("tokens mutex poisoned");
            tokens.seed(token.clone());
        }
        self.publish_qr(&token);

        let (clock, events) = SessionClock::start(expires_at, self.inner.options.rotation_interval);
        *self.inner.clock.lock().expect("clock mutex poisoned") = Some(clock);

        let ctrl = self.clone();
        tokio::spawn(active_loop(ctrl, events));

        self.set_phase(SessionPhase::Active);
    }

    /// Stop clock, sampler, and the active loop. Safe on every exit
    /// path, including error paths; each piece is idempotent.
    fn teardown_local(&self) {
        if let Some(clock) = self
            .inner
            .clock
            .lock()
            .expect("clock mutex poisoned")
            .take()
        {
            clock.stop();
        }
        if let Some(sampler) = self
            .inner
            .sampler
            .lock()
            .expect("sampler mutex poisoned")
            .take()
        {
            sampler.stop();
        }
        self.inner.loop_cancel.cancel();
    }

    fn publish_qr(&self, token: &str) {
        let payload = QrPayload::new(self.inner.api.base_url(), token);
        // send_replace: the value must stick even with no subscriber
        // attached (plain send drops it when the receiver count is 0).
        self.inner.qr.send_replace(Some(payload));
    }

    fn set_phase(&self, phase: SessionPhase) {
        debug!(?phase, "phase transition");
        self.inner.phase.send_replace(phase);
    }

    fn expect_phase(&self, expected: SessionPhase, operation: &'static str) -> Result<(), CoreError> {
        let phase = self.current_phase();
        if phase == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidPhase { operation, phase })
        }
    }
}

// ── Active loop ──────────────────────────────────────────────────────

/// Drives the Active phase: rotation ticks fan out as tagged requests,
/// responses come back through one channel and are applied
/// last-write-wins; expiry triggers the automatic end.
async fn active_loop(
    ctrl: AttendanceSessionController,
    mut events: mpsc::Receiver<ClockEvent>,
) {
    let cancel = ctrl.inner.loop_cancel.clone();
    let (result_tx, mut result_rx) =
        mpsc::channel::<(u64, Result<String, rollcall_api::Error>)>(8);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some((seq, result)) = result_rx.recv() => {
                match result {
                    Ok(token) => {
                        let applied = ctrl
                            .inner
                            .tokens
                            .lock()
                            .expect("tokens mutex poisoned")
                            .apply(seq, token.clone());
                        if applied {
                            ctrl.publish_qr(&token);
                            debug!(seq, "token rotated");
                        } else {
                            debug!(seq, "stale rotation response discarded");
                        }
                    }
                    Err(e) => {
                        // Non-fatal: the session keeps its current token
                        // and the next tick tries again.
                        warn!(seq, error = %e, "token rotation failed -- will retry next tick");
                    }
                }
            }
            event = events.recv() => match event {
                Some(ClockEvent::Rotate) => {
                    let Some(live) = ctrl
                        .inner
                        .session
                        .lock()
                        .expect("session mutex poisoned")
                        .clone()
                    else {
                        continue;
                    };
                    let seq = ctrl
                        .inner
                        .tokens
                        .lock()
                        .expect("tokens mutex poisoned")
                        .issue();
                    let api = ctrl.inner.api.clone();
                    let tx = result_tx.clone();
                    tokio::spawn(async move {
                        let result = api
                            .rotate_token(&live.id)
                            .await
                            .map(|r| r.token);
                        let _ = tx.send((seq, result)).await;
                    });
                }
                Some(ClockEvent::Expired) | None => {
                    auto_end(&ctrl).await;
                    break;
                }
            },
        }
    }
}

/// Automatic end on expiry: local teardown first, then the server call
/// (failure logged, not surfaced -- the session is over either way).
async fn auto_end(ctrl: &AttendanceSessionController) {
    if ctrl.current_phase() != SessionPhase::Active {
        return;
    }

    info!("session expired -- ending automatically");
    ctrl.set_phase(SessionPhase::Ending);
    ctrl.teardown_local();

    let session = ctrl
        .inner
        .session
        .lock()
        .expect("session mutex poisoned")
        .clone();
    if let Some(live) = session {
        if let Err(e) = ctrl.inner.api.end_session(&live.id).await {
            warn!(error = %e, "auto end-session call failed");
        }
    }

    ctrl.set_phase(SessionPhase::Ended);
}
