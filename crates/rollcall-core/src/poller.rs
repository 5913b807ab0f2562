// ── Active-session poller ──
//
// One poller per course context, shared by every consumer through a
// watch channel, instead of each screen re-polling on its own
// schedule. Poll failures keep the last good value; consumers see a
// snapshot, never an error.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rollcall_api::AttendanceClient;

use crate::model::AttendanceSession;

/// Default active-session poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Handle to a running poller. Cheap to clone; `stop` is idempotent.
#[derive(Debug, Clone)]
pub struct ActiveSessionPoller {
    cancel: CancellationToken,
    snapshot: watch::Receiver<Option<AttendanceSession>>,
}

impl ActiveSessionPoller {
    /// Start polling `active-session` for a course.
    ///
    /// The first poll fires immediately; consumers subscribed via
    /// [`subscribe`](Self::subscribe) see every change of the snapshot.
    pub fn start(api: AttendanceClient, course_id: impl Into<String>, every: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        tokio::spawn(poll_task(api, course_id.into(), every, tx, cancel.clone()));

        Self {
            cancel,
            snapshot: rx,
        }
    }

    /// Latest known state: `None` when no session is active (or before
    /// the first successful poll).
    pub fn current(&self) -> Option<AttendanceSession> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AttendanceSession>> {
        self.snapshot.clone()
    }

    /// Stop polling. Idempotent; safe from any state.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

async fn poll_task(
    api: AttendanceClient,
    course_id: String,
    every: Duration,
    tx: watch::Sender<Option<AttendanceSession>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(course_id, "session poller stopped");
                break;
            }
            _ = ticker.tick() => {
                match api.active_session(&course_id).await {
                    Ok(dto) => {
                        let session = dto.map(AttendanceSession::from);
                        // Only wake consumers when something changed.
                        tx.send_if_modified(|current| {
                            if *current == session {
                                false
                            } else {
                                *current = session;
                                true
                            }
                        });
                    }
                    Err(e) => {
                        warn!(course_id, error = %e, "active-session poll failed -- keeping last value");
                    }
                }
            }
        }
    }
}
