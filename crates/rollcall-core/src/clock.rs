// ── Session countdown and rotation timing ──
//
// One task, three timers: a 1 s countdown republish, the fixed-cadence
// rotation tick, and the absolute-expiry deadline. Expiry is handled
// first (biased select) and breaks the loop, so no Rotate event can
// ever follow Expired -- the rotation timer dies as a side effect of
// the expiry firing, exactly once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default QR rotation cadence.
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(10);

const EVENT_CHANNEL_SIZE: usize = 16;

/// Events emitted by a running clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Time to mint a fresh token.
    Rotate,
    /// The session's absolute expiry was reached. Always the last event.
    Expired,
}

/// Handle to a running session clock.
///
/// Cheap to clone. `stop` is idempotent and synchronously cancels both
/// timers; safe to call from any state, including after expiry.
#[derive(Debug, Clone)]
pub struct SessionClock {
    cancel: CancellationToken,
    remaining: watch::Receiver<i64>,
}

impl SessionClock {
    /// Start a clock counting down to `expires_at`, rotating every
    /// `rotation_interval`.
    ///
    /// An `expires_at` in the past produces an immediate `Expired`.
    pub fn start(
        expires_at: DateTime<Utc>,
        rotation_interval: Duration,
    ) -> (Self, mpsc::Receiver<ClockEvent>) {
        let ttl = (expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (remaining_tx, remaining_rx) = watch::channel(whole_seconds(ttl));
        let cancel = CancellationToken::new();

        tokio::spawn(clock_task(
            ttl,
            rotation_interval,
            event_tx,
            remaining_tx,
            cancel.clone(),
        ));

        (
            Self {
                cancel,
                remaining: remaining_rx,
            },
            event_rx,
        )
    }

    /// Whole seconds until expiry (0 once expired).
    pub fn seconds_remaining(&self) -> i64 {
        *self.remaining.borrow()
    }

    /// Subscribe to the once-per-second countdown.
    pub fn remaining(&self) -> watch::Receiver<i64> {
        self.remaining.clone()
    }

    /// Stop both timers. Idempotent; never double-fires events.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

fn whole_seconds(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

async fn clock_task(
    ttl: Duration,
    rotation_interval: Duration,
    event_tx: mpsc::Sender<ClockEvent>,
    remaining_tx: watch::Sender<i64>,
    cancel: CancellationToken,
) {
    let expiry_at = Instant::now() + ttl;
    let expiry = sleep_until(expiry_at);
    tokio::pin!(expiry);

    // First rotation fires one full interval in, not immediately --
    // the session already holds a fresh token at creation.
    let mut rotate = interval_at(Instant::now() + rotation_interval, rotation_interval);
    rotate.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut countdown = interval(Duration::from_secs(1));
    countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("session clock stopped");
                break;
            }
            () = &mut expiry => {
                let _ = remaining_tx.send(0);
                let _ = event_tx.send(ClockEvent::Expired).await;
                debug!("session expired");
                break;
            }
            _ = rotate.tick() => {
                let _ = event_tx.send(ClockEvent::Rotate).await;
            }
            _ = countdown.tick() => {
                let left = expiry_at.saturating_duration_since(Instant::now());
                let _ = remaining_tx.send(whole_seconds(left));
            }
        }
    }
}
