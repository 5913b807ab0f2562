// ── GPS sampling and lock detection ──
//
// `LockTracker` is the pure state machine: it owns the qualifying-fix
// counter and best-fix tracking, with no timers or I/O. `GeoSampler`
// wraps it in a background task that reads a `LocationSource`, applies
// the lock-timeout fallback, and publishes state through a watch
// channel. Consumers must be robust to a never-locking stream; the
// timeout guarantees `locked` flips true eventually either way.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::model::{GeoFix, LockedLocation};

use super::GeoError;

/// Platform GPS seam. Implementations wrap whatever the device offers
/// (a location watch, an NMEA stream, a scripted test feed).
///
/// `next_fix` resolves with high-accuracy readings only -- cached fixes
/// must not be replayed. Capability problems (no geolocation support,
/// permission denied) surface as errors on the first call rather than
/// silently producing bad fixes.
pub trait LocationSource: Send + 'static {
    fn next_fix(&mut self) -> impl Future<Output = Result<GeoFix, GeoError>> + Send;
}

/// Role-specific sampling tolerances.
///
/// All knobs are deployment-configurable; the defaults below are the
/// field-tested values for phone GPS in and around lecture halls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerPolicy {
    /// Fixes with worse accuracy than this are presumed network/IP
    /// positioning and discarded outright.
    pub reject_above_m: f64,
    /// A fix at or below this accuracy counts toward the lock.
    pub lock_accuracy_m: f64,
    /// How many qualifying fixes are needed to declare a lock.
    pub lock_fix_count: u32,
    /// Hard upper bound on the wait: lock is forced at this deadline
    /// even if the stream never stabilizes.
    pub lock_timeout: Duration,
}

impl SamplerPolicy {
    /// Stricter path used when creating a session.
    pub fn lecturer() -> Self {
        Self {
            reject_above_m: 200.0,
            lock_accuracy_m: 60.0,
            lock_fix_count: 3,
            lock_timeout: Duration::from_secs(8),
        }
    }

    /// Lighter path used for student-side presence feedback.
    pub fn student() -> Self {
        Self {
            reject_above_m: 300.0,
            lock_accuracy_m: 60.0,
            lock_fix_count: 2,
            lock_timeout: Duration::from_secs(12),
        }
    }
}

/// What happened to an offered fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixDisposition {
    /// Accuracy above the rejection ceiling; ignored entirely.
    Rejected,
    /// Accepted: live position and best-accuracy updated.
    Accepted,
    /// Accepted, and this fix completed the lock.
    AcceptedAndLocked,
}

/// Pure lock state machine. No timers, no channels.
#[derive(Debug)]
pub struct LockTracker {
    policy: SamplerPolicy,
    qualifying: u32,
    state: LockedLocation,
}

impl LockTracker {
    pub fn new(policy: SamplerPolicy) -> Self {
        Self {
            policy,
            qualifying: 0,
            state: LockedLocation::default(),
        }
    }

    /// Offer one fix. Updates live position, best accuracy, and the
    /// qualifying counter; declares lock when the count is reached.
    pub fn offer(&mut self, fix: &GeoFix) -> FixDisposition {
        if fix.accuracy_m > self.policy.reject_above_m {
            return FixDisposition::Rejected;
        }

        self.state.point = Some(fix.point);
        self.state.best_accuracy_m = Some(
            self.state
                .best_accuracy_m
                .map_or(fix.accuracy_m, |best| best.min(fix.accuracy_m)),
        );

        if !self.state.locked && fix.accuracy_m <= self.policy.lock_accuracy_m {
            self.qualifying += 1;
            if self.qualifying >= self.policy.lock_fix_count {
                self.state.locked = true;
                return FixDisposition::AcceptedAndLocked;
            }
        }

        FixDisposition::Accepted
    }

    /// Force the lock at the timeout boundary. Returns `true` if this
    /// call performed the transition.
    pub fn force_lock(&mut self) -> bool {
        if self.state.locked {
            return false;
        }
        self.state.locked = true;
        true
    }

    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    pub fn snapshot(&self) -> LockedLocation {
        self.state
    }
}

/// Handle to a running sampling session.
///
/// Cheap to clone; all clones observe the same state. `stop` is
/// idempotent and synchronously cancels the sampling task.
#[derive(Debug, Clone)]
pub struct SamplerHandle {
    cancel: CancellationToken,
    location: watch::Receiver<LockedLocation>,
    failure: watch::Receiver<Option<GeoError>>,
}

impl SamplerHandle {
    /// Latest published state.
    pub fn current(&self) -> LockedLocation {
        *self.location.borrow()
    }

    /// Capability failure, if the source died.
    pub fn failure(&self) -> Option<GeoError> {
        self.failure.borrow().clone()
    }

    /// Subscribe to state updates (one send per accepted fix, plus the
    /// lock transition itself).
    pub fn subscribe(&self) -> watch::Receiver<LockedLocation> {
        self.location.clone()
    }

    /// Wait until the sampler reports `locked = true` or the source fails.
    pub async fn wait_for_lock(&self) -> Result<LockedLocation, GeoError> {
        let mut location = self.location.clone();
        let mut failure = self.failure.clone();

        loop {
            {
                if let Some(err) = failure.borrow_and_update().clone() {
                    return Err(err);
                }
                let state = *location.borrow_and_update();
                if state.locked {
                    return Ok(state);
                }
            }

            tokio::select! {
                changed = location.changed() => {
                    if changed.is_err() {
                        return Err(GeoError::SourceClosed);
                    }
                }
                changed = failure.changed() => {
                    if changed.is_err() {
                        return Err(GeoError::SourceClosed);
                    }
                }
            }
        }
    }

    /// Stop sampling. Releases the underlying source by cancelling its
    /// task; safe to call from any state, any number of times.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Continuous GPS sampler with lock detection.
pub struct GeoSampler;

impl GeoSampler {
    /// Start sampling from `source` under `policy`.
    ///
    /// The returned handle owns the session; call
    /// [`SamplerHandle::stop`] when done.
    pub fn start<S: LocationSource>(source: S, policy: SamplerPolicy) -> SamplerHandle {
        let (location_tx, location_rx) = watch::channel(LockedLocation::default());
        let (failure_tx, failure_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        tokio::spawn(sample_task(
            source,
            policy,
            location_tx,
            failure_tx,
            cancel.clone(),
        ));

        SamplerHandle {
            cancel,
            location: location_rx,
            failure: failure_rx,
        }
    }
}

async fn sample_task<S: LocationSource>(
    mut source: S,
    policy: SamplerPolicy,
    location_tx: watch::Sender<LockedLocation>,
    failure_tx: watch::Sender<Option<GeoError>>,
    cancel: CancellationToken,
) {
    let mut tracker = LockTracker::new(policy);
    let deadline = Instant::now() + policy.lock_timeout;
    let timeout = sleep_until(deadline);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("sampler stopped");
                break;
            }
            () = &mut timeout, if !tracker.is_locked() => {
                tracker.force_lock();
                debug!(
                    best_accuracy_m = ?tracker.snapshot().best_accuracy_m,
                    "lock timeout reached -- forcing lock"
                );
                let _ = location_tx.send(tracker.snapshot());
            }
            fix = source.next_fix() => {
                match fix {
                    Ok(fix) => match tracker.offer(&fix) {
                        FixDisposition::Rejected => {
                            trace!(accuracy_m = fix.accuracy_m, "fix rejected (above ceiling)");
                        }
                        FixDisposition::Accepted => {
                            let _ = location_tx.send(tracker.snapshot());
                        }
                        FixDisposition::AcceptedAndLocked => {
                            debug!(
                                accuracy_m = fix.accuracy_m,
                                "GPS lock acquired"
                            );
                            let _ = location_tx.send(tracker.snapshot());
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "location source failed");
                        let _ = failure_tx.send(Some(err));
                        break;
                    }
                }
            }
        }
    }
}
