// rollcall-core: the attendance-session protocol between rollcall-api
// and consumers (CLI, screens). State machines, timers, and geo math --
// no presentation, no disk I/O.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod geo;
pub mod model;
pub mod poller;
pub mod verifier;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{ClockEvent, SessionClock, DEFAULT_ROTATION_INTERVAL};
pub use config::{ServerConfig, SessionDefaults};
pub use controller::{AttendanceSessionController, SessionOptions, TokenCell};
pub use error::CoreError;
pub use geo::{
    evaluate, haversine_m, GeoError, GeoSampler, GeofenceVerdict, LocationSource, LockTracker,
    SamplerHandle, SamplerPolicy,
};
pub use poller::{ActiveSessionPoller, DEFAULT_POLL_INTERVAL};
pub use verifier::{QrSource, ScanError, ScanVerifier};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AttendanceSession, GeoFix, GeoPoint, GeofenceSpec, LockedLocation, QrPayload, ScanAttempt,
    ScanOutcome, ScanPhase, SessionPhase, DEFAULT_RADIUS_M,
};
