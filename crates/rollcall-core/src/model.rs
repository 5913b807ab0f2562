// ── Domain model ──
//
// Client-side projections of the attendance protocol. Wire DTOs from
// `rollcall-api` are converted into these at the crate boundary so the
// rest of core never touches raw JSON shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rollcall_api::types::{GeofenceDto, SessionDto};

/// Default geofence radius in meters.
pub const DEFAULT_RADIUS_M: f64 = 60.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One GPS reading. Ephemeral: produced by a `LocationSource`,
/// consumed by the sampler or discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub point: GeoPoint,
    /// Reported accuracy radius in meters (lower is better).
    pub accuracy_m: f64,
    pub at: DateTime<Utc>,
}

/// The sampler's best stable estimate of where the device is.
///
/// `best_accuracy_m` only ever improves within a sampling session.
/// Once `locked` flips true it never flips back; later fixes continue
/// to update `point` without re-gating readiness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LockedLocation {
    /// Latest accepted position. `None` until the first accepted fix.
    pub point: Option<GeoPoint>,
    /// Lowest accuracy value seen so far.
    pub best_accuracy_m: Option<f64>,
    pub locked: bool,
}

/// A circular presence area. Immutable once a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceSpec {
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl From<GeofenceDto> for GeofenceSpec {
    fn from(dto: GeofenceDto) -> Self {
        Self {
            center: GeoPoint::new(dto.lat, dto.lng),
            radius_m: if dto.radius > 0.0 {
                dto.radius
            } else {
                DEFAULT_RADIUS_M
            },
        }
    }
}

/// Client-side projection of a server-owned attendance session.
///
/// The server is the single source of truth for validity; everything
/// here is advisory except `id`, which keys the rotate/end calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub course_id: String,
    pub geofence: GeofenceSpec,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub token: String,
    pub active: bool,
}

impl From<SessionDto> for AttendanceSession {
    fn from(dto: SessionDto) -> Self {
        Self {
            id: dto.id,
            course_id: dto.course_id,
            geofence: dto.geofence.into(),
            created_at: dto.created_at,
            expires_at: dto.expires_at,
            token: dto.token,
            active: dto.active,
        }
    }
}

/// Lecturer-side session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial state before construction work has begun.
    Idle,
    /// Checking the server for a pre-existing active session.
    Restoring,
    /// Sampling GPS, waiting for a stable lock.
    AwaitingLock,
    /// Session-create call in flight.
    Creating,
    /// Session live: token rotating, countdown running.
    Active,
    /// Manual end in progress (local timers already stopped).
    Ending,
    /// Terminal. No resurrection.
    Ended,
}

/// Student-side scan lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPhase {
    /// Fetching session metadata for the token in the scanned URL.
    Loading,
    /// Session valid; camera decode loop may run.
    Valid,
    /// Attendance recorded. Terminal.
    Marked,
    /// Session or token expired/invalid (server-authoritative). Terminal.
    Expired,
    /// Any other failure, with a human-readable reason. Terminal.
    Error(String),
}

/// Outcome of one scan submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Accepted,
    Expired,
    Invalid,
    Offline,
    Failed,
}

/// One scan attempt, kept only for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanAttempt {
    pub token: String,
    pub submitted_at: DateTime<Utc>,
    pub outcome: ScanOutcome,
    /// Server message or failure reason, verbatim where available.
    pub message: String,
}

/// The QR payload a lecturer screen renders: a URL embedding the
/// current rotating token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub token: String,
    pub url: String,
}

impl QrPayload {
    /// Build the attend-URL for a token against the server base.
    pub fn new(base_url: &url::Url, token: &str) -> Self {
        let url = format!(
            "{}/attend?token={token}",
            base_url.as_str().trim_end_matches('/')
        );
        Self {
            token: token.to_owned(),
            url,
        }
    }
}
