// ── Geolocation: sampling, lock detection, geofence math ──

pub mod fence;
pub mod sampler;

use thiserror::Error;

pub use fence::{evaluate, haversine_m, GeofenceVerdict, EARTH_RADIUS_M};
pub use sampler::{
    FixDisposition, GeoSampler, LockTracker, LocationSource, SamplerHandle, SamplerPolicy,
};

/// Failures of the platform location capability.
///
/// These are fatal to the current flow -- sampling never silently
/// proceeds with a bad fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("Geolocation is not supported on this device: {reason}")]
    Unsupported { reason: String },

    #[error("Location permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Location source closed")]
    SourceClosed,
}

impl From<GeoError> for crate::error::CoreError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::Unsupported { reason } => Self::GeolocationUnavailable { reason },
            GeoError::SourceClosed => Self::GeolocationUnavailable {
                reason: "location source closed".into(),
            },
            GeoError::PermissionDenied { reason } => Self::PermissionDenied { reason },
        }
    }
}
