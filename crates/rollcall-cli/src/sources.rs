//! CLI-side implementations of the core capability seams.
//!
//! The CLI has no real GPS receiver or camera, so the venue position
//! comes from flags and the "scan" is the token the user pasted.

use std::time::Duration;

use chrono::Utc;

use rollcall_core::{GeoError, GeoFix, GeoPoint, LocationSource, QrSource, ScanError};

/// Emits the same flag-supplied position on a fixed cadence, the way a
/// stationary receiver would.
pub struct FixedLocationSource {
    point: GeoPoint,
    accuracy_m: f64,
    interval: Duration,
}

impl FixedLocationSource {
    pub fn new(point: GeoPoint, accuracy_m: f64) -> Self {
        Self {
            point,
            accuracy_m,
            interval: Duration::from_millis(400),
        }
    }
}

impl LocationSource for FixedLocationSource {
    async fn next_fix(&mut self) -> Result<GeoFix, GeoError> {
        tokio::time::sleep(self.interval).await;
        Ok(GeoFix {
            point: self.point,
            accuracy_m: self.accuracy_m,
            at: Utc::now(),
        })
    }
}

/// "Decodes" the token handed in on the command line, once.
pub struct PastedTokenSource {
    token: Option<String>,
}

impl PastedTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl QrSource for PastedTokenSource {
    async fn next_decode(&mut self) -> Result<String, ScanError> {
        self.token.take().ok_or(ScanError::Cancelled)
    }
}
