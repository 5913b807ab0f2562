// ── Runtime configuration ──
//
// These types describe *how* to reach the attendance server and which
// protocol tunables apply. They carry credential data but never touch
// disk -- the CLI constructs them from profiles and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use rollcall_api::{AttendanceClient, TransportConfig};

use crate::clock::DEFAULT_ROTATION_INTERVAL;
use crate::error::CoreError;
use crate::model::DEFAULT_RADIUS_M;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Connection settings for the attendance server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server root (e.g. `https://attendance.example.edu`).
    pub base_url: Url,
    /// Bearer token; `None` for the unauthenticated student path.
    pub bearer_token: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
}

impl ServerConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            bearer_token: None,
            timeout: TransportConfig::DEFAULT_TIMEOUT,
        }
    }

    /// Build an [`AttendanceClient`] from this config.
    pub fn build_client(&self) -> Result<AttendanceClient, CoreError> {
        let transport = TransportConfig {
            bearer_token: self.bearer_token.clone(),
            timeout: Some(self.timeout),
        };
        AttendanceClient::new(self.base_url.clone(), &transport).map_err(CoreError::from)
    }
}

/// Per-deployment session tunables with the protocol defaults.
///
/// The original deployment hard-coded these; larger venues (big
/// lecture halls, outdoor sessions) override radius and the sampler
/// tolerances per profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionDefaults {
    pub duration: Duration,
    pub radius_m: f64,
    pub rotation_interval: Duration,
    pub accuracy_clamp_m: f64,
    pub poll_interval: Duration,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(600),
            radius_m: DEFAULT_RADIUS_M,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            accuracy_clamp_m: 100.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
