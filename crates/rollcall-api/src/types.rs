// Wire types for the attendance API.
//
// These mirror the server's JSON exactly (camelCase fields) and carry
// no behavior. `rollcall-core` converts them into domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geofence as the server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceDto {
    pub lat: f64,
    pub lng: f64,
    /// Radius in meters.
    pub radius: f64,
}

/// One attendance session as projected to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub course_id: String,
    pub token: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub geofence: GeofenceDto,
    pub active: bool,
}

/// Response of `GET /courses/{id}/active-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionResponse {
    pub active: bool,
    #[serde(default)]
    pub session: Option<SessionDto>,
}

/// Location payload sent when creating a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationDto {
    pub lat: f64,
    pub lng: f64,
    /// Reported GPS accuracy in meters (clamped client-side).
    pub accuracy: f64,
    /// Geofence radius in meters.
    pub radius: f64,
}

/// Request body of `POST /courses/{id}/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Session duration in seconds.
    pub duration_secs: u64,
    pub location: CreateLocationDto,
}

/// Response of session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedDto {
    pub session_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response of `POST /sessions/{id}/rotate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatedTokenDto {
    pub token: String,
}

/// Generic `{message}` acknowledgement (end-session, submit-scan).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub message: String,
}

/// Request body of `POST /scans`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScanRequest {
    pub token: String,
}

/// Structured error envelope the server returns on rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
