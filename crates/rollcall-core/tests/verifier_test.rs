// Student-verifier flow tests against a wiremock server.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rollcall_api::AttendanceClient;
use rollcall_core::{
    GeoPoint, QrSource, ScanError, ScanOutcome, ScanPhase, ScanVerifier,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Decodes the given payload once, then pends (camera keeps rolling
/// until dropped).
struct ImmediateQr {
    payload: Option<String>,
}

impl ImmediateQr {
    fn new(payload: &str) -> Self {
        Self {
            payload: Some(payload.to_owned()),
        }
    }
}

impl QrSource for ImmediateQr {
    async fn next_decode(&mut self) -> Result<String, ScanError> {
        match self.payload.take() {
            Some(p) => Ok(p),
            None => std::future::pending().await,
        }
    }
}

/// A camera that never produces a decode.
struct NeverDecodes;

impl QrSource for NeverDecodes {
    async fn next_decode(&mut self) -> Result<String, ScanError> {
        std::future::pending().await
    }
}

struct DeniedCamera;

impl QrSource for DeniedCamera {
    async fn next_decode(&mut self) -> Result<String, ScanError> {
        Err(ScanError::PermissionDenied {
            reason: "user blocked camera access".into(),
        })
    }
}

fn client_for(server: &MockServer) -> AttendanceClient {
    let base = server.uri().parse().expect("mock server URI");
    AttendanceClient::with_client(reqwest::Client::new(), base)
}

async fn mock_valid_session(server: &MockServer, token: &str) {
    let expires_at = Utc::now() + chrono::Duration::seconds(120);
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/sessions/by-token/{token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": Uuid::new_v4(),
            "courseId": "COS301",
            "token": token,
            "createdAt": null,
            "expiresAt": expires_at.to_rfc3339(),
            "geofence": { "lat": 6.0, "lng": 7.0, "radius": 60.0 },
            "active": true
        })))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn decode_submit_marks_attendance() {
    let server = MockServer::start().await;
    mock_valid_session(&server, "tok-1").await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scans"))
        .and(body_json(json!({ "token": "tok-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "attendance marked" })),
        )
        .mount(&server)
        .await;

    let mut verifier = ScanVerifier::new(client_for(&server));

    assert_eq!(verifier.load("tok-1").await, ScanPhase::Valid);
    assert!(verifier.seconds_remaining() > 0);

    let attempt = verifier.run(ImmediateQr::new("tok-1")).await.unwrap();
    assert_eq!(attempt.outcome, ScanOutcome::Accepted);
    assert_eq!(attempt.message, "attendance marked");
    assert_eq!(verifier.current_phase(), ScanPhase::Marked);
}

#[tokio::test]
async fn missing_session_goes_straight_to_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sessions/by-token/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    assert_eq!(verifier.load("gone").await, ScanPhase::Expired);
    assert!(verifier.session().is_none());
}

#[tokio::test]
async fn expired_session_on_load_goes_to_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sessions/by-token/stale"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "code": "session.expired",
            "message": "This session has expired"
        })))
        .mount(&server)
        .await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    assert_eq!(verifier.load("stale").await, ScanPhase::Expired);
}

#[tokio::test]
async fn rotated_past_token_maps_to_expired_not_error() {
    let server = MockServer::start().await;
    mock_valid_session(&server, "tok-old").await;

    // The lecturer has rotated past this token by submission time.
    Mock::given(method("POST"))
        .and(path("/api/v1/scans"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "token.expired",
            "message": "QR code has rotated"
        })))
        .mount(&server)
        .await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    verifier.load("tok-old").await;

    let attempt = verifier.run(ImmediateQr::new("tok-old")).await.unwrap();
    assert_eq!(attempt.outcome, ScanOutcome::Expired);
    assert_eq!(verifier.current_phase(), ScanPhase::Expired);
}

#[tokio::test]
async fn offline_submission_maps_to_error_with_offline_message() {
    // Nothing listens here: connect-class failure, i.e. offline.
    let base = "http://127.0.0.1:9".parse().expect("static URL");
    let api = AttendanceClient::with_client(reqwest::Client::new(), base);
    let mut verifier = ScanVerifier::new(api);

    let attempt = verifier.submit("tok-1").await;
    assert_eq!(attempt.outcome, ScanOutcome::Offline);
    assert!(attempt.message.to_lowercase().contains("offline"));

    match verifier.current_phase() {
        ScanPhase::Error(reason) => assert!(reason.to_lowercase().contains("offline")),
        other => panic!("expected Error phase, got {other:?}"),
    }
    // No session-state mutation on the offline path.
    assert!(verifier.session().is_none());
}

#[tokio::test]
async fn camera_denial_surfaces_specific_reason() {
    let server = MockServer::start().await;
    mock_valid_session(&server, "tok-1").await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    verifier.load("tok-1").await;

    let attempt = verifier.run(DeniedCamera).await.unwrap();
    assert_eq!(attempt.outcome, ScanOutcome::Failed);
    assert!(attempt.message.contains("blocked camera access"));

    // No scan was submitted.
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.iter().all(|r| r.url.path() != "/api/v1/scans"));
}

#[tokio::test]
async fn stop_is_idempotent_and_cancels_the_decode() {
    let server = MockServer::start().await;
    mock_valid_session(&server, "tok-1").await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    assert_eq!(verifier.load("tok-1").await, ScanPhase::Valid);

    verifier.stop();
    verifier.stop();

    // The decode is abandoned immediately; nothing reaches the server.
    let attempt = verifier.run(NeverDecodes).await.unwrap();
    assert_eq!(attempt.outcome, ScanOutcome::Failed);
    assert!(attempt.message.to_lowercase().contains("cancelled"));
    assert!(matches!(verifier.current_phase(), ScanPhase::Error(_)));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.iter().all(|r| r.url.path() != "/api/v1/scans"));

    // Stopping after the flow has already failed stays safe.
    verifier.stop();
}

#[tokio::test]
async fn geofence_feedback_tracks_session_fence() {
    let server = MockServer::start().await;
    mock_valid_session(&server, "tok-1").await;

    let mut verifier = ScanVerifier::new(client_for(&server));
    verifier.load("tok-1").await;

    let inside = verifier
        .geofence_feedback(GeoPoint::new(6.0, 7.0))
        .expect("session loaded");
    assert!(inside.inside);
    assert_eq!(inside.distance_m, 0.0);

    let outside = verifier
        .geofence_feedback(GeoPoint::new(6.01, 7.0))
        .expect("session loaded");
    assert!(!outside.inside);
}
