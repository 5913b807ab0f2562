// Integration tests for `AttendanceClient` using wiremock.

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rollcall_api::types::{CreateLocationDto, CreateSessionRequest};
use rollcall_api::{AttendanceClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AttendanceClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().expect("mock server URI");
    let client = AttendanceClient::with_client(reqwest::Client::new(), base);
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_active_session_present() {
    let (server, client) = setup().await;

    let session_id = Uuid::new_v4();
    let body = json!({
        "active": true,
        "session": {
            "id": session_id,
            "courseId": "COS301",
            "token": "tok-1",
            "createdAt": "2025-03-01T08:00:00Z",
            "expiresAt": "2025-03-01T09:00:00Z",
            "geofence": { "lat": 6.0, "lng": 7.0, "radius": 60.0 },
            "active": true
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/courses/COS301/active-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let session = client
        .active_session("COS301")
        .await
        .unwrap()
        .expect("session should be present");

    assert_eq!(session.id, session_id);
    assert_eq!(session.token, "tok-1");
    assert_eq!(session.geofence.radius, 60.0);
}

#[tokio::test]
async fn test_active_session_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/courses/COS301/active-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active": false })))
        .mount(&server)
        .await;

    let session = client.active_session("COS301").await.unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn test_create_session() {
    let (server, client) = setup().await;

    let session_id = Uuid::new_v4();
    let req = CreateSessionRequest {
        duration_secs: 600,
        location: CreateLocationDto {
            lat: 6.0,
            lng: 7.0,
            accuracy: 42.0,
            radius: 60.0,
        },
    };

    Mock::given(method("POST"))
        .and(path("/api/v1/courses/COS301/sessions"))
        .and(body_json(json!({
            "durationSecs": 600,
            "location": { "lat": 6.0, "lng": 7.0, "accuracy": 42.0, "radius": 60.0 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sessionId": session_id,
            "token": "tok-initial",
            "expiresAt": "2025-03-01T09:00:00Z"
        })))
        .mount(&server)
        .await;

    let created = client.create_session("COS301", &req).await.unwrap();
    assert_eq!(created.session_id, session_id);
    assert_eq!(created.token, "tok-initial");
}

#[tokio::test]
async fn test_rotate_and_end() {
    let (server, client) = setup().await;
    let session_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/api/v1/sessions/{session_id}/rotate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-2" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/api/v1/sessions/{session_id}/end")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "session ended" })),
        )
        .mount(&server)
        .await;

    let rotated = client.rotate_token(&session_id).await.unwrap();
    assert_eq!(rotated.token, "tok-2");

    let ended = client.end_session(&session_id).await.unwrap();
    assert_eq!(ended.message, "session ended");
}

#[tokio::test]
async fn test_submit_scan_accepted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scans"))
        .and(body_json(json!({ "token": "tok-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "attendance marked" })),
        )
        .mount(&server)
        .await;

    let result = client.submit_scan("tok-1").await.unwrap();
    assert_eq!(result.message, "attendance marked");
}

// ── Rejection-envelope tests ────────────────────────────────────────

#[tokio::test]
async fn test_session_by_token_missing_maps_to_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sessions/by-token/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.session_by_token("gone").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_expired_session_410() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sessions/by-token/stale"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "code": "session.expired",
            "message": "This session has expired"
        })))
        .mount(&server)
        .await;

    let err = client.session_by_token("stale").await.unwrap_err();
    assert!(err.is_expired());
    assert!(matches!(err, Error::SessionExpired { .. }));
}

#[tokio::test]
async fn test_scan_rejection_with_expired_code() {
    let (server, client) = setup().await;

    // Expiry reported through the envelope code, not a 410.
    Mock::given(method("POST"))
        .and(path("/api/v1/scans"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "token.expired",
            "message": "QR code has rotated"
        })))
        .mount(&server)
        .await;

    let err = client.submit_scan("old-token").await.unwrap_err();
    assert!(err.is_expired());
}

#[tokio::test]
async fn test_structured_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scans"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": "geofence.violation",
            "message": "You are outside the class area"
        })))
        .mount(&server)
        .await;

    let err = client.submit_scan("tok").await.unwrap_err();
    match err {
        Error::Api { code, message, status } => {
            assert_eq!(code.as_deref(), Some("geofence.violation"));
            assert_eq!(message, "You are outside the class area");
            assert_eq!(status, 422);
        }
        other => panic!("expected Error::Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/00000000-0000-0000-0000-000000000000/rotate"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "bad token" })),
        )
        .mount(&server)
        .await;

    let err = client.rotate_token(&Uuid::nil()).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn test_offline_detection() {
    // Point at a port nothing is listening on: connect-class failure.
    let base = "http://127.0.0.1:9".parse().expect("static URL");
    let client = AttendanceClient::with_client(reqwest::Client::new(), base);

    let err = client.submit_scan("tok").await.unwrap_err();
    assert!(err.is_offline());
}
