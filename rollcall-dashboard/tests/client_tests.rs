//! Integration tests for the API client against a mock backend
//!
//! Tests cover:
//! - Bearer token on every session request
//! - 401 ends the session (token cleared, login redirect, LoggedOut event)
//! - Error message extraction from error bodies
//! - Multipart uploads and login
//! - Unreachable backend surfaces as a network error

mod common;

use axum::{
    extract::Multipart,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use common::{harness, spawn_backend, Captured, TOKEN};
use rollcall_common::config::ReloadPolicy;
use rollcall_common::events::DashboardEvent;
use rollcall_common::token::TokenStore;
use rollcall_dashboard::{AlertLevel, ClientError};

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let seen = Captured::default();
    let recorder = seen.clone();
    let app = Router::new().route(
        "/students",
        get(move |headers: HeaderMap| {
            let recorder = recorder.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                recorder.push(json!(auth));
                Json(common::sample_roster())
            }
        }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let count = h.dashboard.load_students().await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(seen.all(), vec![json!(format!("Bearer {}", TOKEN))]);
}

#[tokio::test]
async fn test_unauthorized_ends_session() {
    let app = Router::new().route(
        "/students",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"}))) }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);
    let mut events = h.dashboard.store.events().subscribe();

    let result = h.dashboard.load_students().await;

    assert!(matches!(result, Err(ClientError::Unauthorized)));
    assert!(h.tokens.load().is_none(), "Token should be cleared");
    assert_eq!(h.notifier.redirects(), 1);
    assert!(
        h.notifier.alerts_at(AlertLevel::Error).is_empty(),
        "Session expiry should not raise an error alert"
    );
    assert!(matches!(events.try_recv(), Ok(DashboardEvent::LoggedOut)));
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let app = Router::new().route(
        "/students",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Teacher not found"}))) }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let err = h.dashboard.load_students().await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Teacher not found");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
    let errors = h.notifier.alerts_at(AlertLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Teacher not found"));
    assert_eq!(h.tokens.load().as_deref(), Some(TOKEN), "Token kept on non-401 errors");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let result = h.dashboard.load_students().await;

    assert!(matches!(result, Err(ClientError::Network(_))));
    assert_eq!(h.notifier.alerts_at(AlertLevel::Error).len(), 1);
    assert_eq!(h.notifier.redirects(), 0);
    assert_eq!(h.tokens.load().as_deref(), Some(TOKEN), "Token kept on network errors");
}

#[tokio::test]
async fn test_structured_detail_is_stringified() {
    let app = Router::new().route(
        "/students",
        get(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]})),
            )
        }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let err = h.dashboard.load_students().await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("field required"));
}

#[tokio::test]
async fn test_import_sends_multipart_and_reloads() {
    let uploads = Captured::default();
    let recorder = uploads.clone();
    let app = Router::new()
        .route("/students", get(|| async { Json(common::sample_roster()) }))
        .route(
            "/students/upload",
            post(move |headers: HeaderMap, mut multipart: Multipart| {
                let recorder = recorder.clone();
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    let mut file_name = String::new();
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        if field.name() == Some("file") {
                            file_name = field.file_name().unwrap_or("").to_string();
                        }
                    }
                    recorder.push(json!({"content_type": content_type, "file": file_name}));
                    Json(json!({
                        "filename": file_name,
                        "message": "Imported 3 students",
                        "records_processed": 3
                    }))
                }
            }),
        );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.csv");
    std::fs::write(&path, "roll_number,name,class_name,section\nCS001,Alice,10,A\n").unwrap();

    let response = h.dashboard.import_students(&path).await.unwrap();

    assert_eq!(response.records_processed, Some(3));
    let recorded = uploads.all();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0]["content_type"]
        .as_str()
        .unwrap()
        .starts_with("multipart/form-data"));
    assert_eq!(recorded[0]["file"], "roster.csv");
    assert_eq!(h.dashboard.store.students().await.len(), 3, "Roster reloaded after import");
}

#[tokio::test]
async fn test_import_rejects_unsupported_file_without_request() {
    let uploads = Captured::default();
    let recorder = uploads.clone();
    let app = Router::new().route(
        "/students/upload",
        post(move || {
            let recorder = recorder.clone();
            async move {
                recorder.push(Value::Null);
                Json(json!({}))
            }
        }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.pdf");
    std::fs::write(&path, "not a spreadsheet").unwrap();

    let result = h.dashboard.import_students(&path).await;
    assert!(matches!(result, Err(ClientError::InvalidInput(_))));
    assert_eq!(uploads.len(), 0);
}

#[tokio::test]
async fn test_login_stores_token_and_bad_credentials_do_not_redirect() {
    let app = Router::new().route(
        "/auth/login",
        post(|Json(body): Json<Value>| async move {
            if body["password"] == "secret" {
                (
                    StatusCode::OK,
                    Json(json!({"access_token": "fresh-token", "token_type": "bearer"})),
                )
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"detail": "Incorrect email or password"})),
                )
            }
        }),
    );
    let base = spawn_backend(app).await;
    let h = harness(&base, ReloadPolicy::LastResolved, true);

    let err = h.dashboard.login("t@school.test", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(h.notifier.redirects(), 0);
    assert_eq!(h.tokens.load().as_deref(), Some(TOKEN));

    h.dashboard.login("t@school.test", "secret").await.unwrap();
    assert_eq!(h.tokens.load().as_deref(), Some("fresh-token"));

    h.dashboard.logout().unwrap();
    assert!(!h.dashboard.is_logged_in());
}
