//! HTTP API tests against the full router with the in-memory store.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum_test::TestServer;
use seminar_signup_server::auth::PASSCODE_HEADER;
use seminar_signup_server::config::{Config, DatabaseConfig, ServerConfig};
use seminar_signup_server::{build_router, AppState};
use seminar_signup_core::SystemClock;
use seminar_signup_testing::{student, InMemorySessionStore, SessionBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const PASSCODE: &str = "sesame";

fn test_config(admin_passcode: Option<&str>) -> Config {
    Config {
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            connect_timeout: 1,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        public_base_url: "http://localhost:3000".to_string(),
        admin_passcode: admin_passcode.map(str::to_string),
    }
}

fn server_with(store: Arc<InMemorySessionStore>) -> TestServer {
    let state = AppState::new(
        store,
        Arc::new(SystemClock),
        Arc::new(test_config(Some(PASSCODE))),
    );
    TestServer::new(build_router(state)).unwrap()
}

fn passcode_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(PASSCODE_HEADER),
        HeaderValue::from_static(PASSCODE),
    )
}

#[tokio::test]
async fn registration_places_on_roster_and_returns_links() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a").capacity(5).build(),
    ]));
    let server = server_with(store);

    let response = server
        .post("/api/sessions/seminar-a/registrations")
        .json(&json!({"name": "Ann Lee", "email": "ann@example.edu", "classYear": "2L"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["isWaitlist"], Value::Bool(false));
    assert_eq!(body["student"]["name"], "Ann Lee");
    let cancellation = body["cancellationUrl"].as_str().unwrap();
    assert!(cancellation.starts_with("http://localhost:3000/?cancel="));
    assert!(cancellation.contains("seminar-a"));
    let calendar = body["calendarUrl"].as_str().unwrap();
    assert!(calendar.starts_with("https://www.google.com/calendar/render"));
}

#[tokio::test]
async fn registration_at_capacity_lands_on_the_waitlist() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a")
            .capacity(1)
            .participants(vec![student("Ben", "ben@example.edu")])
            .build(),
    ]));
    let server = server_with(store);

    let response = server
        .post("/api/sessions/seminar-a/registrations")
        .json(&json!({"name": "Ann", "email": "ann@example.edu", "classYear": "3L"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["isWaitlist"], Value::Bool(true));
}

#[tokio::test]
async fn duplicate_email_is_rejected_with_409() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a")
            .capacity(5)
            .participants(vec![student("Ann", "ann@example.edu")])
            .build(),
    ]));
    let server = server_with(store);

    let response = server
        .post("/api/sessions/seminar-a/registrations")
        .json(&json!({"name": "Other Ann", "email": "  ANN@Example.edu ", "classYear": "2L"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "ALREADY_REGISTERED");
}

#[tokio::test]
async fn unknown_session_is_404() {
    let server = server_with(Arc::new(InMemorySessionStore::new()));

    let response = server
        .post("/api/sessions/ghost/registrations")
        .json(&json!({"name": "Ann", "email": "ann@example.edu", "classYear": "2L"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_name_is_422_before_any_write() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a").capacity(5).build(),
    ]));
    let server = server_with(store);

    let response = server
        .post("/api/sessions/seminar-a/registrations")
        .json(&json!({"name": "   ", "email": "ann@example.edu", "classYear": "2L"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let sessions = server.get("/api/sessions").await.json::<Vec<Value>>();
    assert_eq!(sessions[0]["participants"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn cancellation_link_promotes_then_reports_already_handled() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a")
            .capacity(1)
            .participants(vec![student("Ann", "ann@example.edu")])
            .waitlist(vec![student("Ben", "ben@example.edu")])
            .build(),
    ]));
    let server = server_with(store);

    let participants = server.get("/api/sessions").await.json::<Vec<Value>>();
    let ann_id = participants[0]["participants"][0]["id"].as_str().unwrap().to_string();
    let token = format!("seminar-a:{ann_id}");

    let response = server
        .post("/api/cancellations")
        .json(&json!({"token": token.as_str()}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "removed");
    assert_eq!(body["promoted"]["name"], "Ben");
    assert_eq!(body["promoted"]["isPromoted"], Value::Bool(true));
    assert_eq!(body["session"]["participants"][0]["name"], "Ben");
    assert_eq!(body["session"]["waitlist"].as_array().unwrap().len(), 0);

    // Reusing the link must not remove the promoted student.
    let again = server
        .post("/api/cancellations")
        .json(&json!({"token": token.as_str()}))
        .await;
    assert_eq!(again.status_code(), StatusCode::OK);
    let body: Value = again.json();
    assert_eq!(body["status"], "already_handled");
}

#[tokio::test]
async fn malformed_cancellation_token_is_422() {
    let server = server_with(Arc::new(InMemorySessionStore::new()));

    let response = server
        .post("/api/cancellations")
        .json(&json!({"token": "no-separator"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_routes_require_the_passcode() {
    let server = server_with(Arc::new(InMemorySessionStore::new()));

    let bare = server.get("/api/admin/sessions").await;
    assert_eq!(bare.status_code(), StatusCode::FORBIDDEN);

    let wrong = server
        .get("/api/admin/sessions")
        .add_header(
            HeaderName::from_static(PASSCODE_HEADER),
            HeaderValue::from_static("open-says-me"),
        )
        .await;
    assert_eq!(wrong.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = passcode_header();
    let right = server.get("/api/admin/sessions").add_header(name, value).await;
    assert_eq!(right.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn admin_surface_is_disabled_without_a_configured_passcode() {
    let state = AppState::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(SystemClock),
        Arc::new(test_config(None)),
    );
    let server = TestServer::new(build_router(state)).unwrap();

    let (name, value) = passcode_header();
    let response = server.get("/api/admin/sessions").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_sessions_hide_publicly_but_accept_deep_link_registrations() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("visible").build(),
        SessionBuilder::new("hidden").inactive().build(),
    ]));
    let server = server_with(store);

    let listed = server.get("/api/sessions").await.json::<Vec<Value>>();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], "visible");

    // A link shared before deactivation still works.
    let response = server
        .post("/api/sessions/hidden/registrations")
        .json(&json!({"name": "Ann", "email": "ann@example.edu", "classYear": "2L"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let (name, value) = passcode_header();
    let all = server
        .get("/api/admin/sessions")
        .add_header(name, value)
        .await
        .json::<Vec<Value>>();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn admin_removal_reports_the_promotion() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a")
            .capacity(1)
            .participants(vec![student("Ann", "ann@example.edu")])
            .waitlist(vec![student("Ben", "ben@example.edu")])
            .build(),
    ]));
    let server = server_with(store);

    let sessions = server.get("/api/sessions").await.json::<Vec<Value>>();
    let ann_id = sessions[0]["participants"][0]["id"].as_str().unwrap().to_string();

    let (name, value) = passcode_header();
    let response = server
        .delete(&format!(
            "/api/admin/sessions/seminar-a/registrants/{ann_id}?list=participants"
        ))
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["removed"]["name"], "Ann");
    assert_eq!(body["promoted"]["name"], "Ben");
}

#[tokio::test]
async fn admin_session_lifecycle_create_update_delete() {
    let server = server_with(Arc::new(InMemorySessionStore::new()));
    let (name, value) = passcode_header();

    let created = server
        .post("/api/admin/sessions")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "faculty": "Prof. Elena Alvarez",
            "date": "March 3",
            "time": "2:00 PM",
            "location": "Room 180",
            "capacity": 8
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let session: Value = created.json();
    let id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["isActive"], Value::Bool(true));

    let updated = server
        .put(&format!("/api/admin/sessions/{id}"))
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "faculty": "Prof. Elena Alvarez",
            "topic": "Platform moderation",
            "date": "March 10",
            "time": "2:00 PM",
            "location": "Room 180",
            "capacity": 12
        }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    let session: Value = updated.json();
    assert_eq!(session["topic"], "Platform moderation");
    assert_eq!(session["capacity"], 12);

    let deleted = server
        .delete(&format!("/api/admin/sessions/{id}"))
        .add_header(name, value)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let listed = server.get("/api/sessions").await.json::<Vec<Value>>();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn admin_reset_wipes_and_reseeds() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("stale")
            .participants(vec![student("Ann", "ann@example.edu")])
            .build(),
    ]));
    let server = server_with(store);
    let (name, value) = passcode_header();

    let response = server
        .post("/api/admin/reset")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["seeded"].as_u64().unwrap() > 0);

    let all = server
        .get("/api/admin/sessions")
        .add_header(name, value)
        .await
        .json::<Vec<Value>>();
    assert!(all.iter().all(|s| s["id"] != "stale"));
    assert!(all
        .iter()
        .all(|s| s["participants"].as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn session_stream_serves_server_sent_events() {
    let store = Arc::new(InMemorySessionStore::with_sessions([
        SessionBuilder::new("seminar-a").build(),
    ]));
    let state = AppState::new(
        store,
        Arc::new(SystemClock),
        Arc::new(test_config(Some(PASSCODE))),
    );

    // The stream never completes, so only the response head is inspected.
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/sessions/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
