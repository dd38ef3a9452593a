#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use slawatch_common::clock::{Clock, SystemClock};
use slawatch_notify::NotificationDispatcher;
use slawatch_server::app;
use slawatch_server::config::ServerConfig;
use slawatch_server::service::IncidentService;
use slawatch_server::state::AppState;
use slawatch_storage::IncidentStore;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    slawatch_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let config = ServerConfig {
        http_port: 8080,
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        retention_days: 7,
        cors_allowed_origins: vec![],
        sla: Default::default(),
        notify: Default::default(),
    };

    let store = Arc::new(IncidentStore::new(&config.connection_url(), temp_dir.path()).await?);
    let dispatcher = Arc::new(NotificationDispatcher::new(vec![]));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(IncidentService::new(
        store.clone(),
        dispatcher,
        clock,
        config.sla.policy(),
    ));

    let state = AppState {
        service,
        store,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}

/// Create a user through the API and return its id.
pub async fn create_user(app: &axum::Router, email: &str, username: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/users",
        Some(json!({"email": email, "username": username})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ok_envelope(&body);
    body["data"]["id"]
        .as_str()
        .expect("user id should exist")
        .to_string()
}

/// Create an incident through the API and return its id.
pub async fn create_incident(
    app: &axum::Router,
    reporter_id: &str,
    priority: &str,
    title: &str,
) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/incidents",
        Some(json!({
            "title": title,
            "description": "integration test incident",
            "priority": priority,
            "reporter_id": reporter_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ok_envelope(&body);
    body["data"]["incident"]["id"]
        .as_str()
        .expect("incident id should exist")
        .to_string()
}
