//! Common test utilities
//!
//! A `wiremock` server stands in for the quality server; the router runs
//! in-process through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sonargate_core::config::{Config, SonarConfig, TelemetryConfig, WebhookConfig};
use sonargate_core::installation::Installation;
use sonargate_core::server::{build_router, AppState};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "squ_test_token";
pub const WEBHOOK_PATH: &str = "/sonarqube-webhook";

/// Config with a token installation `sq` and a login installation `legacy`,
/// both pointing at `server_url`
pub fn create_test_config(server_url: &str, poll_interval: Duration) -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        sonar: SonarConfig {
            installations: vec![
                Installation::new("sq", server_url).with_token(TOKEN),
                Installation::new("legacy", server_url)
                    .with_login("admin", Some("secret".to_string())),
            ],
            http_timeout: Duration::from_secs(5),
            http_connect_timeout: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(10),
            poll_interval,
            ..SonarConfig::default()
        },
        webhook: WebhookConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

pub fn create_test_state(server_url: &str, poll_interval: Duration) -> AppState {
    AppState::new(create_test_config(server_url, poll_interval)).unwrap()
}

pub fn create_test_app(state: &AppState) -> Router {
    build_router(state.clone(), None)
}

// ============================================================================
// Quality server mocks
// ============================================================================

pub async fn mount_version(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/api/server/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string(version))
        .mount(server)
        .await;
}

pub fn task_body(status: &str, analysis_id: Option<&str>) -> Value {
    let mut task = json!({
        "id": "task-1",
        "status": status,
        "componentName": "Example App",
        "componentKey": "org.example:app",
    });
    if let Some(id) = analysis_id {
        task["analysisId"] = json!(id);
    }
    json!({ "task": task })
}

pub async fn mount_task(server: &MockServer, task_id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/ce/task"))
        .and(query_param("id", task_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_gate(server: &MockServer, analysis_id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/api/qualitygates/project_status"))
        .and(query_param("analysisId", analysis_id))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "projectStatus": { "status": status } })),
        )
        .mount(server)
        .await;
}

/// Version 5.6, task `task-1` finished with analysis `A1`, gate `gate`
pub async fn mount_finished_analysis(server: &MockServer, gate: &str) {
    mount_version(server, "5.6").await;
    mount_task(server, "task-1", task_body("SUCCESS", Some("A1"))).await;
    mount_gate(server, "A1", gate).await;
}

// ============================================================================
// Request helpers
// ============================================================================

pub async fn post_raw(app: &Router, uri: &str, body: &[u8]) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_vec()))
        .unwrap();

    app.clone().oneshot(request).await.unwrap().status()
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
