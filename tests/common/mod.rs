//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use json_relay::providers::LocalMailer;
use json_relay::{ingest, Cli, Environment, Relay, ServiceConfig};
use tower::ServiceExt;

/// Config with `ops@example.com` / `Report` defaults.
pub fn config(allow_to_override: bool) -> ServiceConfig {
    config_with(allow_to_override, 1024 * 1024)
}

pub fn config_with(allow_to_override: bool, max_body_bytes: u64) -> ServiceConfig {
    let mut config = ServiceConfig::resolve(
        &Cli::default(),
        &Environment::from_pairs([
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "relay@example.com"),
            ("DEFAULT_TO", "ops@example.com"),
            ("DEFAULT_SUBJECT", "Report"),
        ]),
    )
    .expect("valid test config");
    config.allow_to_override = allow_to_override;
    config.max_body_bytes = max_body_bytes;
    config
}

/// Router backed by a capturing mailer.
pub fn app(config: ServiceConfig) -> (Router, Arc<LocalMailer>) {
    let mailer = Arc::new(LocalMailer::new());
    let relay = Relay::new(mailer.clone(), config.mail_from.clone());
    (ingest::router(Arc::new(config), Arc::new(relay)), mailer)
}

/// POST `body` to `/ingest` with a matching Content-Length.
pub fn ingest_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ingest")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and decode the JSON response.
pub async fn call(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("application/json"), "{content_type}");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Find a free local port.
pub fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("127.0.0.1:{}", port)
}
