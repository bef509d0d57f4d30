//! Quality server webhook receiver
//!
//! The quality server does not retry on errors, and a broken payload is
//! nothing the sender can fix, so every delivery is acknowledged with
//! `200 OK`. Malformed bodies are logged and dropped.

use super::extract_ip;
use crate::state::HasWebhook;
use crate::telemetry::metrics;
use crate::webhook::parse_payload;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, info, warn};

const SOURCE: &str = "webhook";

/// POST /<webhook-path>
pub async fn receive<S: HasWebhook>(
    State(state): State<S>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let remote = extract_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    info!("Received POST from {}", remote);

    let event = match parse_payload(SOURCE, &body) {
        Ok(event) => event,
        Err(failure) => {
            warn!(
                "Invalid payload from {}: {}. Body preview: {}",
                remote,
                failure.reason,
                failure.body_excerpt()
            );
            metrics::record_webhook_event(false);
            return StatusCode::OK;
        }
    };

    info!(
        "Task {} completed with status {}, quality gate {:?}",
        event.task_id,
        event.status,
        event.quality_gate.as_ref().map(|g| g.as_str())
    );

    let report = state.listeners().dispatch(&event);
    debug!(
        "Task {} delivered to {} listener(s), {} failed",
        event.task_id, report.delivered, report.failed
    );
    metrics::record_webhook_event(true);

    StatusCode::OK
}
