//! Inbound webhook payload

use crate::sonar::{ParseFailure, QualityGateStatus, TaskStatus};
use serde::Deserialize;

/// Completion notice for one compute task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompleted {
    pub task_id: String,
    pub status: TaskStatus,
    /// Only present when `status` is `SUCCESS`
    pub quality_gate: Option<QualityGateStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    task_id: String,
    status: String,
    #[serde(default)]
    quality_gate: Option<QualityGateBody>,
}

#[derive(Deserialize)]
struct QualityGateBody {
    status: Option<String>,
}

/// Decode a webhook body.
///
/// `taskId` and `status` are required. A `SUCCESS` notice without
/// `qualityGate.status` is rejected like any other malformed body; for other
/// statuses any gate block is ignored.
pub fn parse_payload(source: &str, body: &[u8]) -> Result<TaskCompleted, ParseFailure> {
    let raw = String::from_utf8_lossy(body).into_owned();
    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| ParseFailure::new(source, raw.as_str(), e.to_string()))?;

    let status = TaskStatus::from(payload.status.as_str());
    let quality_gate = if status == TaskStatus::Success {
        let gate = payload
            .quality_gate
            .and_then(|g| g.status)
            .ok_or_else(|| {
                ParseFailure::new(source, raw.as_str(), "missing qualityGate.status")
            })?;
        Some(QualityGateStatus::from(gate))
    } else {
        None
    };

    Ok(TaskCompleted {
        task_id: payload.task_id,
        status,
        quality_gate,
    })
}
