//! Quality server response types and decoding
//!
//! The two response shapes consumed here are the compute-task status
//! (`/api/ce/task`) and the quality-gate status
//! (`/api/qualitygates/project_status`). Decoding is strict: a missing
//! required field is a [`ParseFailure`], never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of body characters kept in log excerpts
const BODY_EXCERPT_CHARS: usize = 500;

/// Compute task status
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Canceled,
    /// A status this service does not know about yet
    Other(String),
}

impl TaskStatus {
    pub const SUCCESS: &'static str = "SUCCESS";

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Success => Self::SUCCESS,
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Other(s) => s,
        }
    }

    /// Whether the server will not change this task any more
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "PENDING" => TaskStatus::Pending,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "SUCCESS" => TaskStatus::Success,
            "FAILED" => TaskStatus::Failed,
            "CANCELED" => TaskStatus::Canceled,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality gate verdict
///
/// Unknown values are carried through as [`QualityGateStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityGateStatus {
    Ok,
    Warn,
    Error,
    /// No gate is associated with the project
    None,
    Other(String),
}

impl QualityGateStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QualityGateStatus::Ok => "OK",
            QualityGateStatus::Warn => "WARN",
            QualityGateStatus::Error => "ERROR",
            QualityGateStatus::None => "NONE",
            QualityGateStatus::Other(s) => s,
        }
    }
}

impl From<&str> for QualityGateStatus {
    fn from(s: &str) -> Self {
        match s {
            "OK" => QualityGateStatus::Ok,
            "WARN" => QualityGateStatus::Warn,
            "ERROR" => QualityGateStatus::Error,
            "NONE" => QualityGateStatus::None,
            other => QualityGateStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for QualityGateStatus {
    fn from(s: String) -> Self {
        QualityGateStatus::from(s.as_str())
    }
}

impl From<QualityGateStatus> for String {
    fn from(status: QualityGateStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for QualityGateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a compute task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeTask {
    pub status: TaskStatus,
    pub component_name: String,
    pub component_key: String,
    /// URL the task was fetched from
    pub url: String,
    /// Absent until the task has produced an analysis
    pub analysis_id: Option<String>,
    /// Failure reason reported by the server for failed tasks
    pub error_message: Option<String>,
    /// Response text the task was decoded from
    pub body: String,
}

/// A response body that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to parse response from {url}: {reason}")]
pub struct ParseFailure {
    pub url: String,
    pub body: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(url: impl Into<String>, body: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            reason: reason.into(),
        }
    }

    /// Leading part of the body, safe to put in a log line
    pub fn body_excerpt(&self) -> &str {
        excerpt(&self.body)
    }
}

/// Truncate `text` to at most [`BODY_EXCERPT_CHARS`] characters
pub(crate) fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Deserialize)]
struct TaskEnvelope {
    task: TaskBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskBody {
    status: String,
    component_name: String,
    component_key: String,
    #[serde(default)]
    analysis_id: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectStatusEnvelope {
    project_status: ProjectStatusBody,
}

#[derive(Deserialize)]
struct ProjectStatusBody {
    status: String,
}

/// Decode a compute task response fetched from `url`
pub fn parse_task(url: &str, body: &str) -> Result<CeTask, ParseFailure> {
    let envelope: TaskEnvelope =
        serde_json::from_str(body).map_err(|e| ParseFailure::new(url, body, e.to_string()))?;
    let task = envelope.task;

    Ok(CeTask {
        status: TaskStatus::from(task.status.as_str()),
        component_name: task.component_name,
        component_key: task.component_key,
        url: url.to_string(),
        analysis_id: task.analysis_id.filter(|id| !id.is_empty()),
        error_message: task.error_message,
        body: body.to_string(),
    })
}

/// Decode a quality gate status response fetched from `url`
pub fn parse_gate_status(url: &str, body: &str) -> Result<QualityGateStatus, ParseFailure> {
    let envelope: ProjectStatusEnvelope =
        serde_json::from_str(body).map_err(|e| ParseFailure::new(url, body, e.to_string()))?;

    Ok(QualityGateStatus::from(envelope.project_status.status))
}
