//! Resolved, build-visible analysis result

use super::types::QualityGateStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one successful resolution.
///
/// Either fully populated or not constructed at all. When
/// [`has_errors`](Self::has_errors) is true no gate status is set.
/// Equality ignores the `created` timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInformation {
    created: DateTime<Utc>,
    #[serde(rename = "projectName")]
    name: String,
    url: String,
    ce_task_id: String,
    status: Option<QualityGateStatus>,
    ce_status: String,
    ce_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    badge_status: &'static str,
}

impl ProjectInformation {
    /// Result for a task whose analysis completed
    pub fn completed(
        name: impl Into<String>,
        url: impl Into<String>,
        ce_task_id: impl Into<String>,
        ce_status: &str,
        ce_url: impl Into<String>,
        status: Option<QualityGateStatus>,
    ) -> Self {
        Self::build(
            name.into(),
            url.into(),
            ce_task_id.into(),
            ce_status,
            ce_url.into(),
            status,
            Vec::new(),
        )
    }

    /// Result for a task that failed or was canceled
    pub fn with_errors(
        name: impl Into<String>,
        url: impl Into<String>,
        ce_task_id: impl Into<String>,
        ce_status: &str,
        ce_url: impl Into<String>,
        errors: Vec<String>,
    ) -> Self {
        Self::build(
            name.into(),
            url.into(),
            ce_task_id.into(),
            ce_status,
            ce_url.into(),
            None,
            errors,
        )
    }

    fn build(
        name: String,
        url: String,
        ce_task_id: String,
        ce_status: &str,
        ce_url: String,
        status: Option<QualityGateStatus>,
        errors: Vec<String>,
    ) -> Self {
        let status = if errors.is_empty() { status } else { None };
        Self {
            created: Utc::now(),
            name,
            url,
            ce_task_id,
            badge_status: badge_for(status.as_ref()),
            status,
            ce_status: ce_status.to_lowercase(),
            ce_url,
            errors,
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn project_name(&self) -> &str {
        &self.name
    }

    /// Public dashboard URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ce_task_id(&self) -> &str {
        &self.ce_task_id
    }

    pub fn status(&self) -> Option<&QualityGateStatus> {
        self.status.as_ref()
    }

    /// Compute task status, lower-cased
    pub fn ce_status(&self) -> &str {
        &self.ce_status
    }

    pub fn ce_url(&self) -> &str {
        &self.ce_url
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Short label for build badges
    pub fn badge_status(&self) -> &'static str {
        self.badge_status
    }
}

fn badge_for(status: Option<&QualityGateStatus>) -> &'static str {
    match status {
        Some(QualityGateStatus::Ok) => "Passed",
        Some(QualityGateStatus::Warn) => "Warning",
        Some(QualityGateStatus::Error) => "Failed",
        _ => "N/A",
    }
}

impl PartialEq for ProjectInformation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.url == other.url
            && self.ce_task_id == other.ce_task_id
            && self.status == other.status
            && self.ce_status == other.ce_status
            && self.ce_url == other.ce_url
            && self.errors == other.errors
    }
}

impl Eq for ProjectInformation {}
