//! Analysis result resolver
//!
//! Runs capability check, installation lookup, task fetch and gate fetch in
//! that order, one request at a time. Every failure collapses into "no
//! result" for the caller; the reason is only logged. Nothing is
//! assembled until the last step, so dropping the future part-way leaves
//! no partial result behind.

use super::http::{HttpClient, TransportError};
use super::project::ProjectInformation;
use super::types::{excerpt, ParseFailure, TaskStatus};
use super::version::{is_supported, ServerVersion};
use super::ws::{WsClient, WsError};
use crate::installation::InstallationLookup;
use crate::telemetry::metrics;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a resolution produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error("server {server_url} reports unsupported version '{version}'")]
    UnsupportedServer { server_url: String, version: String },

    #[error("no installation named '{0}'")]
    UnknownInstallation(String),

    #[error("compute task {task_id} is not finished yet ({status})")]
    PendingTask { task_id: String, status: TaskStatus },
}

impl ResolveError {
    /// Stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ResolveError::Transport(_) => "transport",
            ResolveError::Parse(_) => "parse",
            ResolveError::UnsupportedServer { .. } => "unsupported_server",
            ResolveError::UnknownInstallation(_) => "unknown_installation",
            ResolveError::PendingTask { .. } => "pending",
        }
    }
}

impl From<WsError> for ResolveError {
    fn from(e: WsError) -> Self {
        match e {
            WsError::Transport(t) => ResolveError::Transport(t),
            WsError::Parse(p) => ResolveError::Parse(p),
        }
    }
}

/// Resolves a compute task id into a [`ProjectInformation`]
pub struct ProjectResolver<C, I> {
    http: C,
    installations: I,
    minimum_version: ServerVersion,
}

impl<C: HttpClient, I: InstallationLookup> ProjectResolver<C, I> {
    pub fn new(http: C, installations: I, minimum_version: ServerVersion) -> Self {
        Self {
            http,
            installations,
            minimum_version,
        }
    }

    pub fn installations(&self) -> &I {
        &self.installations
    }

    /// Resolve the result of `task_id`, or `None` when it is not available now.
    ///
    /// `project_url` is the dashboard link reported by the scanner; when it
    /// is absent one is derived from the server URL and component key.
    pub async fn resolve(
        &self,
        server_url: &str,
        project_url: Option<&str>,
        task_id: &str,
        installation_name: &str,
    ) -> Option<ProjectInformation> {
        let started = Instant::now();
        let outcome = self
            .try_resolve(server_url, project_url, task_id, installation_name)
            .await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(info) => {
                info!(
                    "Resolved task {} on '{}': ce_status={}, gate={:?}",
                    task_id,
                    installation_name,
                    info.ce_status(),
                    info.status().map(|s| s.as_str())
                );
                metrics::record_resolution(None, elapsed);
                Some(info)
            }
            Err(e) => {
                match &e {
                    ResolveError::PendingTask { .. } => {
                        debug!("Task {} not resolvable yet: {}", task_id, e)
                    }
                    ResolveError::Parse(failure) => warn!(
                        "Unable to resolve task {} on '{}': {}. Body excerpt: {}",
                        task_id,
                        installation_name,
                        e,
                        failure.body_excerpt()
                    ),
                    _ => warn!(
                        "Unable to resolve task {} on '{}': {}",
                        task_id, installation_name, e
                    ),
                }
                metrics::record_resolution(Some(e.reason()), elapsed);
                None
            }
        }
    }

    /// Same as [`resolve`](Self::resolve) but reports why nothing was produced.
    pub async fn try_resolve(
        &self,
        server_url: &str,
        project_url: Option<&str>,
        task_id: &str,
        installation_name: &str,
    ) -> Result<ProjectInformation, ResolveError> {
        // Capability check: fresh on every call, servers get upgraded
        let anonymous = WsClient::new(&self.http, server_url, None);
        let version = anonymous.server_version().await?;
        if !is_supported(&version, &self.minimum_version) {
            return Err(ResolveError::UnsupportedServer {
                server_url: anonymous.server_url().to_string(),
                version: excerpt(&version).to_string(),
            });
        }

        let installation = self
            .installations
            .find(installation_name)
            .ok_or_else(|| ResolveError::UnknownInstallation(installation_name.to_string()))?;

        let ws = WsClient::new(&self.http, server_url, installation.credentials());
        let task = ws.ce_task(task_id).await?;

        let dashboard_url = project_url
            .map(str::to_string)
            .unwrap_or_else(|| dashboard_url(ws.server_url(), &task.component_key));

        match task.status {
            TaskStatus::Success => {}
            TaskStatus::Failed | TaskStatus::Canceled => {
                let error = task.error_message.clone().unwrap_or_else(|| {
                    format!("Compute task {} ended with status {}", task_id, task.status)
                });
                return Ok(ProjectInformation::with_errors(
                    task.component_name,
                    dashboard_url,
                    task_id,
                    task.status.as_str(),
                    task.url,
                    vec![error],
                ));
            }
            status => {
                return Err(ResolveError::PendingTask {
                    task_id: task_id.to_string(),
                    status,
                })
            }
        }

        let Some(analysis_id) = task.analysis_id.as_deref() else {
            return Err(ParseFailure::new(
                &task.url,
                task.body.as_str(),
                "successful task has no analysisId",
            )
            .into());
        };

        // A failed gate fetch keeps the task result, without a verdict
        let gate = match ws.quality_gate_status(analysis_id).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(
                    "Quality gate lookup for analysis {} of task {} failed: {}",
                    analysis_id, task_id, e
                );
                None
            }
        };

        Ok(ProjectInformation::completed(
            task.component_name,
            dashboard_url,
            task_id,
            task.status.as_str(),
            task.url,
            gate,
        ))
    }
}

fn dashboard_url(server_url: &str, component_key: &str) -> String {
    format!(
        "{}/dashboard?id={}",
        server_url,
        urlencoding::encode(component_key)
    )
}
