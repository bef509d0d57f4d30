//! Attaching analysis results to a build

use super::report::ReportTask;
use super::watcher::{AnalysisWatcher, WatchRequest};
use crate::installation::{Installation, InstallationLookup};
use crate::sonar::{HttpClient, ProjectInformation};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Something the build records about an analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildAction {
    /// The build ran an analysis against `installation`
    Analysis {
        installation: String,
        url: Option<String>,
        ce_task_id: Option<String>,
    },
    /// Badge linking to the project dashboard
    Badge { url: Option<String> },
    /// The resolved outcome
    Result(ProjectInformation),
}

/// A build result that accepts analysis annotations
pub trait BuildAnnotations: Send + Sync {
    fn add_action(&self, action: BuildAction);
}

/// In-memory build record
#[derive(Debug, Default)]
pub struct BuildRecord {
    actions: Mutex<Vec<BuildAction>>,
}

impl BuildRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<BuildAction> {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn result(&self) -> Option<ProjectInformation> {
        self.actions().into_iter().find_map(|a| match a {
            BuildAction::Result(info) => Some(info),
            _ => None,
        })
    }
}

impl BuildAnnotations for BuildRecord {
    fn add_action(&self, action: BuildAction) {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(action);
    }
}

/// Annotates builds from the scanner report and the eventual task result
pub struct BuildAnnotator<C, I> {
    watcher: Arc<AnalysisWatcher<C, I>>,
    timeout: Duration,
}

impl<C: HttpClient, I: InstallationLookup> BuildAnnotator<C, I> {
    pub fn new(watcher: Arc<AnalysisWatcher<C, I>>, timeout: Duration) -> Self {
        Self { watcher, timeout }
    }

    /// Mark `build` as analysed and wait for the task result.
    ///
    /// The marker and badge are attached right away. The result is attached
    /// only if it resolves before the timeout; it is also returned.
    pub async fn annotate<B: BuildAnnotations + ?Sized>(
        &self,
        report: &ReportTask,
        installation: &Installation,
        build: &B,
    ) -> Option<ProjectInformation> {
        build.add_action(BuildAction::Analysis {
            installation: installation.name.clone(),
            url: report.dashboard_url.clone(),
            ce_task_id: report.ce_task_id.clone(),
        });
        build.add_action(BuildAction::Badge {
            url: report.dashboard_url.clone(),
        });

        let Some(task_id) = report.ce_task_id.clone() else {
            debug!(
                "No compute task in report for installation '{}'",
                installation.name
            );
            return None;
        };

        let request = WatchRequest {
            installation: installation.name.clone(),
            server_url: installation.server_url.clone(),
            project_url: report.dashboard_url.clone(),
            task_id,
        };

        let info = self.watcher.watch(&request, self.timeout).await?;
        info!(
            "Task {} resolved, badge status {}",
            request.task_id,
            info.badge_status()
        );
        build.add_action(BuildAction::Result(info.clone()));
        Some(info)
    }
}
