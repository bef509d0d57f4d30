//! Analysis result endpoints

use crate::analysis::WatchRequest;
use crate::error::{AppError, Result};
use crate::installation::{Installation, InstallationLookup};
use crate::sonar::ProjectInformation;
use crate::state::HasResolver;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    pub installation: String,
    /// Dashboard link reported by the scanner
    pub project_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitQuery {
    pub installation: String,
    pub project_url: Option<String>,
    /// Capped at the configured wait timeout
    pub timeout_secs: Option<u64>,
}

fn find_installation<S: HasResolver>(state: &S, name: &str) -> Result<Installation> {
    state
        .resolver()
        .installations()
        .find(name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown installation '{}'", name)))
}

fn no_result(task_id: &str) -> AppError {
    AppError::NotFound(format!("No result available for task {}", task_id))
}

/// GET /api/v1/analyses/{task_id}
///
/// Resolves the task once; `404` while the result is not available.
pub async fn get<S: HasResolver>(
    State(state): State<S>,
    Path(task_id): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<ProjectInformation>> {
    let installation = find_installation(&state, &query.installation)?;

    state
        .resolver()
        .resolve(
            &installation.server_url,
            query.project_url.as_deref(),
            &task_id,
            &installation.name,
        )
        .await
        .map(Json)
        .ok_or_else(|| no_result(&task_id))
}

/// GET /api/v1/analyses/{task_id}/wait
///
/// Waits for a webhook or a successful poll; `404` on timeout.
pub async fn wait<S: HasResolver>(
    State(state): State<S>,
    Path(task_id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> Result<Json<ProjectInformation>> {
    let installation = find_installation(&state, &query.installation)?;

    let max = state.config().sonar.wait_timeout;
    let timeout = query
        .timeout_secs
        .map(Duration::from_secs)
        .map_or(max, |t| t.min(max));

    let request = WatchRequest {
        installation: installation.name,
        server_url: installation.server_url,
        project_url: query.project_url,
        task_id,
    };

    state
        .watcher()
        .watch(&request, timeout)
        .await
        .map(Json)
        .ok_or_else(|| no_result(&request.task_id))
}
