//! Quality server web-service client

use super::http::{Credentials, HttpClient, TransportError};
use super::types::{parse_gate_status, parse_task, CeTask, ParseFailure, QualityGateStatus};
use thiserror::Error;

pub const API_VERSION: &str = "/api/server/version";
pub const API_CE_TASK: &str = "/api/ce/task?id=";
pub const API_PROJECT_STATUS_WITH_ANALYSIS_ID: &str = "/api/qualitygates/project_status?analysisId=";

/// Failure of a web-service call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// Typed access to the three endpoints the resolver needs
pub struct WsClient<'a, C: HttpClient + ?Sized> {
    http: &'a C,
    server_url: String,
    credentials: Option<Credentials>,
}

impl<'a, C: HttpClient + ?Sized> WsClient<'a, C> {
    pub fn new(http: &'a C, server_url: &str, credentials: Option<Credentials>) -> Self {
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Raw version string; the version endpoint is queried anonymously
    pub async fn server_version(&self) -> Result<String, TransportError> {
        let url = format!("{}{}", self.server_url, API_VERSION);
        let text = self.http.get(&url, None).await?;
        Ok(text.trim().to_string())
    }

    pub async fn ce_task(&self, task_id: &str) -> Result<CeTask, WsError> {
        let url = format!("{}{}{}", self.server_url, API_CE_TASK, urlencoding::encode(task_id));
        let text = self.http.get(&url, self.credentials.as_ref()).await?;
        Ok(parse_task(&url, &text)?)
    }

    pub async fn quality_gate_status(&self, analysis_id: &str) -> Result<QualityGateStatus, WsError> {
        let url = format!(
            "{}{}{}",
            self.server_url,
            API_PROJECT_STATUS_WITH_ANALYSIS_ID,
            urlencoding::encode(analysis_id)
        );
        let text = self.http.get(&url, self.credentials.as_ref()).await?;
        Ok(parse_gate_status(&url, &text)?)
    }
}
