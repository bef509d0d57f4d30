//! Scanner report file (`report-task.txt`)

use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

pub const REPORT_TASK_FILE_NAME: &str = "report-task.txt";

/// What the scanner wrote after submitting an analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTask {
    pub project_key: Option<String>,
    pub server_url: Option<String>,
    pub server_version: Option<String>,
    pub dashboard_url: Option<String>,
    pub ce_task_id: Option<String>,
    pub ce_task_url: Option<String>,
}

impl ReportTask {
    /// Parse the properties-style report.
    ///
    /// Lines are `key=value` (or `key:value`); blank lines and lines
    /// starting with `#` or `!` are skipped. Unknown keys are ignored.
    pub fn parse(content: &str) -> Self {
        let mut props: HashMap<&str, &str> = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split) = line.find(|c: char| c == '=' || c == ':') else {
                continue;
            };
            props.insert(line[..split].trim_end(), line[split + 1..].trim_start());
        }

        let get = |key: &str| {
            props
                .get(key)
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };

        Self {
            project_key: get("projectKey"),
            server_url: get("serverUrl"),
            server_version: get("serverVersion"),
            dashboard_url: get("dashboardUrl"),
            ce_task_id: get("ceTaskId"),
            ce_task_url: get("ceTaskUrl"),
        }
    }

    /// Read `report-task.txt` from a scanner work directory.
    ///
    /// A missing file yields an empty report: the scanner skipped the analysis.
    pub async fn read_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(REPORT_TASK_FILE_NAME);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
