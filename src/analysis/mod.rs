//! Following an analysis from scanner report to quality gate verdict

pub mod build;
pub mod report;
pub mod watcher;

pub use build::{BuildAction, BuildAnnotations, BuildAnnotator, BuildRecord};
pub use report::{ReportTask, REPORT_TASK_FILE_NAME};
pub use watcher::{AnalysisWatcher, WatchRequest};
