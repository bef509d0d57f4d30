//! Application state traits for dependency injection
//!
//! Handlers are generic over these traits so the same router runs against
//! the production `AppState` and against test states.

use crate::analysis::AnalysisWatcher;
use crate::config::Config;
use crate::installation::InstallationLookup;
use crate::sonar::{HttpClient, ProjectResolver};
use crate::webhook::ListenerRegistry;
use std::sync::Arc;

/// State that can resolve analysis results
pub trait HasResolver: Clone + Send + Sync + 'static {
    /// Transport to the quality server
    type Http: HttpClient;
    /// Installation lookup
    type Installations: InstallationLookup;

    /// Get the application configuration
    fn config(&self) -> &Config;

    fn resolver(&self) -> &ProjectResolver<Self::Http, Self::Installations>;

    fn watcher(&self) -> &AnalysisWatcher<Self::Http, Self::Installations>;
}

/// State that receives webhook events
pub trait HasWebhook: Clone + Send + Sync + 'static {
    fn listeners(&self) -> &Arc<ListenerRegistry>;
}
