//! Server initialization and routing

use crate::analysis::AnalysisWatcher;
use crate::api;
use crate::config::Config;
use crate::installation::InstallationStore;
use crate::middleware::inject_client_ip;
use crate::sonar::{ProjectResolver, ReqwestHttpClient, ServerVersion};
use crate::state::{HasResolver, HasWebhook};
use crate::webhook::ListenerRegistry;
use anyhow::{Context, Result};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

type Resolver = ProjectResolver<ReqwestHttpClient, InstallationStore>;
type Watcher = AnalysisWatcher<ReqwestHttpClient, InstallationStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<Resolver>,
    pub watcher: Arc<Watcher>,
    pub listeners: Arc<ListenerRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let minimum_version = ServerVersion::parse(&config.sonar.min_server_version)
            .with_context(|| {
                format!(
                    "Invalid SONAR_MIN_SERVER_VERSION '{}'",
                    config.sonar.min_server_version
                )
            })?;

        let http = ReqwestHttpClient::new(
            config.sonar.http_timeout,
            config.sonar.http_connect_timeout,
        )?;
        let installations = InstallationStore::new(config.sonar.installations.clone());
        if installations.is_empty() {
            warn!("No quality server installation configured");
        }

        let resolver = Arc::new(ProjectResolver::new(http, installations, minimum_version));
        let listeners = Arc::new(ListenerRegistry::new());
        let watcher = Arc::new(AnalysisWatcher::new(
            resolver.clone(),
            listeners.clone(),
            config.sonar.poll_interval,
        ));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            watcher,
            listeners,
        })
    }
}

impl HasResolver for AppState {
    type Http = ReqwestHttpClient;
    type Installations = InstallationStore;

    fn config(&self) -> &Config {
        &self.config
    }

    fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

impl HasWebhook for AppState {
    fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }
}

/// Run the server until Ctrl-C
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<()> {
    let http_addr = config.http_addr();
    let state = AppState::new(config)?;

    for installation in state.resolver.installations().all() {
        info!(
            "Installation '{}' at {}",
            installation.name, installation.server_url
        );
    }

    let app = build_router(state, metrics_handle);

    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

/// Build the HTTP router with generic state type
///
/// Works with the production `AppState` and with test states implementing
/// the state traits.
pub fn build_router<S>(state: S, metrics_handle: Option<PrometheusHandle>) -> Router
where
    S: HasResolver + HasWebhook,
{
    let webhook_path = format!("/{}", state.config().webhook.path);
    let webhook_path_slash = format!("{}/", webhook_path);

    let metrics = Router::new()
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(Arc::new(metrics_handle));

    Router::new()
        .route("/health", get(api::health::health))
        .route(&webhook_path, post(api::webhook::receive::<S>))
        .route(&webhook_path_slash, post(api::webhook::receive::<S>))
        .route("/api/v1/analyses/{task_id}", get(api::analysis::get::<S>))
        .route(
            "/api/v1/analyses/{task_id}/wait",
            get(api::analysis::wait::<S>),
        )
        .layer(from_fn(inject_client_ip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(metrics)
}
