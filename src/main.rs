use anyhow::Result;
use sonargate_core::{config::Config, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let metrics_handle = telemetry::init(&config.telemetry)?;

    info!("Starting Sonargate Core Service");
    info!(
        "Webhook endpoint: POST http://{}/{}",
        config.http_addr(),
        config.webhook.path
    );

    server::run(config, metrics_handle).await
}
