use std::sync::Arc;

use cardsync_core::BridgeConfig;
use cardsync_engine::Reconciler;
use cardsync_server::ServerConfig;
use cardsync_trello::TrelloClient;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting cardsync bridge");

    // Configuration is read once; a missing setting refuses startup
    // instead of surfacing later as a per-event fault.
    let config = match BridgeConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        master_checklist_id = %config.master_checklist_id,
        sub_checklist_name = %config.sub_checklist_name,
        "configuration loaded"
    );

    let client = Arc::new(TrelloClient::new(&config));
    let reconciler = Arc::new(Reconciler::new(client, Arc::clone(&config)));

    let server_config = ServerConfig { port: config.port };
    let handle = cardsync_server::start(server_config, reconciler)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "cardsync ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}
