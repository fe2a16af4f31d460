use anyhow::Context;
use soroban_bridge_gateway::{
    config::BridgeConfig, lifecycle, router, service::ContractService, transport, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config from env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soroban_bridge_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;

    tracing::info!("Bridge mode: {}", config.mode.as_str());
    tracing::info!("Network: {}", config.network);

    let transport =
        transport::transport_for(&config).context("failed to build bridge transport")?;
    let bridge = Arc::new(ContractService::new(&config, transport));
    let bridge = lifecycle::install_global(bridge)?;

    // Calls issued before this finishes wait on the gate
    tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge.initialize().await;
        }
    });

    let app = router(AppState {
        bridge: bridge.clone(),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind to port {}", config.port))?;

    tracing::info!("Gateway listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            // Unblock requests still waiting on the endpoint
            bridge.shutdown();
        })
        .await
        .context("server failed")?;

    Ok(())
}
