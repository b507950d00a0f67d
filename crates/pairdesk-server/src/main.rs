use tracing::info;

use pairdesk_gateway::build_router;
use pairdesk_gateway::config::GatewayConfig;
use pairdesk_gateway::proxy::GatewayStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pairdesk=debug,pairdesk_gateway=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let addr = config.listen_addr()?;

    info!("Forwarding {}/* -> {}/*", config.prefix, config.upstream_url);
    if !config.relay_status {
        info!("Upstream status codes are masked; every parsed reply is sent as 200");
    }
    match config.upstream_timeout {
        Some(timeout) => info!("Upstream timeout: {}s", timeout.as_secs()),
        None => info!("Upstream timeout disabled"),
    }

    let state = GatewayStateInner::new(config)?;
    let app = build_router(state);

    info!("Pairdesk gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
