//! Embedder daemon entry point.

use axon_config::AxonConfig;
use axon_config::validation::Validate;
use axon_daemon::bootstrap::{initialize_app_state, sweep_interval_ms};
use axon_daemon::{routes, sweeper};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    axon_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting axon embedder daemon...");

    let config = AxonConfig::from_env()?;
    config.validate()?;

    let state = initialize_app_state(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.webhook.bind_address, config.webhook.port).parse()?;
    info!(%addr, path = %config.webhook.path, "Webhook server listening");

    let (sweeper_shutdown_tx, sweeper_shutdown_rx) = tokio::sync::oneshot::channel();
    let sweep_interval = Duration::from_millis(sweep_interval_ms(config.queue.stale_minutes));
    let sweeper_state = state.clone();
    let sweeper_handle = tokio::spawn(sweeper::run(sweeper_state, sweep_interval, sweeper_shutdown_rx));

    let app = routes::router(state, &config.webhook.path);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = sweeper_shutdown_tx.send(());
    let _ = sweeper_handle.await;

    info!("axon embedder daemon shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
