//! Asali House of Fashion shop backend binary.

use std::net::SocketAddr;

use asali_server::{
    config::Config, create_app, create_state, init_tracing, services::images::storage_from_config,
};
use shop_store::{MemoryShopStore, PostgresShopStore, ShopStore};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        environment = %config.environment,
        persistent = config.database_url.is_some(),
        "Starting Asali House of Fashion API"
    );

    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresShopStore::connect(&url, config.database_max_connections).await?;
            store.init().await?;
            tracing::info!("Connected to PostgreSQL");
            serve(config, store).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data will be kept in memory only");
            serve(config, MemoryShopStore::new()).await
        }
    }
}

async fn serve<S: ShopStore + 'static>(config: Config, store: S) -> anyhow::Result<()> {
    let images = storage_from_config(config.supabase.as_ref());
    let addr: SocketAddr = config.server_addr().parse()?;

    let state = create_state(config, store, images);
    let app = create_app(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        }
    }
}
