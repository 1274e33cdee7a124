//! Asali House of Fashion shop backend
//!
//! Serves the product catalog, customer accounts and the order workflow over
//! a JSON REST API. Admin routes manage products, orders and user roles.

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use shop_store::ShopStore;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::images::ImageStorage;
use crate::state::AppState;

/// Creates the application router with all routes configured.
pub fn create_app<S: ShopStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = state.origins.layer();

    api::create_router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state with the given configuration, store and
/// image storage.
pub fn create_state<S: ShopStore>(
    config: Config,
    store: S,
    images: Arc<dyn ImageStorage>,
) -> Arc<AppState<S>> {
    let jwt_config =
        JwtConfig::new(&config.jwt_secret).with_expiration_hours(config.jwt_expiration_hours);
    let jwt_manager = JwtManager::new(jwt_config);

    Arc::new(AppState::new(config, store, jwt_manager, images))
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
