//! Application state.

use std::sync::Arc;
use std::time::Instant;

use auth::JwtManager;
use shop_store::ShopStore;

use crate::config::Config;
use crate::cors::OriginMatcher;
use crate::services::images::ImageStorage;

/// Shared application state.
pub struct AppState<S: ShopStore> {
    /// Server configuration.
    pub config: Config,
    /// Shop store.
    pub store: S,
    /// JWT manager.
    pub jwt_manager: JwtManager,
    /// Product image storage.
    pub images: Arc<dyn ImageStorage>,
    /// Allowed CORS origins.
    pub origins: OriginMatcher,
    /// When the server started.
    pub started_at: Instant,
}

impl<S: ShopStore> AppState<S> {
    /// Creates new application state.
    pub fn new(
        config: Config,
        store: S,
        jwt_manager: JwtManager,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        let origins = OriginMatcher::new(config.cors_origins.clone());
        Self {
            config,
            store,
            jwt_manager,
            images,
            origins,
            started_at: Instant::now(),
        }
    }
}
