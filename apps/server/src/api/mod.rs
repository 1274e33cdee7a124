//! API endpoints.

pub mod auth;
pub mod orders;
pub mod products;

use std::sync::Arc;

use api_protocol::{ErrorBody, HealthResponse, RootResponse};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use chrono::Utc;
use shop_store::ShopStore;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;

/// Body limit for product forms: five images plus the text fields.
const PRODUCT_FORM_LIMIT: usize =
    api_protocol::MAX_PRODUCT_IMAGES * api_protocol::MAX_IMAGE_BYTES + 1024 * 1024;

/// Creates the router with all endpoints.
pub fn create_router<S: ShopStore + 'static>(state: Arc<AppState<S>>) -> Router<Arc<AppState<S>>> {
    let public = Router::new()
        .route("/auth/register", post(auth::register::<S>))
        .route("/auth/login", post(auth::login::<S>))
        .route("/auth/google-login", post(auth::google_login::<S>))
        .route("/products", get(products::list_products::<S>))
        .route("/products/{id}", get(products::get_product::<S>));

    let authenticated = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile::<S>))
        .route("/orders", post(orders::create_order::<S>))
        .route("/orders/my-orders", get(orders::my_orders::<S>))
        .route("/orders/{id}", get(orders::get_order::<S>))
        .route("/orders/{id}/cancel", patch(orders::cancel_order::<S>))
        .route_layer(from_fn_with_state(state.clone(), require_auth::<S>));

    let product_forms = Router::new()
        .route("/products", post(products::create_product::<S>))
        .route(
            "/products/{id}",
            put(products::update_product::<S>).delete(products::delete_product::<S>),
        )
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT));

    let admin = Router::new()
        .route("/auth/test-admin", get(auth::test_admin))
        .route("/auth/users", get(auth::list_users::<S>))
        .route("/auth/users/{user_id}/role", patch(auth::update_user_role::<S>))
        .route("/products/admin/all", get(products::list_all_products::<S>))
        .route("/orders/admin/all", get(orders::list_all_orders::<S>))
        .route("/orders/admin/stats", get(orders::order_stats::<S>))
        .route("/orders/{id}/status", patch(orders::update_order_status::<S>))
        .merge(product_forms)
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, require_auth::<S>));

    let api = public.merge(authenticated).merge(admin);

    Router::new()
        .route("/", get(root::<S>))
        .route("/health", get(health_check::<S>))
        .nest("/api", api)
        .fallback(not_found)
}

/// Parses a path id. Anything that is not a UUID cannot name an existing
/// record, so it is reported as `NotFound`.
pub(crate) fn parse_id(raw: &str, entity: &str) -> ServerResult<Uuid> {
    raw.parse()
        .map_err(|_| ServerError::NotFound(format!("{entity} not found")))
}

async fn root<S: ShopStore>(State(state): State<Arc<AppState<S>>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Asali House of Fashion API is running!".to_string(),
        timestamp: Utc::now(),
        environment: state.config.environment.clone(),
    })
}

/// Health check endpoint.
async fn health_check<S: ShopStore>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(format!("Route {target} not found"))),
    )
}
