//! Authentication middleware.

use std::sync::Arc;

use auth::extract_bearer;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use entities::User;
use shop_store::ShopStore;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// The user resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// User ID.
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Returns true if the user is an admin.
    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer)
}

fn invalid_token() -> ServerError {
    ServerError::Unauthenticated("Invalid token.".to_string())
}

/// Authentication middleware.
///
/// Validates the bearer token, loads the user it names and stores it in the
/// request extensions as [`AuthenticatedUser`].
pub async fn require_auth<S: ShopStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> ServerResult<Response> {
    let token = extract_token(&request).ok_or_else(|| {
        ServerError::Unauthenticated("Access denied. No token provided.".to_string())
    })?;

    let claims = state.jwt_manager.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        invalid_token()
    })?;
    let user_id = claims.user_id().map_err(|_| invalid_token())?;

    let user = state.store.get_user(user_id).await?.ok_or_else(|| {
        tracing::debug!(user_id = %user_id, "Token names an unknown user");
        invalid_token()
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin gate. Must run after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> ServerResult<Response> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ServerError::Unauthenticated("Authentication required.".to_string()))?;

    if !user.is_admin() {
        tracing::warn!(
            user_id = %user.id(),
            role = %user.0.role,
            path = %request.uri().path(),
            "Admin access denied"
        );
        return Err(ServerError::Forbidden("Access denied. Admin only.".to_string()));
    }

    Ok(next.run(request).await)
}
