//! Authentication and account API endpoints.

use std::sync::Arc;

use api_protocol::{
    AdminCheckResponse, AuthResponse, GoogleLoginRequest, LoginRequest, MeResponse,
    RegisterRequest, UpdateProfileRequest, UpdateRoleRequest, UserProfile, UserResponse,
    UserSummary, UsersResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use entities::UserRole;
use shop_store::ShopStore;

use crate::api::parse_id;
use crate::error::{ServerError, ServerResult};
use crate::extract::ValidJson;
use crate::middleware::AuthenticatedUser;
use crate::services::accounts;
use crate::state::AppState;

/// Registers a customer account.
pub async fn register<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ServerResult<(StatusCode, Json<AuthResponse>)> {
    let user = accounts::register(&state.store, request, UserRole::Customer).await?;
    let token = state.jwt_manager.generate_token(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

/// Signs in with email and password.
pub async fn login<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> ServerResult<Json<AuthResponse>> {
    let user = accounts::authenticate(&state.store, &request.email, &request.password).await?;
    let token = state.jwt_manager.generate_token(user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from(&user),
    }))
}

/// Signs in with a Google profile, creating or linking the account.
pub async fn google_login<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidJson(request): ValidJson<GoogleLoginRequest>,
) -> ServerResult<Json<AuthResponse<UserProfile>>> {
    let user = accounts::google_sign_in(&state.store, request).await?;
    let token = state.jwt_manager.generate_token(user.id)?;

    Ok(Json(AuthResponse {
        message: "Google login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

/// Gets the current authenticated user.
pub async fn me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserProfile::from(&user.0),
    })
}

/// Updates the caller's name, phone or address.
pub async fn update_profile<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ServerResult<Json<UserResponse<UserProfile>>> {
    let user = state
        .store
        .update_profile(caller.id(), request.into_update())
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user: UserProfile::from(&user),
    }))
}

/// Confirms that the caller passed the admin gate.
pub async fn test_admin(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<AdminCheckResponse> {
    Json(AdminCheckResponse {
        message: "Admin access working correctly".to_string(),
        user: UserSummary::from(&user.0),
        timestamp: Utc::now(),
    })
}

/// Lists every account, newest first.
pub async fn list_users<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(admin): Extension<AuthenticatedUser>,
) -> ServerResult<Json<UsersResponse>> {
    let users = state.store.list_users().await?;

    tracing::debug!(admin_id = %admin.id(), count = users.len(), "Listed users");

    Ok(Json(UsersResponse {
        message: "Users fetched successfully".to_string(),
        total: users.len(),
        users,
    }))
}

/// Changes another user's role.
pub async fn update_user_role<S: ShopStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    ValidJson(request): ValidJson<UpdateRoleRequest>,
) -> ServerResult<Json<UserResponse>> {
    let role = request
        .role()
        .ok_or_else(|| ServerError::InvalidInput("Invalid role. Must be customer or admin.".to_string()))?;

    let user_id = parse_id(&user_id, "User");
    if user_id.as_ref().is_ok_and(|id| *id == admin.id()) {
        return Err(ServerError::Forbidden(
            "You cannot change your own role".to_string(),
        ));
    }

    let user_id = user_id?;
    let not_found = || ServerError::NotFound("User not found".to_string());
    let previous = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(not_found)?
        .role;
    let user = state
        .store
        .set_user_role(user_id, role)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        admin_id = %admin.id(),
        user_id = %user.id,
        from = %previous,
        to = %role,
        "User role changed"
    );

    Ok(Json(UserResponse {
        message: format!("User role updated to {role} successfully"),
        user: UserSummary::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use entities::UserRole;
    use serde_json::json;

    use crate::test_support::TestApp;

    fn registration(email: &str) -> serde_json::Value {
        json!({ "name": "Wanjiru", "email": email, "password": "secret123" })
    }

    #[tokio::test]
    async fn test_register_always_creates_customers() {
        let app = TestApp::new();
        let mut body = registration("Wanjiru@Example.com");
        body["role"] = json!("admin");

        let (status, body) = app
            .json(Method::POST, "/api/auth/register", None, Some(body))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["role"], "customer");
        assert_eq!(body["user"]["email"], "wanjiru@example.com");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let app = TestApp::new();
        app.json(Method::POST, "/api/auth/register", None, Some(registration("a@b.co")))
            .await;

        let (status, body) = app
            .json(Method::POST, "/api/auth/register", None, Some(registration("A@B.co")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists with this email");

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "X", "email": "x@b.co", "password": "12345" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn test_login() {
        let app = TestApp::new();
        app.json(Method::POST, "/api/auth/register", None, Some(registration("a@b.co")))
            .await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "a@b.co", "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");

        let token = body["token"].as_str().unwrap().to_string();
        let (status, body) = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "a@b.co");

        for (email, password) in [("a@b.co", "wrong-pass"), ("nobody@b.co", "secret123")] {
            let (status, body) = app
                .json(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({ "email": email, "password": password })),
                )
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["message"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn test_token_errors() {
        let app = TestApp::new();

        let (status, body) = app.get("/api/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access denied. No token provided.");

        let (status, body) = app.get("/api/auth/me", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token.");
    }

    #[tokio::test]
    async fn test_google_login_creates_then_links() {
        let app = TestApp::new();
        let profile = json!({ "email": "g@b.co", "name": "Gee", "googleId": "g-1" });

        let (status, body) = app
            .json(Method::POST, "/api/auth/google-login", None, Some(profile.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Google login successful");
        let first_id = body["user"]["id"].clone();

        let (_, body) = app
            .json(Method::POST, "/api/auth/google-login", None, Some(profile))
            .await;
        assert_eq!(body["user"]["id"], first_id);

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/google-login",
                None,
                Some(json!({ "email": "g@b.co", "name": "Gee" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required Google profile information");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let app = TestApp::new();
        let (_, token) = app.user("p@b.co", UserRole::Customer).await;

        let (status, body) = app
            .json(
                Method::PUT,
                "/api/auth/profile",
                Some(&token),
                Some(json!({ "phone": "+254700000000" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile updated successfully");
        assert_eq!(body["user"]["phone"], "+254700000000");
        assert_eq!(body["user"]["name"], "Test User");
    }

    #[tokio::test]
    async fn test_admin_routes_reject_customers() {
        let app = TestApp::new();
        let (_, token) = app.user("c@b.co", UserRole::Customer).await;

        let (status, body) = app.get("/api/auth/test-admin", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied. Admin only.");

        let (status, _) = app.get("/api/auth/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_changes() {
        let app = TestApp::new();
        let (admin, admin_token) = app.user("admin@b.co", UserRole::Admin).await;
        let (customer, customer_token) = app.user("c@b.co", UserRole::Customer).await;

        let (status, body) = app
            .json(
                Method::PATCH,
                &format!("/api/auth/users/{}/role", admin.id),
                Some(&admin_token),
                Some(json!({ "role": "customer" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You cannot change your own role");

        let (status, body) = app
            .json(
                Method::PATCH,
                &format!("/api/auth/users/{}/role", customer.id),
                Some(&admin_token),
                Some(json!({ "role": "superuser" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid role. Must be customer or admin.");

        let (status, body) = app
            .json(
                Method::PATCH,
                &format!("/api/auth/users/{}/role", customer.id),
                Some(&admin_token),
                Some(json!({ "role": "admin" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User role updated to admin successfully");

        // The promoted user's existing token now passes the admin gate.
        let (status, body) = app.get("/api/auth/test-admin", Some(&customer_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Admin access working correctly");

        let (status, body) = app.get("/api/auth/users", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_role_change_for_unknown_user() {
        let app = TestApp::new();
        let (_, admin_token) = app.user("admin@b.co", UserRole::Admin).await;

        for id in [uuid::Uuid::new_v4().to_string(), "not-an-id".to_string()] {
            let (status, body) = app
                .json(
                    Method::PATCH,
                    &format!("/api/auth/users/{id}/role"),
                    Some(&admin_token),
                    Some(json!({ "role": "admin" })),
                )
                .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "User not found");
        }
    }
}
