//! Account creation and sign-in.

use api_protocol::{GoogleLoginRequest, RegisterRequest, Validate};
use entities::{User, UserRole};
use shop_store::{ShopStore, StoreError};

use crate::error::{ServerError, ServerResult};

const EMAIL_TAKEN: &str = "User already exists with this email";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a password account with the given role.
pub async fn register<S: ShopStore + ?Sized>(
    store: &S,
    request: RegisterRequest,
    role: UserRole,
) -> ServerResult<User> {
    request.validate()?;
    let email = normalize_email(&request.email);

    if store.get_user_by_email(&email).await?.is_some() {
        return Err(ServerError::InvalidInput(EMAIL_TAKEN.to_string()));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let user = User::new(request.name.trim(), email)
        .with_password_hash(password_hash)
        .with_role(role);

    let user = store.create_user(user).await.map_err(|e| match e {
        StoreError::AlreadyExists { .. } => ServerError::InvalidInput(EMAIL_TAKEN.to_string()),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Checks an email/password pair. Unknown emails, accounts without a
/// password and wrong passwords are indistinguishable to the caller.
pub async fn authenticate<S: ShopStore + ?Sized>(
    store: &S,
    email: &str,
    password: &str,
) -> ServerResult<User> {
    let invalid = || ServerError::Unauthenticated(INVALID_CREDENTIALS.to_string());

    let user = store
        .get_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    auth::verify_password(password, hash).map_err(|_| invalid())?;

    Ok(user)
}

/// Finds or creates the account for a Google profile, linking the Google
/// id to an existing password account that has none.
pub async fn google_sign_in<S: ShopStore + ?Sized>(
    store: &S,
    request: GoogleLoginRequest,
) -> ServerResult<User> {
    request.validate()?;
    let email = normalize_email(&request.email);

    match store.get_user_by_email(&email).await? {
        None => {
            let user = User::new(request.name.trim(), email).with_google_id(request.google_id);
            let user = store.create_user(user).await?;
            tracing::info!(user_id = %user.id, "Google user created");
            Ok(user)
        }
        Some(user) if user.google_id.is_none() => {
            match store.link_google_id(user.id, &request.google_id).await? {
                Some(linked) => {
                    tracing::info!(user_id = %linked.id, "Google account linked");
                    Ok(linked)
                }
                // Linked by a concurrent sign-in.
                None => Ok(store.get_user(user.id).await?.unwrap_or(user)),
            }
        }
        Some(user) => {
            tracing::debug!(user_id = %user.id, "Google user signed in");
            Ok(user)
        }
    }
}
