//! Validating extractors.
//!
//! Both extractors turn framework rejections into `ServerError::InvalidInput`
//! so malformed input renders the same `{message}` body as every other error.

use api_protocol::Validate;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ServerError;

/// JSON body that deserialized strictly and passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| ServerError::InvalidInput(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string that deserialized and passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServerError::InvalidInput(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
