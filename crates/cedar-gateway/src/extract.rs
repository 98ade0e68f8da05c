//! Body and query extractors whose rejections use the JSON error shape

use crate::server::ApiError;
use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use cedar_core::Error;
use serde::de::DeserializeOwned;

/// `Json<T>` that rejects with a 400 and `{ "error": ... }`.
pub struct ApiJson<T>(pub T);

/// `Query<T>` that rejects with `{ "error": ... }`.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(Error::invalid(format!(
                "Invalid JSON body: {}",
                rejection.body_text()
            )))),
        }
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(Error::invalid(format!(
                "Invalid query string: {}",
                rejection.body_text()
            )))),
        }
    }
}
