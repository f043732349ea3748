//! Request extractors for caller identity, correlation and service auth.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::{REQUEST_ID_HEADER, RequestId, USER_ID_HEADER, UserId};

use crate::error::ApiError;

/// Authenticated caller, as resolved by the edge into `X-User-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| CallerId(UserId::new(id)))
            .ok_or_else(|| ApiError::unauthorized("Missing or invalid X-User-Id header"))
    }
}

/// The request's correlation id.
///
/// Set by [`crate::middleware::request_id`]; falls back to the raw header or
/// a fresh id when the middleware is not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation(pub RequestId);

impl<S: Send + Sync> FromRequestParts<S> for Correlation {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return Ok(Correlation(id.clone()));
        }
        let header = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(Correlation(
            RequestId::from_header(header).unwrap_or_else(RequestId::generate),
        ))
    }
}

/// Shared secret expected from internal callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken(pub Arc<str>);

impl ServiceToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }
}

/// Proof that the caller presented the service token as a bearer credential.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

impl<S> FromRequestParts<S> for ServiceAuth
where
    ServiceToken: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = ServiceToken::from_ref(state);
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if token == &*expected.0 => Ok(ServiceAuth),
            Some(_) => {
                tracing::warn!("rejected service call with wrong token");
                Err(ApiError::unauthorized("Invalid service token"))
            }
            None => Err(ApiError::unauthorized("Missing service token")),
        }
    }
}
