//! Current-user identity extraction.
//!
//! Login and session management live in the fronting auth gateway, which
//! authenticates the request and injects the account id as an `x-user-id`
//! header before proxying to this service. The extractors here only read
//! that header: [`CurrentUser`] rejects unauthenticated requests with 401,
//! [`MaybeUser`] is for routes that are public but personalize their
//! response when an identity is present.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated account id; extraction fails with 401 when absent.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i32);

/// Optional account id for public routes.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<i32>);

fn user_id_from(parts: &Parts) -> Option<i32> {
    parts
        .headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match user_id_from(parts) {
            Some(id) => Ok(CurrentUser(id)),
            None => {
                warn!(path = %parts.uri.path(), "Request without gateway identity");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "status": "unauthorized",
                        "message": "Authentication required"
                    })),
                ))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_id_from(parts)))
    }
}
