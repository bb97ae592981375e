use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header naming the employee a request acts on behalf of.
pub const ACTOR_HEADER: &str = "x-employee-id";

/// The acting employee id. Authentication happens upstream; this only reads
/// the identity the gateway forwarded.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::unauthorized(format!("missing {ACTOR_HEADER} header")))?;
        Ok(Actor(value.to_string()))
    }
}
