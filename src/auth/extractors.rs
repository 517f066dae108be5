use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::services::Identity;
use crate::error::AppError;

/// Requires an identity set by the auth middleware.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(identity) => Ok(AuthUser(identity.clone())),
            None => {
                warn!(uri = %parts.uri, "missing credentials");
                Err(AppError::authentication("Access denied"))
            }
        }
    }
}
