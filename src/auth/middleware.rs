use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::basic::Credentials;
use super::services::authenticate;
use crate::error::AppError;
use crate::state::AppState;

/// Resolves Basic credentials into an [`Identity`](super::Identity) request extension.
///
/// Requests without credentials pass through untouched; protected handlers
/// reject them via [`AuthUser`](super::AuthUser). Supplied but invalid
/// credentials are rejected here with 401.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(creds) = Credentials::from_headers(req.headers()) {
        let identity = authenticate(state.store.as_ref(), &creds).await?;
        req.extensions_mut().insert(identity);
    }
    Ok(next.run(req).await)
}
