use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::db::StoreError;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Error returned by every handler; rendered as `{ message, error: {} }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Attached to error responses so the global error logger can report the cause.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub String);

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join(" ");
        AppError::Validation { message, errors }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        AppError::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        AppError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Full anyhow chain for the log, generic text for the client.
        let (message, report) = match &self {
            AppError::Internal(e) => ("Internal server error".to_string(), format!("{e:#}")),
            other => (other.to_string(), other.to_string()),
        };

        let body = match &self {
            AppError::Validation { errors, .. } => json!({
                "message": message,
                "errors": errors,
                "error": {},
            }),
            _ => json!({
                "message": message,
                "error": {},
            }),
        };

        let mut res = (status, Json(body)).into_response();
        if matches!(self, AppError::Authentication(_)) {
            res.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"api\""),
            );
        }
        res.extensions_mut().insert(ErrorReport(report));
        res
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::validation(vec![FieldError::new(
                "emailAddress",
                "Email address is already in use.",
            )]),
            StoreError::UnknownUser => {
                AppError::Internal(anyhow::anyhow!("referenced user does not exist"))
            }
            StoreError::Database(e) => {
                AppError::Internal(anyhow::Error::new(e).context("storage operation failed"))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            message: rejection.body_text(),
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::authentication("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::authorization("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_joins_field_messages() {
        let err = AppError::validation(vec![
            FieldError::new("firstName", "First name is required."),
            FieldError::new("lastName", "Last name is required."),
        ]);
        assert_eq!(
            err.to_string(),
            "First name is required. Last name is required."
        );
    }

    #[test]
    fn duplicate_email_maps_to_validation() {
        let err = AppError::from(StoreError::DuplicateEmail);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_error_hides_cause_from_client() {
        let err = AppError::from(anyhow::anyhow!("connection reset").context("load courses"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = res.extensions().get::<ErrorReport>().cloned().unwrap();
        assert!(report.0.contains("connection reset"));

        let body = body_json(res).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn authentication_error_challenges_for_basic() {
        let res = AppError::authentication("Access denied").into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"api\""
        );
        let body = body_json(res).await;
        assert_eq!(body["message"], "Access denied");
    }

    #[tokio::test]
    async fn validation_body_lists_field_errors() {
        let res = AppError::validation(vec![FieldError::new("title", "Title is required.")])
            .into_response();
        let body = body_json(res).await;
        assert_eq!(body["errors"][0]["field"], "title");
        assert_eq!(body["errors"][0]["message"], "Title is required.");
    }
}
