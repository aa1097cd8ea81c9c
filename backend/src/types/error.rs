//! Universal error handling for the API

use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common_types::store::StorageError;
use schemars::JsonSchema;
use serde::Serialize;

use crate::account::AccountError;
use crate::push_dispatcher::DispatchError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Human-readable error message
    pub error: Cow<'static, str>,
    /// Machine-readable error code
    pub code: &'static str,
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Status returned by an upstream service, when one caused the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                error: Cow::Borrowed(msg),
                code,
                allow_retry: retry,
                status_code: None,
            },
        }
    }

    /// Request validation failure carrying the validator's message
    #[must_use]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            inner: ApiErrorResponse {
                error: message.into(),
                code: "validation_error",
                allow_retry: false,
                status_code: None,
            },
        }
    }

    /// Attaches the status code an upstream service answered with
    #[must_use]
    pub fn with_upstream_status(mut self, status_code: u16) -> Self {
        self.inner.status_code = Some(status_code);
        self
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Message sent to the client
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.error
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.code,
                self.inner.error
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.code,
                self.inner.error
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert storage errors to application errors
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::Unavailable(msg) => {
                tracing::error!("Storage unavailable: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_unavailable",
                    "Storage temporarily unavailable",
                    true,
                )
            }
            StorageError::Serialization(msg) => {
                tracing::error!("Storage serialization error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

/// Convert dispatch errors to application errors
impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotConfigured => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "push_not_configured",
                "Push notifications are not configured",
                false,
            ),
            DispatchError::Storage(err) => err.into(),
        }
    }
}

/// Convert account deletion errors to application errors
impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotConfigured => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "account_deletion_not_configured",
                "Account deletion is not configured",
                false,
            ),
            AccountError::Storage(err) => err.into(),
            AccountError::Rejected { status } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "account_deletion_failed",
                "Failed to delete account",
                true,
            )
            .with_upstream_status(status),
            AccountError::Transport(msg) => {
                tracing::error!("Auth admin request failed: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "account_deletion_failed",
                    "Failed to delete account",
                    true,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = AppError::validation("userId is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "userId is required");
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["allowRetry"], false);
        assert!(json.get("statusCode").is_none());
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let response = AppError::from(AccountError::Rejected { status: 403 }).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["statusCode"], 403);
    }
}
