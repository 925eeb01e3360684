//! HTTP error responses.
//!
//! Every failure leaves the server as
//! `{"error": {"type": ..., "message": ..., "provider": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{GatewayError, ProviderIdentity};
use serde::{Deserialize, Serialize};

/// Error body detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Stable error kind
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable message
    pub message: String,
    /// Provider involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderIdentity>,
}

/// Error returned by handlers
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Body detail
    pub detail: ApiErrorDetail,
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    error: &'a ApiErrorDetail,
}

impl ApiError {
    /// Create an error with the given status and kind
    pub fn new(
        status: StatusCode,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            detail: ApiErrorDetail {
                error_type: error_type.into(),
                message: message.into(),
                provider: None,
            },
        }
    }

    /// 400 for malformed input
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// 503 when no backend can serve
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Message shown to the client
    #[must_use]
    pub fn message(&self) -> &str {
        &self.detail.message
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut api = Self::new(status, error.kind(), error.to_string());
        api.detail.provider = error.provider();
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiErrorBody { error: &self.detail })).into_response()
    }
}
