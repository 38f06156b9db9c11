use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::repositories::StoreError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Coupon SUMMER25 not found",
    "request_id": "req-abc123xyz",
    "timestamp": "2026-10-19T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Coupon SUMMER25 not found")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("A coupon with code {0} already exists")]
    DuplicateCode(String),

    #[error("The expiration date must be a future date")]
    InvalidExpiration,

    #[error("The discount percent must be a value between 1 and 100, got {0}")]
    InvalidDiscount(i32),

    #[error("The status must be \"pending\", \"valid\" or \"invalid\", got {0:?}")]
    InvalidStatus(String),

    #[error("The coupon code must be at least 3 characters long, got {0:?}")]
    InvalidCode(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Coupon {0} not found")]
    NotFound(String),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    /// Wraps a store failure with an operation-specific prefix.
    pub fn store(context: &'static str, source: StoreError) -> Self {
        ServiceError::Store { context, source }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateCode(_)
            | Self::InvalidExpiration
            | Self::InvalidDiscount(_)
            | Self::InvalidStatus(_)
            | Self::InvalidCode(_)
            | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Store failures keep their operation prefix but hide backend details.
    pub fn response_message(&self) -> String {
        match self {
            Self::Store { context, .. } => format!("{}: internal storage error", context),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
