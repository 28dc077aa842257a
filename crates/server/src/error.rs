// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use progression_core::ValidationError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Validation(err) => {
                tracing::warn!(field = ?err.field(), error = %err, "Rejected submission");
                let error_msg = match err {
                    ValidationError::MalformedBody { .. } | ValidationError::NotAnObject => {
                        "Malformed request body"
                    }
                    ValidationError::MissingField { .. } => "Missing field",
                    ValidationError::NotNumeric { .. } => "Non-numeric field",
                    ValidationError::OutOfRange { .. } => "Field out of range",
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details(error_msg, err.to_string()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_missing_field_returns_400() {
        let error = ApiError::from(ValidationError::missing("interval"));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Missing field");
        assert!(body.details.unwrap().contains("interval"));
    }

    #[tokio::test]
    async fn test_non_numeric_returns_400() {
        let error = ApiError::from(ValidationError::not_numeric("d", "number"));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Non-numeric field");
    }

    #[tokio::test]
    async fn test_malformed_body_returns_400() {
        let error = ApiError::from(ValidationError::NotAnObject);
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Malformed request body");
    }
}
