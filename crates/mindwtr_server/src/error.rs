#![forbid(unsafe_code)]

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mindwtr_contracts::ContractViolation;
use mindwtr_storage::StorageError;

/// Request-pipeline failure taxonomy. Every handler returns
/// `Result<_, ApiError>`; the conversion into a response is the single
/// place status codes and the `{"error": …}` body shape are decided.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound,
    PayloadTooLarge { limit_bytes: usize },
    RateLimited { retry_after_secs: u64 },
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(reason) => reason.clone(),
            ApiError::Unauthorized => "missing or unauthorized credential".to_string(),
            ApiError::NotFound => "not found".to_string(),
            ApiError::PayloadTooLarge { limit_bytes } => {
                format!("payload exceeds the {limit_bytes} byte limit")
            }
            ApiError::RateLimited { retry_after_secs } => {
                format!("rate limit exceeded, retry in {retry_after_secs}s")
            }
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "request failed with internal error");
        }
        let retry_after_secs = match &self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let mut body = serde_json::json!({ "error": self.message() });
        if let Some(secs) = retry_after_secs {
            body["retryAfterSeconds"] = serde_json::json!(secs);
        }
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath { .. } => ApiError::BadRequest(err.to_string()),
            StorageError::NotFound => ApiError::NotFound,
            StorageError::TooLarge { limit_bytes } => ApiError::PayloadTooLarge { limit_bytes },
            StorageError::Io { .. } | StorageError::Serialize(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ContractViolation> for ApiError {
    fn from(violation: ContractViolation) -> Self {
        ApiError::BadRequest(violation.to_string())
    }
}
