//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`BloodBankError`] to HTTP status codes and JSON bodies of the
//! form `{"error": {"code", "message", "details?"}}`.
//!
//! Storage failures are logged in full but answered with a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use bloodbank_core::BloodBankError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed a domain rule (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Illegal lifecycle transition (409).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Approval would overdraw stock (422).
    #[error("{message}")]
    InsufficientInventory {
        message: String,
        requested: u32,
        available: u32,
    },

    /// Storage backend unreachable or timed out (503). Message is logged
    /// but not returned to the client.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::InsufficientInventory { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_INVENTORY")
            }
            Self::StorageUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InsufficientInventory {
                requested,
                available,
                ..
            } => Some(serde_json::json!({
                "requested": requested,
                "available": available,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::StorageUnavailable(_) => {
                "Storage is temporarily unavailable; retry the request".to_string()
            }
            other => other.to_string(),
        };

        if let Self::StorageUnavailable(_) = &self {
            tracing::error!(error = %self, "storage unavailable");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BloodBankError> for AppError {
    fn from(err: BloodBankError) -> Self {
        match err {
            BloodBankError::Validation(_) => Self::Validation(err.to_string()),
            BloodBankError::NotFound { .. } => Self::NotFound(err.to_string()),
            BloodBankError::InvalidState { .. } => Self::InvalidState(err.to_string()),
            BloodBankError::InsufficientInventory {
                requested,
                available,
                ..
            } => Self::InsufficientInventory {
                message: err.to_string(),
                requested,
                available,
            },
            BloodBankError::StorageUnavailable(_) => Self::StorageUnavailable(err.to_string()),
        }
    }
}

impl From<bloodbank_core::ValidationError> for AppError {
    fn from(err: bloodbank_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbank_core::{BankId, BloodGroup, InventoryKey, ValidationError};
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        let key = InventoryKey::new(BankId::new(), BloodGroup::ONeg);
        let cases = [
            (
                BloodBankError::Validation(ValidationError::EmptyPurpose),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                BloodBankError::NotFound {
                    kind: "blood request",
                    id: "x".into(),
                },
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                BloodBankError::InvalidState {
                    id: "x".into(),
                    from: "approved".into(),
                    to: "rejected".into(),
                },
                StatusCode::CONFLICT,
                "INVALID_STATE",
            ),
            (
                BloodBankError::InsufficientInventory {
                    key,
                    requested: 2,
                    available: 0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_INVENTORY",
            ),
            (
                BloodBankError::StorageUnavailable("pool timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
            ),
        ];
        for (domain, status, code) in cases {
            let err = AppError::from(domain);
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn bad_request_status_code() {
        let err = AppError::BadRequest("malformed JSON".to_string());
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "BAD_REQUEST")
        );
    }

    #[tokio::test]
    async fn storage_details_are_not_leaked() {
        let (status, body) = body_json(AppError::StorageUnavailable(
            "connection to 10.0.0.7:5432 refused".into(),
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("10.0.0.7"));
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn insufficient_inventory_carries_details() {
        let key = InventoryKey::new(BankId::new(), BloodGroup::ONeg);
        let (status, body) = body_json(AppError::from(BloodBankError::InsufficientInventory {
            key,
            requested: 2,
            available: 0,
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
        assert_eq!(body["error"]["details"]["requested"], 2);
        assert_eq!(body["error"]["details"]["available"], 0);
    }
}
