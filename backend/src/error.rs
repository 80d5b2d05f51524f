//! Error handling for the Warehouse Management Platform
//!
//! Every failure is recovered at the call boundary and surfaced as a typed
//! result; none should crash the service. Storage-layer unavailability is
//! the one fatal condition and propagates opaquely instead of being
//! swallowed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::models::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Replenishment engine errors
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid alert transition: {0}")]
    InvalidTransition(String),

    #[error("Alert already resolved: {0}")]
    AlertAlreadyResolved(String),

    #[error("An open draft already exists for this alert: {0}")]
    NoOpenDraftAllowed(String),

    #[error("Bill batch rejected, nothing applied: {0}")]
    PartialApplyRejected(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // External service errors
    #[error("Bill extraction service error: {0}")]
    ExtractionError(String),

    #[error("Purchasing system error: {0}")]
    PurchasingError(String),

    // Database errors
    #[error("Storage unavailable: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message: "You do not have permission to perform this action".to_string(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: message.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::InvalidQuantity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_QUANTITY".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InvalidTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_TRANSITION".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::AlertAlreadyResolved(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "ALERT_ALREADY_RESOLVED".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::NoOpenDraftAllowed(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "NO_OPEN_DRAFT_ALLOWED".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::PartialApplyRejected(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "PARTIAL_APPLY_REJECTED".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::ExtractionError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "EXTRACTION_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::PurchasingError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "PURCHASING_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "STORAGE_UNAVAILABLE".to_string(),
                    message: "Storage layer unavailable".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidThreshold(_) => AppError::Configuration(err.to_string()),
            DomainError::InvalidQuantity(_) | DomainError::NegativeStock(_) => {
                AppError::InvalidQuantity(err.to_string())
            }
            DomainError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            DomainError::UnknownValue { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("request".to_string(), "invalid request".to_string()));

        AppError::Validation { field, message }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
