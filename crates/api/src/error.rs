use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::{AdmissionError, CatalogError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Duplicate RSVP: {0}")]
    DuplicateRsvp(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("RSVP disabled: {0}")]
    RsvpDisabled(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            ApiError::DuplicateRsvp(_) => (StatusCode::CONFLICT, "duplicate_rsvp"),
            ApiError::CapacityExceeded(_) => (StatusCode::CONFLICT, "capacity_exceeded"),
            ApiError::RsvpDisabled(_) => (StatusCode::FORBIDDEN, "rsvp_disabled"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg)
            | ApiError::InvalidQuery(msg)
            | ApiError::DuplicateRsvp(msg)
            | ApiError::CapacityExceeded(msg)
            | ApiError::RsvpDisabled(msg) => msg,
            ApiError::RateLimited => "Too many requests. Please try again later.".into(),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".into()
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                "The service is temporarily unavailable. Please retry.".into()
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidQuery(msg) => ApiError::InvalidQuery(msg),
            CatalogError::NotFound(id) => ApiError::NotFound(format!("Event {} not found", id)),
            CatalogError::NotPublished(id) => {
                ApiError::Forbidden(format!("Event {} is not published", id))
            }
            CatalogError::Persistence(msg) => ApiError::ServiceUnavailable(msg),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::InvalidInput(_) => ApiError::Validation(message),
            AdmissionError::EventNotFound(_) => ApiError::NotFound(message),
            AdmissionError::EventNotPublished(_) => ApiError::Forbidden(message),
            AdmissionError::Duplicate => ApiError::DuplicateRsvp(message),
            AdmissionError::CapacityExceeded { .. } => ApiError::CapacityExceeded(message),
            AdmissionError::RsvpDisabled => ApiError::RsvpDisabled(message),
            AdmissionError::PersistenceFailure(_) => ApiError::ServiceUnavailable(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => ApiError::Conflict("Resource already exists".into()),
            StoreError::ForeignKeyViolation(_) => {
                ApiError::NotFound("Referenced resource not found".into())
            }
            other => ApiError::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::Validation(message)
    }
}
