use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use shopfront_core::DomainError;
use shopfront_infra::services::ServiceError;

/// Handler error: anything a service can fail with.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        service_error_to_response(self.0)
    }
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    let (status, code) = match &err {
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::EmptyCart => (StatusCode::BAD_REQUEST, "empty_cart"),
        DomainError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "insufficient_stock"),
        DomainError::Unavailable { .. } => (StatusCode::BAD_REQUEST, "unavailable"),
        DomainError::AlreadyPaid => (StatusCode::BAD_REQUEST, "already_paid"),
        DomainError::AccessDenied => (StatusCode::FORBIDDEN, "access_denied"),
        DomainError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        DomainError::AlreadyReleased => (StatusCode::CONFLICT, "already_released"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        DomainError::InvariantViolation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation"),
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
