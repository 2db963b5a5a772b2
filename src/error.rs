use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{dao::storage::StorageError, state::error::MatchError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current match status.
    #[error("{0}")]
    InvalidState(String),
    /// Player cannot take part in the requested action.
    #[error("{0}")]
    NotEligible(String),
    /// A per-bracket allowance has been used up.
    #[error("{0}")]
    QuotaExceeded(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<MatchError> for ServiceError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::NotFound(message) => ServiceError::NotFound(message),
            MatchError::InvalidArgument(message) => ServiceError::InvalidInput(message),
            invalid @ MatchError::InvalidTransition(_) => {
                ServiceError::InvalidState(invalid.to_string())
            }
            ineligible @ MatchError::PlayerNotEligible(_) => {
                ServiceError::NotEligible(ineligible.to_string())
            }
            exhausted @ MatchError::QuotaExceeded(_) => {
                ServiceError::QuotaExceeded(exhausted.to_string())
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Well-formed request the match rules refuse.
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotEligible(message) => AppError::Conflict(message),
            ServiceError::QuotaExceeded(message) => AppError::Unprocessable(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{MatchStateMachine, MatchAction};

    fn status_of(err: MatchError) -> StatusCode {
        AppError::from(ServiceError::from(err))
            .into_response()
            .status()
    }

    #[test]
    fn match_errors_map_to_http_statuses() {
        let invalid = MatchStateMachine::new()
            .plan(MatchAction::RecordBasket)
            .unwrap_err();
        assert_eq!(status_of(MatchError::NotFound("m".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(MatchError::InvalidArgument("p".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(invalid.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(MatchError::PlayerNotEligible("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(MatchError::QuotaExceeded("t".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
