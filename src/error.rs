use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    sports::registry::RegistryError,
    state::validation::{Rejection, Unsupported},
    sync::SyncError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The engine refused the operation.
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The operation does not exist for the game's sport.
    #[error(transparent)]
    Unsupported(#[from] Unsupported),
    /// The sport cannot be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A stored snapshot disagrees with the attached game.
    #[error("inconsistent game data: {0}")]
    Inconsistent(String),
    /// No free game code was found.
    #[error("no free game code after {attempts} attempts")]
    CodesExhausted {
        /// Codes tried.
        attempts: usize,
    },
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<SyncError> for ServiceError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Storage(source) => ServiceError::Unavailable(source),
            mismatch => ServiceError::Inconsistent(mismatch.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Refused by the game's rules.
    #[error("rejected: {message}")]
    Unprocessable {
        /// Stable rejection code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Rejected(rejection) => rejection.into(),
            ServiceError::Unsupported(unsupported) => AppError::BadRequest(unsupported.to_string()),
            ServiceError::Registry(registry) => AppError::BadRequest(registry.to_string()),
            ServiceError::Inconsistent(message) => AppError::Internal(message),
            err @ ServiceError::CodesExhausted { .. } => {
                AppError::ServiceUnavailable(err.to_string())
            }
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidTransition(_)
            | Rejection::GameNotLive(_)
            | Rejection::GameClosed(_) => AppError::Conflict(rejection.to_string()),
            other => AppError::Unprocessable {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

/// JSON body returned with every error status.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable description.
    message: String,
    /// Stable rejection code, for rule refusals.
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::Conflict(_) => (StatusCode::CONFLICT, None),
            AppError::Unprocessable { code, .. } => (StatusCode::UNPROCESSABLE_ENTITY, Some(*code)),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
            code,
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{GameStatus, Side},
        state_machine::{LifecycleEvent, compute_transition},
    };

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn rule_rejections_are_unprocessable() {
        assert_eq!(
            status_of(ServiceError::Rejected(Rejection::NoTimeoutsRemaining(Side::A))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(Rejection::UnknownAction("dunk".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn lifecycle_conflicts_map_to_409() {
        let invalid = compute_transition(GameStatus::Completed, LifecycleEvent::Start).unwrap_err();
        assert_eq!(status_of(Rejection::from(invalid)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Rejection::GameNotLive(GameStatus::Setup)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn structural_misuse_and_storage_map_apart() {
        let unsupported = Unsupported::NoGameClock {
            sport: "badminton".into(),
        };
        assert_eq!(
            status_of(ServiceError::from(unsupported)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::from(RegistryError::UnknownSport("curling".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(ServiceError::NotFound("game".into())),
            StatusCode::NOT_FOUND
        );
    }
}
