use crate::provider::ProviderError;
use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type FunctionResult<T> = Result<T, FunctionError>;

impl From<ProviderError> for FunctionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => FunctionError::NotFound(msg),
            ProviderError::AlreadyExists(msg) => FunctionError::AlreadyExists(msg),
            ProviderError::InvalidSpec(msg) => FunctionError::Validation(msg),
            ProviderError::Unavailable(msg) => FunctionError::Unavailable(msg),
            ProviderError::NotSupported(msg) => FunctionError::NotSupported(msg),
            ProviderError::Internal(msg) => FunctionError::Internal(msg),
        }
    }
}

impl From<FunctionError> for AppError {
    fn from(err: FunctionError) -> Self {
        match err {
            FunctionError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            FunctionError::AlreadyExists(what) => {
                AppError::AlreadyExists(format!("{} already exists", what))
            }
            FunctionError::Validation(msg) => AppError::BadRequest(msg),
            FunctionError::InvalidState(msg) => AppError::InvalidState(msg),
            FunctionError::NotSupported(msg) => AppError::NotSupported(msg),
            FunctionError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            FunctionError::Timeout(msg) => AppError::Timeout(msg),
            FunctionError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
