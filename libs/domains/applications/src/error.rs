use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use kubernetes::ClusterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl From<ApplicationError> for AppError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            ApplicationError::AlreadyExists(what) => {
                AppError::AlreadyExists(format!("{} already exists", what))
            }
            ApplicationError::Validation(msg) => AppError::BadRequest(msg),
            ApplicationError::InvalidState(msg) => AppError::InvalidState(msg),
            ApplicationError::Cluster(e) => match e {
                ClusterError::NotFound(msg) => AppError::NotFound(msg),
                ClusterError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
                other => AppError::InternalServerError(other.to_string()),
            },
            ApplicationError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
