use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use kubernetes::ClusterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl From<WorkspaceError> for AppError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            WorkspaceError::AlreadyExists(what) => {
                AppError::AlreadyExists(format!("{} already exists", what))
            }
            WorkspaceError::Validation(msg) => AppError::BadRequest(msg),
            WorkspaceError::InvalidState(msg) => AppError::InvalidState(msg),
            WorkspaceError::Timeout(msg) => AppError::Timeout(msg),
            WorkspaceError::Cluster(e) => match e {
                ClusterError::NotFound(msg) => AppError::NotFound(msg),
                ClusterError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
                other => AppError::InternalServerError(other.to_string()),
            },
            WorkspaceError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
