use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use kubernetes::ClusterError;
use proxmox::VirtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Hypervisor error: {0}")]
    Virtualization(#[from] VirtError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NodeResult<T> = Result<T, NodeError>;

impl From<NodeError> for AppError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            NodeError::AlreadyExists(what) => {
                AppError::AlreadyExists(format!("{} already exists", what))
            }
            NodeError::Validation(msg) => AppError::BadRequest(msg),
            NodeError::InvalidState(msg) => AppError::InvalidState(msg),
            NodeError::Conflict(msg) => AppError::Conflict(msg),
            NodeError::Timeout(msg) => AppError::Timeout(msg),
            NodeError::Virtualization(e) => match e {
                VirtError::NotFound(id) => AppError::NotFound(format!("VM {} not found", id)),
                VirtError::Timeout(secs) => {
                    AppError::Timeout(format!("hypervisor timed out after {}s", secs))
                }
                VirtError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
                other => AppError::InternalServerError(other.to_string()),
            },
            NodeError::Cluster(e) => match e {
                ClusterError::NotFound(msg) => AppError::NotFound(msg),
                ClusterError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
                other => AppError::InternalServerError(other.to_string()),
            },
            NodeError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
