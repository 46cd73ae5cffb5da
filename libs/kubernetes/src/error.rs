use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes object not found: {0}")]
    NotFound(String),

    #[error("Kubernetes API error: {0}")]
    Api(String),

    #[error("Cluster unreachable: {0}")]
    Unavailable(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => {
                ClusterError::NotFound(response.message.clone())
            }
            other => ClusterError::Api(other.to_string()),
        }
    }
}
