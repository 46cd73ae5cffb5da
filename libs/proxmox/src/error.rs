use thiserror::Error;

#[derive(Debug, Error)]
pub enum VirtError {
    #[error("VM {0} not found")]
    NotFound(u32),

    #[error("Hypervisor API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Hypervisor unreachable: {0}")]
    Unavailable(String),

    #[error("Hypervisor operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal virtualization error: {0}")]
    Internal(String),
}

pub type VirtResult<T> = Result<T, VirtError>;

impl VirtError {
    /// Transient errors are retried by the adapter before surfacing.
    pub fn is_transient(&self) -> bool {
        match self {
            VirtError::Unavailable(_) => true,
            VirtError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
