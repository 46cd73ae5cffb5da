//! Stable error codes exposed to API clients.
//!
//! The integer code is for logs and monitoring dashboards; the string form is
//! the machine-readable `error` field clients switch on. Codes are stable
//! across releases.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    AlreadyExists,
    InvalidState,
    Conflict,
    NotSupported,
    Unavailable,
    Timeout,
    Internal,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::InvalidInput => 1001,
            ErrorCode::Unauthorized => 1002,
            ErrorCode::Forbidden => 1003,
            ErrorCode::NotFound => 1004,
            ErrorCode::AlreadyExists => 1005,
            ErrorCode::InvalidState => 1006,
            ErrorCode::Conflict => 1007,
            ErrorCode::NotSupported => 1008,
            ErrorCode::Unavailable => 1009,
            ErrorCode::Timeout => 1010,
            ErrorCode::Internal => 1099,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::NotSupported => "NOT_SUPPORTED",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Request validation failed",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access denied",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidState => "Operation not allowed in the current state",
            ErrorCode::Conflict => "Concurrent modification detected",
            ErrorCode::NotSupported => "Operation not supported by the backing provider",
            ErrorCode::Unavailable => "Upstream service temporarily unavailable",
            ErrorCode::Timeout => "Operation deadline exceeded",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorCode::InvalidInput,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::InvalidState,
            ErrorCode::Conflict,
            ErrorCode::NotSupported,
            ErrorCode::Unavailable,
            ErrorCode::Timeout,
            ErrorCode::Internal,
        ];
        let mut codes: Vec<i32> = all.iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
