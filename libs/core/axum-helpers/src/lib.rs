//! Shared axum infrastructure: error responses, JWT authentication, and
//! server bootstrap used by every Hexabase service binary.

pub mod auth;
pub mod errors;
pub mod pagination;
pub mod server;

pub use auth::{auth_middleware, require_org, JwtConfig, JwtVerifier, OrgRole, Principal};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use pagination::{ListParams, Page, SortOrder};
pub use server::{create_app, create_router, health_router, shutdown_signal};
