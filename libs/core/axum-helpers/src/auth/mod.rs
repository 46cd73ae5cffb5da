//! Request authentication and organization scoping.
//!
//! Every API request carries an RS256-signed bearer token with exactly one
//! `org_id` claim. The middleware verifies the token against the configured
//! JWKS and inserts a [`Principal`] into request extensions; handlers read
//! the organization id from the principal only, never from the request body.

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use jwt::{Claims, JwtVerifier};
pub use middleware::{auth_middleware, require_org};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role of a user inside an organization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
}

/// Authenticated request principal, derived from the verified token.
///
/// The single permitted source of `organization_id` for authorization
/// decisions downstream.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: OrgRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, OrgRole::Owner | OrgRole::Admin)
    }
}
