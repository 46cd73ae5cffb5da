//! SeaORM entities for the tenancy tables.

pub mod organization_users;
pub mod organizations;
pub mod projects;
pub mod users;
pub mod workspaces;
