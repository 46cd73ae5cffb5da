//! SeaORM entities for the function tables.

pub mod function_audit_events;
pub mod function_triggers;
pub mod function_versions;
pub mod functions;
pub mod invocations;
pub mod provider_configs;
