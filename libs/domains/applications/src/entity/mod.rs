//! SeaORM entities for the application tables.

pub mod applications;
pub mod backup_policies;
pub mod cronjob_executions;
