mod config;
mod connector;

pub use config::PostgresConfig;
pub use connector::{
    connect, connect_from_config, connect_from_config_with_retry, run_migrations,
};

// Re-export so callers don't need a direct sea-orm dependency for the handle type
pub use sea_orm::DatabaseConnection;
