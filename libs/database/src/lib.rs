//! PostgreSQL connectivity and repository plumbing shared by domain crates.
//!
//! ```ignore
//! use database::postgres;
//! use migration::Migrator;
//!
//! let db = postgres::connect_from_config_with_retry(config, None).await?;
//! postgres::run_migrations::<Migrator>(&db).await?;
//! ```

pub mod common;
pub mod postgres;
pub mod repository;

pub use common::{retry, retry_with_backoff, DatabaseError, DatabaseResult, RetryConfig};
pub use repository::BaseRepository;
