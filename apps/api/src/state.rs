//! Shared application state for cross-cutting handlers (readiness).
//!
//! Domain routers carry their own service state; this struct only holds what
//! the app-level endpoints need.

use crate::config::Config;
use crate::events::EventHub;
use database::postgres::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DatabaseConnection,
    pub hub: EventHub,
}
