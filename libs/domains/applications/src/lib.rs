//! Application domain: long-running workloads, scheduled CronJobs, and the
//! backup policies linked to them.
//!
//! Deployment strategy and pod placement are recorded on the application and
//! passed opaquely to the cluster port; in dedicated workspaces the service
//! pins workloads to the workspace's node pool.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{ApplicationError, ApplicationResult};
pub use models::{
    AppKind, AppSource, AppStatus, Application, BackupPolicy, CreateApplication,
    CreateBackupPolicy, CronJobExecution, DeploymentStrategy, ExecutionStatus, Toleration,
    UpdateApplication, UpdateBackupPolicy,
};
pub use postgres::PgApplicationRepository;
pub use repository::{ApplicationRepository, InMemoryApplicationRepository};
pub use service::ApplicationService;
