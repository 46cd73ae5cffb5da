//! Tenancy domain: organizations, workspaces, and projects.
//!
//! A workspace maps one-to-one onto a vCluster instance; projects map onto
//! namespaces inside it. The orchestrator drives the vCluster lifecycle
//! asynchronously and keeps the workspace status row as the source of truth.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{WorkspaceError, WorkspaceResult};
pub use models::{
    CreateOrganization, CreateProject, CreateWorkspace, Organization, OrganizationMember,
    Project, UpdateOrganization, UpdateProject, UpdateWorkspace, VClusterStatus, Workspace,
    WorkspacePlan,
};
pub use orchestrator::WorkspaceService;
pub use postgres::PgTenancyRepository;
pub use repository::{InMemoryTenancyRepository, TenancyRepository};
pub use service::{OrganizationService, ProjectService};
