use axum_helpers::OrgRole;
use chrono::{DateTime, Utc};
use kubernetes::ResourceQuotas;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Resource plan of a workspace
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "workspace_plan")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkspacePlan {
    /// Quota-bounded slice of the multi-tenant node pool
    #[default]
    #[sea_orm(string_value = "shared")]
    Shared,
    /// Exclusive VM-backed nodes
    #[sea_orm(string_value = "dedicated")]
    Dedicated,
}

/// Lifecycle status of the backing vCluster
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "vcluster_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VClusterStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "creating")]
    Creating,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "stopped")]
    Stopped,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "deleting")]
    Deleting,
}

/// Root tenant. Owned by exactly one initial user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity record; the `external_id + provider` pair is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub provider: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Membership edge between a user and an organization
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrganizationMember {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
}

/// Tenant-visible isolated Kubernetes environment (1:1 with a vCluster)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Workspace {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub plan: WorkspacePlan,
    pub vcluster_status: VClusterStatus,
    pub vcluster_instance_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Namespaced subdivision of a workspace
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    /// Optional parent for project hierarchies
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// Namespace inside the vCluster this project maps onto
    pub namespace: String,
    #[schema(value_type = Object)]
    pub quotas: Option<ResourceQuotas>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrganization {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateOrganization {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWorkspace {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateWorkspace {
    #[validate(length(min = 1, max = 63))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    pub parent_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub quotas: Option<ResourceQuotas>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 63))]
    pub name: Option<String>,
    #[schema(value_type = Object)]
    pub quotas: Option<ResourceQuotas>,
}

impl Organization {
    pub fn new(input: CreateOrganization, owner_user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            owner_user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Workspace {
    /// New workspaces always start on the shared plan with a pending vCluster.
    pub fn new(organization_id: Uuid, input: CreateWorkspace) -> Self {
        let now = Utc::now();
        let id = Uuid::now_v7();
        Self {
            id,
            organization_id,
            name: input.name,
            plan: WorkspacePlan::Shared,
            vcluster_status: VClusterStatus::Pending,
            vcluster_instance_name: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Project {
    pub fn new(workspace_id: Uuid, input: CreateProject) -> Self {
        let now = Utc::now();
        let id = Uuid::now_v7();
        // Namespace derives from the project id so renames never orphan it
        let namespace = format!("proj-{}", &id.simple().to_string()[..12]);
        Self {
            id,
            workspace_id,
            parent_id: input.parent_id,
            name: input.name,
            namespace,
            quotas: input.quotas,
            created_at: now,
            updated_at: now,
        }
    }
}
