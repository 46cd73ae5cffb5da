use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hexabase KaaS Control Plane",
        description = "Multi-tenant Kubernetes-as-a-Service orchestration API",
        version = env!("CARGO_PKG_VERSION"),
    ),
    components(schemas(
        axum_helpers::ErrorResponse,
        domain_workspaces::models::Organization,
        domain_workspaces::models::Workspace,
        domain_workspaces::models::Project,
        domain_workspaces::models::WorkspacePlan,
        domain_workspaces::models::VClusterStatus,
        domain_applications::models::Application,
        domain_applications::models::AppKind,
        domain_applications::models::DeploymentStrategy,
        domain_applications::models::CronJobExecution,
        domain_applications::models::BackupPolicy,
        domain_functions::models::FunctionDef,
        domain_functions::models::FunctionVersion,
        domain_functions::models::FunctionTrigger,
        domain_functions::models::InvocationStatus,
        domain_functions::models::ProviderCapabilities,
        domain_nodes::models::NodePlan,
        domain_nodes::models::DedicatedNode,
        domain_nodes::models::NodeStatus,
        domain_nodes::models::WorkspaceNodeAllocation,
        domain_nodes::models::CostReport,
    ))
)]
pub struct ApiDoc;
