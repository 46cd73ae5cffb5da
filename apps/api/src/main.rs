use axum::{middleware, routing::get, Router};
use axum_helpers::{create_app, create_router, health_router, JwtVerifier};
use core_config::tracing::{init_tracing, install_color_eyre};
use kubernetes::KubeClusterProvider;
use proxmox::ProxmoxClient;
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod events;
mod openapi;
mod state;
mod ws;

use api::AppServices;
use config::Config;
use domain_applications::{ApplicationService, PgApplicationRepository};
use domain_functions::{DefaultProviderFactory, FunctionService, PgFunctionRepository};
use domain_nodes::{NodeAllocationService, PgNodeRepository};
use domain_workspaces::{
    OrganizationService, PgTenancyRepository, ProjectService, WorkspaceService,
};
use events::EventHub;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics();
    info!("Prometheus metrics initialized");

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;
    database::postgres::run_migrations::<migration::Migrator>(&db)
        .await
        .map_err(|e| eyre::eyre!("migration failed: {}", e))?;

    let verifier = Arc::new(
        JwtVerifier::from_config(&config.jwt)
            .map_err(|e| eyre::eyre!("JWT verifier init failed: {}", e))?,
    );

    // External ports
    let virt = Arc::new(
        ProxmoxClient::new(config.proxmox.clone())
            .map_err(|e| eyre::eyre!("Proxmox client init failed: {}", e))?,
    );
    let cluster = Arc::new(
        KubeClusterProvider::try_default()
            .await
            .map_err(|e| eyre::eyre!("Kubernetes client init failed: {}", e))?,
    );

    // Repositories share the pool; services share the repositories
    let tenancy = Arc::new(PgTenancyRepository::new(db.clone()));
    let application_repo = Arc::new(PgApplicationRepository::new(db.clone()));
    let function_repo = Arc::new(PgFunctionRepository::new(db.clone()));
    let node_repo = Arc::new(PgNodeRepository::new(db.clone()));

    let services = AppServices {
        organizations: OrganizationService::new(tenancy.clone()),
        workspaces: WorkspaceService::new(
            tenancy.clone(),
            cluster.clone(),
            config.vcluster_oidc.clone(),
        ),
        projects: ProjectService::new(tenancy.clone(), cluster.clone()),
        applications: ApplicationService::new(
            application_repo,
            tenancy.clone(),
            cluster.clone(),
        ),
        functions: FunctionService::new(
            function_repo,
            Arc::new(DefaultProviderFactory),
            config.fission_endpoint.clone(),
        ),
        nodes: NodeAllocationService::new(node_repo.clone(), virt, cluster),
    };

    let hub = EventHub::new();
    events::spawn_status_watcher(hub.clone(), tenancy, node_repo);

    let app_state = AppState {
        config: config.clone(),
        db: db.clone(),
        hub: hub.clone(),
    };

    let api_routes = api::routes(services, verifier, hub);
    let router = create_router::<openapi::ApiDoc>(api_routes).await?;

    let metrics_router = Router::new().route("/metrics", get(observability::metrics_handler));

    let app = router
        .layer(middleware::from_fn(
            observability::middleware::metrics_middleware,
        ))
        .merge(health_router(config.app.clone()))
        .merge(api::ready_router(app_state))
        .merge(metrics_router);

    info!("Starting hexabase-api control plane");
    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    // Connections close on drop after graceful shutdown
    db.close()
        .await
        .map_err(|e| eyre::eyre!("error closing PostgreSQL: {}", e))?;

    info!("hexabase-api shutdown complete");
    Ok(())
}
