use axum_helpers::JwtConfig;
use core_config::{app_info, env_or_default, server::ServerConfig, AppInfo, Environment, FromEnv};
use database::postgres::PostgresConfig;
use kubernetes::OidcSettings;
use proxmox::ProxmoxConfig;

/// Control-plane configuration, composed from the shared config components.
///
/// Everything else (per-workspace provider selection, quotas, plans) lives in
/// the database.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub jwt: JwtConfig,
    pub proxmox: ProxmoxConfig,
    /// Default Fission controller endpoint for workspaces without a stored
    /// provider configuration
    pub fission_endpoint: String,
    /// OIDC settings applied to provisioned vClusters
    pub vcluster_oidc: OidcSettings,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let database = PostgresConfig::from_env()?;
        let jwt = JwtConfig::from_env()?;
        let proxmox = ProxmoxConfig::from_env()?;

        let fission_endpoint = env_or_default(
            "FUNCTION_PROVIDER_ENDPOINT",
            "http://controller.fission.svc.cluster.local",
        );

        let vcluster_oidc = OidcSettings {
            issuer_url: jwt.issuer.clone(),
            client_id: env_or_default("VCLUSTER_OIDC_CLIENT_ID", "hexabase-vcluster"),
            groups_claim: None,
        };

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            database,
            jwt,
            proxmox,
            fission_endpoint,
            vcluster_oidc,
        })
    }
}
