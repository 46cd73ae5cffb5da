use core_config::{env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

/// Proxmox VE API connection settings.
#[derive(Clone, Debug)]
pub struct ProxmoxConfig {
    /// Base URL, e.g. `https://pve.example.com:8006`
    pub api_url: String,
    /// API token id, e.g. `hexabase@pve!provisioner`
    pub token_id: String,
    pub token_secret: String,
    /// Hypervisor node used when a spec names no target
    pub default_node: String,
    pub verify_tls: bool,
    /// Outer bound for a single API call, in seconds
    pub request_timeout_secs: u64,
}

impl FromEnv for ProxmoxConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env_required("PROXMOX_API_URL")?,
            token_id: env_required("PROXMOX_TOKEN_ID")?,
            token_secret: env_required("PROXMOX_TOKEN_SECRET")?,
            default_node: env_or_default("PROXMOX_DEFAULT_NODE", "pve"),
            verify_tls: env_parse_or("PROXMOX_VERIFY_TLS", true)?,
            request_timeout_secs: env_parse_or("PROXMOX_REQUEST_TIMEOUT_SECS", 60)?,
        })
    }
}
