use serde::{Deserialize, Serialize};

/// Cloud-init settings injected into a freshly cloned VM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudInitConfig {
    pub ssh_keys: Vec<String>,
    pub user_data: Option<String>,
}

/// Everything needed to create a VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSpec {
    pub name: String,
    pub node_type: String,
    pub template_id: u32,
    /// Hypervisor node to place the VM on
    pub target_node: String,
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
    pub network_bridge: String,
    pub cloud_init: CloudInitConfig,
    pub tags: Vec<String>,
}

/// Partial VM configuration update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmConfigUpdate {
    pub cpu_cores: Option<u32>,
    pub memory_mb: Option<u64>,
    pub tags: Option<Vec<String>>,
}

/// Hypervisor view of a VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmInfo {
    pub vm_id: u32,
    /// Hypervisor node hosting the VM
    pub node: String,
    pub name: String,
    pub status: String,
    pub ip_address: Option<String>,
}

/// Point-in-time resource sample for a running VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmResourceUsage {
    pub cpu_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmTemplate {
    pub template_id: u32,
    pub name: String,
    pub node: String,
}
