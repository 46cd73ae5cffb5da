//! Virtualization port: VM lifecycle on an external hypervisor.
//!
//! The [`VirtualizationProvider`] trait is the boundary the orchestration
//! core programs against; [`ProxmoxClient`] is the Proxmox VE adapter.
//! Adapters retry transient errors internally but always return a terminal
//! error within a bounded time so callers can compensate.

mod client;
mod config;
mod error;
mod models;

pub use client::ProxmoxClient;
pub use config::ProxmoxConfig;
pub use error::{VirtError, VirtResult};
pub use models::{
    CloudInitConfig, VmConfigUpdate, VmInfo, VmResourceUsage, VmSpec, VmTemplate,
};

use async_trait::async_trait;

#[async_trait]
pub trait VirtualizationProvider: Send + Sync {
    /// Create a VM from the spec (clone template, apply config, boot).
    async fn create_vm(&self, spec: &VmSpec) -> VirtResult<VmInfo>;

    async fn get_vm(&self, vm_id: u32) -> VirtResult<VmInfo>;

    async fn start_vm(&self, vm_id: u32) -> VirtResult<()>;

    async fn stop_vm(&self, vm_id: u32) -> VirtResult<()>;

    async fn reboot_vm(&self, vm_id: u32) -> VirtResult<()>;

    async fn delete_vm(&self, vm_id: u32) -> VirtResult<()>;

    async fn update_config(&self, vm_id: u32, config: &VmConfigUpdate) -> VirtResult<()>;

    /// Raw hypervisor status string (e.g. `running`, `stopped`).
    async fn get_status(&self, vm_id: u32) -> VirtResult<String>;

    async fn set_cloud_init(&self, vm_id: u32, config: &CloudInitConfig) -> VirtResult<()>;

    async fn get_resource_usage(&self, vm_id: u32) -> VirtResult<VmResourceUsage>;

    /// Clone a template into a new VM, returning the new VM id.
    async fn clone_template(&self, template_id: u32, name: &str) -> VirtResult<u32>;

    async fn list_templates(&self) -> VirtResult<Vec<VmTemplate>>;
}
