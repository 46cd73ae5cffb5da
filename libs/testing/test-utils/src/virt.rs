use async_trait::async_trait;
use proxmox::{
    CloudInitConfig, VirtResult, VirtualizationProvider, VmConfigUpdate, VmInfo,
    VmResourceUsage, VmSpec, VmTemplate,
};

/// Canned-answer virtualization provider for tests.
///
/// Every VM it "creates" is vm 100 on node `hv1` with a fixed address.
#[derive(Debug, Default, Clone)]
pub struct NullVirt;

#[async_trait]
impl VirtualizationProvider for NullVirt {
    async fn create_vm(&self, spec: &VmSpec) -> VirtResult<VmInfo> {
        Ok(VmInfo {
            vm_id: 100,
            node: "hv1".to_string(),
            name: spec.name.clone(),
            status: "running".to_string(),
            ip_address: Some("10.0.0.5".to_string()),
        })
    }

    async fn get_vm(&self, vm_id: u32) -> VirtResult<VmInfo> {
        Ok(VmInfo {
            vm_id,
            node: "hv1".to_string(),
            name: "vm".to_string(),
            status: "running".to_string(),
            ip_address: Some("10.0.0.5".to_string()),
        })
    }

    async fn start_vm(&self, _vm_id: u32) -> VirtResult<()> {
        Ok(())
    }

    async fn stop_vm(&self, _vm_id: u32) -> VirtResult<()> {
        Ok(())
    }

    async fn reboot_vm(&self, _vm_id: u32) -> VirtResult<()> {
        Ok(())
    }

    async fn delete_vm(&self, _vm_id: u32) -> VirtResult<()> {
        Ok(())
    }

    async fn update_config(&self, _vm_id: u32, _config: &VmConfigUpdate) -> VirtResult<()> {
        Ok(())
    }

    async fn get_status(&self, _vm_id: u32) -> VirtResult<String> {
        Ok("running".to_string())
    }

    async fn set_cloud_init(&self, _vm_id: u32, _config: &CloudInitConfig) -> VirtResult<()> {
        Ok(())
    }

    async fn get_resource_usage(&self, _vm_id: u32) -> VirtResult<VmResourceUsage> {
        Ok(VmResourceUsage {
            cpu_percent: 10.0,
            memory_used_mb: 1024,
            memory_total_mb: 16384,
            disk_used_gb: 10.0,
            disk_total_gb: 200.0,
            uptime_secs: 60,
        })
    }

    async fn clone_template(&self, _template_id: u32, _name: &str) -> VirtResult<u32> {
        Ok(100)
    }

    async fn list_templates(&self) -> VirtResult<Vec<VmTemplate>> {
        Ok(vec![])
    }
}
