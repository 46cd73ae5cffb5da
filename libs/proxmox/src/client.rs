use crate::config::ProxmoxConfig;
use crate::error::{VirtError, VirtResult};
use crate::models::{
    CloudInitConfig, VmConfigUpdate, VmInfo, VmResourceUsage, VmSpec, VmTemplate,
};
use crate::VirtualizationProvider;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const TRANSIENT_RETRIES: u32 = 3;
const IP_POLL_ATTEMPTS: u32 = 6;
const IP_POLL_DELAY_SECS: u64 = 5;

/// Proxmox VE adapter for the virtualization port.
///
/// Authenticates with an API token; retries transient failures a bounded
/// number of times before surfacing a terminal error.
pub struct ProxmoxClient {
    http: reqwest::Client,
    config: ProxmoxConfig,
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct VmStatusData {
    status: String,
    #[serde(default)]
    cpu: f64,
    #[serde(default)]
    mem: u64,
    #[serde(default)]
    maxmem: u64,
    #[serde(default)]
    disk: u64,
    #[serde(default)]
    maxdisk: u64,
    #[serde(default)]
    uptime: u64,
}

#[derive(Deserialize)]
struct ClusterResource {
    #[serde(default)]
    vmid: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    node: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    template: u8,
}

impl ProxmoxClient {
    pub fn new(config: ProxmoxConfig) -> VirtResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| VirtError::Internal(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn auth_header(&self) -> String {
        format!(
            "PVEAPIToken={}={}",
            self.config.token_id, self.config.token_secret
        )
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> VirtResult<T> {
        let url = format!("{}/api2/json{}", self.config.api_url, path);
        let mut attempt = 0u32;

        loop {
            let mut req = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", self.auth_header());
            if let Some(ref b) = body {
                req = req.json(b);
            }

            let result = match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<ApiEnvelope<T>>()
                            .await
                            .map(|env| env.data)
                            .map_err(|e| VirtError::Internal(format!("decode failure: {e}")));
                    }
                    let message = response.text().await.unwrap_or_default();
                    if status == StatusCode::NOT_FOUND {
                        return Err(VirtError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    Err(VirtError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
                Err(e) => Err(VirtError::Unavailable(e.to_string())),
            };

            match result {
                Err(e) if e.is_transient() && attempt < TRANSIENT_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, url = %url, "transient hypervisor error, retrying: {}", e);
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }

    /// Locate the hypervisor node hosting a VM.
    async fn resolve(&self, vm_id: u32) -> VirtResult<ClusterResource> {
        let resources: Vec<ClusterResource> = self
            .request(Method::GET, "/cluster/resources?type=vm", None)
            .await?;

        resources
            .into_iter()
            .find(|r| r.vmid == vm_id)
            .ok_or(VirtError::NotFound(vm_id))
    }

    async fn next_vm_id(&self) -> VirtResult<u32> {
        let raw: String = self.request(Method::GET, "/cluster/nextid", None).await?;
        raw.parse::<u32>()
            .map_err(|_| VirtError::Internal(format!("unparsable vm id '{raw}'")))
    }

    async fn power(&self, vm_id: u32, action: &str) -> VirtResult<()> {
        let vm = self.resolve(vm_id).await?;
        let path = format!("/nodes/{}/qemu/{}/status/{}", vm.node, vm_id, action);
        let _task: String = self.request(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    /// Ask the guest agent for the first non-loopback IPv4 address.
    async fn guest_ip(&self, node: &str, vm_id: u32) -> Option<String> {
        #[derive(Deserialize)]
        struct Interfaces {
            result: Vec<Interface>,
        }
        #[derive(Deserialize)]
        struct Interface {
            #[serde(rename = "ip-addresses", default)]
            ip_addresses: Vec<IpAddress>,
        }
        #[derive(Deserialize)]
        struct IpAddress {
            #[serde(rename = "ip-address")]
            ip_address: String,
            #[serde(rename = "ip-address-type")]
            ip_address_type: String,
        }

        let path = format!("/nodes/{}/qemu/{}/agent/network-get-interfaces", node, vm_id);
        let interfaces: Interfaces = self.request(Method::GET, &path, None).await.ok()?;

        interfaces
            .result
            .into_iter()
            .flat_map(|i| i.ip_addresses)
            .find(|ip| ip.ip_address_type == "ipv4" && !ip.ip_address.starts_with("127."))
            .map(|ip| ip.ip_address)
    }
}

#[async_trait]
impl VirtualizationProvider for ProxmoxClient {
    async fn create_vm(&self, spec: &VmSpec) -> VirtResult<VmInfo> {
        let vm_id = self.clone_template(spec.template_id, &spec.name).await?;
        let node = self.config.default_node.clone();
        let target_node = if spec.target_node.is_empty() {
            node
        } else {
            spec.target_node.clone()
        };

        // Size the clone and tag it before first boot
        let config_path = format!("/nodes/{}/qemu/{}/config", target_node, vm_id);
        let _: Option<String> = self
            .request(
                Method::PUT,
                &config_path,
                Some(json!({
                    "cores": spec.cpu_cores,
                    "memory": spec.memory_mb,
                    "net0": format!("virtio,bridge={}", spec.network_bridge),
                    "tags": spec.tags.join(";"),
                })),
            )
            .await?;

        self.set_cloud_init(vm_id, &spec.cloud_init).await?;

        let start_path = format!("/nodes/{}/qemu/{}/status/start", target_node, vm_id);
        let _task: String = self.request(Method::POST, &start_path, Some(json!({}))).await?;

        // The guest agent needs a moment before it can report addresses
        let mut ip_address = None;
        for _ in 0..IP_POLL_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(IP_POLL_DELAY_SECS)).await;
            ip_address = self.guest_ip(&target_node, vm_id).await;
            if ip_address.is_some() {
                break;
            }
        }
        if ip_address.is_none() {
            tracing::warn!(vm_id, "VM started but reported no IP address yet");
        }

        Ok(VmInfo {
            vm_id,
            node: target_node,
            name: spec.name.clone(),
            status: "running".to_string(),
            ip_address,
        })
    }

    async fn get_vm(&self, vm_id: u32) -> VirtResult<VmInfo> {
        let vm = self.resolve(vm_id).await?;
        let ip_address = self.guest_ip(&vm.node, vm_id).await;
        Ok(VmInfo {
            vm_id,
            node: vm.node,
            name: vm.name,
            status: vm.status,
            ip_address,
        })
    }

    async fn start_vm(&self, vm_id: u32) -> VirtResult<()> {
        self.power(vm_id, "start").await
    }

    async fn stop_vm(&self, vm_id: u32) -> VirtResult<()> {
        self.power(vm_id, "stop").await
    }

    async fn reboot_vm(&self, vm_id: u32) -> VirtResult<()> {
        self.power(vm_id, "reboot").await
    }

    async fn delete_vm(&self, vm_id: u32) -> VirtResult<()> {
        let vm = self.resolve(vm_id).await?;
        let path = format!("/nodes/{}/qemu/{}?purge=1", vm.node, vm_id);
        let _task: String = self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn update_config(&self, vm_id: u32, config: &VmConfigUpdate) -> VirtResult<()> {
        let vm = self.resolve(vm_id).await?;
        let mut body = serde_json::Map::new();
        if let Some(cores) = config.cpu_cores {
            body.insert("cores".to_string(), json!(cores));
        }
        if let Some(memory) = config.memory_mb {
            body.insert("memory".to_string(), json!(memory));
        }
        if let Some(ref tags) = config.tags {
            body.insert("tags".to_string(), json!(tags.join(";")));
        }
        if body.is_empty() {
            return Ok(());
        }

        let path = format!("/nodes/{}/qemu/{}/config", vm.node, vm_id);
        let _: Option<String> = self
            .request(Method::PUT, &path, Some(serde_json::Value::Object(body)))
            .await?;
        Ok(())
    }

    async fn get_status(&self, vm_id: u32) -> VirtResult<String> {
        let vm = self.resolve(vm_id).await?;
        let path = format!("/nodes/{}/qemu/{}/status/current", vm.node, vm_id);
        let status: VmStatusData = self.request(Method::GET, &path, None).await?;
        Ok(status.status)
    }

    async fn set_cloud_init(&self, vm_id: u32, config: &CloudInitConfig) -> VirtResult<()> {
        let vm = self.resolve(vm_id).await?;
        let mut body = serde_json::Map::new();
        if !config.ssh_keys.is_empty() {
            // Proxmox expects the key list URL-encoded
            let keys = urlencoding::encode(&config.ssh_keys.join("\n")).into_owned();
            body.insert("sshkeys".to_string(), json!(keys));
        }
        if let Some(ref user_data) = config.user_data {
            body.insert("cicustom".to_string(), json!(user_data));
        }
        if body.is_empty() {
            return Ok(());
        }

        let path = format!("/nodes/{}/qemu/{}/config", vm.node, vm_id);
        let _: Option<String> = self
            .request(Method::PUT, &path, Some(serde_json::Value::Object(body)))
            .await?;
        Ok(())
    }

    async fn get_resource_usage(&self, vm_id: u32) -> VirtResult<VmResourceUsage> {
        let vm = self.resolve(vm_id).await?;
        let path = format!("/nodes/{}/qemu/{}/status/current", vm.node, vm_id);
        let status: VmStatusData = self.request(Method::GET, &path, None).await?;

        Ok(VmResourceUsage {
            cpu_percent: status.cpu * 100.0,
            memory_used_mb: status.mem / (1024 * 1024),
            memory_total_mb: status.maxmem / (1024 * 1024),
            disk_used_gb: status.disk as f64 / (1024.0 * 1024.0 * 1024.0),
            disk_total_gb: status.maxdisk as f64 / (1024.0 * 1024.0 * 1024.0),
            uptime_secs: status.uptime,
        })
    }

    async fn clone_template(&self, template_id: u32, name: &str) -> VirtResult<u32> {
        let new_id = self.next_vm_id().await?;
        let path = format!(
            "/nodes/{}/qemu/{}/clone",
            self.config.default_node, template_id
        );
        let _task: String = self
            .request(
                Method::POST,
                &path,
                Some(json!({
                    "newid": new_id,
                    "name": name,
                    "full": true,
                })),
            )
            .await?;

        Ok(new_id)
    }

    async fn list_templates(&self) -> VirtResult<Vec<VmTemplate>> {
        let resources: Vec<ClusterResource> = self
            .request(Method::GET, "/cluster/resources?type=vm", None)
            .await?;

        Ok(resources
            .into_iter()
            .filter(|r| r.template == 1)
            .map(|r| VmTemplate {
                template_id: r.vmid,
                name: r.name,
                node: r.node,
            })
            .collect())
    }
}
