use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node reporting Ready=True with a heartbeat older than this is stale.
pub const STALE_HEARTBEAT: Duration = Duration::minutes(5);

/// OIDC settings applied to a vCluster API server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcSettings {
    pub issuer_url: String,
    pub client_id: String,
    pub groups_claim: Option<String>,
}

/// Resource quotas for a vCluster or project namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuotas {
    pub cpu_millis: i64,
    pub memory_mib: i64,
    pub storage_gib: i64,
    pub pods: i32,
}

impl ResourceQuotas {
    /// True when every axis of `self` fits within `parent`.
    pub fn fits_within(&self, parent: &ResourceQuotas) -> bool {
        self.cpu_millis <= parent.cpu_millis
            && self.memory_mib <= parent.memory_mib
            && self.storage_gib <= parent.storage_gib
            && self.pods <= parent.pods
    }
}

/// Everything needed to provision a vCluster instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VClusterSpec {
    pub workspace_id: Uuid,
    pub instance_name: String,
    pub oidc: OidcSettings,
    pub quotas: Option<ResourceQuotas>,
}

/// One condition reported by a Kubernetes node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCondition {
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Taint applied to dedicated-pool nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTaint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

/// SubjectAccessReview inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessReview {
    pub user: String,
    pub groups: Vec<String>,
    pub namespace: Option<String>,
    pub verb: String,
    pub resource: String,
}

/// Opaque workload manifest handed through from the application service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadManifest {
    pub name: String,
    /// Kubernetes kind (`Deployment`, `StatefulSet`, `CronJob`)
    pub kind: String,
    pub manifest: serde_json::Value,
}

/// Node readiness derived from its `Ready` condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReadyState {
    Ready,
    NotReady,
    /// Ready=True but the heartbeat is older than [`STALE_HEARTBEAT`]
    Stale,
}

/// Apply the staleness rule to a node's condition list.
pub fn ready_state(conditions: &[NodeCondition], now: DateTime<Utc>) -> NodeReadyState {
    let ready = conditions
        .iter()
        .find(|c| c.condition_type == "Ready");

    match ready {
        Some(c) if c.status == "True" => match c.last_heartbeat {
            Some(heartbeat) if now - heartbeat > STALE_HEARTBEAT => NodeReadyState::Stale,
            _ => NodeReadyState::Ready,
        },
        _ => NodeReadyState::NotReady,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(status: &str, age_minutes: i64) -> NodeCondition {
        NodeCondition {
            condition_type: "Ready".to_string(),
            status: status.to_string(),
            reason: None,
            message: None,
            last_heartbeat: Some(Utc::now() - Duration::minutes(age_minutes)),
        }
    }

    #[test]
    fn test_ready_with_recent_heartbeat() {
        let now = Utc::now();
        assert_eq!(ready_state(&[condition("True", 1)], now), NodeReadyState::Ready);
    }

    #[test]
    fn test_stale_when_heartbeat_older_than_five_minutes() {
        let now = Utc::now();
        assert_eq!(ready_state(&[condition("True", 10)], now), NodeReadyState::Stale);
    }

    #[test]
    fn test_not_ready() {
        let now = Utc::now();
        assert_eq!(ready_state(&[condition("False", 1)], now), NodeReadyState::NotReady);
    }

    #[test]
    fn test_no_ready_condition_is_not_ready() {
        let now = Utc::now();
        assert_eq!(ready_state(&[], now), NodeReadyState::NotReady);
    }

    #[test]
    fn test_quota_inheritance() {
        let parent = ResourceQuotas {
            cpu_millis: 4000,
            memory_mib: 8192,
            storage_gib: 100,
            pods: 50,
        };
        let child_ok = ResourceQuotas {
            cpu_millis: 2000,
            memory_mib: 4096,
            storage_gib: 50,
            pods: 25,
        };
        let child_too_big = ResourceQuotas {
            cpu_millis: 8000,
            ..child_ok
        };
        assert!(child_ok.fits_within(&parent));
        assert!(!child_too_big.fits_within(&parent));
    }
}
