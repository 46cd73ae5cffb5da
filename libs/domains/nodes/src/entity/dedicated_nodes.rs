use crate::models::{NodePlan, NodeStatus, NodeType};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dedicated_nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub node_type: String,
    /// JSONB snapshot of the catalog entry at provisioning time
    pub specification: Json,
    pub status: NodeStatus,
    pub proxmox_vm_id: Option<i32>,
    pub proxmox_node: Option<String>,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub ssh_public_key: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::DedicatedNode {
    fn from(model: Model) -> Self {
        // The snapshot is authoritative even if the catalog changes later
        let specification: NodePlan = serde_json::from_value(model.specification.clone())
            .unwrap_or_else(|_| {
                NodePlan::for_type(
                    model.node_type.parse::<NodeType>().unwrap_or(NodeType::SType),
                )
            });

        Self {
            id: model.id,
            workspace_id: model.workspace_id,
            name: model.name,
            specification,
            status: model.status,
            proxmox_vm_id: model.proxmox_vm_id.map(|v| v as u32),
            proxmox_node: model.proxmox_node,
            ip_address: model.ip_address,
            ssh_public_key: model.ssh_public_key,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            deleted_at: model.deleted_at.map(Into::into),
        }
    }
}

impl From<&crate::models::DedicatedNode> for ActiveModel {
    fn from(node: &crate::models::DedicatedNode) -> Self {
        let specification =
            serde_json::to_value(node.specification).expect("node plan always serializes");

        ActiveModel {
            id: Set(node.id),
            workspace_id: Set(node.workspace_id),
            name: Set(node.name.clone()),
            node_type: Set(node.specification.node_type.to_string()),
            specification: Set(specification),
            status: Set(node.status),
            proxmox_vm_id: Set(node.proxmox_vm_id.map(|v| v as i32)),
            proxmox_node: Set(node.proxmox_node.clone()),
            ip_address: Set(node.ip_address.clone()),
            ssh_public_key: Set(node.ssh_public_key.clone()),
            created_at: Set(node.created_at.into()),
            updated_at: Set(node.updated_at.into()),
            deleted_at: Set(node.deleted_at.map(Into::into)),
        }
    }
}
