use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(NodeStatus::Enum)
                    .values([
                        NodeStatus::Provisioning,
                        NodeStatus::Ready,
                        NodeStatus::Starting,
                        NodeStatus::Stopping,
                        NodeStatus::Stopped,
                        NodeStatus::Rebooting,
                        NodeStatus::Deleting,
                        NodeStatus::Failed,
                        NodeStatus::Deleted,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DedicatedNodes::Table)
                    .if_not_exists()
                    .col(pk_uuid(DedicatedNodes::Id))
                    .col(uuid(DedicatedNodes::WorkspaceId))
                    .col(string(DedicatedNodes::Name))
                    .col(string(DedicatedNodes::NodeType))
                    .col(json(DedicatedNodes::Specification))
                    .col(
                        ColumnDef::new(DedicatedNodes::Status)
                            .enumeration(
                                NodeStatus::Enum,
                                [
                                    NodeStatus::Provisioning,
                                    NodeStatus::Ready,
                                    NodeStatus::Starting,
                                    NodeStatus::Stopping,
                                    NodeStatus::Stopped,
                                    NodeStatus::Rebooting,
                                    NodeStatus::Deleting,
                                    NodeStatus::Failed,
                                    NodeStatus::Deleted,
                                ],
                            )
                            .not_null()
                            .default("provisioning"),
                    )
                    .col(integer_null(DedicatedNodes::ProxmoxVmId))
                    .col(string_null(DedicatedNodes::ProxmoxNode))
                    .col(string_null(DedicatedNodes::IpAddress))
                    .col(text(DedicatedNodes::SshPublicKey))
                    .col(timestamp_with_time_zone(DedicatedNodes::CreatedAt))
                    .col(timestamp_with_time_zone(DedicatedNodes::UpdatedAt))
                    .col(timestamp_with_time_zone_null(DedicatedNodes::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(DedicatedNodes::Table, DedicatedNodes::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dedicated_nodes_workspace")
                    .table(DedicatedNodes::Table)
                    .col(DedicatedNodes::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkspaceAllocations::Table)
                    .if_not_exists()
                    .col(uuid(WorkspaceAllocations::WorkspaceId).primary_key())
                    .col(
                        ColumnDef::new(WorkspaceAllocations::PlanType)
                            .custom(WorkspacePlan::Enum)
                            .not_null()
                            .default("shared"),
                    )
                    .col(json_null(WorkspaceAllocations::SharedQuota))
                    .col(timestamp_with_time_zone(WorkspaceAllocations::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(WorkspaceAllocations::Table, WorkspaceAllocations::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Append-only; month column is the partition key for archival
        manager
            .create_table(
                Table::create()
                    .table(NodeEvents::Table)
                    .if_not_exists()
                    .col(pk_uuid(NodeEvents::Id))
                    .col(uuid(NodeEvents::WorkspaceId))
                    .col(uuid(NodeEvents::NodeId))
                    .col(string(NodeEvents::EventType))
                    .col(text(NodeEvents::Description))
                    .col(json_null(NodeEvents::Metadata))
                    .col(string(NodeEvents::Month))
                    .col(timestamp_with_time_zone(NodeEvents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_node_events_node_created")
                    .table(NodeEvents::Table)
                    .col(NodeEvents::NodeId)
                    .col(NodeEvents::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NodeEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkspaceAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DedicatedNodes::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(NodeStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum DedicatedNodes {
    Table,
    Id,
    WorkspaceId,
    Name,
    NodeType,
    Specification,
    Status,
    ProxmoxVmId,
    ProxmoxNode,
    IpAddress,
    SshPublicKey,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum WorkspaceAllocations {
    Table,
    WorkspaceId,
    PlanType,
    SharedQuota,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NodeEvents {
    Table,
    Id,
    WorkspaceId,
    NodeId,
    EventType,
    Description,
    Metadata,
    Month,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NodeStatus {
    #[sea_orm(iden = "node_status")]
    Enum,
    #[sea_orm(iden = "provisioning")]
    Provisioning,
    #[sea_orm(iden = "ready")]
    Ready,
    #[sea_orm(iden = "starting")]
    Starting,
    #[sea_orm(iden = "stopping")]
    Stopping,
    #[sea_orm(iden = "stopped")]
    Stopped,
    #[sea_orm(iden = "rebooting")]
    Rebooting,
    #[sea_orm(iden = "deleting")]
    Deleting,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "deleted")]
    Deleted,
}

#[derive(DeriveIden)]
enum WorkspacePlan {
    #[sea_orm(iden = "workspace_plan")]
    Enum,
}
