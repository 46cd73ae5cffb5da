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
                    .as_enum(WorkspacePlan::Enum)
                    .values([WorkspacePlan::Shared, WorkspacePlan::Dedicated])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(VclusterStatus::Enum)
                    .values([
                        VclusterStatus::Pending,
                        VclusterStatus::Creating,
                        VclusterStatus::Running,
                        VclusterStatus::Stopped,
                        VclusterStatus::Failed,
                        VclusterStatus::Deleting,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string(Users::ExternalId))
                    .col(string(Users::Provider))
                    .col(string(Users::Email))
                    .col(string(Users::DisplayName))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // external_id + provider is the immutable identity pair
        manager
            .create_index(
                Index::create()
                    .name("idx_users_external_identity")
                    .table(Users::Table)
                    .col(Users::ExternalId)
                    .col(Users::Provider)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(pk_uuid(Organizations::Id))
                    .col(string(Organizations::Name))
                    .col(uuid(Organizations::OwnerUserId))
                    .col(timestamp_with_time_zone(Organizations::CreatedAt))
                    .col(timestamp_with_time_zone(Organizations::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationUsers::Table)
                    .if_not_exists()
                    .col(uuid(OrganizationUsers::OrganizationId))
                    .col(uuid(OrganizationUsers::UserId))
                    .col(string(OrganizationUsers::Role))
                    .primary_key(
                        Index::create()
                            .col(OrganizationUsers::OrganizationId)
                            .col(OrganizationUsers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrganizationUsers::Table, OrganizationUsers::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(pk_uuid(Workspaces::Id))
                    .col(uuid(Workspaces::OrganizationId))
                    .col(string(Workspaces::Name))
                    .col(
                        ColumnDef::new(Workspaces::Plan)
                            .enumeration(
                                WorkspacePlan::Enum,
                                [WorkspacePlan::Shared, WorkspacePlan::Dedicated],
                            )
                            .not_null()
                            .default("shared"),
                    )
                    .col(
                        ColumnDef::new(Workspaces::VclusterStatus)
                            .enumeration(
                                VclusterStatus::Enum,
                                [
                                    VclusterStatus::Pending,
                                    VclusterStatus::Creating,
                                    VclusterStatus::Running,
                                    VclusterStatus::Stopped,
                                    VclusterStatus::Failed,
                                    VclusterStatus::Deleting,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(string_null(Workspaces::VclusterInstanceName))
                    .col(timestamp_with_time_zone(Workspaces::CreatedAt))
                    .col(timestamp_with_time_zone(Workspaces::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Workspaces::Table, Workspaces::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workspaces_org_name")
                    .table(Workspaces::Table)
                    .col(Workspaces::OrganizationId)
                    .col(Workspaces::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(pk_uuid(Projects::Id))
                    .col(uuid(Projects::WorkspaceId))
                    .col(uuid_null(Projects::ParentId))
                    .col(string(Projects::Name))
                    .col(string(Projects::Namespace))
                    .col(json_null(Projects::Quotas))
                    .col(timestamp_with_time_zone(Projects::CreatedAt))
                    .col(timestamp_with_time_zone(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Projects::Table, Projects::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Projects::Table, Projects::ParentId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_workspace_name")
                    .table(Projects::Table)
                    .col(Projects::WorkspaceId)
                    .col(Projects::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizationUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(VclusterStatus::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(WorkspacePlan::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    ExternalId,
    Provider,
    Email,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    OwnerUserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationUsers {
    Table,
    OrganizationId,
    UserId,
    Role,
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
    OrganizationId,
    Name,
    Plan,
    VclusterStatus,
    VclusterInstanceName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    WorkspaceId,
    ParentId,
    Name,
    Namespace,
    Quotas,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WorkspacePlan {
    #[sea_orm(iden = "workspace_plan")]
    Enum,
    #[sea_orm(iden = "shared")]
    Shared,
    #[sea_orm(iden = "dedicated")]
    Dedicated,
}

#[derive(DeriveIden)]
enum VclusterStatus {
    #[sea_orm(iden = "vcluster_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "creating")]
    Creating,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "stopped")]
    Stopped,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "deleting")]
    Deleting,
}
