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
                    .as_enum(AppKind::Enum)
                    .values([AppKind::Stateless, AppKind::Stateful, AppKind::Cronjob])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(DeploymentStrategy::Enum)
                    .values([
                        DeploymentStrategy::Rolling,
                        DeploymentStrategy::BlueGreen,
                        DeploymentStrategy::Canary,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(AppStatus::Enum)
                    .values([
                        AppStatus::Pending,
                        AppStatus::Deploying,
                        AppStatus::Running,
                        AppStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ExecutionStatus::Enum)
                    .values([
                        ExecutionStatus::Running,
                        ExecutionStatus::Succeeded,
                        ExecutionStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Applications::Table)
                    .if_not_exists()
                    .col(pk_uuid(Applications::Id))
                    .col(uuid(Applications::WorkspaceId))
                    .col(uuid(Applications::ProjectId))
                    .col(string(Applications::Name))
                    .col(
                        ColumnDef::new(Applications::Kind)
                            .enumeration(
                                AppKind::Enum,
                                [AppKind::Stateless, AppKind::Stateful, AppKind::Cronjob],
                            )
                            .not_null(),
                    )
                    .col(json(Applications::Source))
                    .col(integer(Applications::Replicas).default(1))
                    .col(json(Applications::Env).default("{}"))
                    .col(json(Applications::Ports).default("[]"))
                    .col(
                        ColumnDef::new(Applications::Strategy)
                            .enumeration(
                                DeploymentStrategy::Enum,
                                [
                                    DeploymentStrategy::Rolling,
                                    DeploymentStrategy::BlueGreen,
                                    DeploymentStrategy::Canary,
                                ],
                            )
                            .not_null()
                            .default("rolling"),
                    )
                    .col(
                        ColumnDef::new(Applications::Status)
                            .enumeration(
                                AppStatus::Enum,
                                [
                                    AppStatus::Pending,
                                    AppStatus::Deploying,
                                    AppStatus::Running,
                                    AppStatus::Failed,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(string_null(Applications::CronSchedule))
                    .col(json_null(Applications::Command))
                    .col(json_null(Applications::Args))
                    .col(uuid_null(Applications::TemplateAppId))
                    .col(boolean(Applications::IsTemplate).default(false))
                    .col(json(Applications::NodeSelector).default("{}"))
                    .col(json(Applications::Tolerations).default("[]"))
                    .col(timestamp_with_time_zone(Applications::CreatedAt))
                    .col(timestamp_with_time_zone(Applications::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Applications::Table, Applications::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_applications_project_name")
                    .table(Applications::Table)
                    .col(Applications::ProjectId)
                    .col(Applications::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CronjobExecutions::Table)
                    .if_not_exists()
                    .col(pk_uuid(CronjobExecutions::Id))
                    .col(uuid(CronjobExecutions::ApplicationId))
                    .col(string(CronjobExecutions::JobName))
                    .col(timestamp_with_time_zone(CronjobExecutions::StartedAt))
                    .col(timestamp_with_time_zone_null(CronjobExecutions::CompletedAt))
                    .col(
                        ColumnDef::new(CronjobExecutions::Status)
                            .enumeration(
                                ExecutionStatus::Enum,
                                [
                                    ExecutionStatus::Running,
                                    ExecutionStatus::Succeeded,
                                    ExecutionStatus::Failed,
                                ],
                            )
                            .not_null()
                            .default("running"),
                    )
                    .col(integer_null(CronjobExecutions::ExitCode))
                    .col(text_null(CronjobExecutions::Logs))
                    .foreign_key(
                        ForeignKey::create()
                            .from(CronjobExecutions::Table, CronjobExecutions::ApplicationId)
                            .to(Applications::Table, Applications::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BackupPolicies::Table)
                    .if_not_exists()
                    .col(pk_uuid(BackupPolicies::Id))
                    .col(uuid(BackupPolicies::ApplicationId))
                    .col(string(BackupPolicies::StorageId))
                    .col(string(BackupPolicies::Schedule))
                    .col(integer(BackupPolicies::RetentionDays))
                    .col(boolean(BackupPolicies::IncludeVolumes).default(true))
                    .col(boolean(BackupPolicies::IncludeDatabase).default(false))
                    .col(boolean(BackupPolicies::Compression).default(true))
                    .col(boolean(BackupPolicies::Encryption).default(false))
                    .col(timestamp_with_time_zone(BackupPolicies::CreatedAt))
                    .col(timestamp_with_time_zone(BackupPolicies::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(BackupPolicies::Table, BackupPolicies::ApplicationId)
                            .to(Applications::Table, Applications::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One policy per application
        manager
            .create_index(
                Index::create()
                    .name("idx_backup_policies_application")
                    .table(BackupPolicies::Table)
                    .col(BackupPolicies::ApplicationId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BackupPolicies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CronjobExecutions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Applications::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ExecutionStatus::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(AppStatus::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(DeploymentStrategy::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(AppKind::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Applications {
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    Name,
    Kind,
    Source,
    Replicas,
    Env,
    Ports,
    Strategy,
    Status,
    CronSchedule,
    Command,
    Args,
    TemplateAppId,
    IsTemplate,
    NodeSelector,
    Tolerations,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CronjobExecutions {
    Table,
    Id,
    ApplicationId,
    JobName,
    StartedAt,
    CompletedAt,
    Status,
    ExitCode,
    Logs,
}

#[derive(DeriveIden)]
enum BackupPolicies {
    Table,
    Id,
    ApplicationId,
    StorageId,
    Schedule,
    RetentionDays,
    IncludeVolumes,
    IncludeDatabase,
    Compression,
    Encryption,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AppKind {
    #[sea_orm(iden = "app_kind")]
    Enum,
    #[sea_orm(iden = "stateless")]
    Stateless,
    #[sea_orm(iden = "stateful")]
    Stateful,
    #[sea_orm(iden = "cronjob")]
    Cronjob,
}

#[derive(DeriveIden)]
enum DeploymentStrategy {
    #[sea_orm(iden = "deployment_strategy")]
    Enum,
    #[sea_orm(iden = "rolling")]
    Rolling,
    #[sea_orm(iden = "blue_green")]
    BlueGreen,
    #[sea_orm(iden = "canary")]
    Canary,
}

#[derive(DeriveIden)]
enum AppStatus {
    #[sea_orm(iden = "app_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "deploying")]
    Deploying,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "failed")]
    Failed,
}

#[derive(DeriveIden)]
enum ExecutionStatus {
    #[sea_orm(iden = "execution_status")]
    Enum,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "succeeded")]
    Succeeded,
    #[sea_orm(iden = "failed")]
    Failed,
}
