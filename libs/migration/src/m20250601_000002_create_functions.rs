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
                    .as_enum(FunctionStatus::Enum)
                    .values([
                        FunctionStatus::Pending,
                        FunctionStatus::Building,
                        FunctionStatus::Ready,
                        FunctionStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(TriggerType::Enum)
                    .values([TriggerType::Http, TriggerType::Schedule, TriggerType::Event])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(InvocationState::Enum)
                    .values([
                        InvocationState::Running,
                        InvocationState::Completed,
                        InvocationState::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ProviderKind::Enum)
                    .values([ProviderKind::Fission, ProviderKind::Knative, ProviderKind::Mock])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Functions::Table)
                    .if_not_exists()
                    .col(pk_uuid(Functions::Id))
                    .col(uuid(Functions::WorkspaceId))
                    .col(uuid(Functions::ProjectId))
                    .col(string(Functions::Name))
                    .col(string(Functions::Runtime))
                    .col(string(Functions::Handler))
                    .col(uuid_null(Functions::ActiveVersionId))
                    .col(
                        ColumnDef::new(Functions::Status)
                            .enumeration(
                                FunctionStatus::Enum,
                                [
                                    FunctionStatus::Pending,
                                    FunctionStatus::Building,
                                    FunctionStatus::Ready,
                                    FunctionStatus::Failed,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(json(Functions::ProviderMetadata).default("{}"))
                    .col(timestamp_with_time_zone(Functions::CreatedAt))
                    .col(timestamp_with_time_zone(Functions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Functions::Table, Functions::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Function names are unique within a project namespace
        manager
            .create_index(
                Index::create()
                    .name("idx_functions_project_name")
                    .table(Functions::Table)
                    .col(Functions::ProjectId)
                    .col(Functions::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FunctionVersions::Table)
                    .if_not_exists()
                    .col(pk_uuid(FunctionVersions::Id))
                    .col(uuid(FunctionVersions::FunctionId))
                    .col(integer(FunctionVersions::Version))
                    .col(text_null(FunctionVersions::SourceCode))
                    .col(string_null(FunctionVersions::Image))
                    .col(boolean(FunctionVersions::IsActive).default(false))
                    .col(timestamp_with_time_zone(FunctionVersions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(FunctionVersions::Table, FunctionVersions::FunctionId)
                            .to(Functions::Table, Functions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_function_versions_function_version")
                    .table(FunctionVersions::Table)
                    .col(FunctionVersions::FunctionId)
                    .col(FunctionVersions::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FunctionTriggers::Table)
                    .if_not_exists()
                    .col(pk_uuid(FunctionTriggers::Id))
                    .col(uuid(FunctionTriggers::FunctionId))
                    .col(string(FunctionTriggers::Name))
                    .col(
                        ColumnDef::new(FunctionTriggers::TriggerType)
                            .enumeration(
                                TriggerType::Enum,
                                [TriggerType::Http, TriggerType::Schedule, TriggerType::Event],
                            )
                            .not_null(),
                    )
                    .col(json(FunctionTriggers::Config))
                    .col(timestamp_with_time_zone(FunctionTriggers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(FunctionTriggers::Table, FunctionTriggers::FunctionId)
                            .to(Functions::Table, Functions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_function_triggers_function_name")
                    .table(FunctionTriggers::Table)
                    .col(FunctionTriggers::FunctionId)
                    .col(FunctionTriggers::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // No foreign key: invocation history outlives the function row
        manager
            .create_table(
                Table::create()
                    .table(Invocations::Table)
                    .if_not_exists()
                    .col(string(Invocations::InvocationId).primary_key())
                    .col(uuid(Invocations::FunctionId))
                    .col(uuid(Invocations::WorkspaceId))
                    .col(
                        ColumnDef::new(Invocations::Status)
                            .enumeration(
                                InvocationState::Enum,
                                [
                                    InvocationState::Running,
                                    InvocationState::Completed,
                                    InvocationState::Failed,
                                ],
                            )
                            .not_null()
                            .default("running"),
                    )
                    .col(timestamp_with_time_zone(Invocations::StartedAt))
                    .col(timestamp_with_time_zone_null(Invocations::CompletedAt))
                    .col(json_null(Invocations::Result))
                    .col(text_null(Invocations::Error))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invocations_function_started")
                    .table(Invocations::Table)
                    .col(Invocations::FunctionId)
                    .col(Invocations::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProviderConfigs::Table)
                    .if_not_exists()
                    .col(uuid(ProviderConfigs::WorkspaceId).primary_key())
                    .col(
                        ColumnDef::new(ProviderConfigs::Kind)
                            .enumeration(
                                ProviderKind::Enum,
                                [
                                    ProviderKind::Fission,
                                    ProviderKind::Knative,
                                    ProviderKind::Mock,
                                ],
                            )
                            .not_null()
                            .default("fission"),
                    )
                    .col(json(ProviderConfigs::Config).default("{}"))
                    .col(timestamp_with_time_zone(ProviderConfigs::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(ProviderConfigs::Table, ProviderConfigs::WorkspaceId)
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
                    .table(FunctionAuditEvents::Table)
                    .if_not_exists()
                    .col(pk_uuid(FunctionAuditEvents::Id))
                    .col(uuid(FunctionAuditEvents::WorkspaceId))
                    .col(uuid(FunctionAuditEvents::SubjectId))
                    .col(string(FunctionAuditEvents::EventType))
                    .col(text(FunctionAuditEvents::Description))
                    .col(json_null(FunctionAuditEvents::Metadata))
                    .col(string(FunctionAuditEvents::Month))
                    .col(timestamp_with_time_zone(FunctionAuditEvents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_function_audit_events_subject")
                    .table(FunctionAuditEvents::Table)
                    .col(FunctionAuditEvents::SubjectId)
                    .col(FunctionAuditEvents::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FunctionAuditEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderConfigs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FunctionTriggers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FunctionVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Functions::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ProviderKind::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(InvocationState::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(TriggerType::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(FunctionStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Functions {
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    Name,
    Runtime,
    Handler,
    ActiveVersionId,
    Status,
    ProviderMetadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FunctionVersions {
    Table,
    Id,
    FunctionId,
    Version,
    SourceCode,
    Image,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FunctionTriggers {
    Table,
    Id,
    FunctionId,
    Name,
    TriggerType,
    Config,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invocations {
    Table,
    InvocationId,
    FunctionId,
    WorkspaceId,
    Status,
    StartedAt,
    CompletedAt,
    Result,
    Error,
}

#[derive(DeriveIden)]
enum ProviderConfigs {
    Table,
    WorkspaceId,
    Kind,
    Config,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FunctionAuditEvents {
    Table,
    Id,
    WorkspaceId,
    SubjectId,
    EventType,
    Description,
    Metadata,
    Month,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FunctionStatus {
    #[sea_orm(iden = "function_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "building")]
    Building,
    #[sea_orm(iden = "ready")]
    Ready,
    #[sea_orm(iden = "failed")]
    Failed,
}

#[derive(DeriveIden)]
enum TriggerType {
    #[sea_orm(iden = "trigger_type")]
    Enum,
    #[sea_orm(iden = "http")]
    Http,
    #[sea_orm(iden = "schedule")]
    Schedule,
    #[sea_orm(iden = "event")]
    Event,
}

#[derive(DeriveIden)]
enum InvocationState {
    #[sea_orm(iden = "invocation_state")]
    Enum,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
}

#[derive(DeriveIden)]
enum ProviderKind {
    #[sea_orm(iden = "provider_kind")]
    Enum,
    #[sea_orm(iden = "fission")]
    Fission,
    #[sea_orm(iden = "knative")]
    Knative,
    #[sea_orm(iden = "mock")]
    Mock,
}
