use async_trait::async_trait;
use database::BaseRepository;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{NodeError, NodeResult},
    models::{DedicatedNode, NodeEvent, NodeStatus, WorkspaceNodeAllocation},
    repository::NodeRepository,
    state::transition_allowed,
};

pub struct PgNodeRepository {
    base: BaseRepository<entity::dedicated_nodes::Entity>,
}

impl PgNodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.base.db()
    }
}

fn db_err(e: sea_orm::DbErr) -> NodeError {
    NodeError::Internal(format!("Database error: {}", e))
}

#[async_trait]
impl NodeRepository for PgNodeRepository {
    async fn create_node(&self, node: &DedicatedNode) -> NodeResult<()> {
        let exists = self.base.find_by_id(node.id).await.map_err(db_err)?.is_some();
        if exists {
            return Err(NodeError::AlreadyExists(format!("node {}", node.id)));
        }

        let model: entity::dedicated_nodes::ActiveModel = node.into();
        self.base.insert(model).await.map_err(db_err)?;
        tracing::info!(node_id = %node.id, "Created dedicated node");
        Ok(())
    }

    async fn get_node(&self, id: Uuid) -> NodeResult<Option<DedicatedNode>> {
        let model = self.base.find_by_id(id).await.map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn update_node(&self, node: &DedicatedNode) -> NodeResult<()> {
        let model: entity::dedicated_nodes::ActiveModel = node.into();
        self.base.update(model).await.map_err(db_err)?;
        Ok(())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: NodeStatus,
        to: NodeStatus,
    ) -> NodeResult<bool> {
        if !transition_allowed(from, to) {
            return Err(NodeError::InvalidState(format!(
                "transition {from} -> {to} is not allowed"
            )));
        }

        // Compare-and-swap on the status column; a concurrent transition
        // makes the filter miss and affects zero rows
        let result = entity::dedicated_nodes::Entity::update_many()
            .col_expr(
                entity::dedicated_nodes::Column::Status,
                sea_orm::sea_query::Expr::value(to),
            )
            .col_expr(
                entity::dedicated_nodes::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now()),
            )
            .filter(entity::dedicated_nodes::Column::Id.eq(id))
            .filter(entity::dedicated_nodes::Column::Status.eq(from))
            .exec(self.db())
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_nodes(&self, workspace_id: Uuid) -> NodeResult<Vec<DedicatedNode>> {
        let models = entity::dedicated_nodes::Entity::find()
            .filter(entity::dedicated_nodes::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::dedicated_nodes::Column::DeletedAt.is_null())
            .order_by_asc(entity::dedicated_nodes::Column::CreatedAt)
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_nodes_with_deleted(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<Vec<DedicatedNode>> {
        let models = entity::dedicated_nodes::Entity::find()
            .filter(entity::dedicated_nodes::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(entity::dedicated_nodes::Column::CreatedAt)
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn get_allocation(
        &self,
        workspace_id: Uuid,
    ) -> NodeResult<Option<WorkspaceNodeAllocation>> {
        let model = entity::workspace_allocations::Entity::find_by_id(workspace_id)
            .one(self.db())
            .await
            .map_err(db_err)?;
        Ok(model.map(Into::into))
    }

    async fn upsert_allocation(&self, allocation: &WorkspaceNodeAllocation) -> NodeResult<()> {
        let existing = entity::workspace_allocations::Entity::find_by_id(allocation.workspace_id)
            .one(self.db())
            .await
            .map_err(db_err)?;

        let mut model: entity::workspace_allocations::ActiveModel = allocation.into();
        model.updated_at = Set(chrono::Utc::now().into());
        if existing.is_some() {
            model.update(self.db()).await.map_err(db_err)?;
        } else {
            model.insert(self.db()).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn append_event(&self, event: &NodeEvent) -> NodeResult<()> {
        let model: entity::node_events::ActiveModel = event.into();
        model.insert(self.db()).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_events(&self, node_id: Uuid) -> NodeResult<Vec<NodeEvent>> {
        let models = entity::node_events::Entity::find()
            .filter(entity::node_events::Column::NodeId.eq(node_id))
            .order_by_asc(entity::node_events::Column::CreatedAt)
            .all(self.db())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
