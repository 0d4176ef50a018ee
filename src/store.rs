use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{Identity, LaneDetail, Pipeline, PipelineId},
    error::{PipelineError, Result},
    storage::Storage,
};

/// Tenant-scoped read access to pipelines and their lane/ticket trees
pub struct PipelineStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for PipelineStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> PipelineStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Fetches one pipeline. Another tenant's pipeline is `NotFound`.
    pub async fn get_pipeline_details(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
    ) -> Result<Pipeline> {
        debug!(tenant_id = %identity.tenant_id, %pipeline_id, "Loading pipeline");
        self.storage
            .load_pipeline(&identity.tenant_id, pipeline_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("pipeline {}", pipeline_id)))
    }

    /// The caller's pipelines, oldest first
    pub async fn list_pipelines(&self, identity: &Identity) -> Result<Vec<Pipeline>> {
        self.storage.list_pipelines(&identity.tenant_id).await
    }

    /// Lanes ascending by order, each with its tickets ascending by order and
    /// the tickets' tags and customer resolved
    pub async fn get_lanes_with_tickets_and_tags(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
    ) -> Result<Vec<LaneDetail>> {
        let board = self
            .storage
            .load_board(&identity.tenant_id, pipeline_id)
            .await?;
        debug!(
            %pipeline_id,
            lanes = board.lanes.len(),
            tickets = board.tickets.len(),
            "Loaded pipeline board"
        );
        Ok(board.details())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Board, TicketDraft};
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_foreign_pipeline_is_not_found() {
        let storage = Arc::new(MemoryStorage::new());
        let owner = Identity::new("user_a", "sub_1");
        let pipeline = Pipeline::new(owner.tenant_id.clone(), "Sales").unwrap();
        storage.save_pipeline(&pipeline).await.unwrap();

        let store = PipelineStore::new(storage);
        let intruder = Identity::new("user_b", "sub_2");

        assert!(store.get_pipeline_details(&owner, &pipeline.id).await.is_ok());
        assert!(matches!(
            store.get_pipeline_details(&intruder, &pipeline.id).await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            store
                .get_lanes_with_tickets_and_tags(&intruder, &pipeline.id)
                .await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(store.list_pipelines(&intruder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lanes_and_tickets_sorted() {
        let storage = Arc::new(MemoryStorage::new());
        let owner = Identity::new("user_a", "sub_1");
        let pipeline = Pipeline::new(owner.tenant_id.clone(), "Sales").unwrap();
        storage.save_pipeline(&pipeline).await.unwrap();

        storage
            .update_board(&owner.tenant_id, &pipeline.id, &mut |board: &mut Board| -> Result<()> {
                let first = board.append_lane("First")?;
                let second = board.append_lane("Second")?;
                board.append_ticket(&first.id, TicketDraft::named("a"))?;
                board.append_ticket(&first.id, TicketDraft::named("b"))?;
                board.apply_lane_order(&[second.id, first.id])
            })
            .await
            .unwrap();

        let lanes = PipelineStore::new(storage)
            .get_lanes_with_tickets_and_tags(&owner, &pipeline.id)
            .await
            .unwrap();

        assert_eq!(lanes[0].lane.name, "Second");
        assert_eq!(lanes[1].lane.name, "First");
        let names: Vec<&str> = lanes[1]
            .tickets
            .iter()
            .map(|t| t.ticket.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
