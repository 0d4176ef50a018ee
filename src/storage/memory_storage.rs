use crate::{
    domain::{Board, Contact, ContactId, Pipeline, PipelineId, Tag, TenantId, TicketId},
    error::Result,
    storage::{dataset::Dataset, BoardMutation, Storage, TicketLocation},
};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process storage backend.
///
/// Writers take the lock exclusively and swap in a fully mutated snapshot, so
/// a reader never observes half of a reorder.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<Dataset>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        true
    }

    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.data.write().await.save_pipeline(pipeline);
        Ok(())
    }

    async fn load_pipeline(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
    ) -> Result<Option<Pipeline>> {
        Ok(self.data.read().await.pipeline(tenant_id, id).cloned())
    }

    async fn list_pipelines(&self, tenant_id: &TenantId) -> Result<Vec<Pipeline>> {
        Ok(self.data.read().await.list_pipelines(tenant_id))
    }

    async fn delete_pipeline(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<()> {
        self.data.write().await.remove_pipeline(tenant_id, id)
    }

    async fn load_board(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<Board> {
        self.data.read().await.board(tenant_id, id)
    }

    async fn update_board(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
        mutation: BoardMutation<'_>,
    ) -> Result<Board> {
        self.data.write().await.update_board(tenant_id, id, mutation)
    }

    async fn locate_tickets(&self, ids: &[TicketId]) -> Result<Vec<TicketLocation>> {
        Ok(self.data.read().await.locate(ids))
    }

    async fn upsert_tag(&self, tag: Tag) -> Result<Tag> {
        Ok(self.data.write().await.upsert_tag(tag))
    }

    async fn list_tags(&self, tenant_id: &TenantId) -> Result<Vec<Tag>> {
        Ok(self.data.read().await.list_tags(tenant_id))
    }

    async fn save_contact(&self, contact: &Contact) -> Result<()> {
        self.data.write().await.save_contact(contact);
        Ok(())
    }

    async fn load_contact(&self, tenant_id: &TenantId, id: &ContactId) -> Result<Option<Contact>> {
        Ok(self.data.read().await.contact(tenant_id, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TicketDraft;

    async fn seeded(storage: &MemoryStorage) -> (TenantId, PipelineId) {
        let tenant = TenantId::new("sub_1");
        let pipeline = Pipeline::new(tenant.clone(), "Sales").unwrap();
        storage.save_pipeline(&pipeline).await.unwrap();
        (tenant, pipeline.id)
    }

    #[tokio::test]
    async fn test_pipeline_save_and_load() {
        let storage = MemoryStorage::new();
        let (tenant, id) = seeded(&storage).await;

        let loaded = storage.load_pipeline(&tenant, &id).await.unwrap();
        assert_eq!(loaded.unwrap().name, "Sales");

        let foreign = storage
            .load_pipeline(&TenantId::new("sub_2"), &id)
            .await
            .unwrap();
        assert!(foreign.is_none());
    }

    #[tokio::test]
    async fn test_locate_tickets() {
        let storage = MemoryStorage::new();
        let (tenant, id) = seeded(&storage).await;

        let board = storage
            .update_board(&tenant, &id, &mut |board: &mut Board| -> Result<()> {
                let lane = board.append_lane("New")?;
                board.append_ticket(&lane.id, TicketDraft::named("Deal"))?;
                Ok(())
            })
            .await
            .unwrap();
        let ticket = &board.tickets[0];

        let found = storage
            .locate_tickets(&[ticket.id, TicketId::new()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tenant_id, tenant);
        assert_eq!(found[0].pipeline_id, id);
        assert_eq!(found[0].lane_id, ticket.lane_id);
    }

    #[tokio::test]
    async fn test_delete_pipeline_cascades() {
        let storage = MemoryStorage::new();
        let (tenant, id) = seeded(&storage).await;
        storage
            .update_board(&tenant, &id, &mut |board: &mut Board| -> Result<()> {
                board.append_lane("New").map(|_| ())
            })
            .await
            .unwrap();

        assert!(storage
            .delete_pipeline(&TenantId::new("sub_2"), &id)
            .await
            .is_err());
        storage.delete_pipeline(&tenant, &id).await.unwrap();

        assert!(storage.load_board(&tenant, &id).await.is_err());
        assert!(storage.list_pipelines(&tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contact_scoped_to_tenant() {
        let storage = MemoryStorage::new();
        let contact = Contact::new(TenantId::new("sub_1"), "Ada", "ada@example.com").unwrap();
        storage.save_contact(&contact).await.unwrap();

        let loaded = storage
            .load_contact(&TenantId::new("sub_1"), &contact.id)
            .await
            .unwrap();
        assert_eq!(loaded.map(|c| c.name), Some("Ada".to_string()));
        assert!(storage
            .load_contact(&TenantId::new("sub_2"), &contact.id)
            .await
            .unwrap()
            .is_none());
    }
}
