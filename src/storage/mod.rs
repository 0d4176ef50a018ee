use crate::{
    domain::{
        Board, Contact, ContactId, LaneId, Pipeline, PipelineId, Tag, TenantId, TicketId,
    },
    error::Result,
};
use async_trait::async_trait;

mod dataset;
pub mod memory_storage;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory_storage::MemoryStorage;

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;

#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// A change applied to a board snapshot inside a store transaction.
///
/// Returning an error aborts the transaction. The closure may be called more
/// than once if the caller retries after a transient failure.
pub type BoardMutation<'a> = &'a mut (dyn FnMut(&mut Board) -> Result<()> + Send);

/// Where a ticket lives, used to check tenant scope before a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLocation {
    pub ticket_id: TicketId,
    pub tenant_id: TenantId,
    pub pipeline_id: PipelineId,
    pub lane_id: LaneId,
}

/// Storage trait for pipelines and their lane/ticket trees.
///
/// Every read takes the caller's tenant. Records of other tenants are
/// reported exactly like absent ones.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Checks if the backend has been initialized
    async fn is_initialized(&self) -> bool;

    /// Inserts or replaces a pipeline record
    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()>;

    /// Loads a pipeline, `None` when absent or owned by another tenant
    async fn load_pipeline(&self, tenant_id: &TenantId, id: &PipelineId)
        -> Result<Option<Pipeline>>;

    /// Lists a tenant's pipelines, oldest first
    async fn list_pipelines(&self, tenant_id: &TenantId) -> Result<Vec<Pipeline>>;

    /// Deletes a pipeline together with its lanes and tickets
    async fn delete_pipeline(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<()>;

    /// Loads a pipeline with its lanes, tickets, and the tenant's tags and
    /// contacts
    async fn load_board(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<Board>;

    /// Runs `mutation` against a fresh snapshot of the board and commits the
    /// pipeline, lanes and tickets it leaves behind as one atomic write.
    ///
    /// Calls are serialized per backend. Nothing is written when the mutation
    /// or the integrity check fails. Returns the committed board.
    async fn update_board(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
        mutation: BoardMutation<'_>,
    ) -> Result<Board>;

    /// Resolves ticket ids across all tenants. Unknown ids are left out.
    async fn locate_tickets(&self, ids: &[TicketId]) -> Result<Vec<TicketLocation>>;

    /// Stores `tag` unless the tenant already has one with the same name, in
    /// which case the existing tag is returned
    async fn upsert_tag(&self, tag: Tag) -> Result<Tag>;

    /// Lists a tenant's tags by name
    async fn list_tags(&self, tenant_id: &TenantId) -> Result<Vec<Tag>>;

    /// Inserts or replaces a contact record
    async fn save_contact(&self, contact: &Contact) -> Result<()>;

    /// Loads a contact, `None` when absent or owned by another tenant
    async fn load_contact(&self, tenant_id: &TenantId, id: &ContactId)
        -> Result<Option<Contact>>;
}
