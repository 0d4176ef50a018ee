//! Writes to pipeline boards.
//!
//! Every mutation runs as one [`Storage::update_board`] transaction: the
//! board is re-read, validated and changed inside the transaction, and
//! committed all at once or not at all. Activity entries go out only after a
//! commit and never affect its outcome.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    activity::{ActivityEntry, ActivitySink},
    config::CoordinatorConfig,
    domain::{
        ordering, Board, Contact, Identity, Lane, LaneId, Pipeline, PipelineId, Tag, Ticket,
        TicketDraft, TicketId, TicketOrderChange,
    },
    error::{PipelineError, Result},
    storage::{Storage, TicketLocation},
};

pub struct ReorderCoordinator<S: Storage> {
    storage: Arc<S>,
    activity: Arc<dyn ActivitySink>,
    config: CoordinatorConfig,
}

impl<S: Storage> ReorderCoordinator<S> {
    pub fn new(storage: Arc<S>, activity: Arc<dyn ActivitySink>) -> Self {
        Self {
            storage,
            activity,
            config: CoordinatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Persists a new lane order for a pipeline.
    ///
    /// `ordered_lane_ids` must list every lane of the pipeline exactly once;
    /// lane `i` in the list gets `order = i`.
    #[instrument(
        skip(self, identity, ordered_lane_ids),
        fields(tenant_id = %identity.tenant_id, lanes = ordered_lane_ids.len())
    )]
    pub async fn update_lanes_order(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        ordered_lane_ids: &[LaneId],
    ) -> Result<()> {
        self.commit(identity, pipeline_id, |board| {
            board.apply_lane_order(ordered_lane_ids)
        })
        .await
        .map_err(|e| rejected("lane order", e))?;

        info!(%pipeline_id, lanes = ordered_lane_ids.len(), "Updated lane order");
        Ok(())
    }

    /// Persists a ticket reorder batch exactly as the caller computed it.
    ///
    /// The batch must hold the final `(lane, order)` of every ticket whose
    /// position changed, in both the source and the destination lane. Nothing
    /// is shifted here; see [`Board::apply_ticket_changes`] for the checks.
    #[instrument(
        skip(self, identity, changes),
        fields(tenant_id = %identity.tenant_id, changes = changes.len())
    )]
    pub async fn update_tickets_order(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        changes: &[TicketOrderChange],
    ) -> Result<()> {
        if changes.len() > self.config.max_batch_size {
            return Err(rejected(
                "ticket order",
                PipelineError::ConsistencyViolation(format!(
                    "batch of {} changes exceeds the limit of {}",
                    changes.len(),
                    self.config.max_batch_size
                )),
            ));
        }
        ordering::check_unique_tickets(changes).map_err(|e| rejected("ticket order", e))?;
        self.require_pipeline(identity, pipeline_id).await?;

        if changes.is_empty() {
            return Ok(());
        }

        let ids: Vec<TicketId> = changes.iter().map(|c| c.ticket_id).collect();
        let locations = self.storage.locate_tickets(&ids).await?;
        authorize_batch(identity, pipeline_id, &ids, &locations)
            .map_err(|e| rejected("ticket order", e))?;

        let policy = self.config.density_policy;
        let (_, moves) = self
            .commit(identity, pipeline_id, |board| {
                board.apply_ticket_changes(changes, policy)
            })
            .await
            .map_err(|e| rejected("ticket order", e))?;

        info!(
            %pipeline_id,
            changes = changes.len(),
            moved = moves.len(),
            "Updated ticket order"
        );
        self.emit(
            moves
                .into_iter()
                .map(|m| {
                    ActivityEntry::new(
                        identity,
                        format!(
                            "Moved ticket {} from {} to {}",
                            m.ticket_name, m.from_lane, m.to_lane
                        ),
                    )
                    .for_pipeline(*pipeline_id)
                })
                .collect(),
        );
        Ok(())
    }

    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn create_pipeline(&self, identity: &Identity, name: &str) -> Result<Pipeline> {
        let pipeline = Pipeline::new(identity.tenant_id.clone(), name)?;
        self.with_retries(|| self.storage.save_pipeline(&pipeline))
            .await?;

        info!(pipeline_id = %pipeline.id, "Created pipeline");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Created pipeline {}", pipeline.name),
        )
        .for_pipeline(pipeline.id)]);
        Ok(pipeline)
    }

    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn rename_pipeline(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        name: &str,
    ) -> Result<Pipeline> {
        let (board, ()) = self
            .commit(identity, pipeline_id, |board| board.pipeline.rename(name))
            .await?;

        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Renamed pipeline to {}", board.pipeline.name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(board.pipeline)
    }

    /// Deletes a pipeline with all of its lanes and tickets
    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn delete_pipeline(&self, identity: &Identity, pipeline_id: &PipelineId) -> Result<()> {
        let pipeline = self.require_pipeline(identity, pipeline_id).await?;
        self.with_retries(|| self.storage.delete_pipeline(&identity.tenant_id, pipeline_id))
            .await?;

        info!(%pipeline_id, "Deleted pipeline");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Deleted pipeline {}", pipeline.name),
        )]);
        Ok(())
    }

    /// Appends a lane after the pipeline's existing lanes
    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn create_lane(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        name: &str,
    ) -> Result<Lane> {
        let (board, lane) = self
            .commit(identity, pipeline_id, |board| board.append_lane(name))
            .await?;

        info!(%pipeline_id, lane_id = %lane.id, order = lane.order, "Created lane");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Created lane {} in pipeline {}", lane.name, board.pipeline.name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(lane)
    }

    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn rename_lane(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        lane_id: &LaneId,
        name: &str,
    ) -> Result<Lane> {
        let (_, lane) = self
            .commit(identity, pipeline_id, |board| board.rename_lane(lane_id, name))
            .await?;

        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Renamed lane to {}", lane.name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(lane)
    }

    /// Deletes a lane and its tickets, then renumbers the remaining lanes
    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn delete_lane(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        lane_id: &LaneId,
    ) -> Result<()> {
        let (_, (lane, dropped)) = self
            .commit(identity, pipeline_id, |board| board.remove_lane(lane_id))
            .await?;

        info!(%pipeline_id, %lane_id, tickets = dropped, "Deleted lane");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Deleted lane {} and its {} tickets", lane.name, dropped),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(())
    }

    /// Appends a ticket at the end of a lane
    #[instrument(skip(self, identity, draft), fields(tenant_id = %identity.tenant_id))]
    pub async fn create_ticket(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        lane_id: &LaneId,
        draft: TicketDraft,
    ) -> Result<Ticket> {
        let (board, ticket) = self
            .commit(identity, pipeline_id, |board| {
                board.append_ticket(lane_id, draft.clone())
            })
            .await?;

        let lane_name = board.lane(lane_id).map(|l| l.name.clone()).unwrap_or_default();
        info!(%pipeline_id, ticket_id = %ticket.id, order = ticket.order, "Created ticket");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Created ticket {} in lane {}", ticket.name, lane_name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(ticket)
    }

    /// Edits a ticket's name, description, value, tags, customer and
    /// assignee. Its position is left alone.
    #[instrument(skip(self, identity, draft), fields(tenant_id = %identity.tenant_id))]
    pub async fn update_ticket(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        ticket_id: &TicketId,
        draft: TicketDraft,
    ) -> Result<Ticket> {
        let (_, ticket) = self
            .commit(identity, pipeline_id, |board| {
                board.edit_ticket(ticket_id, draft.clone())
            })
            .await?;

        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Updated ticket {}", ticket.name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(ticket)
    }

    /// Deletes a ticket and closes the gap in its lane
    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn delete_ticket(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        ticket_id: &TicketId,
    ) -> Result<()> {
        let (_, ticket) = self
            .commit(identity, pipeline_id, |board| board.remove_ticket(ticket_id))
            .await?;

        info!(%pipeline_id, %ticket_id, "Deleted ticket");
        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Deleted ticket {}", ticket.name),
        )
        .for_pipeline(*pipeline_id)]);
        Ok(())
    }

    /// Returns the tenant's tag with this name, creating it when missing
    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn upsert_tag(
        &self,
        identity: &Identity,
        name: &str,
        color: Option<&str>,
    ) -> Result<Tag> {
        let tag = Tag::new(identity.tenant_id.clone(), name, color)?;
        let stored = self
            .with_retries(|| self.storage.upsert_tag(tag.clone()))
            .await?;

        if stored.id == tag.id {
            self.emit(vec![ActivityEntry::new(
                identity,
                format!("Created tag {}", stored.name),
            )]);
        }
        Ok(stored)
    }

    #[instrument(skip(self, identity), fields(tenant_id = %identity.tenant_id))]
    pub async fn create_contact(
        &self,
        identity: &Identity,
        name: &str,
        email: &str,
    ) -> Result<Contact> {
        let contact = Contact::new(identity.tenant_id.clone(), name, email)?;
        self.with_retries(|| self.storage.save_contact(&contact))
            .await?;

        self.emit(vec![ActivityEntry::new(
            identity,
            format!("Created contact {}", contact.name),
        )]);
        Ok(contact)
    }

    async fn require_pipeline(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
    ) -> Result<Pipeline> {
        self.storage
            .load_pipeline(&identity.tenant_id, pipeline_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("pipeline {}", pipeline_id)))
    }

    /// Runs `mutation` in a board transaction, re-running the whole
    /// transaction after transient store failures
    async fn commit<T, F>(
        &self,
        identity: &Identity,
        pipeline_id: &PipelineId,
        mut mutation: F,
    ) -> Result<(Board, T)>
    where
        T: Send,
        F: FnMut(&mut Board) -> Result<T> + Send,
    {
        let mut attempt = 0;
        loop {
            let mut output = None;
            let result = self
                .storage
                .update_board(
                    &identity.tenant_id,
                    pipeline_id,
                    &mut |board: &mut Board| -> Result<()> {
                        output = Some(mutation(board)?);
                        Ok(())
                    },
                )
                .await;

            match result {
                Ok(board) => {
                    return output.map(|value| (board, value)).ok_or_else(|| {
                        PipelineError::TransientStoreFailure(
                            "store committed without running the mutation".to_string(),
                        )
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.config.transient_retries => {
                    attempt += 1;
                    warn!(%pipeline_id, attempt, error = %e, "Retrying board transaction");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.config.transient_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Retrying store operation");
                }
                result => return result,
            }
        }
    }

    /// Hands entries to the activity sink on a background task
    fn emit(&self, entries: Vec<ActivityEntry>) {
        if !self.config.activity_log || entries.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(entries = entries.len(), "No runtime to record activity on");
            return;
        };

        let sink = Arc::clone(&self.activity);
        handle.spawn(async move {
            for entry in entries {
                if let Err(e) = sink.record(entry).await {
                    warn!(error = %e, "Failed to record activity");
                }
            }
        });
    }
}

/// Classifies the tickets of a batch against the caller and the pipeline.
///
/// Another tenant's ticket anywhere in the batch wins over every other
/// problem, so the caller learns nothing about which of the ids exist.
fn authorize_batch(
    identity: &Identity,
    pipeline_id: &PipelineId,
    ids: &[TicketId],
    locations: &[TicketLocation],
) -> Result<()> {
    let by_ticket: HashMap<&TicketId, &TicketLocation> =
        locations.iter().map(|l| (&l.ticket_id, l)).collect();

    if let Some(foreign) = locations
        .iter()
        .find(|l| l.tenant_id != identity.tenant_id)
    {
        return Err(PipelineError::AuthorizationViolation(format!(
            "ticket {} is outside the caller's tenant",
            foreign.ticket_id
        )));
    }
    if let Some(missing) = ids.iter().find(|id| !by_ticket.contains_key(id)) {
        return Err(PipelineError::NotFound(format!("ticket {}", missing)));
    }
    if let Some(elsewhere) = locations.iter().find(|l| &l.pipeline_id != pipeline_id) {
        return Err(PipelineError::ConsistencyViolation(format!(
            "ticket {} belongs to pipeline {}",
            elsewhere.ticket_id, elsewhere.pipeline_id
        )));
    }
    Ok(())
}

/// Logs refusals the client has to resolve by refetching
fn rejected(what: &str, err: PipelineError) -> PipelineError {
    if err.requires_refresh() {
        warn!(error = %err, "Rejected {} update", what);
    }
    err
}
