use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    domain::{
        Board, Contact, ContactId, Lane, LaneId, Pipeline, PipelineId, Tag, TenantId, Ticket,
        TicketId,
    },
    error::{PipelineError, Result},
    storage::{BoardMutation, TicketLocation},
};

/// The whole record set of the document-style backends.
///
/// The memory backend keeps one of these for everything; the file backend
/// keeps one per tenant document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Dataset {
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Dataset {
    pub fn pipeline(&self, tenant_id: &TenantId, id: &PipelineId) -> Option<&Pipeline> {
        self.pipelines
            .iter()
            .find(|p| &p.id == id && p.is_owned_by(tenant_id))
    }

    pub fn save_pipeline(&mut self, pipeline: &Pipeline) {
        match self.pipelines.iter_mut().find(|p| p.id == pipeline.id) {
            Some(existing) => *existing = pipeline.clone(),
            None => self.pipelines.push(pipeline.clone()),
        }
    }

    pub fn list_pipelines(&self, tenant_id: &TenantId) -> Vec<Pipeline> {
        let mut pipelines: Vec<Pipeline> = self
            .pipelines
            .iter()
            .filter(|p| p.is_owned_by(tenant_id))
            .cloned()
            .collect();
        pipelines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        pipelines
    }

    pub fn remove_pipeline(&mut self, tenant_id: &TenantId, id: &PipelineId) -> Result<()> {
        if self.pipeline(tenant_id, id).is_none() {
            return Err(PipelineError::NotFound(format!("pipeline {}", id)));
        }
        self.detach_board(id);
        self.pipelines.retain(|p| &p.id != id);
        Ok(())
    }

    pub fn board(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<Board> {
        let pipeline = self
            .pipeline(tenant_id, id)
            .ok_or_else(|| PipelineError::NotFound(format!("pipeline {}", id)))?;

        let lanes: Vec<Lane> = self
            .lanes
            .iter()
            .filter(|l| &l.pipeline_id == id)
            .cloned()
            .collect();
        let lane_ids: HashSet<&LaneId> = lanes.iter().map(|l| &l.id).collect();
        let tickets = self
            .tickets
            .iter()
            .filter(|t| lane_ids.contains(&t.lane_id))
            .cloned()
            .collect();

        Ok(Board {
            pipeline: pipeline.clone(),
            lanes,
            tickets,
            tags: self.list_tags(tenant_id),
            contacts: self
                .contacts
                .iter()
                .filter(|c| &c.tenant_id == tenant_id)
                .cloned()
                .collect(),
        })
    }

    /// Applies `mutation` to a snapshot and swaps the result in. The dataset
    /// is untouched unless the whole mutation succeeds.
    pub fn update_board(
        &mut self,
        tenant_id: &TenantId,
        id: &PipelineId,
        mutation: BoardMutation<'_>,
    ) -> Result<Board> {
        let mut board = self.board(tenant_id, id)?;
        let expected = board.pipeline.clone();

        mutation(&mut board)?;
        board.check_integrity(&expected)?;

        self.detach_board(id);
        self.save_pipeline(&board.pipeline);
        self.lanes.extend(board.lanes.iter().cloned());
        self.tickets.extend(board.tickets.iter().cloned());
        Ok(board)
    }

    pub fn locate(&self, ids: &[TicketId]) -> Vec<TicketLocation> {
        ids.iter()
            .filter_map(|id| {
                let ticket = self.tickets.iter().find(|t| &t.id == id)?;
                let lane = self.lanes.iter().find(|l| l.id == ticket.lane_id)?;
                let pipeline = self.pipelines.iter().find(|p| p.id == lane.pipeline_id)?;
                Some(TicketLocation {
                    ticket_id: ticket.id,
                    tenant_id: pipeline.tenant_id.clone(),
                    pipeline_id: pipeline.id,
                    lane_id: lane.id,
                })
            })
            .collect()
    }

    pub fn upsert_tag(&mut self, tag: Tag) -> Tag {
        if let Some(existing) = self
            .tags
            .iter()
            .find(|t| t.tenant_id == tag.tenant_id && t.has_name(&tag.name))
        {
            return existing.clone();
        }
        self.tags.push(tag.clone());
        tag
    }

    pub fn list_tags(&self, tenant_id: &TenantId) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .filter(|t| &t.tenant_id == tenant_id)
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.name.to_lowercase());
        tags
    }

    pub fn save_contact(&mut self, contact: &Contact) {
        match self.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(existing) => *existing = contact.clone(),
            None => self.contacts.push(contact.clone()),
        }
    }

    pub fn contact(&self, tenant_id: &TenantId, id: &ContactId) -> Option<Contact> {
        self.contacts
            .iter()
            .find(|c| &c.id == id && &c.tenant_id == tenant_id)
            .cloned()
    }

    /// Drops the lanes and tickets of a pipeline, keeping the pipeline record
    fn detach_board(&mut self, id: &PipelineId) {
        let lane_ids: HashSet<LaneId> = self
            .lanes
            .iter()
            .filter(|l| &l.pipeline_id == id)
            .map(|l| l.id)
            .collect();
        self.tickets.retain(|t| !lane_ids.contains(&t.lane_id));
        self.lanes.retain(|l| &l.pipeline_id != id);
    }
}
