//! Read-side projection of a pipeline into the lane-column view.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{Identity, Lane, LaneDetail, Money, PipelineId, TicketDetail},
    error::Result,
    storage::Storage,
    store::PipelineStore,
};

/// One lane column with its tickets in order and their summed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneView {
    pub lane: Lane,
    pub tickets: Vec<TicketDetail>,
    pub total_value: Money,
    pub ticket_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub lanes: Vec<LaneView>,
    pub pipeline_total: Money,
}

impl BoardView {
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn ticket_count(&self) -> usize {
        self.lanes.iter().map(|l| l.ticket_count).sum()
    }
}

/// Builds the column view from a lane/ticket tree.
///
/// Lanes and tickets are sorted by `order`. Equal orders keep their input
/// order, so a tree stored under a trusting density policy still renders
/// deterministically. Tickets without a value count as zero.
pub fn project_board(lanes: &[LaneDetail]) -> BoardView {
    let mut lanes: Vec<&LaneDetail> = lanes.iter().collect();
    lanes.sort_by_key(|detail| detail.lane.order);

    let lanes: Vec<LaneView> = lanes
        .into_iter()
        .map(|detail| {
            let mut tickets = detail.tickets.clone();
            tickets.sort_by_key(|t| t.ticket.order);
            let total_value = tickets.iter().map(|t| t.ticket.value_or_zero()).sum();
            LaneView {
                lane: detail.lane.clone(),
                ticket_count: tickets.len(),
                tickets,
                total_value,
            }
        })
        .collect();

    let pipeline_total = lanes.iter().map(|l| l.total_value).sum();
    BoardView {
        lanes,
        pipeline_total,
    }
}

/// Loads and projects boards on behalf of a caller
pub struct ViewProjector<S: Storage> {
    store: PipelineStore<S>,
}

impl<S: Storage> ViewProjector<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            store: PipelineStore::new(storage),
        }
    }

    pub async fn load(&self, identity: &Identity, pipeline_id: &PipelineId) -> Result<BoardView> {
        let lanes = self
            .store
            .get_lanes_with_tickets_and_tags(identity, pipeline_id)
            .await?;
        Ok(project_board(&lanes))
    }
}
