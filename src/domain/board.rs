use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::ids::{LaneId, TagId, TicketId};
use crate::domain::ordering::{self, DensityPolicy, TicketOrderChange};
use crate::domain::pipeline::{Lane, Pipeline};
use crate::domain::tag::{Contact, ContactSummary, Tag};
use crate::domain::ticket::{Ticket, TicketDraft};
use crate::error::{PipelineError, Result};

/// A ticket together with the display data it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactSummary>,
}

/// A lane with its tickets in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneDetail {
    #[serde(flatten)]
    pub lane: Lane,
    pub tickets: Vec<TicketDetail>,
}

/// A ticket that changed lanes in a reorder batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketMove {
    pub ticket_id: TicketId,
    pub ticket_name: String,
    pub from_lane: String,
    pub to_lane: String,
}

/// Snapshot of one pipeline: its lanes and tickets plus the tenant's tags and
/// the contacts its tickets reference.
///
/// Storage backends hand a `Board` to mutations and persist `lanes` and
/// `tickets` back atomically. `tags` and `contacts` are read-only context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub pipeline: Pipeline,
    pub lanes: Vec<Lane>,
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Board {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            lanes: Vec::new(),
            tickets: Vec::new(),
            tags: Vec::new(),
            contacts: Vec::new(),
        }
    }

    pub fn lane(&self, id: &LaneId) -> Option<&Lane> {
        self.lanes.iter().find(|l| &l.id == id)
    }

    pub fn ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|t| &t.id == id)
    }

    /// Lane ids in their current order
    pub fn lane_ids(&self) -> Vec<LaneId> {
        let mut lanes: Vec<&Lane> = self.lanes.iter().collect();
        lanes.sort_by_key(|l| (l.order, l.created_at));
        lanes.into_iter().map(|l| l.id).collect()
    }

    /// Tickets of a lane in their current order
    pub fn tickets_in_lane(&self, lane_id: &LaneId) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self
            .tickets
            .iter()
            .filter(|t| &t.lane_id == lane_id)
            .collect();
        tickets.sort_by_key(|t| (t.order, t.created_at));
        tickets
    }

    /// Appends a lane after the existing ones
    pub fn append_lane(&mut self, name: &str) -> Result<Lane> {
        let order = next_order(self.lanes.iter().map(|l| l.order));
        let lane = Lane::new(self.pipeline.id, name, order)?;
        self.lanes.push(lane.clone());
        Ok(lane)
    }

    pub fn rename_lane(&mut self, id: &LaneId, name: &str) -> Result<Lane> {
        let lane = self
            .lanes
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("lane {}", id)))?;
        lane.rename(name)?;
        Ok(lane.clone())
    }

    /// Removes a lane with all its tickets and closes the gap it leaves
    pub fn remove_lane(&mut self, id: &LaneId) -> Result<(Lane, usize)> {
        let index = self
            .lanes
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("lane {}", id)))?;
        let lane = self.lanes.remove(index);

        let before = self.tickets.len();
        self.tickets.retain(|t| &t.lane_id != id);
        ordering::renumber(&mut self.lanes);

        Ok((lane, before - self.tickets.len()))
    }

    /// Appends a ticket at the end of `lane_id`
    pub fn append_ticket(&mut self, lane_id: &LaneId, draft: TicketDraft) -> Result<Ticket> {
        if self.lane(lane_id).is_none() {
            return Err(PipelineError::NotFound(format!("lane {}", lane_id)));
        }
        self.check_references(&draft)?;

        let order = next_order(
            self.tickets
                .iter()
                .filter(|t| &t.lane_id == lane_id)
                .map(|t| t.order),
        );
        let ticket = Ticket::new(*lane_id, order, draft)?;
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    /// Edits a ticket's fields in place; its position never changes
    pub fn edit_ticket(&mut self, id: &TicketId, draft: TicketDraft) -> Result<Ticket> {
        self.check_references(&draft)?;
        let ticket = self
            .tickets
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("ticket {}", id)))?;
        ticket.apply_draft(draft)?;
        Ok(ticket.clone())
    }

    /// Removes a ticket and renumbers the rest of its lane
    pub fn remove_ticket(&mut self, id: &TicketId) -> Result<Ticket> {
        let index = self
            .tickets
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("ticket {}", id)))?;
        let ticket = self.tickets.remove(index);
        self.renumber_lane(&ticket.lane_id);
        Ok(ticket)
    }

    /// Assigns `order = index` to every lane, given the full lane set in its
    /// new order
    pub fn apply_lane_order(&mut self, ordered: &[LaneId]) -> Result<()> {
        ordering::check_permutation(&self.lane_ids(), ordered)?;

        let positions: HashMap<&LaneId, u32> = ordered
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index as u32))
            .collect();
        for lane in &mut self.lanes {
            if let Some(order) = positions.get(&lane.id) {
                if lane.order != *order {
                    lane.order = *order;
                    lane.updated_at = chrono::Utc::now();
                }
            }
        }
        Ok(())
    }

    /// Applies a ticket reorder batch as the caller computed it.
    ///
    /// Nothing is shifted implicitly. Every lane the batch touches (as source
    /// or destination) is checked for density afterwards and handled according
    /// to `policy`. On error the board is left unchanged.
    pub fn apply_ticket_changes(
        &mut self,
        changes: &[TicketOrderChange],
        policy: DensityPolicy,
    ) -> Result<Vec<TicketMove>> {
        ordering::check_unique_tickets(changes)?;

        let mut tickets = self.tickets.clone();
        let mut affected: HashSet<LaneId> = HashSet::new();
        let mut moves = Vec::new();

        for change in changes {
            let to_lane = self.lane(&change.lane_id).ok_or_else(|| {
                PipelineError::ConsistencyViolation(format!(
                    "lane {} is not part of pipeline {}",
                    change.lane_id, self.pipeline.id
                ))
            })?;
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == change.ticket_id)
                .ok_or_else(|| {
                    PipelineError::ConsistencyViolation(format!(
                        "ticket {} is no longer on pipeline {}",
                        change.ticket_id, self.pipeline.id
                    ))
                })?;

            if ticket.lane_id != change.lane_id {
                let from_lane = self
                    .lane(&ticket.lane_id)
                    .map(|l| l.name.clone())
                    .unwrap_or_default();
                moves.push(TicketMove {
                    ticket_id: ticket.id,
                    ticket_name: ticket.name.clone(),
                    from_lane,
                    to_lane: to_lane.name.clone(),
                });
            }

            affected.insert(ticket.lane_id);
            affected.insert(change.lane_id);
            ticket.move_to(change.lane_id, change.order);
        }

        for lane_id in &affected {
            let orders = tickets
                .iter()
                .filter(|t| &t.lane_id == lane_id)
                .map(|t| t.order);
            if ordering::is_dense(orders) {
                continue;
            }
            match policy {
                DensityPolicy::Reject => {
                    return Err(PipelineError::ConsistencyViolation(format!(
                        "ticket orders in lane {} would not be contiguous from 0",
                        lane_id
                    )));
                }
                DensityPolicy::Trust => {
                    tracing::warn!(
                        pipeline_id = %self.pipeline.id,
                        lane_id = %lane_id,
                        "Storing non-contiguous ticket orders as submitted"
                    );
                }
            }
        }

        self.tickets = tickets;
        Ok(moves)
    }

    /// The lane/ticket tree in display order, with tags and customers resolved
    pub fn details(&self) -> Vec<LaneDetail> {
        let tags: HashMap<&TagId, &Tag> = self.tags.iter().map(|t| (&t.id, t)).collect();

        self.lane_ids()
            .iter()
            .filter_map(|id| self.lane(id))
            .map(|lane| LaneDetail {
                lane: lane.clone(),
                tickets: self
                    .tickets_in_lane(&lane.id)
                    .into_iter()
                    .map(|ticket| TicketDetail {
                        ticket: ticket.clone(),
                        tags: ticket
                            .tag_ids
                            .iter()
                            .filter_map(|id| tags.get(id).map(|t| (*t).clone()))
                            .collect(),
                        customer: ticket.customer_id.and_then(|id| {
                            self.contacts
                                .iter()
                                .find(|c| c.id == id)
                                .map(Contact::summary)
                        }),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Checks what every committed board must satisfy: the pipeline identity
    /// is unchanged, every lane belongs to the pipeline, every ticket sits in
    /// one of its lanes and lane orders are dense.
    pub fn check_integrity(&self, expected: &Pipeline) -> Result<()> {
        if self.pipeline.id != expected.id || self.pipeline.tenant_id != expected.tenant_id {
            return Err(PipelineError::ConsistencyViolation(format!(
                "board no longer describes pipeline {}",
                expected.id
            )));
        }
        if let Some(lane) = self.lanes.iter().find(|l| l.pipeline_id != expected.id) {
            return Err(PipelineError::ConsistencyViolation(format!(
                "lane {} belongs to another pipeline",
                lane.id
            )));
        }
        let lane_ids: HashSet<&LaneId> = self.lanes.iter().map(|l| &l.id).collect();
        if lane_ids.len() != self.lanes.len() {
            return Err(PipelineError::ConsistencyViolation(
                "duplicate lane id on board".to_string(),
            ));
        }
        if let Some(ticket) = self.tickets.iter().find(|t| !lane_ids.contains(&t.lane_id)) {
            return Err(PipelineError::ConsistencyViolation(format!(
                "ticket {} references a lane outside pipeline {}",
                ticket.id, expected.id
            )));
        }
        if !ordering::is_dense(self.lanes.iter().map(|l| l.order)) {
            return Err(PipelineError::ConsistencyViolation(format!(
                "lane orders of pipeline {} are not contiguous from 0",
                expected.id
            )));
        }
        Ok(())
    }

    fn renumber_lane(&mut self, lane_id: &LaneId) {
        let mut siblings: Vec<&mut Ticket> = self
            .tickets
            .iter_mut()
            .filter(|t| &t.lane_id == lane_id)
            .collect();
        siblings.sort_by_key(|t| t.order);
        for (index, ticket) in siblings.into_iter().enumerate() {
            ticket.order = index as u32;
        }
    }

    /// Tags and customers must belong to the pipeline's tenant. Anything else
    /// is reported as absent.
    fn check_references(&self, draft: &TicketDraft) -> Result<()> {
        let tenant = &self.pipeline.tenant_id;
        for tag_id in &draft.tag_ids {
            if !self.tags.iter().any(|t| &t.id == tag_id && &t.tenant_id == tenant) {
                return Err(PipelineError::NotFound(format!("tag {}", tag_id)));
            }
        }
        if let Some(customer_id) = &draft.customer_id {
            if !self
                .contacts
                .iter()
                .any(|c| &c.id == customer_id && &c.tenant_id == tenant)
            {
                return Err(PipelineError::NotFound(format!("contact {}", customer_id)));
            }
        }
        Ok(())
    }
}

/// One past the highest order, so appends land last even when a trusted
/// batch left gaps
fn next_order(orders: impl Iterator<Item = u32>) -> u32 {
    orders.max().map_or(0, |max| max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::TenantId;
    use crate::domain::money::Money;

    fn board_with_lanes(names: &[&str]) -> Board {
        let pipeline = Pipeline::new(TenantId::new("sub_1"), "Sales").unwrap();
        let mut board = Board::new(pipeline);
        for name in names {
            board.append_lane(name).unwrap();
        }
        board
    }

    fn ticket_names(board: &Board, lane: &LaneId) -> Vec<String> {
        board
            .tickets_in_lane(lane)
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    #[test]
    fn test_append_lane_and_ticket_orders() {
        let mut board = board_with_lanes(&["New", "Won"]);
        let lanes = board.lane_ids();
        assert_eq!(board.lane(&lanes[1]).unwrap().order, 1);

        let first = board.append_ticket(&lanes[0], TicketDraft::named("A")).unwrap();
        let second = board.append_ticket(&lanes[0], TicketDraft::named("B")).unwrap();
        let other = board.append_ticket(&lanes[1], TicketDraft::named("C")).unwrap();

        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);
        assert_eq!(other.order, 0);
    }

    #[test]
    fn test_append_ticket_unknown_lane() {
        let mut board = board_with_lanes(&["New"]);
        let result = board.append_ticket(&LaneId::new(), TicketDraft::named("A"));
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[test]
    fn test_append_ticket_rejects_foreign_tag() {
        let mut board = board_with_lanes(&["New"]);
        let lane = board.lane_ids()[0];
        let foreign = Tag::new(TenantId::new("sub_2"), "Hot", None).unwrap();
        let foreign_id = foreign.id;
        board.tags.push(foreign);

        let draft = TicketDraft::named("A").with_tags(vec![foreign_id]);
        assert!(matches!(
            board.append_ticket(&lane, draft),
            Err(PipelineError::NotFound(_))
        ));
        assert!(board.tickets.is_empty());
    }

    #[test]
    fn test_remove_lane_renumbers_and_drops_tickets() {
        let mut board = board_with_lanes(&["New", "Contacted", "Won"]);
        let lanes = board.lane_ids();
        board.append_ticket(&lanes[1], TicketDraft::named("A")).unwrap();
        board.append_ticket(&lanes[2], TicketDraft::named("B")).unwrap();

        let (removed, dropped) = board.remove_lane(&lanes[1]).unwrap();
        assert_eq!(removed.name, "Contacted");
        assert_eq!(dropped, 1);
        assert_eq!(board.lane_ids(), vec![lanes[0], lanes[2]]);
        assert_eq!(board.lane(&lanes[2]).unwrap().order, 1);
        assert_eq!(board.tickets.len(), 1);
    }

    #[test]
    fn test_remove_ticket_closes_gap() {
        let mut board = board_with_lanes(&["New"]);
        let lane = board.lane_ids()[0];
        let a = board.append_ticket(&lane, TicketDraft::named("A")).unwrap();
        board.append_ticket(&lane, TicketDraft::named("B")).unwrap();
        board.append_ticket(&lane, TicketDraft::named("C")).unwrap();

        board.remove_ticket(&a.id).unwrap();

        let orders: Vec<u32> = board.tickets_in_lane(&lane).iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(ticket_names(&board, &lane), vec!["B", "C"]);
    }

    #[test]
    fn test_apply_lane_order() {
        let mut board = board_with_lanes(&["A", "B", "C"]);
        let lanes = board.lane_ids();
        let reordered = vec![lanes[2], lanes[0], lanes[1]];

        board.apply_lane_order(&reordered).unwrap();
        assert_eq!(board.lane_ids(), reordered);
        assert_eq!(board.lane(&lanes[2]).unwrap().order, 0);
    }

    #[test]
    fn test_apply_lane_order_rejects_missing_lane() {
        let mut board = board_with_lanes(&["A", "B"]);
        let lanes = board.lane_ids();
        let snapshot = board.clone();

        let err = board.apply_lane_order(&lanes[..1]).unwrap_err();
        assert!(matches!(err, PipelineError::ConsistencyViolation(_)));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn test_ticket_move_between_lanes() {
        let mut board = board_with_lanes(&["A", "B"]);
        let lanes = board.lane_ids();
        let a: Vec<Ticket> = ["a0", "a1", "a2"]
            .iter()
            .map(|n| board.append_ticket(&lanes[0], TicketDraft::named(*n)).unwrap())
            .collect();
        let b: Vec<Ticket> = ["b0", "b1"]
            .iter()
            .map(|n| board.append_ticket(&lanes[1], TicketDraft::named(*n)).unwrap())
            .collect();

        // a1 moves to lane B at position 1
        let batch = vec![
            TicketOrderChange::new(a[0].id, lanes[0], 0),
            TicketOrderChange::new(a[2].id, lanes[0], 1),
            TicketOrderChange::new(b[0].id, lanes[1], 0),
            TicketOrderChange::new(a[1].id, lanes[1], 1),
            TicketOrderChange::new(b[1].id, lanes[1], 2),
        ];
        let moves = board
            .apply_ticket_changes(&batch, DensityPolicy::Reject)
            .unwrap();

        assert_eq!(ticket_names(&board, &lanes[0]), vec!["a0", "a2"]);
        assert_eq!(ticket_names(&board, &lanes[1]), vec!["b0", "a1", "b1"]);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].ticket_id, a[1].id);
        assert_eq!(moves[0].from_lane, "A");
        assert_eq!(moves[0].to_lane, "B");
    }

    #[test]
    fn test_ticket_batch_with_gap_rejected() {
        let mut board = board_with_lanes(&["A", "B"]);
        let lanes = board.lane_ids();
        let a0 = board.append_ticket(&lanes[0], TicketDraft::named("a0")).unwrap();
        board.append_ticket(&lanes[0], TicketDraft::named("a1")).unwrap();
        let snapshot = board.clone();

        // Only the dragged ticket is submitted, leaving lane A as [1]
        let batch = vec![TicketOrderChange::new(a0.id, lanes[1], 0)];
        let err = board
            .apply_ticket_changes(&batch, DensityPolicy::Reject)
            .unwrap_err();

        assert!(matches!(err, PipelineError::ConsistencyViolation(_)));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn test_ticket_batch_with_gap_trusted() {
        let mut board = board_with_lanes(&["A", "B"]);
        let lanes = board.lane_ids();
        let a0 = board.append_ticket(&lanes[0], TicketDraft::named("a0")).unwrap();
        board.append_ticket(&lanes[0], TicketDraft::named("a1")).unwrap();

        let batch = vec![TicketOrderChange::new(a0.id, lanes[1], 0)];
        board
            .apply_ticket_changes(&batch, DensityPolicy::Trust)
            .unwrap();

        assert_eq!(board.ticket(&a0.id).unwrap().lane_id, lanes[1]);
        assert_eq!(board.tickets_in_lane(&lanes[0])[0].order, 1);

        let a2 = board.append_ticket(&lanes[0], TicketDraft::named("a2")).unwrap();
        assert_eq!(a2.order, 2);
        let orders: Vec<u32> = board
            .tickets_in_lane(&lanes[0])
            .iter()
            .map(|t| t.order)
            .collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_ticket_batch_unknown_lane() {
        let mut board = board_with_lanes(&["A"]);
        let lane = board.lane_ids()[0];
        let t = board.append_ticket(&lane, TicketDraft::named("t")).unwrap();

        let batch = vec![TicketOrderChange::new(t.id, LaneId::new(), 0)];
        assert!(matches!(
            board.apply_ticket_changes(&batch, DensityPolicy::Reject),
            Err(PipelineError::ConsistencyViolation(_))
        ));
    }

    #[test]
    fn test_integrity_rejects_foreign_lane_and_orphan_ticket() {
        let mut board = board_with_lanes(&["A"]);
        let expected = board.pipeline.clone();
        assert!(board.check_integrity(&expected).is_ok());

        let mut orphaned = board.clone();
        orphaned
            .tickets
            .push(Ticket::new(LaneId::new(), 0, TicketDraft::named("stray")).unwrap());
        assert!(orphaned.check_integrity(&expected).is_err());

        board
            .lanes
            .push(Lane::new(crate::domain::ids::PipelineId::new(), "Other", 1).unwrap());
        assert!(board.check_integrity(&expected).is_err());
    }

    #[test]
    fn test_details_resolve_tags_and_customer() {
        let mut board = board_with_lanes(&["B", "A"]);
        let lanes = board.lane_ids();
        board.apply_lane_order(&[lanes[1], lanes[0]]).unwrap();

        let tag = Tag::new(TenantId::new("sub_1"), "Hot", None).unwrap();
        let contact = Contact::new(TenantId::new("sub_1"), "Ada", "ada@example.com").unwrap();
        let (tag_id, contact_id) = (tag.id, contact.id);
        board.tags.push(tag);
        board.contacts.push(contact);

        let draft = TicketDraft::named("Deal")
            .with_value(Money::from_cents(500))
            .with_tags(vec![tag_id])
            .with_customer(contact_id);
        board.append_ticket(&lanes[0], draft).unwrap();

        let details = board.details();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].lane.name, "A");
        assert!(details[0].tickets.is_empty());

        let ticket = &details[1].tickets[0];
        assert_eq!(ticket.tags.len(), 1);
        assert_eq!(ticket.tags[0].name, "Hot");
        assert_eq!(ticket.customer.as_ref().unwrap().name, "Ada");
    }
}
