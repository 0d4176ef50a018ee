//! Order bookkeeping for sibling lanes and tickets.
//!
//! Siblings carry a numeric `order` that must stay *dense*: sorted, the values
//! are exactly `0..n`. Everything in here is pure so the storage backends and
//! the coordinator can share the same checks.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::domain::ids::{LaneId, TicketId};
use crate::domain::pipeline::Lane;
use crate::domain::ticket::Ticket;
use crate::error::{PipelineError, Result};

/// Something positioned among its siblings
pub trait Ordered {
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

impl Ordered for Lane {
    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Ticket {
    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// What to do with a ticket batch that leaves a lane with gaps or duplicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityPolicy {
    /// Fail the batch with a consistency violation
    #[default]
    Reject,
    /// Store the batch as submitted and log a warning
    Trust,
}

/// One entry of a ticket reorder batch: where `ticket_id` ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOrderChange {
    pub ticket_id: TicketId,
    pub lane_id: LaneId,
    pub order: u32,
}

impl TicketOrderChange {
    pub fn new(ticket_id: TicketId, lane_id: LaneId, order: u32) -> Self {
        Self {
            ticket_id,
            lane_id,
            order,
        }
    }
}

/// Returns true when the orders, in any sequence, are exactly `0..n`
pub fn is_dense(orders: impl IntoIterator<Item = u32>) -> bool {
    let mut orders: Vec<u32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order as usize == index)
}

/// Sorts siblings by their current order and rewrites the orders as `0..n`.
///
/// Used after a delete to close the gap. Ties keep their relative input
/// position.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(index as u32);
    }
}

/// Checks that `proposed` is a permutation of `current`: no id invented, none
/// dropped, none repeated.
pub fn check_permutation<T>(current: &[T], proposed: &[T]) -> Result<()>
where
    T: Eq + Hash + Display,
{
    let mut seen = HashSet::with_capacity(proposed.len());
    if let Some(dup) = proposed.iter().find(|id| !seen.insert(*id)) {
        return Err(PipelineError::ConsistencyViolation(format!(
            "{} appears more than once in the submitted order",
            dup
        )));
    }

    let current_set: HashSet<&T> = current.iter().collect();
    if let Some(unknown) = proposed.iter().find(|id| !current_set.contains(id)) {
        return Err(PipelineError::ConsistencyViolation(format!(
            "{} is not part of the current order",
            unknown
        )));
    }

    if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
        return Err(PipelineError::ConsistencyViolation(format!(
            "{} is missing from the submitted order",
            missing
        )));
    }

    Ok(())
}

/// Checks a batch for repeated ticket ids
pub fn check_unique_tickets(changes: &[TicketOrderChange]) -> Result<()> {
    let mut seen = HashSet::with_capacity(changes.len());
    match changes.iter().find(|c| !seen.insert(c.ticket_id)) {
        Some(dup) => Err(PipelineError::ConsistencyViolation(format!(
            "ticket {} appears more than once in the batch",
            dup.ticket_id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::PipelineId;

    fn lanes(orders: &[u32]) -> Vec<Lane> {
        let pipeline = PipelineId::new();
        orders
            .iter()
            .map(|o| Lane::new(pipeline, &format!("Lane {}", o), *o).unwrap())
            .collect()
    }

    #[test]
    fn test_is_dense() {
        assert!(is_dense(Vec::<u32>::new()));
        assert!(is_dense([0]));
        assert!(is_dense([2, 0, 1]));

        assert!(!is_dense([1]));
        assert!(!is_dense([0, 2]));
        assert!(!is_dense([0, 1, 1]));
    }

    #[test]
    fn test_renumber_closes_gaps() {
        let mut items = lanes(&[4, 0, 7]);
        let names: Vec<String> = items.iter().map(|l| l.name.clone()).collect();

        renumber(&mut items);

        assert_eq!(
            items.iter().map(|l| l.order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(items[0].name, names[1]);
        assert_eq!(items[1].name, names[0]);
        assert_eq!(items[2].name, names[2]);
    }

    #[test]
    fn test_permutation_accepts_reordering() {
        let a = LaneId::new();
        let b = LaneId::new();
        let c = LaneId::new();
        assert!(check_permutation(&[a, b, c], &[c, a, b]).is_ok());
        assert!(check_permutation::<LaneId>(&[], &[]).is_ok());
    }

    #[test]
    fn test_permutation_rejects_extra_missing_and_duplicate() {
        let a = LaneId::new();
        let b = LaneId::new();
        let extra = LaneId::new();

        let err = check_permutation(&[a, b], &[a, b, extra]).unwrap_err();
        assert!(err.to_string().contains("not part of"));

        let err = check_permutation(&[a, b], &[a]).unwrap_err();
        assert!(err.to_string().contains("missing"));

        let err = check_permutation(&[a, b], &[a, a]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
        assert!(matches!(err, PipelineError::ConsistencyViolation(_)));
    }

    #[test]
    fn test_unique_tickets() {
        let ticket = TicketId::new();
        let lane = LaneId::new();
        let batch = [
            TicketOrderChange::new(ticket, lane, 0),
            TicketOrderChange::new(ticket, lane, 1),
        ];
        assert!(check_unique_tickets(&batch[..1]).is_ok());
        assert!(check_unique_tickets(&batch).is_err());
    }

    #[test]
    fn test_density_policy_serde() {
        let policy: DensityPolicy = serde_json::from_str("\"trust\"").unwrap();
        assert_eq!(policy, DensityPolicy::Trust);
        assert_eq!(DensityPolicy::default(), DensityPolicy::Reject);
    }
}
