use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ContactId, LaneId, TagId, TicketId, UserId};
use crate::domain::money::Money;
use crate::domain::pipeline::validate_name;
use crate::error::Result;

/// Editable fields of a ticket, as submitted by the ticket form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Money>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
}

impl TicketDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: Money) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<TagId>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn with_customer(mut self, customer_id: ContactId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

/// A sales card within a lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub lane_id: LaneId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Money>,
    pub order: u32,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a ticket at `order` within `lane_id` from a draft
    pub fn new(lane_id: LaneId, order: u32, draft: TicketDraft) -> Result<Self> {
        let now = Utc::now();
        let mut ticket = Self {
            id: TicketId::new(),
            lane_id,
            name: String::new(),
            description: None,
            value: None,
            order,
            tag_ids: Vec::new(),
            customer_id: None,
            assigned_user_id: None,
            created_at: now,
            updated_at: now,
        };
        ticket.apply_draft(draft)?;
        ticket.updated_at = now;
        Ok(ticket)
    }

    /// Replaces the editable fields. Position (`lane_id`, `order`) is untouched.
    pub fn apply_draft(&mut self, draft: TicketDraft) -> Result<()> {
        self.name = validate_name("ticket", &draft.name)?;
        self.description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.value = draft.value;
        self.tag_ids = dedup_tags(draft.tag_ids);
        self.customer_id = draft.customer_id;
        self.assigned_user_id = draft.assigned_user_id;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Places the ticket at a new position
    pub fn move_to(&mut self, lane_id: LaneId, order: u32) {
        if self.lane_id != lane_id || self.order != order {
            self.lane_id = lane_id;
            self.order = order;
            self.updated_at = Utc::now();
        }
    }

    /// Value used for lane totals; a ticket without a value counts as zero
    pub fn value_or_zero(&self) -> Money {
        self.value.unwrap_or(Money::ZERO)
    }
}

fn dedup_tags(tag_ids: Vec<TagId>) -> Vec<TagId> {
    let mut seen = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_ticket_from_draft() {
        let lane = LaneId::new();
        let draft = TicketDraft::named("Website redesign").with_value(Money::from_cents(250000));
        let ticket = Ticket::new(lane, 3, draft).unwrap();

        assert_eq!(ticket.lane_id, lane);
        assert_eq!(ticket.order, 3);
        assert_eq!(ticket.value, Some(Money::from_cents(250000)));
        assert!(ticket.description.is_none());
    }

    #[test]
    fn test_ticket_requires_name() {
        let result = Ticket::new(LaneId::new(), 0, TicketDraft::named("  "));
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_apply_draft_keeps_position() {
        let lane = LaneId::new();
        let mut ticket = Ticket::new(lane, 2, TicketDraft::named("Old")).unwrap();

        let mut draft = TicketDraft::named("New");
        draft.description = Some("   ".to_string());
        ticket.apply_draft(draft).unwrap();

        assert_eq!(ticket.name, "New");
        assert_eq!(ticket.lane_id, lane);
        assert_eq!(ticket.order, 2);
        assert!(ticket.description.is_none());
    }

    #[test]
    fn test_duplicate_tags_collapsed() {
        let tag = TagId::new();
        let other = TagId::new();
        let draft = TicketDraft::named("Deal").with_tags(vec![tag, other, tag]);
        let ticket = Ticket::new(LaneId::new(), 0, draft).unwrap();
        assert_eq!(ticket.tag_ids, vec![tag, other]);
    }

    #[test]
    fn test_move_to_updates_updated_at_only_on_change() {
        let lane = LaneId::new();
        let mut ticket = Ticket::new(lane, 0, TicketDraft::named("Deal")).unwrap();
        let initial_updated_at = ticket.updated_at;

        ticket.move_to(lane, 0);
        assert_eq!(ticket.updated_at, initial_updated_at);

        std::thread::sleep(std::time::Duration::from_millis(10));
        let target = LaneId::new();
        ticket.move_to(target, 1);
        assert_eq!(ticket.lane_id, target);
        assert!(ticket.updated_at > initial_updated_at);
    }

    #[test]
    fn test_backwards_compatible_deserialization() {
        let json = format!(
            r#"{{
            "id": "{}",
            "lane_id": "{}",
            "name": "Old ticket",
            "order": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }}"#,
            TicketId::new(),
            LaneId::new()
        );

        let ticket: Ticket = serde_json::from_str(&json).unwrap();
        assert!(ticket.tag_ids.is_empty());
        assert!(ticket.value.is_none());
        assert_eq!(ticket.value_or_zero(), Money::ZERO);
    }
}
