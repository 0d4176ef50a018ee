use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ContactId, TagId, TenantId};
use crate::domain::pipeline::validate_name;
use crate::error::Result;

/// A tenant-wide label that can be attached to any number of tickets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tenant_id: TenantId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub const DEFAULT_COLOR: &'static str = "BLUE";

    pub fn new(tenant_id: TenantId, name: &str, color: Option<&str>) -> Result<Self> {
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Self::DEFAULT_COLOR);
        Ok(Self {
            id: TagId::new(),
            tenant_id,
            name: validate_name("tag", name)?,
            color: color.to_uppercase(),
            created_at: Utc::now(),
        })
    }

    /// Tag names are unique per tenant regardless of case
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// A customer record of a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(tenant_id: TenantId, name: &str, email: &str) -> Result<Self> {
        Ok(Self {
            id: ContactId::new(),
            tenant_id,
            name: validate_name("contact", name)?,
            email: email.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn summary(&self) -> ContactSummary {
        ContactSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The display data of a ticket's customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: ContactId,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_defaults_color() {
        let tag = Tag::new(TenantId::new("sub_1"), "Hot", None).unwrap();
        assert_eq!(tag.color, "BLUE");

        let tag = Tag::new(TenantId::new("sub_1"), "Hot", Some("orange")).unwrap();
        assert_eq!(tag.color, "ORANGE");
    }

    #[test]
    fn test_tag_name_match_is_case_insensitive() {
        let tag = Tag::new(TenantId::new("sub_1"), "Follow Up", None).unwrap();
        assert!(tag.has_name("follow up"));
        assert!(tag.has_name(" FOLLOW UP "));
        assert!(!tag.has_name("follow"));
    }

    #[test]
    fn test_contact_summary() {
        let contact = Contact::new(TenantId::new("sub_1"), "Ada", " ada@example.com").unwrap();
        let summary = contact.summary();
        assert_eq!(summary.id, contact.id);
        assert_eq!(summary.email, "ada@example.com");
    }
}
