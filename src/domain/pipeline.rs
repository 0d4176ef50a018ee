use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{LaneId, PipelineId, TenantId};
use crate::error::{PipelineError, Result};

/// Trims a user-supplied name and rejects it when nothing is left.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation(format!(
            "{} name must not be empty",
            kind
        )));
    }
    Ok(trimmed.to_string())
}

/// A sales pipeline owned by exactly one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub tenant_id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(tenant_id: TenantId, name: &str) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: PipelineId::new(),
            tenant_id,
            name: validate_name("pipeline", name)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.name = validate_name("pipeline", name)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_owned_by(&self, tenant_id: &TenantId) -> bool {
        &self.tenant_id == tenant_id
    }
}

/// A kanban column within a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub pipeline_id: PipelineId,
    pub name: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lane {
    pub fn new(pipeline_id: PipelineId, name: &str, order: u32) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: LaneId::new(),
            pipeline_id,
            name: validate_name("lane", name)?,
            order,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.name = validate_name("lane", name)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_creation_trims_name() {
        let pipeline = Pipeline::new(TenantId::new("sub_1"), "  Lead Cycle ").unwrap();
        assert_eq!(pipeline.name, "Lead Cycle");
        assert!(pipeline.is_owned_by(&TenantId::new("sub_1")));
        assert!(!pipeline.is_owned_by(&TenantId::new("sub_2")));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(
            Pipeline::new(TenantId::new("sub_1"), "   "),
            Err(PipelineError::Validation(_))
        ));
        assert!(Lane::new(PipelineId::new(), "", 0).is_err());
    }

    #[test]
    fn test_lane_rename_updates_updated_at() {
        let mut lane = Lane::new(PipelineId::new(), "New", 0).unwrap();
        let initial_updated_at = lane.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        lane.rename("Qualified").unwrap();

        assert_eq!(lane.name, "Qualified");
        assert!(lane.updated_at > initial_updated_at);
    }

    #[test]
    fn test_failed_rename_keeps_name() {
        let mut pipeline = Pipeline::new(TenantId::new("sub_1"), "Sales").unwrap();
        assert!(pipeline.rename(" ").is_err());
        assert_eq!(pipeline.name, "Sales");
    }
}
