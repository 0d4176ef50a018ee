//! Activity log entries for audit and notification consumers.
//!
//! Sinks are best effort. The coordinator hands entries over on a spawned
//! task after its transaction has committed, and only logs a failing sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{Identity, PipelineId, TenantId, UserId};
use crate::error::Result;

/// One human-readable record of something that happened on a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<PipelineId>,
    pub user_id: UserId,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(identity: &Identity, description: impl Into<String>) -> Self {
        Self {
            tenant_id: identity.tenant_id.clone(),
            pipeline_id: None,
            user_id: identity.user_id.clone(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn for_pipeline(mut self, pipeline_id: PipelineId) -> Self {
        self.pipeline_id = Some(pipeline_id);
        self
    }
}

/// Destination for activity entries
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<()>;
}

/// Keeps entries in memory, oldest first
#[derive(Debug, Default)]
pub struct MemoryActivitySink {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl MemoryActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far
    pub async fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().await.clone()
    }

    /// Entries recorded for one tenant
    pub async fn entries_for(&self, tenant_id: &TenantId) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActivitySink for MemoryActivitySink {
    async fn record(&self, entry: ActivityEntry) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// Emits entries as `tracing` events under the `activity` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivitySink;

#[async_trait]
impl ActivitySink for TracingActivitySink {
    async fn record(&self, entry: ActivityEntry) -> Result<()> {
        tracing::info!(
            target: "activity",
            tenant_id = %entry.tenant_id,
            pipeline_id = ?entry.pipeline_id.map(|id| id.to_string()),
            user_id = %entry.user_id,
            "{}",
            entry.description
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_filters_by_tenant() {
        let sink = MemoryActivitySink::new();
        let alice = Identity::new("user_a", "sub_1");
        let bob = Identity::new("user_b", "sub_2");

        sink.record(ActivityEntry::new(&alice, "Created lane New"))
            .await
            .unwrap();
        sink.record(ActivityEntry::new(&bob, "Created lane Won"))
            .await
            .unwrap();

        assert_eq!(sink.entries().await.len(), 2);
        let mine = sink.entries_for(&alice.tenant_id).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].description, "Created lane New");
        assert_eq!(mine[0].user_id, alice.user_id);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        let entry = ActivityEntry::new(&Identity::new("u", "t"), "Deleted ticket Deal")
            .for_pipeline(PipelineId::new());
        assert!(TracingActivitySink.record(entry).await.is_ok());
    }
}
