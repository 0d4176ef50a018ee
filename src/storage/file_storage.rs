use crate::{
    domain::{Board, Contact, ContactId, Pipeline, PipelineId, Tag, TenantId, TicketId},
    error::{PipelineError, Result},
    storage::{dataset::Dataset, BoardMutation, Storage, TicketLocation},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::warn;

/// File-based storage implementation.
///
/// Each tenant's records live in one JSON document. Writes go to a temp file
/// that is renamed over the document, so readers only ever see a complete
/// document and an interrupted write leaves the previous one in place.
pub struct FileStorage {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    const STORE_DIR: &'static str = ".pipelines";
    const TENANTS_DIR: &'static str = "tenants";

    /// Creates a new FileStorage instance under the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::STORE_DIR),
            write_lock: Mutex::new(()),
        }
    }

    fn tenants_dir(&self) -> PathBuf {
        self.root_path.join(Self::TENANTS_DIR)
    }

    fn tenant_file(&self, tenant_id: &TenantId) -> PathBuf {
        self.tenants_dir()
            .join(format!("{}.json", encode_file_stem(tenant_id.as_str())))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    async fn read_document(path: &Path) -> Result<Dataset> {
        if !path.exists() {
            return Ok(Dataset::default());
        }
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn read_tenant(&self, tenant_id: &TenantId) -> Result<Dataset> {
        Self::read_document(&self.tenant_file(tenant_id)).await
    }

    async fn write_tenant(&self, tenant_id: &TenantId, dataset: &Dataset) -> Result<()> {
        self.ensure_directory_exists(&self.tenants_dir()).await?;

        let path = self.tenant_file(tenant_id);
        let staging = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(dataset)?;

        fs::write(&staging, json).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    /// Read-modify-write of one tenant document under the write lock
    async fn modify_tenant<T>(
        &self,
        tenant_id: &TenantId,
        change: impl FnOnce(&mut Dataset) -> Result<T> + Send,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut dataset = self.read_tenant(tenant_id).await?;
        let output = change(&mut dataset)?;
        self.write_tenant(tenant_id, &dataset).await?;
        Ok(output)
    }
}

/// Maps an opaque tenant id onto a file stem, escaping anything outside
/// `[A-Za-z0-9_-]` as `%XX`
fn encode_file_stem(raw: &str) -> String {
    let mut stem = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;
        self.ensure_directory_exists(&self.tenants_dir()).await?;

        let gitignore_path = self.root_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "# Interrupted writes\n*.tmp\n").await?;
        }

        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.tenants_dir().exists()
    }

    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.modify_tenant(&pipeline.tenant_id, |dataset| {
            dataset.save_pipeline(pipeline);
            Ok(())
        })
        .await
    }

    async fn load_pipeline(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
    ) -> Result<Option<Pipeline>> {
        let dataset = self.read_tenant(tenant_id).await?;
        Ok(dataset.pipeline(tenant_id, id).cloned())
    }

    async fn list_pipelines(&self, tenant_id: &TenantId) -> Result<Vec<Pipeline>> {
        Ok(self.read_tenant(tenant_id).await?.list_pipelines(tenant_id))
    }

    async fn delete_pipeline(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<()> {
        self.modify_tenant(tenant_id, |dataset| dataset.remove_pipeline(tenant_id, id))
            .await
    }

    async fn load_board(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<Board> {
        self.read_tenant(tenant_id).await?.board(tenant_id, id)
    }

    async fn update_board(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
        mutation: BoardMutation<'_>,
    ) -> Result<Board> {
        self.modify_tenant(tenant_id, |dataset| {
            dataset.update_board(tenant_id, id, mutation)
        })
        .await
    }

    async fn locate_tickets(&self, ids: &[TicketId]) -> Result<Vec<TicketLocation>> {
        let tenants_dir = self.tenants_dir();

        if !tenants_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&tenants_dir).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match Self::read_document(&path).await {
                    Ok(dataset) => found.extend(dataset.locate(ids)),
                    Err(PipelineError::Serialization(e)) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Skipping unreadable tenant document"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(found)
    }

    async fn upsert_tag(&self, tag: Tag) -> Result<Tag> {
        let tenant_id = tag.tenant_id.clone();
        self.modify_tenant(&tenant_id, |dataset| Ok(dataset.upsert_tag(tag)))
            .await
    }

    async fn list_tags(&self, tenant_id: &TenantId) -> Result<Vec<Tag>> {
        Ok(self.read_tenant(tenant_id).await?.list_tags(tenant_id))
    }

    async fn save_contact(&self, contact: &Contact) -> Result<()> {
        self.modify_tenant(&contact.tenant_id, |dataset| {
            dataset.save_contact(contact);
            Ok(())
        })
        .await
    }

    async fn load_contact(&self, tenant_id: &TenantId, id: &ContactId) -> Result<Option<Contact>> {
        Ok(self.read_tenant(tenant_id).await?.contact(tenant_id, id))
    }
}
