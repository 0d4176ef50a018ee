use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::DensityPolicy;
use crate::error::{PipelineError, Result};

/// Tunables of the reorder coordinator.
///
/// ```toml
/// max_batch_size = 500
/// transient_retries = 2
/// density_policy = "reject"
/// activity_log = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Largest ticket batch accepted in one reorder call
    pub max_batch_size: usize,
    /// How many times a transaction is re-run after a transient store failure
    pub transient_retries: u32,
    /// Handling of ticket batches that leave gaps or duplicates in a lane
    pub density_policy: DensityPolicy,
    /// Whether committed mutations emit activity entries
    pub activity_log: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 500,
            transient_retries: 2,
            density_policy: DensityPolicy::Reject,
            activity_log: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML config file. A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(PipelineError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = CoordinatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.density_policy, DensityPolicy::Reject);
    }

    #[test]
    fn test_partial_override() {
        let config =
            CoordinatorConfig::from_toml_str("density_policy = \"trust\"\nmax_batch_size = 10")
                .unwrap();
        assert_eq!(config.density_policy, DensityPolicy::Trust);
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.transient_retries, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            CoordinatorConfig::from_toml_str("max_batch_size = 0"),
            Err(PipelineError::Config(_))
        ));
        assert!(CoordinatorConfig::from_toml_str("density_policy = \"maybe\"").is_err());
        assert!(CoordinatorConfig::from_toml_str("unknown_key = 1").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.toml");

        let config = CoordinatorConfig::load(&path).await.unwrap();
        assert_eq!(config, CoordinatorConfig::default());

        tokio::fs::write(&path, "activity_log = false\n").await.unwrap();
        let config = CoordinatorConfig::load(&path).await.unwrap();
        assert!(!config.activity_log);
    }
}
