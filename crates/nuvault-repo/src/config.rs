//! Repository settings
//!
//! Stored as YAML, by default in `~/.config/nuvault/repository.yaml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nuvault_core::PackageArtifact;

use crate::credentials::{AllowAnyKey, ApiKeyEntry, ApiKeyStore, KeyValidator};
use crate::error::{RepoError, Result};
use crate::source::PackageSource;
use crate::storage::FileStorage;
use crate::strategy::PushPolicy;

/// Repository settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySettings {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Where package content lives
    #[serde(default)]
    pub storage: StorageSettings,

    /// Policy applied to pushes
    #[serde(default)]
    pub push_policy: PushPolicy,

    /// Old version pruning
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Accept any non-empty API key (local development only)
    #[serde(default)]
    pub allow_any_key: bool,

    /// Configured push keys
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

fn default_api_version() -> String {
    "nuvault/v1".to_string()
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            storage: StorageSettings::default(),
            push_policy: PushPolicy::default(),
            retention: RetentionPolicy::default(),
            allow_any_key: false,
            api_keys: Vec::new(),
        }
    }
}

/// Storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// Root directory of the file storage
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let root = dirs::data_dir()
            .map(|dir| dir.join("nuvault").join("packages"))
            .unwrap_or_else(|| PathBuf::from("packages"));
        Self { root }
    }
}

/// How many versions of each id to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Keep at most this many versions per id; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_versions: Option<usize>,
}

impl RetentionPolicy {
    pub fn keep(max_versions: usize) -> Self {
        Self {
            max_versions: Some(max_versions),
        }
    }
}

impl RepositorySettings {
    /// Load settings from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("nuvault").join("repository.yaml"))
    }

    /// Check the settings for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if let Some(entry) = self.api_keys.iter().find(|e| e.key.trim().is_empty()) {
            return Err(RepoError::InvalidConfig {
                message: format!("API key scoped to {:?} is empty", entry.packages),
            });
        }
        if self.retention.max_versions == Some(0) {
            return Err(RepoError::InvalidConfig {
                message: "retention.maxVersions must be at least 1".to_string(),
            });
        }
        self.key_validator().map(|_| ())
    }

    /// Validator for the configured keys
    pub fn key_validator(&self) -> Result<Arc<dyn KeyValidator>> {
        if self.allow_any_key {
            return Ok(Arc::new(AllowAnyKey));
        }
        Ok(Arc::new(ApiKeyStore::new(&self.api_keys)?))
    }

    /// Open the file storage and build a ready package source
    pub fn build_source(&self) -> Result<PackageSource<PackageArtifact>> {
        self.validate()?;
        if self.allow_any_key {
            tracing::warn!("Accepting any non-empty API key");
        }

        let storage = Arc::new(FileStorage::new(&self.storage.root)?);
        let source = PackageSource::open(storage, self.key_validator()?)?
            .with_push_strategy(self.push_policy.strategy())
            .with_retention(self.retention);

        tracing::debug!(
            "Package source at {} using {}",
            self.storage.root.display(),
            self.push_policy
        );
        Ok(source)
    }
}
