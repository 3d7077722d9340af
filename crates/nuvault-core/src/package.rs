//! Package artifacts and identifiers
//!
//! The repository core never looks inside a package archive. An artifact is
//! an opaque handle that exposes its id, version, metadata and a readable
//! content stream; anything that can do that implements [`Package`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::version::Version;

/// Maximum length of a package id
pub const MAX_ID_LENGTH: usize = 100;

/// Free-form package metadata (title, authors, description, ...)
pub type Metadata = BTreeMap<String, String>;

/// Capability set the repository needs from a package handle
pub trait Package: Send + Sync {
    /// Package id, in the casing the publisher used
    fn id(&self) -> &str;

    fn version(&self) -> &Version;

    fn metadata(&self) -> &Metadata;

    /// Open the package content for reading
    fn open_content(&self) -> std::io::Result<Box<dyn Read + Send + '_>>;

    /// Copy of this handle with its metadata replaced
    fn with_metadata(&self, metadata: Metadata) -> Self
    where
        Self: Sized;

    /// Copy of this handle under another casing of the same id
    fn with_id(&self, id: &str) -> Self
    where
        Self: Sized;
}

/// Case-folded form of a package id, used as the lookup key
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}

/// Check that an id is usable as a package identifier
pub fn validate_id(id: &str) -> Result<()> {
    let invalid = |reason: &str| CoreError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("id is empty"));
    }
    if id.chars().count() > MAX_ID_LENGTH {
        return Err(invalid(&format!(
            "id is longer than {} characters",
            MAX_ID_LENGTH
        )));
    }
    if id.starts_with('.') || id.ends_with('.') {
        return Err(invalid("id must not start or end with '.'"));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        return Err(invalid(&format!("invalid character '{}'", c)));
    }
    Ok(())
}

/// Where an artifact's bytes live
#[derive(Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Bytes held in memory
    Memory(Arc<Vec<u8>>),

    /// A file on disk
    File(PathBuf),
}

impl ContentSource {
    pub fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        match self {
            ContentSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            ContentSource::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            ContentSource::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

/// A package archive handle: id, version, metadata and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    id: String,
    version: Version,
    metadata: Metadata,
    content: ContentSource,
}

impl PackageArtifact {
    /// Create an artifact whose content is held in memory
    pub fn new(
        id: impl Into<String>,
        version: Version,
        content: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        Self::with_content(id, version, ContentSource::Memory(Arc::new(content.into())))
    }

    /// Create an artifact backed by a file on disk
    pub fn from_file(
        id: impl Into<String>,
        version: Version,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("package file not found: {}", path.display()),
            )));
        }
        Self::with_content(id, version, ContentSource::File(path.to_path_buf()))
    }

    /// Create an artifact from an already resolved content source
    pub fn with_content(
        id: impl Into<String>,
        version: Version,
        content: ContentSource,
    ) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self {
            id,
            version,
            metadata: Metadata::new(),
            content,
        })
    }

    /// Builder-style metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn content(&self) -> &ContentSource {
        &self.content
    }

    /// `(normalized id, version)`, the identity used by the index
    pub fn identity(&self) -> (String, &Version) {
        (normalize_id(&self.id), &self.version)
    }

    /// Read the whole content into memory
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.content.open()?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Package for PackageArtifact {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn open_content(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        self.content.open()
    }

    fn with_metadata(&self, metadata: Metadata) -> Self {
        Self {
            metadata,
            ..self.clone()
        }
    }

    fn with_id(&self, id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..self.clone()
        }
    }
}

/// Serializable summary of a package, used for sidecar files and listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl PackageInfo {
    pub fn of<P: Package + ?Sized>(package: &P) -> Self {
        Self {
            id: package.id().to_string(),
            version: package.version().clone(),
            metadata: package.metadata().clone(),
        }
    }
}
