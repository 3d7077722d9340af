//! File-based package storage
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<normalized id>/<version>/<normalized id>.<version>.nupkg
//! <root>/<normalized id>/<version>/package.json
//! ```
//!
//! `package.json` keeps the original id casing and the metadata so the index
//! can be rebuilt from disk. Both files are written to temporary names first
//! and only renamed into place once both writes succeeded.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use nuvault_core::{ContentSource, Package, PackageArtifact, PackageInfo, Version, normalize_id};

use super::ArtifactStorage;
use crate::error::{RepoError, Result};

const SIDECAR: &str = "package.json";

/// Directory-tree package storage
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage root
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| RepoError::storage(format!("creating {}", root.display()), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, normalized_id: &str, version: &Version) -> PathBuf {
        self.root.join(normalized_id).join(version.to_string())
    }

    /// Path of the stored archive for an (id, version)
    pub fn content_path(&self, normalized_id: &str, version: &Version) -> PathBuf {
        self.version_dir(normalized_id, version)
            .join(format!("{}.{}.nupkg", normalized_id, version))
    }

    fn sidecar_path(&self, normalized_id: &str, version: &Version) -> PathBuf {
        self.version_dir(normalized_id, version).join(SIDECAR)
    }

    fn read_entry(&self, sidecar: &Path) -> Result<PackageArtifact> {
        let data = fs::read(sidecar)?;
        let info: PackageInfo = serde_json::from_slice(&data)?;
        let key = normalize_id(&info.id);

        let expected = self.sidecar_path(&key, &info.version);
        if expected != sidecar {
            return Err(RepoError::storage_msg(format!(
                "{} describes {} {}, which belongs at {}",
                sidecar.display(),
                info.id,
                info.version,
                expected.display()
            )));
        }

        let content = self.content_path(&key, &info.version);
        if !content.is_file() {
            return Err(RepoError::storage_msg(format!(
                "missing package content {}",
                content.display()
            )));
        }

        let artifact =
            PackageArtifact::with_content(info.id, info.version, ContentSource::File(content))?;
        Ok(artifact.with_metadata(info.metadata))
    }
}

/// Hidden sibling of `target` carrying `suffix`
fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}", file_name, suffix))
}

/// Write a synced copy of `target` under a temporary name
fn stage(target: &Path, write: impl FnOnce(&mut File) -> io::Result<()>) -> Result<PathBuf> {
    let tmp = sibling(target, "tmp");
    let result = File::create(&tmp).and_then(|mut file| {
        write(&mut file)?;
        file.sync_all()
    });

    match result {
        Ok(()) => Ok(tmp),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(RepoError::storage(format!("writing {}", target.display()), e))
        }
    }
}

/// Rename every staged file over its target, or none of them
///
/// Existing targets are moved to a backup name first and put back if a later
/// rename fails. Staged files are removed on failure.
fn swap_in(staged: &[(PathBuf, PathBuf)]) -> Result<()> {
    let mut done: Vec<(&Path, Option<PathBuf>)> = Vec::new();

    for (tmp, target) in staged {
        match replace_file(tmp, target) {
            Ok(backup) => done.push((target.as_path(), backup)),
            Err(e) => {
                for (target, backup) in done.into_iter().rev() {
                    let _ = match backup {
                        Some(backup) => fs::rename(backup, target),
                        None => fs::remove_file(target),
                    };
                }
                for (tmp, _) in staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(RepoError::storage(format!("writing {}", target.display()), e));
            }
        }
    }

    for (_, backup) in done {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }
    Ok(())
}

/// Move `tmp` to `target`, returning where the previous file went
fn replace_file(tmp: &Path, target: &Path) -> io::Result<Option<PathBuf>> {
    let backup = if target.is_file() {
        let backup = sibling(target, "bak");
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };

    match fs::rename(tmp, target) {
        Ok(()) => Ok(backup),
        Err(e) => {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, target);
            }
            Err(e)
        }
    }
}

impl ArtifactStorage<PackageArtifact> for FileStorage {
    fn store(&self, package: &PackageArtifact) -> Result<()> {
        let key = normalize_id(package.id());
        let dir = self.version_dir(&key, package.version());
        fs::create_dir_all(&dir)
            .map_err(|e| RepoError::storage(format!("creating {}", dir.display()), e))?;

        let sidecar = serde_json::to_vec_pretty(&PackageInfo::of(package))?;
        let content_path = self.content_path(&key, package.version());
        let sidecar_path = self.sidecar_path(&key, package.version());

        let staged_content = stage(&content_path, |file| {
            let mut content = package.open_content()?;
            io::copy(&mut content, file)?;
            Ok(())
        })?;
        let staged_sidecar = match stage(&sidecar_path, |file| file.write_all(&sidecar)) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&staged_content);
                return Err(e);
            }
        };

        swap_in(&[
            (staged_content, content_path),
            (staged_sidecar, sidecar_path),
        ])
    }

    fn delete(&self, normalized_id: &str, version: &Version) -> Result<()> {
        let dir = self.version_dir(normalized_id, version);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(RepoError::storage(format!("deleting {}", dir.display()), e)),
        }

        // Drop the id directory once its last version is gone
        let _ = fs::remove_dir(self.root.join(normalized_id));
        Ok(())
    }

    fn read(&self, normalized_id: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let path = self.content_path(normalized_id, version);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RepoError::NotFound {
                id: normalized_id.to_string(),
                version: version.clone(),
            }),
            Err(e) => Err(RepoError::storage(format!("reading {}", path.display()), e)),
        }
    }

    fn update_metadata(&self, package: &PackageArtifact) -> Result<()> {
        let key = normalize_id(package.id());
        let path = self.sidecar_path(&key, package.version());
        if !path.is_file() {
            return Err(RepoError::NotFound {
                id: package.id().to_string(),
                version: package.version().clone(),
            });
        }

        let sidecar = serde_json::to_vec_pretty(&PackageInfo::of(package))?;
        let staged = stage(&path, |file| file.write_all(&sidecar))?;
        swap_in(&[(staged, path)])
    }

    fn load_all(&self) -> Result<Vec<PackageArtifact>> {
        let mut packages = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(3).max_depth(3) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable storage entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.file_name() != SIDECAR {
                continue;
            }

            match self.read_entry(entry.path()) {
                Ok(package) => packages.push(package),
                Err(e) => tracing::warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }

        Ok(packages)
    }
}
