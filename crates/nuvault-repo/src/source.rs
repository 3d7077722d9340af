//! Package source - the repository facade
//!
//! Reads go straight to the case-fold table and the version index snapshot.
//! Mutations take the per-id critical section, consult the current push
//! strategy, persist through storage, and only then publish to the index.
//! A failed mutation leaves the index and the case-fold table as they were.

use arc_swap::ArcSwap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use nuvault_core::{Package, Version, normalize_id, validate_id};

use crate::casefold::CaseFoldTable;
use crate::config::RetentionPolicy;
use crate::credentials::KeyValidator;
use crate::error::{RepoError, Result};
use crate::index::VersionIndex;
use crate::lock::IdentityLocks;
use crate::storage::ArtifactStorage;
use crate::strategy::{PushDecision, PushStrategy, RejectExisting};

/// Package repository over artifacts of type `P`
pub struct PackageSource<P: Package + 'static> {
    index: VersionIndex<P>,
    casefold: CaseFoldTable,
    locks: IdentityLocks,
    strategy: ArcSwap<Arc<dyn PushStrategy>>,
    storage: Arc<dyn ArtifactStorage<P>>,
    keys: Arc<dyn KeyValidator>,
    retention: RetentionPolicy,
}

impl<P: Package + 'static> PackageSource<P> {
    /// Create an empty source; nothing is loaded from storage
    pub fn new(storage: Arc<dyn ArtifactStorage<P>>, keys: Arc<dyn KeyValidator>) -> Self {
        Self {
            index: VersionIndex::new(),
            casefold: CaseFoldTable::new(),
            locks: IdentityLocks::new(),
            strategy: ArcSwap::from_pointee(Arc::new(RejectExisting) as Arc<dyn PushStrategy>),
            storage,
            keys,
            retention: RetentionPolicy::default(),
        }
    }

    /// Create a source and index everything the storage already holds
    ///
    /// For each id, the casing of its lowest stored version becomes canonical.
    pub fn open(storage: Arc<dyn ArtifactStorage<P>>, keys: Arc<dyn KeyValidator>) -> Result<Self> {
        let source = Self::new(storage, keys);

        let mut loaded = source.storage.load_all()?;
        loaded.sort_by(|a, b| {
            normalize_id(a.id())
                .cmp(&normalize_id(b.id()))
                .then_with(|| a.version().cmp(b.version()))
        });

        for package in loaded {
            let (id, version) = (package.id().to_string(), package.version().clone());
            source.casefold.register(&id);
            if let Err(e) = source.index.insert(Arc::new(package)) {
                tracing::warn!("Skipping duplicate stored package {} {}: {}", id, version, e);
            }
        }

        tracing::info!(
            "Opened package source with {} packages across {} ids",
            source.index.len(),
            source.casefold.len()
        );
        Ok(source)
    }

    /// Builder-style push strategy
    pub fn with_push_strategy(self, strategy: Arc<dyn PushStrategy>) -> Self {
        self.strategy.store(Arc::new(strategy));
        self
    }

    /// Builder-style retention policy
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    // ============ Reads ============

    /// Every stored package
    pub fn all_packages(&self) -> Vec<Arc<P>> {
        self.index.all()
    }

    /// The latest version of every id
    pub fn latest_packages(&self) -> Vec<Arc<P>> {
        self.index.latest_all()
    }

    /// All versions of an id, lowest first
    ///
    /// Without `ignore_case` the id must match the canonical casing exactly.
    pub fn packages(&self, id: &str, ignore_case: bool) -> Vec<Arc<P>> {
        self.casefold
            .resolve(id, ignore_case)
            .map(|key| self.index.packages_for(&key))
            .unwrap_or_default()
    }

    /// Highest version of an id
    pub fn latest_package(&self, id: &str, ignore_case: bool) -> Option<Arc<P>> {
        let key = self.casefold.resolve(id, ignore_case)?;
        self.index.latest_for(&key)
    }

    /// Exact (id, version) lookup
    pub fn package(&self, id: &str, version: &Version, ignore_case: bool) -> Option<Arc<P>> {
        let key = self.casefold.resolve(id, ignore_case)?;
        self.index.get(&key, version)
    }

    /// Canonical casing of an id, matched case-insensitively
    pub fn canonical_id(&self, id: &str) -> Option<String> {
        self.casefold.canonical_of(&normalize_id(id))
    }

    /// Open the stored content of a package
    pub fn open_content(&self, id: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let key = normalize_id(id);
        if self.index.get(&key, version).is_none() {
            return Err(RepoError::NotFound {
                id: id.to_string(),
                version: version.clone(),
            });
        }
        self.storage.read(&key, version)
    }

    // ============ Push Strategy ============

    /// Strategy applied to the next push
    pub fn push_strategy(&self) -> Arc<dyn PushStrategy> {
        (*self.strategy.load_full()).clone()
    }

    /// Replace the strategy; pushes already deciding keep the old one
    pub fn set_push_strategy(&self, strategy: Arc<dyn PushStrategy>) {
        tracing::info!("Switching push strategy to {}", strategy.name());
        self.strategy.store(Arc::new(strategy));
    }

    // ============ Mutations ============

    /// Push a package
    ///
    /// Returns `Ok(true)` when the package was stored and indexed, `Ok(false)`
    /// when the push strategy rejected it. An invalid or missing key is an
    /// [`RepoError::Authorization`] error.
    ///
    /// Once an id is known, later pushes are stored under its canonical casing
    /// whatever casing they were pushed with.
    pub fn push_package(&self, package: P, api_key: &str) -> Result<bool> {
        validate_id(package.id())?;
        self.authorize(package.id(), api_key)?;

        let key = normalize_id(package.id());
        let _guard = self.locks.acquire(&key);

        let strategy = self.push_strategy();
        let existing = self.index.packages_for(&key);
        let decision = {
            let existing: Vec<&dyn Package> =
                existing.iter().map(|p| p.as_ref() as &dyn Package).collect();
            strategy.decide(&existing, &package)
        };
        tracing::debug!(
            "Push decision for {} {} by {}: {:?}",
            package.id(),
            package.version(),
            strategy.name(),
            decision
        );

        let version = package.version().clone();
        match decision {
            PushDecision::Reject { reason } => {
                tracing::warn!("Rejected push of {} {}: {}", package.id(), version, reason);
                return Ok(false);
            }
            PushDecision::Accept => {
                self.ensure_vacant(&key, &package)?;
                self.commit(&key, package, None)?;
            }
            PushDecision::AcceptReplacing { version: superseded } => {
                if superseded != version {
                    self.ensure_vacant(&key, &package)?;
                }
                self.commit(&key, package, Some(superseded))?;
            }
        }

        self.apply_retention(&key, &version);
        Ok(true)
    }

    /// Remove a package; removing something absent is a no-op
    ///
    /// Storage is deleted first, so a storage failure leaves the package indexed.
    pub fn remove_package(&self, id: &str, version: &Version) -> Result<()> {
        let key = normalize_id(id);
        let _guard = self.locks.acquire(&key);

        if self.index.get(&key, version).is_none() {
            tracing::debug!("Nothing to remove for {} {}", id, version);
            return Ok(());
        }

        self.storage.delete(&key, version)?;
        self.index.remove(&key, version);
        tracing::info!("Removed {} {}", id, version);
        Ok(())
    }

    /// Replace the metadata of a stored package
    ///
    /// Only metadata changes; the stored id casing, version and content stay.
    pub fn refresh_package(&self, package: &P) -> Result<()> {
        let key = normalize_id(package.id());
        let _guard = self.locks.acquire(&key);

        let current = self
            .index
            .get(&key, package.version())
            .ok_or_else(|| RepoError::NotFound {
                id: package.id().to_string(),
                version: package.version().clone(),
            })?;

        let metadata = package.metadata().clone();
        self.storage
            .update_metadata(&current.with_metadata(metadata.clone()))?;
        self.index
            .replace_metadata(&key, package.version(), metadata)?;

        tracing::info!("Refreshed metadata of {} {}", current.id(), current.version());
        Ok(())
    }

    // ============ Internals ============

    fn authorize(&self, id: &str, api_key: &str) -> Result<()> {
        let reason = if api_key.is_empty() {
            "missing API key"
        } else if !self.keys.is_valid(id, api_key) {
            "API key is not valid for this package"
        } else {
            return Ok(());
        };

        tracing::warn!("Unauthorized push of {}: {}", id, reason);
        Err(RepoError::Authorization {
            id: id.to_string(),
            reason: reason.to_string(),
        })
    }

    /// Refuse to store over a version that is indexed and not being replaced
    fn ensure_vacant(&self, key: &str, package: &P) -> Result<()> {
        match self.index.get(key, package.version()) {
            Some(_) => Err(RepoError::Conflict {
                id: package.id().to_string(),
                version: package.version().clone(),
            }),
            None => Ok(()),
        }
    }

    /// Persist, then publish. Must run inside the id's critical section.
    fn commit(&self, key: &str, package: P, superseded: Option<Version>) -> Result<()> {
        let package = match self.casefold.canonical_of(key) {
            Some(canonical) if canonical != package.id() => package.with_id(&canonical),
            _ => package,
        };
        self.storage.store(&package)?;

        let package = Arc::new(package);
        let (_, registered) = self.casefold.register_new(package.id());

        match superseded {
            Some(old) if &old == package.version() => {
                self.index.replace(Arc::clone(&package));
            }
            superseded => {
                if let Err(e) = self.index.insert(Arc::clone(&package)) {
                    self.rollback(key, &package, registered);
                    return Err(e);
                }
                if let Some(old) = superseded {
                    self.index.remove(key, &old);
                    if let Err(e) = self.storage.delete(key, &old) {
                        tracing::warn!("Superseded {} {} left in storage: {}", key, old, e);
                    }
                }
            }
        }

        tracing::info!("Pushed {} {}", package.id(), package.version());
        Ok(())
    }

    fn rollback(&self, key: &str, package: &P, registered: bool) {
        tracing::warn!(
            "Rolling back push of {} {}",
            package.id(),
            package.version()
        );
        if registered && self.index.packages_for(key).is_empty() {
            self.casefold.forget(key);
        }
        // Stored content of an indexed version is never ours to delete
        if self.index.get(key, package.version()).is_some() {
            return;
        }
        if let Err(e) = self.storage.delete(key, package.version()) {
            tracing::warn!("Could not remove stored content during rollback: {}", e);
        }
    }

    /// Prune the oldest versions beyond the retention limit, sparing `pushed`
    fn apply_retention(&self, key: &str, pushed: &Version) {
        let Some(max_versions) = self.retention.max_versions else {
            return;
        };

        let versions = self.index.packages_for(key);
        let excess = versions.len().saturating_sub(max_versions);
        if excess == 0 {
            return;
        }

        let mut pruned = 0usize;
        for old in versions
            .iter()
            .filter(|p| p.version() != pushed)
            .take(excess)
        {
            match self.storage.delete(key, old.version()) {
                Ok(()) => {
                    self.index.remove(key, old.version());
                    pruned += 1;
                }
                Err(e) => tracing::warn!(
                    "Retention could not delete {} {}: {}",
                    old.id(),
                    old.version(),
                    e
                ),
            }
        }

        tracing::debug!("Retention pruned {} versions of {}", pruned, key);
    }
}

impl<P: Package + 'static> fmt::Debug for PackageSource<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSource")
            .field("index", &self.index)
            .field("ids", &self.casefold.len())
            .field("strategy", &self.push_strategy().name())
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AllowAnyKey, ApiKeyEntry, ApiKeyStore};
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::strategy::{AllowOverwrite, PushPolicy, ReadOnly};
    use nuvault_core::{Metadata, PackageArtifact};

    const KEY: &str = "test-key";

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn artifact(id: &str, version: &str) -> PackageArtifact {
        PackageArtifact::new(id, v(version), format!("{} {}", id, version).into_bytes()).unwrap()
    }

    fn memory_source() -> (PackageSource<PackageArtifact>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let source = PackageSource::new(Arc::new(storage.clone()), Arc::new(AllowAnyKey));
        (source, storage)
    }

    fn versions(packages: &[Arc<PackageArtifact>]) -> Vec<String> {
        packages.iter().map(|p| p.version().to_string()).collect()
    }

    #[test]
    fn test_push_then_get() {
        let (source, storage) = memory_source();
        let package = artifact("Sample", "1.0.0").meta("title", "Sample");

        assert!(source.push_package(package.clone(), KEY).unwrap());

        let found = source.package("Sample", &v("1.0.0"), false).unwrap();
        assert_eq!(*found, package);
        assert_eq!(
            storage.content_of("Sample", &v("1.0.0")),
            Some(b"Sample 1.0.0".to_vec())
        );
    }

    #[test]
    fn test_latest_follows_version_order() {
        let (source, _) = memory_source();
        for version in ["1.0.0", "1.2.0", "1.2.0-beta"] {
            assert!(source.push_package(artifact("Sample", version), KEY).unwrap());
        }

        let all = source.packages("Sample", false);
        assert_eq!(versions(&all), vec!["1.0.0", "1.2.0-beta", "1.2.0"]);

        let latest = source.latest_package("Sample", false).unwrap();
        assert_eq!(latest.version(), &v("1.2.0"));
        assert_eq!(all.iter().max_by(|a, b| a.version().cmp(b.version())), Some(&latest));
    }

    #[test]
    fn test_push_remove_scenario() {
        let (source, _) = memory_source();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();
        source.push_package(artifact("Sample", "2.0.0"), KEY).unwrap();
        assert_eq!(
            source.latest_package("Sample", false).unwrap().version(),
            &v("2.0.0")
        );

        source.remove_package("Sample", &v("2.0.0")).unwrap();
        assert_eq!(
            source.latest_package("Sample", false).unwrap().version(),
            &v("1.0.0")
        );
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let (source, _) = memory_source();
        source.push_package(artifact("Foo", "1.0.0"), KEY).unwrap();
        let version = v("1.0.0");

        for id in ["foo", "FOO", "Foo"] {
            let found = source.package(id, &version, true).unwrap();
            assert_eq!(found.id(), "Foo");
        }
        assert!(source.package("foo", &version, false).is_none());
        assert!(source.package("Foo", &version, false).is_some());
        assert!(source.packages("FOO", false).is_empty());
        assert_eq!(source.packages("FOO", true).len(), 1);
    }

    #[test]
    fn test_canonical_casing_survives_later_pushes() {
        let (source, _) = memory_source();
        source.push_package(artifact("Foo", "1.0.0"), KEY).unwrap();
        source.push_package(artifact("FOO", "2.0.0"), KEY).unwrap();

        assert_eq!(source.canonical_id("foo").as_deref(), Some("Foo"));
        assert_eq!(source.packages("Foo", false).len(), 2);
        assert!(source.packages("FOO", false).is_empty());

        // The later push is stored under the canonical casing
        let later = source.package("foo", &v("2.0.0"), true).unwrap();
        assert_eq!(later.id(), "Foo");
        assert_eq!(later.read_all().unwrap(), b"FOO 2.0.0");
        assert!(source.package("Foo", &v("2.0.0"), false).is_some());
    }

    #[test]
    fn test_canonical_casing_written_to_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
            let source: PackageSource<PackageArtifact> =
                PackageSource::open(storage, Arc::new(AllowAnyKey)).unwrap();
            source.push_package(artifact("Foo", "2.0.0"), KEY).unwrap();
            source.push_package(artifact("FOO", "1.0.0"), KEY).unwrap();
        }

        let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let source: PackageSource<PackageArtifact> =
            PackageSource::open(storage, Arc::new(AllowAnyKey)).unwrap();
        assert_eq!(source.canonical_id("foo").as_deref(), Some("Foo"));
        assert_eq!(source.packages("Foo", false).len(), 2);
    }

    #[test]
    fn test_unknown_id_reads() {
        let (source, _) = memory_source();
        assert!(source.packages("missing", true).is_empty());
        assert!(source.latest_package("missing", true).is_none());
        assert!(source.package("missing", &v("1.0"), true).is_none());
        assert!(source.packages("", true).is_empty());
        assert!(source.all_packages().is_empty());
    }

    #[test]
    fn test_remove_twice() {
        let (source, storage) = memory_source();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();

        source.remove_package("Sample", &v("1.0.0")).unwrap();
        source.remove_package("Sample", &v("1.0.0")).unwrap();
        source.remove_package("Never.Pushed", &v("1.0.0")).unwrap();

        assert!(source.packages("Sample", false).is_empty());
        assert_eq!(storage.operation_counts().deletes, 1);
        // The canonical entry outlives the last version
        assert_eq!(source.canonical_id("sample").as_deref(), Some("Sample"));
    }

    #[test]
    fn test_remove_storage_failure_keeps_index() {
        let (source, storage) = memory_source();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();

        storage.fail_deletes(true);
        let err = source.remove_package("Sample", &v("1.0.0")).unwrap_err();
        assert!(matches!(err, RepoError::Storage { .. }));
        assert!(source.package("Sample", &v("1.0.0"), false).is_some());
    }

    #[test]
    fn test_duplicate_push_rejected_by_default() {
        let (source, storage) = memory_source();
        let original = artifact("Sample", "1.0.0");
        assert!(source.push_package(original.clone(), KEY).unwrap());

        let again = PackageArtifact::new("Sample", v("1.0.0"), b"different".to_vec()).unwrap();
        assert!(!source.push_package(again, KEY).unwrap());

        assert_eq!(*source.package("Sample", &v("1.0.0"), false).unwrap(), original);
        assert_eq!(
            storage.content_of("sample", &v("1.0.0")),
            Some(b"Sample 1.0.0".to_vec())
        );
        assert_eq!(storage.operation_counts().stores, 1);
    }

    #[test]
    fn test_allow_overwrite_replaces_content() {
        let (source, storage) = memory_source();
        source.set_push_strategy(Arc::new(AllowOverwrite));

        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();
        let again = PackageArtifact::new("Sample", v("1.0.0"), b"second".to_vec()).unwrap();
        assert!(source.push_package(again.clone(), KEY).unwrap());

        assert_eq!(source.packages("Sample", false).len(), 1);
        assert_eq!(*source.package("Sample", &v("1.0.0"), false).unwrap(), again);
        assert_eq!(storage.content_of("sample", &v("1.0.0")), Some(b"second".to_vec()));
    }

    /// Accepts every push as a replacement of one fixed version
    #[derive(Debug)]
    struct Supersede(Version);

    impl PushStrategy for Supersede {
        fn name(&self) -> &str {
            "supersede"
        }

        fn decide(&self, _existing: &[&dyn Package], _incoming: &dyn Package) -> PushDecision {
            PushDecision::AcceptReplacing {
                version: self.0.clone(),
            }
        }
    }

    #[test]
    fn test_replacing_other_version_conflicts_with_indexed() {
        let (source, storage) = memory_source();
        source.push_package(artifact("S", "1.0.0"), KEY).unwrap();
        source.push_package(artifact("S", "2.0.0"), KEY).unwrap();

        source.set_push_strategy(Arc::new(Supersede(v("1.0.0"))));
        let again = PackageArtifact::new("S", v("2.0.0"), b"other".to_vec()).unwrap();
        let err = source.push_package(again, KEY).unwrap_err();
        assert!(matches!(err, RepoError::Conflict { .. }));

        assert_eq!(versions(&source.packages("S", false)), vec!["1.0.0", "2.0.0"]);
        assert_eq!(storage.content_of("s", &v("2.0.0")), Some(b"S 2.0.0".to_vec()));
        assert_eq!(storage.content_of("s", &v("1.0.0")), Some(b"S 1.0.0".to_vec()));
        assert_eq!(storage.operation_counts().stores, 2);
        assert_eq!(storage.operation_counts().deletes, 0);
    }

    #[test]
    fn test_replacing_other_version_supersedes_it() {
        let (source, storage) = memory_source();
        source.push_package(artifact("S", "1.0.0"), KEY).unwrap();

        source.set_push_strategy(Arc::new(Supersede(v("1.0.0"))));
        assert!(source.push_package(artifact("S", "1.1.0"), KEY).unwrap());

        assert_eq!(versions(&source.packages("S", false)), vec!["1.1.0"]);
        assert_eq!(storage.content_of("s", &v("1.0.0")), None);
        assert_eq!(storage.content_of("s", &v("1.1.0")), Some(b"S 1.1.0".to_vec()));
    }

    #[test]
    fn test_strategy_swap_applies_to_next_push() {
        let (source, _) = memory_source();
        assert_eq!(source.push_strategy().name(), "reject-existing");

        source.set_push_strategy(Arc::new(ReadOnly));
        assert_eq!(source.push_strategy().name(), "read-only");
        assert!(!source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap());

        source.set_push_strategy(PushPolicy::RejectExisting.strategy());
        assert!(source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap());
    }

    #[test]
    fn test_storage_failure_leaves_index_untouched() {
        let (source, storage) = memory_source();
        storage.fail_stores(true);

        let err = source.push_package(artifact("Fresh", "1.0.0"), KEY).unwrap_err();
        assert!(matches!(err, RepoError::Storage { .. }));
        assert!(source.all_packages().is_empty());
        assert!(source.canonical_id("fresh").is_none());

        // Retry after the storage recovers
        storage.fail_stores(false);
        assert!(source.push_package(artifact("Fresh", "1.0.0"), KEY).unwrap());
    }

    #[test]
    fn test_storage_failure_during_overwrite_keeps_old() {
        let (source, storage) = memory_source();
        source.set_push_strategy(Arc::new(AllowOverwrite));
        let original = artifact("Sample", "1.0.0");
        source.push_package(original.clone(), KEY).unwrap();

        storage.fail_stores(true);
        let again = PackageArtifact::new("Sample", v("1.0.0"), b"second".to_vec()).unwrap();
        assert!(source.push_package(again, KEY).is_err());

        assert_eq!(*source.package("Sample", &v("1.0.0"), false).unwrap(), original);
    }

    #[test]
    fn test_authorization() {
        let storage = MemoryStorage::new();
        let keys = ApiKeyStore::new(&[ApiKeyEntry::new("contoso").scoped("Contoso.*")]).unwrap();
        let source: PackageSource<PackageArtifact> =
            PackageSource::new(Arc::new(storage.clone()), Arc::new(keys));

        assert!(source.push_package(artifact("Contoso.Core", "1.0.0"), "contoso").unwrap());

        let attempts = [
            ("Contoso.Core", ""),
            ("Contoso.Core", "wrong"),
            ("Fabrikam", "contoso"),
        ];
        for (id, key) in attempts {
            let err = source.push_package(artifact(id, "2.0.0"), key).unwrap_err();
            assert!(matches!(err, RepoError::Authorization { .. }), "{id} / {key}");
        }

        assert_eq!(source.all_packages().len(), 1);
        assert_eq!(storage.operation_counts().stores, 1);
    }

    #[test]
    fn test_refresh_replaces_metadata_only() {
        let (source, storage) = memory_source();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("description".to_string(), "Refreshed".to_string());
        let update = PackageArtifact::new("SAMPLE", v("1.0.0"), b"ignored".to_vec())
            .unwrap()
            .with_metadata(metadata.clone());
        source.refresh_package(&update).unwrap();

        let stored = source.package("Sample", &v("1.0.0"), false).unwrap();
        assert_eq!(stored.metadata(), &metadata);
        assert_eq!(stored.id(), "Sample");
        assert_eq!(stored.read_all().unwrap(), b"Sample 1.0.0");
        assert_eq!(storage.operation_counts().metadata_updates, 1);
    }

    #[test]
    fn test_refresh_missing() {
        let (source, _) = memory_source();
        let err = source.refresh_package(&artifact("Sample", "1.0.0")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_id() {
        struct Loose(PackageArtifact, String);

        impl Package for Loose {
            fn id(&self) -> &str {
                &self.1
            }
            fn version(&self) -> &Version {
                self.0.version()
            }
            fn metadata(&self) -> &Metadata {
                self.0.metadata()
            }
            fn open_content(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
                self.0.open_content()
            }
            fn with_metadata(&self, metadata: Metadata) -> Self {
                Loose(self.0.with_metadata(metadata), self.1.clone())
            }
            fn with_id(&self, id: &str) -> Self {
                Loose(self.0.clone(), id.to_string())
            }
        }

        let source: PackageSource<Loose> =
            PackageSource::new(Arc::new(MemoryStorage::new()), Arc::new(AllowAnyKey));
        let err = source
            .push_package(Loose(artifact("Sample", "1.0.0"), "../etc".to_string()), KEY)
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidPackage(_)));
    }

    #[test]
    fn test_open_content() {
        let (source, _) = memory_source();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();

        let mut buf = Vec::new();
        source
            .open_content("sample", &v("1.0.0"))
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, b"Sample 1.0.0");

        assert!(matches!(
            source.open_content("sample", &v("9.0")),
            Err(RepoError::NotFound { .. })
        ));
    }

    #[test]
    fn test_retention_keeps_newest() {
        let (source, storage) = memory_source();
        let source = source.with_retention(RetentionPolicy {
            max_versions: Some(2),
        });

        for version in ["1.0.0", "2.0.0", "3.0.0", "4.0.0"] {
            source.push_package(artifact("Sample", version), KEY).unwrap();
        }

        assert_eq!(
            versions(&source.packages("Sample", false)),
            vec!["3.0.0", "4.0.0"]
        );
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_retention_spares_pushed_version() {
        let (source, _) = memory_source();
        let source = source.with_retention(RetentionPolicy {
            max_versions: Some(2),
        });

        source.push_package(artifact("Sample", "2.0.0"), KEY).unwrap();
        source.push_package(artifact("Sample", "3.0.0"), KEY).unwrap();
        source.push_package(artifact("Sample", "1.0.0"), KEY).unwrap();

        assert_eq!(
            versions(&source.packages("Sample", false)),
            vec!["1.0.0", "3.0.0"]
        );
    }

    #[test]
    fn test_latest_packages() {
        let (source, _) = memory_source();
        source.push_package(artifact("A", "1.0.0"), KEY).unwrap();
        source.push_package(artifact("A", "1.1.0"), KEY).unwrap();
        source.push_package(artifact("B", "0.1.0-alpha"), KEY).unwrap();

        let mut latest: Vec<String> = source
            .latest_packages()
            .iter()
            .map(|p| format!("{} {}", p.id(), p.version()))
            .collect();
        latest.sort();
        assert_eq!(latest, vec!["A 1.1.0", "B 0.1.0-alpha"]);
        assert_eq!(source.all_packages().len(), 3);
    }

    #[test]
    fn test_concurrent_pushes_same_id() {
        let (source, _) = memory_source();
        let shared = &source;

        std::thread::scope(|s| {
            for n in 0..16u32 {
                s.spawn(move || {
                    let package = PackageArtifact::new(
                        "Sample",
                        Version::new(1, n, 0, 0),
                        vec![n as u8],
                    )
                    .unwrap();
                    assert!(shared.push_package(package, KEY).unwrap());
                });
            }
        });

        let all = source.packages("Sample", false);
        assert_eq!(all.len(), 16);
        let expected: Vec<String> = (0..16).map(|n| format!("1.{}.0", n)).collect();
        assert_eq!(versions(&all), expected);
    }

    #[test]
    fn test_concurrent_duplicate_pushes_one_winner() {
        let (source, storage) = memory_source();
        let shared = &source;

        let accepted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8u8)
                .map(|n| {
                    s.spawn(move || {
                        let package =
                            PackageArtifact::new("Sample", Version::new(1, 0, 0, 0), vec![n])
                                .unwrap();
                        shared.push_package(package, KEY).unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(accepted, 1);
        assert_eq!(source.packages("Sample", false).len(), 1);
        assert_eq!(storage.operation_counts().stores, 1);
    }

    #[test]
    fn test_open_rebuilds_from_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
            let source: PackageSource<PackageArtifact> =
                PackageSource::open(storage, Arc::new(AllowAnyKey)).unwrap();
            source.push_package(artifact("NUnit", "2.5.9"), KEY).unwrap();
            source.push_package(artifact("NUnit", "2.6.0"), KEY).unwrap();
            source.push_package(artifact("NHibernate", "3.2.0.4000"), KEY).unwrap();
        }

        let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let source: PackageSource<PackageArtifact> =
            PackageSource::open(storage, Arc::new(AllowAnyKey)).unwrap();

        assert_eq!(source.all_packages().len(), 3);
        assert_eq!(
            source.latest_package("NUnit", false).unwrap().version(),
            &v("2.6.0")
        );
        assert_eq!(source.canonical_id("nhibernate").as_deref(), Some("NHibernate"));

        let mut buf = Vec::new();
        source
            .open_content("nunit", &v("2.5.9"))
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, b"NUnit 2.5.9");
    }
}
