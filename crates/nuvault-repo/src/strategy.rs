//! Push acceptance policies
//!
//! A strategy looks at what is already published for an id and at the
//! incoming package, and decides what a push does. It never touches the
//! index itself; the package source applies the decision inside the id's
//! critical section.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use nuvault_core::{Package, Version};

/// Outcome of a push decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDecision {
    /// Store the package next to the existing versions
    Accept,

    /// Store the package in place of an existing version
    AcceptReplacing { version: Version },

    /// Do not store anything
    Reject { reason: String },
}

impl PushDecision {
    pub fn reject(reason: impl Into<String>) -> Self {
        PushDecision::Reject {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, PushDecision::Reject { .. })
    }
}

/// Pluggable push policy
///
/// `existing` holds the artifacts already indexed for the incoming id, in
/// ascending version order.
pub trait PushStrategy: Send + Sync + fmt::Debug {
    /// Short policy name for logs and listings
    fn name(&self) -> &str;

    fn decide(&self, existing: &[&dyn Package], incoming: &dyn Package) -> PushDecision;
}

fn find_version<'a>(existing: &[&'a dyn Package], version: &Version) -> Option<&'a dyn Package> {
    existing.iter().copied().find(|p| p.version() == version)
}

/// Published versions are immutable: re-pushing one is rejected
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectExisting;

impl PushStrategy for RejectExisting {
    fn name(&self) -> &str {
        "reject-existing"
    }

    fn decide(&self, existing: &[&dyn Package], incoming: &dyn Package) -> PushDecision {
        match find_version(existing, incoming.version()) {
            Some(found) => PushDecision::reject(format!(
                "{} {} is already published",
                found.id(),
                found.version()
            )),
            None => PushDecision::Accept,
        }
    }
}

/// Re-pushing a published version replaces it
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowOverwrite;

impl PushStrategy for AllowOverwrite {
    fn name(&self) -> &str {
        "allow-overwrite"
    }

    fn decide(&self, existing: &[&dyn Package], incoming: &dyn Package) -> PushDecision {
        match find_version(existing, incoming.version()) {
            Some(found) => PushDecision::AcceptReplacing {
                version: found.version().clone(),
            },
            None => PushDecision::Accept,
        }
    }
}

/// Only versions above the current latest are accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOlder;

impl PushStrategy for RejectOlder {
    fn name(&self) -> &str {
        "reject-older"
    }

    fn decide(&self, existing: &[&dyn Package], incoming: &dyn Package) -> PushDecision {
        match existing.iter().map(|p| p.version()).max() {
            Some(latest) if incoming.version() <= latest => PushDecision::reject(format!(
                "{} {} is not newer than the latest published version {}",
                incoming.id(),
                incoming.version(),
                latest
            )),
            _ => PushDecision::Accept,
        }
    }
}

/// Rejects every push
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly;

impl PushStrategy for ReadOnly {
    fn name(&self) -> &str {
        "read-only"
    }

    fn decide(&self, _existing: &[&dyn Package], _incoming: &dyn Package) -> PushDecision {
        PushDecision::reject("repository is read-only")
    }
}

/// Named push policy, as written in repository settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushPolicy {
    /// Published versions can never be replaced (default)
    #[default]
    RejectExisting,

    /// Same version re-push replaces the stored package
    AllowOverwrite,

    /// Versions must increase monotonically
    RejectOlder,

    /// No pushes at all
    ReadOnly,
}

impl PushPolicy {
    /// Build the strategy object for this policy
    pub fn strategy(self) -> Arc<dyn PushStrategy> {
        match self {
            PushPolicy::RejectExisting => Arc::new(RejectExisting),
            PushPolicy::AllowOverwrite => Arc::new(AllowOverwrite),
            PushPolicy::RejectOlder => Arc::new(RejectOlder),
            PushPolicy::ReadOnly => Arc::new(ReadOnly),
        }
    }
}

impl fmt::Display for PushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PushPolicy::RejectExisting => "reject-existing",
            PushPolicy::AllowOverwrite => "allow-overwrite",
            PushPolicy::RejectOlder => "reject-older",
            PushPolicy::ReadOnly => "read-only",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuvault_core::PackageArtifact;

    fn artifact(version: &str) -> PackageArtifact {
        PackageArtifact::new("Sample", Version::parse(version).unwrap(), b"".to_vec()).unwrap()
    }

    fn decide(
        strategy: &dyn PushStrategy,
        existing: &[PackageArtifact],
        incoming: &str,
    ) -> PushDecision {
        let existing: Vec<&dyn Package> = existing.iter().map(|p| p as &dyn Package).collect();
        strategy.decide(&existing, &artifact(incoming))
    }

    #[test]
    fn test_reject_existing() {
        let existing = [artifact("1.0.0")];
        assert_eq!(decide(&RejectExisting, &existing, "2.0.0"), PushDecision::Accept);
        assert!(!decide(&RejectExisting, &existing, "1.0.0").is_accepted());
        assert!(!decide(&RejectExisting, &existing, "1.0").is_accepted());
    }

    #[test]
    fn test_allow_overwrite() {
        let existing = [artifact("1.0.0")];
        assert_eq!(decide(&AllowOverwrite, &existing, "1.1.0"), PushDecision::Accept);
        assert_eq!(
            decide(&AllowOverwrite, &existing, "1.0.0"),
            PushDecision::AcceptReplacing {
                version: Version::parse("1.0.0").unwrap()
            }
        );
    }

    #[test]
    fn test_reject_older() {
        let existing = [artifact("1.0.0"), artifact("2.0.0")];
        assert_eq!(decide(&RejectOlder, &existing, "2.0.1"), PushDecision::Accept);
        assert!(!decide(&RejectOlder, &existing, "2.0.0").is_accepted());
        assert!(!decide(&RejectOlder, &existing, "1.5.0").is_accepted());
        assert!(decide(&RejectOlder, &existing, "2.0.1-beta").is_accepted());
        assert_eq!(decide(&RejectOlder, &[], "0.0.1"), PushDecision::Accept);
    }

    #[test]
    fn test_read_only() {
        assert!(!decide(&ReadOnly, &[], "1.0.0").is_accepted());
    }

    #[test]
    fn test_policy_names_match_strategies() {
        for policy in [
            PushPolicy::RejectExisting,
            PushPolicy::AllowOverwrite,
            PushPolicy::RejectOlder,
            PushPolicy::ReadOnly,
        ] {
            assert_eq!(policy.strategy().name(), policy.to_string());
        }
    }

    #[test]
    fn test_policy_serde() {
        let policy: PushPolicy = serde_yaml::from_str("allow-overwrite").unwrap();
        assert_eq!(policy, PushPolicy::AllowOverwrite);
        assert_eq!(PushPolicy::default(), PushPolicy::RejectExisting);
    }
}
