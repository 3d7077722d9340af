//! Push API key validation
//!
//! Key issuance lives elsewhere; the repository only asks whether a key may
//! push a given id. Keys can be scoped to glob patterns over package ids
//! (`Contoso.*`), matched case-insensitively.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::error::Result;

/// Decides whether an API key may push a package id
pub trait KeyValidator: Send + Sync {
    fn is_valid(&self, id: &str, api_key: &str) -> bool;
}

/// Accepts any non-empty key (development setups)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnyKey;

impl KeyValidator for AllowAnyKey {
    fn is_valid(&self, _id: &str, api_key: &str) -> bool {
        !api_key.is_empty()
    }
}

/// One configured key and the ids it may push
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,

    /// Glob patterns over package ids; empty means every id
    #[serde(default)]
    pub packages: Vec<String>,
}

impl ApiKeyEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            packages: Vec::new(),
        }
    }

    /// Restrict the key to ids matching `pattern`
    pub fn scoped(mut self, pattern: impl Into<String>) -> Self {
        self.packages.push(pattern.into());
        self
    }
}

impl fmt::Debug for ApiKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyEntry")
            .field("key", &"<redacted>")
            .field("packages", &self.packages)
            .finish()
    }
}

struct CompiledKey {
    key: String,
    patterns: Vec<Pattern>,
}

/// Validator backed by a fixed list of scoped keys
pub struct ApiKeyStore {
    keys: Vec<CompiledKey>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl ApiKeyStore {
    /// Compile the configured entries; fails on an invalid glob pattern
    pub fn new(entries: &[ApiKeyEntry]) -> Result<Self> {
        let keys = entries
            .iter()
            .map(|entry| {
                let patterns = entry
                    .packages
                    .iter()
                    .map(|p| Pattern::new(p))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(CompiledKey {
                    key: entry.key.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl KeyValidator for ApiKeyStore {
    fn is_valid(&self, id: &str, api_key: &str) -> bool {
        if api_key.is_empty() {
            return false;
        }
        self.keys.iter().any(|entry| {
            constant_time_eq(entry.key.as_bytes(), api_key.as_bytes())
                && (entry.patterns.is_empty()
                    || entry
                        .patterns
                        .iter()
                        .any(|p| p.matches_with(id, MATCH_OPTIONS)))
        })
    }
}

/// Key comparison whose timing does not depend on where the keys differ
fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    if expected.len() != provided.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    expected.ct_eq(provided).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_any_key() {
        assert!(AllowAnyKey.is_valid("Sample", "anything"));
        assert!(!AllowAnyKey.is_valid("Sample", ""));
    }

    #[test]
    fn test_unscoped_key() {
        let store = ApiKeyStore::new(&[ApiKeyEntry::new("s3cret")]).unwrap();
        assert!(store.is_valid("Sample", "s3cret"));
        assert!(store.is_valid("Other.Package", "s3cret"));
        assert!(!store.is_valid("Sample", "wrong"));
        assert!(!store.is_valid("Sample", ""));
    }

    #[test]
    fn test_scoped_key() {
        let store = ApiKeyStore::new(&[
            ApiKeyEntry::new("contoso").scoped("Contoso.*"),
            ApiKeyEntry::new("admin"),
        ])
        .unwrap();

        assert!(store.is_valid("Contoso.Core", "contoso"));
        assert!(store.is_valid("contoso.logging", "contoso"));
        assert!(!store.is_valid("Fabrikam.Core", "contoso"));
        assert!(store.is_valid("Fabrikam.Core", "admin"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = ApiKeyStore::new(&[ApiKeyEntry::new("k").scoped("[unclosed")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let entry = ApiKeyEntry::new("top-secret").scoped("A.*");
        let rendered = format!("{:?}", entry);
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("A.*"));
    }
}
