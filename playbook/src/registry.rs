//! Playbook registry with versioned snapshots.
//!
//! Readers clone an `Arc` to the current snapshot and keep a consistent view
//! for the whole request. Applying overrides builds a new snapshot and swaps
//! it in; concurrent writers are last-writer-wins.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::domains::{builtin_providers, DomainProvider, GeneralDomain, GENERAL_DOMAIN_ID};
use crate::overrides::{InMemoryOverrideStore, OverrideSet, OverrideStore};
use crate::types::DomainPlaybook;
use crate::validation::validate_playbook;

/// Error types for playbook operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaybookError {
    /// A playbook failed invariant checks
    #[error("Invalid playbook '{id}': {}", issues.join("; "))]
    InvalidPlaybook { id: String, issues: Vec<String> },

    /// Document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Storage backend failed
    #[error("Store error: {0}")]
    Store(String),

    /// A guard rule pattern did not compile
    #[error("Invalid guard rule '{rule_id}': {message}")]
    InvalidGuardRule { rule_id: String, message: String },

    #[error("Guard ruleset unavailable: {0}")]
    RulesetUnavailable(String),
}

/// An immutable set of playbooks.
#[derive(Debug, Clone)]
pub struct PlaybookSnapshot {
    /// Monotonic snapshot number, 1 for the built-in defaults
    pub version: u64,
    /// SHA-256 over every playbook in id order
    pub hash: String,
    pub created_at: DateTime<Utc>,
    playbooks: BTreeMap<String, DomainPlaybook>,
}

impl PlaybookSnapshot {
    fn build(version: u64, playbooks: BTreeMap<String, DomainPlaybook>) -> Self {
        let hash = snapshot_hash(&playbooks);
        Self {
            version,
            hash,
            created_at: Utc::now(),
            playbooks,
        }
    }

    /// Snapshot made only of the built-in defaults.
    pub fn defaults() -> Self {
        let playbooks = builtin_providers()
            .iter()
            .map(|p| (p.id().to_string(), p.default_playbook()))
            .collect();
        Self::build(1, playbooks)
    }

    pub fn get(&self, domain_id: &str) -> Option<&DomainPlaybook> {
        self.playbooks.get(domain_id)
    }

    /// Playbook for a domain, or the general playbook for unknown ids.
    pub fn resolve(&self, domain_id: &str) -> DomainPlaybook {
        self.playbooks
            .get(domain_id)
            .or_else(|| self.playbooks.get(GENERAL_DOMAIN_ID))
            .cloned()
            .unwrap_or_else(|| GeneralDomain.default_playbook())
    }

    pub fn domain_ids(&self) -> impl Iterator<Item = &str> {
        self.playbooks.keys().map(String::as_str)
    }
}

/// Registry holding the current playbook snapshot.
pub struct PlaybookRegistry {
    current: RwLock<Arc<PlaybookSnapshot>>,
    store: Arc<dyn OverrideStore>,
}

impl PlaybookRegistry {
    /// Registry over the built-in defaults with an in-memory override store.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(InMemoryOverrideStore::new()))
    }

    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self {
            current: RwLock::new(Arc::new(PlaybookSnapshot::defaults())),
            store,
        }
    }

    /// Load persisted overrides and swap in the resulting snapshot.
    ///
    /// Invalid stored overrides are rejected and the defaults stay active.
    pub async fn load(&self) -> Result<Arc<PlaybookSnapshot>, PlaybookError> {
        let set = self.store.load().await?;
        if set.is_empty() {
            return Ok(self.snapshot().await);
        }
        check_set(&set)?;
        Ok(self.swap_in(&set).await)
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<PlaybookSnapshot> {
        self.current.read().await.clone()
    }

    /// Validate, persist and activate an override set.
    pub async fn apply_overrides(
        &self,
        set: OverrideSet,
    ) -> Result<Arc<PlaybookSnapshot>, PlaybookError> {
        check_set(&set)?;
        self.store.save(&set).await?;
        let snapshot = self.swap_in(&set).await;
        tracing::info!(
            snapshot_version = snapshot.version,
            snapshot_hash = %snapshot.hash,
            overridden = set.playbooks.len(),
            "Playbook overrides applied"
        );
        Ok(snapshot)
    }

    async fn swap_in(&self, set: &OverrideSet) -> Arc<PlaybookSnapshot> {
        let mut playbooks: BTreeMap<String, DomainPlaybook> = builtin_providers()
            .iter()
            .map(|p| (p.id().to_string(), p.default_playbook()))
            .collect();
        for playbook in &set.playbooks {
            playbooks.insert(playbook.id.clone(), playbook.clone());
        }

        let mut current = self.current.write().await;
        let snapshot = Arc::new(PlaybookSnapshot::build(current.version + 1, playbooks));
        *current = snapshot.clone();
        snapshot
    }
}

impl Default for PlaybookRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn check_set(set: &OverrideSet) -> Result<(), PlaybookError> {
    let mut seen = HashSet::new();
    for playbook in &set.playbooks {
        if !seen.insert(playbook.id.as_str()) {
            return Err(PlaybookError::InvalidPlaybook {
                id: playbook.id.clone(),
                issues: vec!["id appears more than once in the override set".to_string()],
            });
        }
        let issues = validate_playbook(playbook);
        if !issues.is_empty() {
            return Err(PlaybookError::InvalidPlaybook {
                id: playbook.id.clone(),
                issues,
            });
        }
    }
    Ok(())
}

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn snapshot_hash(playbooks: &BTreeMap<String, DomainPlaybook>) -> String {
    let mut hasher = Sha256::new();
    for (id, playbook) in playbooks {
        hasher.update(id.as_bytes());
        hasher.update(playbook.version.as_bytes());
        hasher.update(serde_json::to_string(playbook).unwrap_or_default().as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::provider_for;

    #[tokio::test]
    async fn test_defaults_snapshot() {
        let registry = PlaybookRegistry::with_defaults();
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.domain_ids().count(), 8);
        assert_eq!(snapshot.resolve("astrology").id, GENERAL_DOMAIN_ID);
        assert_eq!(snapshot.hash, PlaybookSnapshot::defaults().hash);
    }

    #[tokio::test]
    async fn test_override_creates_new_version() {
        let registry = PlaybookRegistry::with_defaults();
        let before = registry.snapshot().await;

        let mut music = provider_for("music").unwrap().default_playbook();
        music.version = "2.0.0".to_string();
        let after = registry
            .apply_overrides(OverrideSet {
                playbooks: vec![music],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(after.version, 2);
        assert_ne!(after.hash, before.hash);
        assert_eq!(after.resolve("music").version, "2.0.0");
        // Readers holding the old Arc keep their view
        assert_eq!(before.resolve("music").version, "1.1.0");
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected_and_not_saved() {
        let store = Arc::new(InMemoryOverrideStore::new());
        let registry = PlaybookRegistry::new(store.clone());

        let mut sport = provider_for("sport").unwrap().default_playbook();
        sport.resource_policy.max_resources = 9;
        let result = registry
            .apply_overrides(OverrideSet {
                playbooks: vec![sport],
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(PlaybookError::InvalidPlaybook { .. })));
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(registry.snapshot().await.version, 1);
    }

    #[tokio::test]
    async fn test_duplicate_override_ids_rejected() {
        let store = Arc::new(InMemoryOverrideStore::new());
        let registry = PlaybookRegistry::new(store.clone());

        let mut first = provider_for("music").unwrap().default_playbook();
        first.version = "2.0.0".to_string();
        let mut second = first.clone();
        second.version = "3.0.0".to_string();
        let result = registry
            .apply_overrides(OverrideSet {
                playbooks: vec![first, second],
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(PlaybookError::InvalidPlaybook { ref id, .. }) if id == "music"));
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(registry.snapshot().await.resolve("music").version, "1.1.0");
    }

    #[tokio::test]
    async fn test_load_applies_stored_overrides() {
        let mut cooking = provider_for("cooking").unwrap().default_playbook();
        cooking.profile_label = "Batch cooking".to_string();
        let store = Arc::new(InMemoryOverrideStore::with_set(OverrideSet {
            playbooks: vec![cooking],
            ..Default::default()
        }));

        let registry = PlaybookRegistry::new(store);
        let snapshot = registry.load().await.unwrap();
        assert_eq!(snapshot.resolve("cooking").profile_label, "Batch cooking");
    }

    #[test]
    fn test_compute_hash() {
        let hash1 = compute_hash(b"hello");
        let hash2 = compute_hash(b"hello");
        let hash3 = compute_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }
}
