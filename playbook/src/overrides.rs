//! Admin-editable playbook overrides.
//!
//! An override set replaces whole playbooks by domain id. The store only
//! persists sets; validation happens in the registry before `save` is called.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::registry::PlaybookError;
use crate::types::DomainPlaybook;

/// A set of playbook replacements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSet {
    pub playbooks: Vec<DomainPlaybook>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }

    /// Parse an override set from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlaybookError> {
        serde_yaml::from_str(yaml).map_err(|e| PlaybookError::Parse(e.to_string()))
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, PlaybookError> {
        serde_yaml::to_string(self).map_err(|e| PlaybookError::Parse(e.to_string()))
    }
}

/// Storage for override sets.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Load the current set. Returns an empty set when nothing was saved.
    async fn load(&self) -> Result<OverrideSet, PlaybookError>;

    /// Persist a set that has already been validated.
    async fn save(&self, set: &OverrideSet) -> Result<(), PlaybookError>;
}

/// Process-local override store.
#[derive(Clone, Default)]
pub struct InMemoryOverrideStore {
    current: Arc<RwLock<Option<OverrideSet>>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. from a YAML file read at startup.
    pub fn with_set(set: OverrideSet) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(set))),
        }
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn load(&self) -> Result<OverrideSet, PlaybookError> {
        Ok(self.current.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, set: &OverrideSet) -> Result<(), PlaybookError> {
        *self.current.write().await = Some(set.clone());
        Ok(())
    }
}
