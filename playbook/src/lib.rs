//! Domain playbooks for ritual generation.
//!
//! A playbook bundles the per-domain policy used when turning a learning
//! goal into a ritual: allowed effort types and their weights, tone rules,
//! remediation rules and resource limits.
//!
//! # Key Components
//!
//! - [`PlaybookRegistry`]: Versioned snapshots of playbooks, overridable at runtime
//! - [`DomainClassifier`]: Keyword heuristic mapping an intent to a domain
//! - [`LexiconGuard`]: Compiled admin-editable guard ruleset
//! - [`PromptAssembler`]: Builds generator instructions from playbooks
//!
//! # Example
//!
//! ```ignore
//! use playbook::{DomainClassifier, PlaybookRegistry, PromptAssembler};
//!
//! let registry = PlaybookRegistry::with_defaults();
//! let classification = DomainClassifier::builtin().classify("Improve my Spanish vocabulary");
//! let playbook = registry.snapshot().await.resolve(&classification.domain_id);
//! let prompt = PromptAssembler::plan_prompt(&playbook, &playbook.lock(), &targets, "[ritual:v1]");
//! ```

pub mod classify;
pub mod domains;
pub mod guard;
pub mod overrides;
pub mod prompt;
pub mod registry;
pub mod text;
pub mod types;
pub mod validation;

// Re-export main types
pub use classify::{Classification, Confidence, DomainClassifier};
pub use domains::{builtin_providers, provider_for, DomainProvider, GENERAL_DOMAIN_ID};
pub use guard::{GuardHit, GuardRule, GuardRuleset, GuardRulesetSource, InMemoryGuardRulesetSource, LexiconGuard};
pub use overrides::{InMemoryOverrideStore, OverrideSet, OverrideStore};
pub use prompt::{PlanTargets, PromptAssembler};
pub use registry::{compute_hash, PlaybookError, PlaybookRegistry, PlaybookSnapshot};
pub use types::*;
pub use validation::validate_playbook;
