//! Built-in domain definitions.
//!
//! Each domain provides a default playbook and the keyword table the
//! heuristic classifier scores intents against. Declaration order matters:
//! it is the tie-break order of the classifier.

pub mod cooking;
pub mod creative;
pub mod general;
pub mod language;
pub mod music;
pub mod sport;
pub mod tech;
pub mod wellbeing;

pub use cooking::CookingDomain;
pub use creative::CreativeDomain;
pub use general::GeneralDomain;
pub use language::LanguageDomain;
pub use music::MusicDomain;
pub use sport::SportDomain;
pub use tech::TechDomain;
pub use wellbeing::WellbeingDomain;

use crate::types::DomainPlaybook;

/// Id of the fallback domain used when nothing scores.
pub const GENERAL_DOMAIN_ID: &str = "general";

/// Trait for domain-specific playbook content.
pub trait DomainProvider: Send + Sync {
    /// Domain identifier
    fn id(&self) -> &'static str;

    /// Default playbook for this domain
    fn default_playbook(&self) -> DomainPlaybook;

    /// Normalized (lowercase, accent-folded) keyword stems
    fn keywords(&self) -> &'static [&'static str];

    /// Domain-specific system prompt fragment
    fn prompt_fragment(&self) -> String;
}

/// All built-in providers in classifier declaration order.
///
/// The general domain comes last and carries no keywords.
pub fn builtin_providers() -> Vec<Box<dyn DomainProvider>> {
    vec![
        Box::new(LanguageDomain),
        Box::new(MusicDomain),
        Box::new(SportDomain),
        Box::new(TechDomain),
        Box::new(CreativeDomain),
        Box::new(CookingDomain),
        Box::new(WellbeingDomain),
        Box::new(GeneralDomain),
    ]
}

/// Look up a built-in provider by id.
pub fn provider_for(id: &str) -> Option<Box<dyn DomainProvider>> {
    builtin_providers().into_iter().find(|p| p.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_unique_and_ordered() {
        let ids: Vec<&str> = builtin_providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids.first(), Some(&"language"));
        assert_eq!(ids.last(), Some(&GENERAL_DOMAIN_ID));

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_playbook_ids_match_providers() {
        for provider in builtin_providers() {
            assert_eq!(provider.default_playbook().id, provider.id());
        }
    }

    #[test]
    fn test_prompt_fragment_lookup() {
        let fragment = provider_for("language").unwrap().prompt_fragment();
        assert!(fragment.contains("LANGUAGE DOMAIN"));
        assert!(provider_for("astrology").is_none());
    }
}
