//! Intent gates.
//!
//! Each gate inspects the intent and returns a [`GateVerdict`]:
//! - **Actionability**: is there something to do at all
//! - **Safety**: lexicon patterns, then an admin-editable guard ruleset
//! - **Realism**: implausible levels, scopes and timeframes
//! - **Controllability**: does success depend on other people or chance
//!
//! Gates never fail. A generator-backed gate that cannot reach its backend
//! returns a neutral, degraded verdict instead.

mod actionability;
mod controllability;
pub mod patterns;
mod realism;
mod safety;

pub use actionability::{ActionabilityClass, ActionabilityGate};
pub use controllability::ControllabilityGate;
pub use realism::RealismGate;
pub use safety::{AssistedSafetyGate, LexiconSafetyGate};

use crate::types::{GateName, GateVerdict, Locale};

/// What a gate sees of the intent.
#[derive(Debug, Clone)]
pub struct GateInput {
    /// Text as seen by this gate (insults already stripped after safety)
    pub text: String,
    /// Normalized form of `text`
    pub normalized: String,
    pub days: u32,
    pub locale: Locale,
}

impl GateInput {
    pub fn new(text: impl Into<String>, days: u32, locale: Locale) -> Self {
        let text = text.into();
        let normalized = patterns::normalize(&text);
        Self {
            text,
            normalized,
            days,
            locale,
        }
    }

    /// Same request with replacement text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::new(text, self.days, self.locale)
    }
}

/// Common trait for gates.
#[async_trait::async_trait]
pub trait Gate: Send + Sync {
    /// Pipeline stage this gate implements.
    fn name(&self) -> GateName;

    /// Evaluate the intent.
    async fn evaluate(&self, input: &GateInput) -> GateVerdict;
}
