//! Domain resolution.
//!
//! Labels the intent with a domain, resolves the matching playbook from the
//! current registry snapshot and produces the [`DomainLock`] copied into the
//! generated path.

use std::sync::Arc;

use playbook::{
    Classification, Confidence, DomainClassifier, DomainLock, DomainPlaybook, PlaybookRegistry,
    PromptAssembler,
};
use ritual_agent::{GenerationTask, GeneratorService};
use tracing::{debug, warn};

use crate::types::{DomainSource, GateName, GateVerdict};

/// Outcome of resolving a domain.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub lock: DomainLock,
    pub playbook: DomainPlaybook,
    pub confidence: Confidence,
    pub source: DomainSource,
    /// Registry snapshot the playbook came from
    pub snapshot_version: u64,
    /// The generator fallback was attempted and failed
    pub degraded: Option<String>,
}

impl Resolution {
    /// Trace verdict for the domain stage.
    pub fn verdict(&self) -> GateVerdict {
        let verdict = match &self.degraded {
            Some(error) => GateVerdict::degraded(GateName::Domain, error.clone()),
            None => GateVerdict::ok(GateName::Domain).with_meta("confidence", self.confidence.as_str()),
        };
        verdict
            .with_meta("domain", &self.lock.domain_id)
            .with_meta("domain_version", &self.lock.domain_version)
            .with_meta("source", self.source)
            .with_meta("snapshot_version", self.snapshot_version)
    }
}

/// Resolves intents to domain playbooks.
pub struct DomainResolver {
    classifier: Arc<DomainClassifier>,
    registry: Arc<PlaybookRegistry>,
    generator: Option<Arc<GeneratorService>>,
}

impl DomainResolver {
    pub fn new(classifier: Arc<DomainClassifier>, registry: Arc<PlaybookRegistry>) -> Self {
        Self {
            classifier,
            registry,
            generator: None,
        }
    }

    /// Ask the generator when the heuristic confidence is low.
    pub fn with_generator_fallback(mut self, generator: Arc<GeneratorService>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn resolve(&self, text: &str) -> Resolution {
        let classification = self.classifier.classify(text);
        debug!(
            domain = %classification.domain_id,
            confidence = classification.confidence.as_str(),
            score = classification.score,
            "Heuristic domain"
        );

        let (domain_id, confidence, source, degraded) = match &self.generator {
            Some(generator) if classification.confidence == Confidence::Low => {
                match self.label(generator, text).await {
                    Ok(label) => (label, Confidence::Medium, DomainSource::Generator, None),
                    Err(error) => {
                        warn!(error = %error, "Domain label fallback failed, keeping heuristic");
                        heuristic(classification, Some(error))
                    }
                }
            }
            _ => heuristic(classification, None),
        };

        let snapshot = self.registry.snapshot().await;
        let playbook = snapshot.resolve(&domain_id);
        Resolution {
            lock: playbook.lock(),
            playbook,
            confidence,
            source,
            snapshot_version: snapshot.version,
            degraded,
        }
    }

    /// One label constrained to known ids.
    async fn label(&self, generator: &GeneratorService, text: &str) -> Result<String, String> {
        let known = self.classifier.known_ids();
        let task = GenerationTask::DomainLabel;
        let request = GeneratorService::request_for(
            task,
            PromptAssembler::domain_label_prompt(&known),
            text.to_string(),
        );

        let outcome = generator
            .generate(task, request)
            .await
            .map_err(|e| e.to_string())?;
        let label = outcome
            .content
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase();

        if known.contains(&label.as_str()) {
            Ok(label)
        } else {
            Err(format!("unknown domain label '{}'", label))
        }
    }
}

fn heuristic(
    classification: Classification,
    degraded: Option<String>,
) -> (String, Confidence, DomainSource, Option<String>) {
    (
        classification.domain_id,
        classification.confidence,
        DomainSource::Heuristic,
        degraded,
    )
}
