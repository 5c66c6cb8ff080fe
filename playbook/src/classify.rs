//! Keyword domain classifier.
//!
//! Scores normalized words of an intent against the keyword table of every
//! built-in domain. The highest score wins, ties go to the domain declared
//! first, and a zero score falls back to `general`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domains::{builtin_providers, DomainProvider, GENERAL_DOMAIN_ID};
use crate::text::{normalize, tokens};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// CEFR-style level codes (`a1` to `c2`).
static LEVEL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[abc][12]$").unwrap());

/// Keywords at least this long also match as a prefix (`guitar` matches `guitars`).
const PREFIX_MATCH_MIN_LEN: usize = 5;

/// How sure the heuristic is about its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Result of classifying one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub domain_id: String,
    pub score: usize,
    pub confidence: Confidence,
    /// Words that matched a keyword of the winning domain
    pub matched: Vec<String>,
}

impl Classification {
    fn general() -> Self {
        Self {
            domain_id: GENERAL_DOMAIN_ID.to_string(),
            score: 0,
            confidence: Confidence::Low,
            matched: Vec::new(),
        }
    }
}

struct DomainKeywords {
    id: &'static str,
    keywords: &'static [&'static str],
}

/// Heuristic keyword classifier over the built-in domains.
pub struct DomainClassifier {
    table: Vec<DomainKeywords>,
}

impl DomainClassifier {
    /// Classifier over all built-in providers, in declaration order.
    pub fn builtin() -> Self {
        Self::from_providers(&builtin_providers())
    }

    pub fn from_providers(providers: &[Box<dyn DomainProvider>]) -> Self {
        let table = providers
            .iter()
            .filter(|p| !p.keywords().is_empty())
            .map(|p| DomainKeywords {
                id: p.id(),
                keywords: p.keywords(),
            })
            .collect();
        Self { table }
    }

    /// Ids the classifier can return, general included.
    pub fn known_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.table.iter().map(|d| d.id).collect();
        ids.push(GENERAL_DOMAIN_ID);
        ids
    }

    /// Classify raw intent text.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = normalize(text);
        let words = tokens(&normalized);

        if words.iter().any(|w| LEVEL_CODE.is_match(w)) {
            if let Some(language) = self.table.iter().find(|d| d.id == "language") {
                let matched: Vec<String> = words
                    .iter()
                    .filter(|w| LEVEL_CODE.is_match(w) || keyword_hit(language.keywords, w))
                    .map(|w| (*w).to_string())
                    .collect();
                return Classification {
                    domain_id: language.id.to_string(),
                    score: matched.len(),
                    confidence: Confidence::High,
                    matched,
                };
            }
        }

        let mut scores: Vec<(usize, Vec<String>)> = Vec::with_capacity(self.table.len());
        for domain in &self.table {
            let matched: Vec<String> = words
                .iter()
                .filter(|w| keyword_hit(domain.keywords, w))
                .map(|w| (*w).to_string())
                .collect();
            scores.push((matched.len(), matched));
        }

        // First maximum wins, which is the declaration-order tie-break.
        let mut best: Option<usize> = None;
        for (i, (score, _)) in scores.iter().enumerate() {
            if *score > 0 && best.map_or(true, |b| *score > scores[b].0) {
                best = Some(i);
            }
        }

        let Some(best) = best else {
            return Classification::general();
        };

        let best_score = scores[best].0;
        let runner_up = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best)
            .map(|(_, (s, _))| *s)
            .max()
            .unwrap_or(0);

        let confidence = if runner_up == best_score {
            Confidence::Low
        } else if best_score >= 2 {
            Confidence::High
        } else if runner_up == 0 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let (score, matched) = scores.swap_remove(best);
        Classification {
            domain_id: self.table[best].id.to_string(),
            score,
            confidence,
            matched,
        }
    }
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

fn keyword_hit(keywords: &[&str], word: &str) -> bool {
    keywords.iter().any(|k| {
        *k == word || (k.len() >= PREFIX_MATCH_MIN_LEN && word.starts_with(k))
    })
}

/// Whether normalized text carries a CEFR level code.
pub fn has_level_code(text: &str) -> bool {
    let normalized = normalize(text);
    tokens(&normalized).iter().any(|w| LEVEL_CODE.is_match(w))
}
