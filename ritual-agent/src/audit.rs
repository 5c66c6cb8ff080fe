//! Usage ledger for generator calls.
//!
//! Records every call made through the service: which task, which backend,
//! how it ended and what it cost.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::task::GenerationTask;
use crate::types::GenerationCost;

/// Maximum entries in the ledger before pruning.
const MAX_LEDGER_ENTRIES: usize = 10_000;

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// An entry in the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub entry_id: String,
    pub task: GenerationTask,
    /// Backend that served the call (absent when none was available)
    pub backend_id: Option<String>,
    pub outcome: CallOutcome,
    pub cost: GenerationCost,
    /// Error message for failed calls
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(task: GenerationTask, outcome: CallOutcome) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            task,
            backend_id: None,
            outcome,
            cost: GenerationCost::default(),
            error: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_backend(mut self, backend_id: impl Into<String>) -> Self {
        self.backend_id = Some(backend_id.into());
        self
    }

    pub fn with_cost(mut self, cost: GenerationCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Ledger of generator calls (newest first).
pub struct UsageLedger {
    entries: Arc<RwLock<VecDeque<LedgerEntry>>>,
    max_entries: usize,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_LEDGER_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Record a call.
    pub async fn record(&self, entry: LedgerEntry) {
        let mut entries = self.entries.write().await;
        entries.push_front(entry);

        while entries.len() > self.max_entries {
            entries.pop_back();
        }
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<LedgerEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Get entries for a task.
    pub async fn by_task(&self, task: GenerationTask, limit: usize) -> Vec<LedgerEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.task == task)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get statistics.
    pub async fn stats(&self) -> LedgerStats {
        let entries = self.entries.read().await;

        let count = |outcome: CallOutcome| entries.iter().filter(|e| e.outcome == outcome).count();

        LedgerStats {
            total_calls: entries.len(),
            succeeded: count(CallOutcome::Succeeded),
            failed: count(CallOutcome::Failed),
            timed_out: count(CallOutcome::TimedOut),
            input_tokens: entries.iter().map(|e| u64::from(e.cost.input_tokens)).sum(),
            output_tokens: entries.iter().map(|e| u64::from(e.cost.output_tokens)).sum(),
        }
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Clear the ledger.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_calls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}
