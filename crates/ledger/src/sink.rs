use releve_core::{LedgerTarget, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ledger API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Amount does not fit in milliunits for {0}")]
    AmountOutOfRange(String),
    #[error("Missing API key: set {0}")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSummary {
    pub accepted: usize,
    pub duplicates: usize,
}

/// Destination for finished batches. Callers hand over batches that are
/// already deduplicated and free of future-dated entries.
pub trait LedgerSink: Send + Sync {
    fn submit(
        &self,
        target: &LedgerTarget,
        transactions: &[Transaction],
    ) -> impl Future<Output = Result<SubmitSummary, LedgerError>> + Send;
}

/// Keeps submitted batches in memory and reports an import id seen before as
/// a duplicate, the way the remote ledger does. Backs `--dry-run`.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    batches: Vec<(LedgerTarget, Vec<Transaction>)>,
    seen: HashSet<(String, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(LedgerTarget, Vec<Transaction>)> {
        self.lock().batches.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LedgerSink for RecordingSink {
    async fn submit(
        &self,
        target: &LedgerTarget,
        transactions: &[Transaction],
    ) -> Result<SubmitSummary, LedgerError> {
        let mut state = self.lock();
        let mut summary = SubmitSummary::default();
        for tx in transactions {
            // Import ids are unique per account on the ledger side.
            let key = (target.account_id.to_string(), tx.import_id());
            if state.seen.insert(key) {
                summary.accepted += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        state.batches.push((target.clone(), transactions.to_vec()));
        Ok(summary)
    }
}
