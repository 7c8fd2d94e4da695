use releve_core::{CorrectionStore, RawRow, StoreError, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::builder::{parse_row, ImportError, RowError};
use crate::formatter::PayeeFormatter;
use crate::util::non_blank;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No row {0} in the review batch")]
    UnknownRow(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub transaction: Transaction,
    /// Payee as inferred from the label, before corrections.
    pub inferred_payee: Option<String>,
}

/// What the reviewer submitted for one row. `None` leaves a field untouched,
/// a blank value clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEdit {
    pub index: usize,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedBatch {
    pub transactions: Vec<Transaction>,
    pub learned: usize,
}

/// One export on its way through human review.
#[derive(Debug, Clone, Default)]
pub struct ReviewBatch {
    entries: Vec<ReviewEntry>,
}

impl ReviewBatch {
    /// Builds every row and applies the current corrections for display.
    pub async fn prepare<S: CorrectionStore>(
        rows: &[RawRow],
        formatter: &PayeeFormatter<'_, S>,
    ) -> Result<Self, RowError> {
        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let at_row = |source: ImportError| RowError { index, source };
            let mut transaction = parse_row(row).map_err(at_row)?;
            let inferred_payee = transaction.payee.clone();
            transaction.payee = formatter
                .format_opt(inferred_payee.as_deref())
                .await
                .map_err(|e| at_row(e.into()))?;
            entries.push(ReviewEntry {
                transaction,
                inferred_payee,
            });
        }
        Ok(ReviewBatch { entries })
    }

    pub fn entries(&self) -> &[ReviewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the reviewer's edits. A submitted payee that differs from the
    /// displayed one is learned as a correction of the inferred payee.
    /// Every index is checked before anything is learned.
    pub async fn accept<S: CorrectionStore>(
        self,
        edits: &[RowEdit],
        formatter: &PayeeFormatter<'_, S>,
    ) -> Result<AcceptedBatch, ReviewError> {
        self.check_indices(edits)?;

        let mut entries = self.entries;
        let mut learned = 0;
        for edit in edits {
            if let Some((inferred, adjusted)) = apply_edit(&mut entries[edit.index], edit) {
                if formatter.learn(&inferred, &adjusted).await? {
                    learned += 1;
                }
            }
        }

        info!(rows = entries.len(), learned, "review accepted");
        Ok(AcceptedBatch {
            transactions: entries.into_iter().map(|e| e.transaction).collect(),
            learned,
        })
    }

    /// Applies the reviewer's edits without learning anything from them.
    pub fn apply(self, edits: &[RowEdit]) -> Result<Vec<Transaction>, ReviewError> {
        self.check_indices(edits)?;

        let mut entries = self.entries;
        for edit in edits {
            apply_edit(&mut entries[edit.index], edit);
        }
        Ok(entries.into_iter().map(|e| e.transaction).collect())
    }

    fn check_indices(&self, edits: &[RowEdit]) -> Result<(), ReviewError> {
        match edits.iter().find(|e| e.index >= self.entries.len()) {
            Some(edit) => Err(ReviewError::UnknownRow(edit.index)),
            None => Ok(()),
        }
    }
}

/// Returns the `(inferred, submitted)` pair to learn when the payee changed.
fn apply_edit(entry: &mut ReviewEntry, edit: &RowEdit) -> Option<(String, String)> {
    let mut correction = None;
    if let Some(payee) = &edit.payee {
        let submitted = non_blank(payee);
        if submitted != entry.transaction.payee {
            if let (Some(inferred), Some(adjusted)) = (&entry.inferred_payee, &submitted) {
                correction = Some((inferred.clone(), adjusted.clone()));
            }
            entry.transaction.payee = submitted;
        }
    }
    if let Some(memo) = &edit.memo {
        entry.transaction.memo = non_blank(memo);
    }
    correction
}
