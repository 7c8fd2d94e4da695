use chrono::NaiveDate;
use releve_core::{parse_amount, AmountError, CorrectionStore, RawRow, StoreError, Transaction};
use thiserror::Error;
use tracing::{error, info};

use crate::formatter::PayeeFormatter;
use crate::label::{self, LabelError};
use crate::normalize::normalize;

/// Date layouts accepted in the export's date columns.
const ROW_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid row: missing {field}")]
    InvalidRow { field: &'static str },
    #[error("Unknown label format: {0}")]
    UnknownLabelFormat(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LabelError> for ImportError {
    fn from(err: LabelError) -> Self {
        match err {
            LabelError::UnknownLabelFormat(label) => ImportError::UnknownLabelFormat(label),
            LabelError::InvalidDate { date, .. } => ImportError::InvalidDate(date),
        }
    }
}

/// A row that stopped a batch, with its position in the export (0-based).
#[derive(Debug, Error)]
#[error("Row {index}: {source}")]
pub struct RowError {
    pub index: usize,
    #[source]
    pub source: ImportError,
}

/// Builds a transaction from one export row, without payee corrections.
///
/// The date embedded in the label wins; the row's value date (or operation
/// date) is used otherwise.
pub fn parse_row(row: &RawRow) -> Result<Transaction, ImportError> {
    let row_date = row
        .effective_date()
        .ok_or(ImportError::InvalidRow { field: "date" })?;
    let raw_label = required(row.label.as_deref(), "label")?;
    let raw_amount = required(row.amount.as_deref(), "amount")?;

    let matched = label::parse(raw_label)?;
    let amount = parse_amount(raw_amount)?;
    let date = match matched.date {
        Some(date) => date,
        None => parse_row_date(row_date)?,
    };

    let normalized = normalize(matched.kind, matched.fragment.as_deref(), matched.via_processor);
    Ok(Transaction::new(matched.kind, date, amount)
        .with_payee(normalized.payee)
        .with_memo(normalized.memo))
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ImportError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ImportError::InvalidRow { field })
}

fn parse_row_date(s: &str) -> Result<NaiveDate, ImportError> {
    let s = s.trim();
    ROW_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ImportError::InvalidDate(s.to_string()))
}

/// Row-to-transaction entry point with payee corrections applied.
pub struct TransactionBuilder<'f, 's, S> {
    formatter: &'f PayeeFormatter<'s, S>,
}

impl<'f, 's, S: CorrectionStore> TransactionBuilder<'f, 's, S> {
    pub fn new(formatter: &'f PayeeFormatter<'s, S>) -> Self {
        TransactionBuilder { formatter }
    }

    pub async fn build(&self, row: &RawRow) -> Result<Transaction, ImportError> {
        let mut tx = parse_row(row)?;
        tx.payee = self.formatter.format_opt(tx.payee.as_deref()).await?;
        Ok(tx)
    }

    /// Builds every row in order. The first failing row aborts the batch.
    pub async fn build_all(&self, rows: &[RawRow]) -> Result<Vec<Transaction>, RowError> {
        let mut transactions = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match self.build(row).await {
                Ok(tx) => transactions.push(tx),
                Err(source) => {
                    error!(index, label = ?row.label, %source, "row rejected, aborting batch");
                    return Err(RowError { index, source });
                }
            }
        }
        info!(count = transactions.len(), "built transactions");
        Ok(transactions)
    }
}
