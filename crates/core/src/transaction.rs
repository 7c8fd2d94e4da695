use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::amount::milliunits_string;

pub const IMPORT_ID_PREFIX: &str = "LEDGER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Card,
    Transfer,
    DirectDebit,
    Withdrawal,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Card => "CARD",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::DirectDebit => "DIRECT_DEBIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        };
        f.pad(name)
    }
}

/// A normalized statement entry, ready for review and submission.
///
/// `kind`, `date` and `amount` are fixed at construction. Only `payee` and
/// `memo` are open to editing; `sequence_index` is owned by
/// [`deduplicate`](crate::batch::deduplicate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    kind: TransactionType,
    date: NaiveDate,
    amount: Decimal,
    pub payee: Option<String>,
    pub memo: Option<String>,
    #[serde(default = "first_index", deserialize_with = "at_least_one")]
    sequence_index: u32,
}

fn first_index() -> u32 {
    1
}

fn at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(u32::deserialize(deserializer)?.max(1))
}

impl Transaction {
    pub fn new(kind: TransactionType, date: NaiveDate, amount: Decimal) -> Self {
        Transaction {
            kind,
            date,
            amount,
            payee: None,
            memo: None,
            sequence_index: 1,
        }
    }

    pub fn with_payee(mut self, payee: Option<String>) -> Self {
        self.payee = payee;
        self
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn sequence_index(&self) -> u32 {
        self.sequence_index
    }

    pub(crate) fn set_sequence_index(&mut self, index: u32) {
        self.sequence_index = index.max(1);
    }

    /// `LEDGER:<milliunits>:<YYYY-MM-DD>:<sequence_index>`
    pub fn import_id(&self) -> String {
        self.import_id_with_index(self.sequence_index)
    }

    /// The import id this transaction would get with `sequence_index = 1`.
    pub fn natural_import_id(&self) -> String {
        self.import_id_with_index(1)
    }

    fn import_id_with_index(&self, index: u32) -> String {
        format!(
            "{IMPORT_ID_PREFIX}:{}:{}:{index}",
            milliunits_string(self.amount),
            self.date.format("%Y-%m-%d"),
        )
    }

    /// Orders transactions that share a natural import id by their remaining
    /// fields so sequencing does not depend on input order.
    pub(crate) fn cmp_content(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.payee.cmp(&other.payee))
            .then_with(|| self.memo.cmp(&other.memo))
    }
}

/// One line of the bank export, as read from the file. Consumed by the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub operation_date: Option<String>,
    pub value_date: Option<String>,
    pub label: Option<String>,
    pub amount: Option<String>,
}

impl RawRow {
    pub fn new(operation_date: &str, value_date: &str, label: &str, amount: &str) -> Self {
        RawRow {
            operation_date: non_blank(operation_date),
            value_date: non_blank(value_date),
            label: non_blank(label),
            amount: non_blank(amount),
        }
    }

    /// The value date, or the operation date when the value date is blank.
    pub fn effective_date(&self) -> Option<&str> {
        self.value_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.operation_date.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn import_id_format() {
        let tx = Transaction::new(TransactionType::Card, date(2022, 6, 14), dec("16.33"));
        assert_eq!(tx.import_id(), "LEDGER:16330:2022-06-14:1");
    }

    #[test]
    fn import_id_negative_amount() {
        let tx = Transaction::new(TransactionType::Card, date(2022, 6, 9), dec("-7.50"));
        assert_eq!(tx.import_id(), "LEDGER:-7500:2022-06-09:1");
    }

    #[test]
    fn import_id_follows_sequence_index() {
        let mut tx = Transaction::new(TransactionType::Transfer, date(1970, 1, 1), dec("10.00"));
        tx.set_sequence_index(3);
        assert_eq!(tx.import_id(), "LEDGER:10000:1970-01-01:3");
        assert_eq!(tx.natural_import_id(), "LEDGER:10000:1970-01-01:1");
    }

    #[test]
    fn sequence_index_never_below_one() {
        let mut tx = Transaction::new(TransactionType::Card, date(1970, 1, 1), dec("1"));
        tx.set_sequence_index(0);
        assert_eq!(tx.sequence_index(), 1);
    }

    #[test]
    fn deserialized_sequence_index_never_below_one() {
        let json = r#"{"kind":"CARD","date":"2022-06-14","amount":"16.33","payee":null,"memo":null,"sequence_index":0}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.sequence_index(), 1);
        assert_eq!(tx.import_id(), "LEDGER:16330:2022-06-14:1");

        let json = r#"{"kind":"CARD","date":"2022-06-14","amount":"16.33","payee":null,"memo":null}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.sequence_index(), 1);
    }

    #[test]
    fn builder_style_setters() {
        let tx = Transaction::new(TransactionType::Withdrawal, date(2022, 6, 14), dec("-20"))
            .with_payee(Some("ATM".to_string()))
            .with_memo(None);
        assert_eq!(tx.kind(), TransactionType::Withdrawal);
        assert_eq!(tx.payee.as_deref(), Some("ATM"));
        assert_eq!(tx.memo, None);
        assert_eq!(tx.sequence_index(), 1);
    }

    #[test]
    fn transaction_type_display() {
        assert_eq!(TransactionType::Card.to_string(), "CARD");
        assert_eq!(TransactionType::DirectDebit.to_string(), "DIRECT_DEBIT");
    }

    #[test]
    fn effective_date_falls_back_to_operation_date() {
        let row = RawRow::new("2022-06-10", "", "CARTE", "1,00");
        assert_eq!(row.effective_date(), Some("2022-06-10"));

        let row = RawRow::new("2022-06-10", "2022-06-11", "CARTE", "1,00");
        assert_eq!(row.effective_date(), Some("2022-06-11"));

        let row = RawRow::new(" ", " ", "CARTE", "1,00");
        assert_eq!(row.effective_date(), None);
    }
}
