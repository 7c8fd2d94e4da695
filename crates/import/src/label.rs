use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use releve_core::TransactionType;
use thiserror::Error;
use tracing::debug;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Card payee runs hold at least one letter and stop before trailing noise: a
// parenthesised city, a country code, a merchant/terminal number (optionally
// suffixed `SC`), a lone digit, a company suffix, a dangling dash, then the
// card reference `CB*dddd`. Digit-only merchants are left to the fallback.
re!(re_card,
    r"^CARTE (?P<date>\d{2}/\d{2}/\d{2}) (?:(?P<processor>PAYPAL) ?\*|(?:ZTL|IZ|SUMUP) ?\*)?(?P<payee>[A-Za-z0-9 _.&'*-]*?[A-Za-z][A-Za-z0-9 _.&'*-]*?)(?: ?\([A-Za-z]+\)?)?(?: ?GB)?(?: ?\d+(?:SC)?)?(?: SC)?(?: ?\d)?(?: LTD| PLC)? ?-? CB\*\d{4}$");
re!(re_card_fallback,
    r"^CARTE(?:\s+(?P<date>\d{2}/\d{2}/\d{2}))?\s+(?P<payee>.+?)(?:\s+CB\*\d{4})?\s*$");

re!(re_bare_date, r"^\d{2}/\d{2}/\d{2}$");

re!(re_transfer,
    r"^(?P<kind>VIR|PRLV)(?: INST| SEPA)? (?:(?:MLE|MR) )?(?P<description>[\w ()':-]+)$");
re!(re_transfer_fallback,
    r"^(?P<kind>VIR|PRLV)\s+(?P<description>.+)$");

re!(re_withdrawal,
    r"^RETRAIT (?:DAB )?(?P<date>\d{2}/\d{2}/\d{2}) [A-Za-z0-9 _.&'*-]+? ?CB\*\d{4}$");
re!(re_withdrawal_fallback,
    r"^RETRAIT(?:\s+DAB)?(?:\s+(?P<date>\d{2}/\d{2}/\d{2}))?(?:\s+.*)?$");

// ── Types ─────────────────────────────────────────────────────────────────────

/// Fields pulled out of one statement label, before any payee clean-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    pub kind: TransactionType,
    /// Date embedded in the label, if any (card and withdrawal labels).
    pub date: Option<NaiveDate>,
    /// Raw payee run for cards, raw description for transfers.
    pub fragment: Option<String>,
    /// The label carried a payment-processor tag (`PAYPAL *`).
    pub via_processor: bool,
    /// Matched by the family's minimal pattern rather than the primary one.
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Unknown label format: {0}")]
    UnknownLabelFormat(String),
    #[error("Invalid date '{date}' in label: {label}")]
    InvalidDate { label: String, date: String },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Picks the label family from its prefix. `CARTE` wins over `VIR`/`PRLV`,
/// which win over `RETRAIT`. Case-sensitive.
pub fn classify(label: &str) -> Option<TransactionType> {
    let label = label.trim();
    if label.starts_with("CARTE") {
        Some(TransactionType::Card)
    } else if label.starts_with("VIR") {
        Some(TransactionType::Transfer)
    } else if label.starts_with("PRLV") {
        Some(TransactionType::DirectDebit)
    } else if label.starts_with("RETRAIT") {
        Some(TransactionType::Withdrawal)
    } else {
        None
    }
}

/// Classifies a label and extracts its fields. The family's primary pattern is
/// tried first, its fallback pattern only when the primary does not match.
pub fn parse(label: &str) -> Result<LabelMatch, LabelError> {
    let label = label.trim();
    let kind = classify(label).ok_or_else(|| LabelError::UnknownLabelFormat(label.to_string()))?;

    match kind {
        TransactionType::Card => parse_card(label),
        TransactionType::Transfer | TransactionType::DirectDebit => parse_transfer(label),
        TransactionType::Withdrawal => parse_withdrawal(label),
    }
}

// ── Families ──────────────────────────────────────────────────────────────────

fn parse_card(label: &str) -> Result<LabelMatch, LabelError> {
    let (caps, fallback) = match_either(label, re_card(), re_card_fallback())?;
    let fragment = group(&caps, "payee");
    // A date with no merchant after it.
    if fragment.as_deref().is_some_and(|f| re_bare_date().is_match(f)) {
        return Err(LabelError::UnknownLabelFormat(label.to_string()));
    }
    Ok(LabelMatch {
        kind: TransactionType::Card,
        date: label_date(label, &caps)?,
        fragment,
        via_processor: caps.name("processor").is_some(),
        fallback,
    })
}

fn parse_transfer(label: &str) -> Result<LabelMatch, LabelError> {
    let (caps, fallback) = match_either(label, re_transfer(), re_transfer_fallback())?;
    let kind = match caps.name("kind").map(|m| m.as_str()) {
        Some("PRLV") => TransactionType::DirectDebit,
        _ => TransactionType::Transfer,
    };
    Ok(LabelMatch {
        kind,
        date: None,
        fragment: group(&caps, "description"),
        via_processor: false,
        fallback,
    })
}

fn parse_withdrawal(label: &str) -> Result<LabelMatch, LabelError> {
    let (caps, fallback) = match_either(label, re_withdrawal(), re_withdrawal_fallback())?;
    Ok(LabelMatch {
        kind: TransactionType::Withdrawal,
        date: label_date(label, &caps)?,
        fragment: None,
        via_processor: false,
        fallback,
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn match_either<'l>(
    label: &'l str,
    primary: &Regex,
    fallback: &Regex,
) -> Result<(Captures<'l>, bool), LabelError> {
    if let Some(caps) = primary.captures(label) {
        return Ok((caps, false));
    }
    match fallback.captures(label) {
        Some(caps) => {
            debug!(label, "label matched fallback pattern only");
            Ok((caps, true))
        }
        None => Err(LabelError::UnknownLabelFormat(label.to_string())),
    }
}

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn label_date(label: &str, caps: &Captures<'_>) -> Result<Option<NaiveDate>, LabelError> {
    let Some(raw) = caps.name("date").map(|m| m.as_str()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%d/%m/%y")
        .map(Some)
        .map_err(|_| LabelError::InvalidDate {
            label: label.to_string(),
            date: raw.to_string(),
        })
}
