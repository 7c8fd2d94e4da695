use releve_core::TransactionType;

use crate::util::{collapse_whitespace, is_upper, non_blank, strip_legal_suffix, title_case};

pub const PROCESSOR_MEMO: &str = "(via Paypal)";
pub const WITHDRAWAL_PAYEE: &str = "ATM";

const PROCESSOR: &str = "paypal";
const SENDER_PREFIX: &str = "Virement de ";

/// Display-ready payee and memo derived from one label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedPayee {
    pub payee: Option<String>,
    pub memo: Option<String>,
}

/// Turns the raw fragment captured from a label into a payee and memo.
///
/// Cards: the merchant run is cleaned up and title-cased; a payment-processor
/// mention moves to the memo. Transfers and direct debits: the description is
/// the payee when it names the sender (`Virement de …`), is all upper-case,
/// or belongs to a direct debit. Otherwise it is free text and goes to the
/// memo. Withdrawals always get the `ATM` payee.
pub fn normalize(kind: TransactionType, fragment: Option<&str>, via_processor: bool) -> NormalizedPayee {
    match kind {
        TransactionType::Card => normalize_card(fragment, via_processor),
        TransactionType::Transfer | TransactionType::DirectDebit => normalize_transfer(kind, fragment),
        TransactionType::Withdrawal => NormalizedPayee {
            payee: Some(WITHDRAWAL_PAYEE.to_string()),
            memo: None,
        },
    }
}

fn normalize_card(fragment: Option<&str>, via_processor: bool) -> NormalizedPayee {
    let mut via_processor = via_processor;
    let payee = fragment.map(clean_merchant).and_then(|name| {
        match remove_processor(&name) {
            Some(rest) => {
                via_processor = true;
                non_blank(&rest)
            }
            None => non_blank(&name),
        }
    });

    NormalizedPayee {
        payee: payee.map(|p| title_case(&p)),
        memo: via_processor.then(|| PROCESSOR_MEMO.to_string()),
    }
}

fn normalize_transfer(kind: TransactionType, fragment: Option<&str>) -> NormalizedPayee {
    let description = collapse_whitespace(fragment.unwrap_or_default());
    if description.is_empty() {
        return NormalizedPayee::default();
    }

    if let Some(sender) = strip_sender_prefix(&description) {
        return NormalizedPayee {
            payee: non_blank(&strip_legal_suffix(sender)).map(|p| title_case(&p)),
            memo: None,
        };
    }

    if kind == TransactionType::DirectDebit || is_upper(&description) {
        NormalizedPayee {
            payee: non_blank(&strip_legal_suffix(&description)).map(|p| title_case(&p)),
            memo: None,
        }
    } else {
        NormalizedPayee {
            payee: None,
            memo: Some(description),
        }
    }
}

/// Underscores become spaces, `*` markers go, separators left dangling at the
/// end are trimmed, then company-form tokens are dropped.
fn clean_merchant(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .filter(|&c| c != '*')
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();
    let collapsed = collapse_whitespace(&spaced);
    let trimmed = collapsed.trim_end_matches(|c: char| c == '-' || c.is_whitespace());
    strip_legal_suffix(trimmed)
}

/// Removes the `paypal` word (any case) and the separators around it. A word
/// that merely contains it is left alone. `None` when the word is absent.
fn remove_processor(name: &str) -> Option<String> {
    let is_sep = |c: char| c.is_whitespace() || matches!(c, '-' | ':' | '.');
    // ASCII lower-casing keeps byte offsets aligned with `name`.
    let lower = name.to_ascii_lowercase();
    let start = lower.match_indices(PROCESSOR).map(|(i, _)| i).find(|&i| {
        let end = i + PROCESSOR.len();
        name[..i].chars().next_back().map_or(true, is_sep)
            && name[end..].chars().next().map_or(true, is_sep)
    })?;
    let end = start + PROCESSOR.len();

    let before = name[..start].trim_end_matches(is_sep);
    let after = name[end..].trim_start_matches(is_sep);
    Some(collapse_whitespace(&format!("{before} {after}")))
}

fn strip_sender_prefix(description: &str) -> Option<&str> {
    let head = description.get(..SENDER_PREFIX.len())?;
    head.eq_ignore_ascii_case(SENDER_PREFIX)
        .then(|| description[SENDER_PREFIX.len()..].trim())
}
