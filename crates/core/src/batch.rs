use chrono::NaiveDate;

use crate::transaction::Transaction;

/// Assigns `sequence_index` values so every `import_id` in the batch is unique.
///
/// The batch is sorted by natural import id (the id with index 1), ties broken
/// on the remaining fields. Each run of equal natural ids is then numbered
/// 1, 2, 3… in that order. The output is in sorted order and depends only on
/// the multiset of transactions given, not on their input order.
pub fn deduplicate(transactions: Vec<Transaction>) -> Vec<Transaction> {
    let mut keyed: Vec<(String, Transaction)> = transactions
        .into_iter()
        .map(|tx| (tx.natural_import_id(), tx))
        .collect();
    keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.cmp_content(b)));

    let mut previous: Option<(String, u32)> = None;
    keyed
        .into_iter()
        .map(|(key, mut tx)| {
            let index = match &previous {
                Some((prev_key, prev_index)) if *prev_key == key => prev_index + 1,
                _ => 1,
            };
            tx.set_sequence_index(index);
            previous = Some((key, index));
            tx
        })
        .collect()
}

/// Drops transactions dated after `reference_date`. Order is preserved.
pub fn filter_future(transactions: Vec<Transaction>, reference_date: NaiveDate) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|tx| tx.date() <= reference_date)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card(d: NaiveDate, amount: &str) -> Transaction {
        Transaction::new(TransactionType::Card, d, Decimal::from_str_exact(amount).unwrap())
    }

    // ── deduplicate ───────────────────────────────────────────────────────────

    #[test]
    fn two_identical_transactions_get_one_and_two() {
        let txs = vec![card(date(1970, 1, 1), "10.00"), card(date(1970, 1, 1), "10.00")];
        let txs = deduplicate(txs);
        assert_eq!(txs[0].sequence_index(), 1);
        assert_eq!(txs[1].sequence_index(), 2);
        assert!(txs[0].import_id().ends_with(":1"));
        assert!(txs[1].import_id().ends_with(":2"));
    }

    #[test]
    fn mixed_collisions_are_sorted_and_numbered() {
        let txs = vec![
            card(date(1970, 1, 1), "10.0"),
            card(date(1972, 1, 1), "20.0"),
            card(date(1971, 1, 1), "10.0"),
            card(date(1972, 1, 1), "20.0"),
            card(date(1970, 1, 1), "10.0"),
            card(date(1972, 1, 1), "20.0"),
        ];
        let ids: Vec<String> = deduplicate(txs).iter().map(|t| t.import_id()).collect();
        assert_eq!(
            ids,
            vec![
                "LEDGER:10000:1970-01-01:1",
                "LEDGER:10000:1970-01-01:2",
                "LEDGER:10000:1971-01-01:1",
                "LEDGER:20000:1972-01-01:1",
                "LEDGER:20000:1972-01-01:2",
                "LEDGER:20000:1972-01-01:3",
            ]
        );
    }

    #[test]
    fn import_ids_are_pairwise_distinct() {
        let mut txs = Vec::new();
        for i in 0..40u32 {
            let amount = ["1.00", "2.00", "-3.50"][(i % 3) as usize];
            let d = date(2022, 6, 1 + i % 4);
            txs.push(card(d, amount).with_payee(Some(format!("Payee {}", i % 5))));
        }
        let txs = deduplicate(txs);
        assert_eq!(txs.len(), 40);
        let ids: HashSet<String> = txs.iter().map(|t| t.import_id()).collect();
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn assignment_does_not_depend_on_input_order() {
        let a = card(date(2022, 6, 9), "-7.50").with_payee(Some("Sncf".to_string()));
        let b = card(date(2022, 6, 9), "-7.50").with_payee(Some("Ratp".to_string()));
        let c = card(date(2022, 6, 9), "-7.50").with_payee(Some("Franprix".to_string()));

        let forward = deduplicate(vec![a.clone(), b.clone(), c.clone()]);
        let backward = deduplicate(vec![c, b, a]);
        assert_eq!(forward, backward);

        let index_of = |txs: &[Transaction], payee: &str| {
            txs.iter()
                .find(|t| t.payee.as_deref() == Some(payee))
                .map(|t| t.sequence_index())
        };
        assert_eq!(index_of(&forward, "Franprix"), Some(1));
        assert_eq!(index_of(&forward, "Ratp"), Some(2));
        assert_eq!(index_of(&forward, "Sncf"), Some(3));
    }

    #[test]
    fn rerunning_is_stable() {
        let txs = vec![
            card(date(2022, 6, 9), "-7.50"),
            card(date(2022, 6, 9), "-7.50"),
            card(date(2022, 6, 10), "-7.50"),
        ];
        let once = deduplicate(txs);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn previously_assigned_indices_are_reset() {
        let txs = deduplicate(vec![card(date(2022, 6, 9), "1"), card(date(2022, 6, 9), "1")]);
        // Only the second one survives a later edit of the batch.
        let survivor = txs.into_iter().nth(1).unwrap();
        assert_eq!(survivor.sequence_index(), 2);
        let txs = deduplicate(vec![survivor]);
        assert_eq!(txs[0].sequence_index(), 1);
    }

    #[test]
    fn empty_batch() {
        assert!(deduplicate(Vec::new()).is_empty());
    }

    // ── filter_future ─────────────────────────────────────────────────────────

    #[test]
    fn reference_date_is_kept_next_day_dropped() {
        let today = date(2022, 6, 14);
        let txs = vec![
            card(date(2022, 6, 15), "1.00"),
            card(date(2022, 6, 14), "2.00"),
            card(date(2022, 6, 13), "3.00"),
        ];
        let kept = filter_future(txs, today);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].date(), date(2022, 6, 14));
        assert_eq!(kept[1].date(), date(2022, 6, 13));
    }

    #[test]
    fn filter_preserves_order() {
        let today = date(2022, 6, 14);
        let txs = vec![
            card(date(2022, 6, 1), "1.00"),
            card(date(2022, 6, 20), "9.00"),
            card(date(2022, 5, 1), "2.00"),
            card(date(2022, 6, 10), "3.00"),
        ];
        let amounts: Vec<String> = filter_future(txs, today)
            .iter()
            .map(|t| t.amount().to_string())
            .collect();
        assert_eq!(amounts, vec!["1.00", "2.00", "3.00"]);
    }
}
