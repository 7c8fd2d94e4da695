use chrono::NaiveDate;
use releve_core::{deduplicate, filter_future, LedgerTarget, Transaction};
use tracing::{info, warn};

use crate::sink::{LedgerError, LedgerSink, SubmitSummary};

/// Numbers import ids, drops entries dated after `today`, then hands the rest
/// to `sink`. An empty batch never reaches the sink.
pub async fn submit_batch<K: LedgerSink>(
    sink: &K,
    target: &LedgerTarget,
    transactions: Vec<Transaction>,
    today: NaiveDate,
) -> Result<SubmitSummary, LedgerError> {
    let batch = deduplicate(transactions);
    for tx in batch.iter().filter(|tx| tx.date() > today) {
        warn!(import_id = %tx.import_id(), date = %tx.date(), "dropping future-dated transaction");
    }
    let batch = filter_future(batch, today);

    if batch.is_empty() {
        info!("nothing to submit");
        return Ok(SubmitSummary::default());
    }

    let summary = sink.submit(target, &batch).await?;
    info!(
        budget = %target.budget_id,
        account = %target.account_id,
        accepted = summary.accepted,
        duplicates = summary.duplicates,
        "batch submitted"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use releve_core::TransactionType;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card(d: NaiveDate) -> Transaction {
        Transaction::new(TransactionType::Card, d, Decimal::new(1000, 2))
    }

    struct FailingSink;

    impl LedgerSink for FailingSink {
        async fn submit(
            &self,
            _target: &LedgerTarget,
            _transactions: &[Transaction],
        ) -> Result<SubmitSummary, LedgerError> {
            Err(LedgerError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn submits_distinct_ids_and_drops_future_rows() {
        let sink = RecordingSink::new();
        let target = LedgerTarget::new("budget", "account");
        let today = date(2022, 6, 14);
        let txs = vec![
            card(date(2022, 6, 14)),
            card(date(2022, 6, 15)),
            card(date(2022, 6, 14)),
            card(date(2022, 6, 1)),
        ];

        let summary = submit_batch(&sink, &target, txs, today).await.unwrap();
        assert_eq!(summary.accepted, 3);

        let batches = sink.batches();
        let sent = &batches[0].1;
        assert!(sent.iter().all(|tx| tx.date() <= today));
        let ids: HashSet<String> = sent.iter().map(|tx| tx.import_id()).collect();
        assert_eq!(ids.len(), sent.len());
        assert!(ids.contains("LEDGER:10000:2022-06-14:2"));
    }

    #[tokio::test]
    async fn empty_batch_skips_sink() {
        let sink = RecordingSink::new();
        let target = LedgerTarget::new("budget", "account");
        let summary = submit_batch(&sink, &target, vec![card(date(2030, 1, 1))], date(2022, 6, 14))
            .await
            .unwrap();
        assert_eq!(summary, SubmitSummary::default());
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_is_propagated() {
        let target = LedgerTarget::new("budget", "account");
        let err = submit_batch(&FailingSink, &target, vec![card(date(2022, 6, 1))], date(2022, 6, 14))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn resubmitting_the_same_export_only_yields_duplicates() {
        let sink = RecordingSink::new();
        let target = LedgerTarget::new("budget", "account");
        let today = date(2022, 6, 14);
        let export = || vec![card(date(2022, 6, 9)), card(date(2022, 6, 9))];

        submit_batch(&sink, &target, export(), today).await.unwrap();
        let again = submit_batch(&sink, &target, export().into_iter().rev().collect(), today)
            .await
            .unwrap();
        assert_eq!(again, SubmitSummary { accepted: 0, duplicates: 2 });
    }
}
