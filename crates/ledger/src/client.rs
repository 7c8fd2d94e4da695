use releve_core::{to_milliunits, LedgerTarget, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sink::{LedgerError, LedgerSink, SubmitSummary};

pub const DEFAULT_BASE_URL: &str = "https://api.ynab.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "LEDGER_API_KEY";

#[derive(Debug, Serialize)]
struct SaveTransactionsWrapper<'a> {
    transactions: Vec<SaveTransaction<'a>>,
}

#[derive(Debug, Serialize)]
struct SaveTransaction<'a> {
    account_id: &'a str,
    date: String,
    amount: i64,
    payee_name: Option<&'a str>,
    memo: Option<&'a str>,
    approved: bool,
    cleared: &'static str,
    import_id: String,
}

#[derive(Debug, Deserialize)]
struct SaveTransactionsResponse {
    data: SaveTransactionsData,
}

#[derive(Debug, Deserialize)]
struct SaveTransactionsData {
    #[serde(default)]
    transaction_ids: Vec<String>,
    #[serde(default)]
    duplicate_import_ids: Vec<String>,
}

/// Bearer-token client for the budgeting ledger's transactions endpoint.
#[derive(Debug, Clone)]
pub struct BudgetApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BudgetApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        BudgetApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Reads the API key from the environment variable `api_key_env`.
    pub fn from_env(base_url: impl Into<String>, api_key_env: &str) -> Result<Self, LedgerError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LedgerError::MissingApiKey(api_key_env.to_string()))?;
        Ok(Self::new(base_url, api_key))
    }

    fn transactions_url(&self, target: &LedgerTarget) -> String {
        format!("{}/budgets/{}/transactions", self.base_url, target.budget_id)
    }
}

fn to_payload<'a>(
    target: &'a LedgerTarget,
    transactions: &'a [Transaction],
) -> Result<SaveTransactionsWrapper<'a>, LedgerError> {
    let transactions = transactions
        .iter()
        .map(|tx| {
            let import_id = tx.import_id();
            let amount = to_milliunits(tx.amount())
                .ok_or_else(|| LedgerError::AmountOutOfRange(import_id.clone()))?;
            Ok(SaveTransaction {
                account_id: &target.account_id.0,
                date: tx.date().format("%Y-%m-%d").to_string(),
                amount,
                payee_name: tx.payee.as_deref(),
                memo: tx.memo.as_deref(),
                approved: true,
                cleared: "cleared",
                import_id,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;
    Ok(SaveTransactionsWrapper { transactions })
}

impl LedgerSink for BudgetApiClient {
    async fn submit(
        &self,
        target: &LedgerTarget,
        transactions: &[Transaction],
    ) -> Result<SubmitSummary, LedgerError> {
        let payload = to_payload(target, transactions)?;
        let url = self.transactions_url(target);
        debug!(%url, count = transactions.len(), "posting transactions");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "ledger rejected batch");
            return Err(LedgerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let saved: SaveTransactionsResponse = response.json().await?;
        Ok(SubmitSummary {
            accepted: saved.data.transaction_ids.len(),
            duplicates: saved.data.duplicate_import_ids.len(),
        })
    }
}
