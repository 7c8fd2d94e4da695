use anyhow::{Context, Result};
use chrono::Local;
use releve_core::{
    deduplicate, seed_corrections, CorrectionStore, LedgerTarget, MemoryCorrectionStore,
    RawRow, Transaction, DEFAULT_CORRECTIONS,
};
use releve_import::{read_rows, PayeeFormatter, ReviewBatch, RowEdit};
use releve_ledger::{submit_batch, BudgetApiClient, RecordingSink, SubmitSummary};
use releve_storage::SqliteCorrectionStore;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::args::{Args, Command, PushArgs};
use crate::config::{default_db_path, Config};

pub async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let db = args.db.as_deref();

    match args.command {
        Command::Push(push) => push_export(&config, db, push).await,
        Command::Preview {
            file,
            no_corrections,
        } => preview(&config, db, &file, no_corrections).await,
        Command::Learn { original, adjusted } => learn(&config, db, &original, &adjusted).await,
        Command::Corrections { filter } => list_corrections(&config, db, filter.as_deref()).await,
    }
}

// ── Correction store ──────────────────────────────────────────────────────────

async fn open_store(config: &Config, db: Option<&Path>) -> Result<SqliteCorrectionStore> {
    let path = match db {
        Some(p) => p.to_path_buf(),
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let store = SqliteCorrectionStore::open(&path)
        .await
        .with_context(|| format!("Failed to open corrections database {}", path.display()))?;

    // Configured seeds go first so they take precedence over the built-in ones.
    let configured = config
        .corrections
        .iter()
        .map(|r| (r.original.as_str(), r.adjusted.as_str()));
    let seeded = seed_corrections(&store, configured).await?
        + seed_corrections(&store, DEFAULT_CORRECTIONS.iter().copied()).await?;
    if seeded > 0 {
        info!(seeded, "seeded payee corrections");
    }
    Ok(store)
}

// ── push ──────────────────────────────────────────────────────────────────────

async fn push_export(config: &Config, db: Option<&Path>, push: PushArgs) -> Result<()> {
    let target = resolve_target(config, &push)?;
    let rows = read_export(&push.file)?;
    let edits = match &push.edits {
        Some(path) => read_edits(path)?,
        None => Vec::new(),
    };

    let transactions = if push.no_corrections {
        review_uncorrected(&rows, &edits).await?
    } else {
        review(&open_store(config, db).await?, &rows, &edits).await?
    };

    let today = push.today.unwrap_or_else(|| Local::now().date_naive());
    let summary = if push.dry_run {
        let sink = RecordingSink::new();
        let summary = submit_batch(&sink, &target, transactions, today).await?;
        for (_, batch) in sink.batches() {
            print_transactions(&batch);
        }
        summary
    } else {
        let client = BudgetApiClient::from_env(&config.ledger.base_url, &config.ledger.api_key_env)?;
        submit_batch(&client, &target, transactions, today)
            .await
            .context("Failed to push transactions")?
    };

    print_summary(&summary, push.dry_run);
    Ok(())
}

async fn review<S: CorrectionStore>(
    store: &S,
    rows: &[RawRow],
    edits: &[RowEdit],
) -> Result<Vec<Transaction>> {
    let formatter = PayeeFormatter::new(store);
    let batch = ReviewBatch::prepare(rows, &formatter).await?;
    let accepted = batch.accept(edits, &formatter).await?;
    if accepted.learned > 0 {
        println!("Learned {} payee correction(s)", accepted.learned);
    }
    Ok(accepted.transactions)
}

/// Inferred payees only. Edits still apply but nothing is learned.
async fn review_uncorrected(rows: &[RawRow], edits: &[RowEdit]) -> Result<Vec<Transaction>> {
    let store = MemoryCorrectionStore::new();
    let batch = ReviewBatch::prepare(rows, &PayeeFormatter::new(&store)).await?;
    Ok(batch.apply(edits)?)
}

/// Flag or environment first, then the config entry for `--user`.
fn resolve_target(config: &Config, push: &PushArgs) -> Result<LedgerTarget> {
    let budget_id = match &push.budget_id {
        Some(id) => id.clone(),
        None => {
            let user = push
                .user
                .as_deref()
                .context("No budget id: pass --budget-id, set LEDGER_BUDGET_ID or use --user")?;
            config.ids.budget_id(user)?.to_string()
        }
    };

    let account_id = match &push.account_id {
        Some(id) => id.clone(),
        None => {
            let user = push
                .user
                .as_deref()
                .context("No account id: pass --account-id, set LEDGER_ACCOUNT_ID or use --user")?;
            let account_type = push
                .account_type
                .context("--account-type is required to look up an account id")?;
            config.ids.account_id(user, account_type)?.to_string()
        }
    };

    Ok(LedgerTarget::new(budget_id, account_id))
}

fn read_export(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = read_rows(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if rows.is_empty() {
        tracing::warn!(path = %path.display(), "export has no rows");
    }
    Ok(rows)
}

fn read_edits(path: &Path) -> Result<Vec<RowEdit>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid edits file {}", path.display()))
}

fn print_summary(summary: &SubmitSummary, dry_run: bool) {
    let verb = if dry_run { "would be accepted" } else { "accepted" };
    println!("{} {verb}, {} duplicate(s)", summary.accepted, summary.duplicates);
}

// ── preview ───────────────────────────────────────────────────────────────────

async fn preview(config: &Config, db: Option<&Path>, file: &Path, no_corrections: bool) -> Result<()> {
    let rows = read_export(file)?;
    let batch = if no_corrections {
        let store = MemoryCorrectionStore::new();
        ReviewBatch::prepare(&rows, &PayeeFormatter::new(&store)).await?
    } else {
        let store = open_store(config, db).await?;
        ReviewBatch::prepare(&rows, &PayeeFormatter::new(&store)).await?
    };

    for (index, entry) in batch.entries().iter().enumerate() {
        let tx = &entry.transaction;
        let corrected = match (&entry.inferred_payee, &tx.payee) {
            (Some(inferred), Some(shown)) if inferred != shown => format!(" (was {inferred})"),
            _ => String::new(),
        };
        println!(
            "{index:>4}  {}  {:>10}  {:<30}  {}{corrected}",
            tx.date(),
            tx.amount(),
            tx.payee.as_deref().unwrap_or("-"),
            tx.memo.as_deref().unwrap_or(""),
        );
    }

    let numbered = deduplicate(batch.entries().iter().map(|e| e.transaction.clone()).collect());
    println!();
    print_transactions(&numbered);
    Ok(())
}

fn print_transactions(transactions: &[Transaction]) {
    for tx in transactions {
        println!(
            "{}  {:<12}  {:>10}  {:<30}  {}",
            tx.date(),
            tx.kind(),
            tx.amount(),
            tx.payee.as_deref().unwrap_or("-"),
            tx.import_id(),
        );
    }
}

// ── learn / corrections ───────────────────────────────────────────────────────

async fn learn(config: &Config, db: Option<&Path>, original: &str, adjusted: &str) -> Result<()> {
    let store = open_store(config, db).await?;
    let formatter = PayeeFormatter::new(&store);
    if formatter.learn(original, adjusted).await? {
        println!("{original} → {adjusted}");
    } else {
        println!("Nothing to learn: {original} already shows as {adjusted}");
    }
    Ok(())
}

async fn list_corrections(config: &Config, db: Option<&Path>, filter: Option<&str>) -> Result<()> {
    let store = open_store(config, db).await?;
    let needle = filter.map(str::to_lowercase);
    let rules = store
        .scan(|rule| match &needle {
            Some(n) => {
                rule.original.to_lowercase().contains(n) || rule.adjusted.to_lowercase().contains(n)
            }
            None => true,
        })
        .await?;

    for rule in &rules {
        println!("{} → {}", rule.original, rule.adjusted);
    }
    println!("{} rule(s)", rules.len());
    Ok(())
}
