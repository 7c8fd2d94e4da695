use releve_core::{CorrectionRule, CorrectionStore, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::debug;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    debug!(path = %path.display(), "opened corrections database");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payee_corrections (
            original TEXT PRIMARY KEY,
            adjusted TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_correction(pool: &DbPool, original: &str) -> Result<Option<CorrectionRule>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT original, adjusted FROM payee_corrections WHERE original = ?",
    )
    .bind(original)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(original, adjusted)| CorrectionRule { original, adjusted }))
}

/// Inserts or updates in a single statement. Returns `true` when a row was
/// created or its `adjusted` value changed.
pub async fn upsert_correction(pool: &DbPool, original: &str, adjusted: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO payee_corrections (original, adjusted) VALUES (?, ?)
        ON CONFLICT(original) DO UPDATE SET
            adjusted = excluded.adjusted,
            updated_at = datetime('now')
        WHERE payee_corrections.adjusted <> excluded.adjusted
        "#,
    )
    .bind(original)
    .bind(adjusted)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_all_corrections(pool: &DbPool) -> Result<Vec<CorrectionRule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT original, adjusted FROM payee_corrections ORDER BY original",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(original, adjusted)| CorrectionRule { original, adjusted })
        .collect())
}

/// [`CorrectionStore`] backed by the `payee_corrections` table.
#[derive(Debug, Clone)]
pub struct SqliteCorrectionStore {
    pool: DbPool,
}

impl SqliteCorrectionStore {
    pub fn new(pool: DbPool) -> Self {
        SqliteCorrectionStore { pool }
    }

    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        Ok(Self::new(create_db(path).await?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl CorrectionStore for SqliteCorrectionStore {
    async fn get(&self, original: &str) -> Result<Option<CorrectionRule>, StoreError> {
        get_correction(&self.pool, original)
            .await
            .map_err(StoreError::backend)
    }

    async fn put(&self, original: &str, adjusted: &str) -> Result<bool, StoreError> {
        upsert_correction(&self.pool, original, adjusted)
            .await
            .map_err(StoreError::backend)
    }

    async fn scan<P>(&self, predicate: P) -> Result<Vec<CorrectionRule>, StoreError>
    where
        P: Fn(&CorrectionRule) -> bool + Send,
    {
        let rules = get_all_corrections(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(rules.into_iter().filter(|rule| predicate(rule)).collect())
    }
}
