use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

/// Maps a payee name as inferred from a statement label to the name the user
/// wants to see in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub original: String,
    pub adjusted: String,
}

impl CorrectionRule {
    pub fn new(original: &str, adjusted: &str) -> Self {
        CorrectionRule {
            original: original.to_string(),
            adjusted: adjusted.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Correction store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Keyed record store holding at most one [`CorrectionRule`] per `original`.
pub trait CorrectionStore: Send + Sync {
    fn get(
        &self,
        original: &str,
    ) -> impl Future<Output = Result<Option<CorrectionRule>, StoreError>> + Send;

    /// Inserts the rule, or overwrites `adjusted` for an existing `original`,
    /// as one atomic step. Returns `true` when a rule was created or changed.
    fn put(
        &self,
        original: &str,
        adjusted: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn scan<P>(
        &self,
        predicate: P,
    ) -> impl Future<Output = Result<Vec<CorrectionRule>, StoreError>> + Send
    where
        P: Fn(&CorrectionRule) -> bool + Send;
}

/// Rules that used to be hard-coded merchant clean-ups. Seeded into a fresh
/// store; never overwrite what the user has learned since.
pub const DEFAULT_CORRECTIONS: &[(&str, &str)] = &[
    ("Sncf", "SNCF"),
    ("Redemption Ro", "Redemption Roasters"),
    ("Tfl Travel Ch", "TfL"),
    ("Amazon Payments", "Amazon"),
    ("Marks&Spencer", "Marks & Spencer"),
    ("M&S Simply Food", "Marks & Spencer"),
];

/// Inserts each seed whose `original` has no rule yet. Returns how many were added.
pub async fn seed_corrections<S, I, K, V>(store: &S, seeds: I) -> Result<usize, StoreError>
where
    S: CorrectionStore,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut inserted = 0;
    for (original, adjusted) in seeds {
        let (original, adjusted) = (original.as_ref(), adjusted.as_ref());
        if original.is_empty() || store.get(original).await?.is_some() {
            continue;
        }
        if store.put(original, adjusted).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// Process-local store. The map lock makes `put` a compare-and-set.
#[derive(Debug, Default)]
pub struct MemoryCorrectionStore {
    rules: Mutex<BTreeMap<String, String>>,
}

impl MemoryCorrectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules<I, K, V>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MemoryCorrectionStore {
            rules: Mutex::new(rules),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.rules.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CorrectionStore for MemoryCorrectionStore {
    async fn get(&self, original: &str) -> Result<Option<CorrectionRule>, StoreError> {
        Ok(self
            .lock()
            .get(original)
            .map(|adjusted| CorrectionRule::new(original, adjusted)))
    }

    async fn put(&self, original: &str, adjusted: &str) -> Result<bool, StoreError> {
        let mut rules = self.lock();
        match rules.get(original) {
            Some(current) if current == adjusted => Ok(false),
            _ => {
                rules.insert(original.to_string(), adjusted.to_string());
                Ok(true)
            }
        }
    }

    async fn scan<P>(&self, predicate: P) -> Result<Vec<CorrectionRule>, StoreError>
    where
        P: Fn(&CorrectionRule) -> bool + Send,
    {
        Ok(self
            .lock()
            .iter()
            .map(|(original, adjusted)| CorrectionRule::new(original, adjusted))
            .filter(|rule| predicate(rule))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryCorrectionStore::new();
        assert!(store.get("Sncf").await.unwrap().is_none());
        assert!(store.put("Sncf", "SNCF").await.unwrap());
        assert_eq!(
            store.get("Sncf").await.unwrap(),
            Some(CorrectionRule::new("Sncf", "SNCF"))
        );
    }

    #[tokio::test]
    async fn put_overwrites_in_place() {
        let store = MemoryCorrectionStore::new();
        assert!(store.put("Monsieur", "John").await.unwrap());
        assert!(store.put("Monsieur", "David").await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Monsieur").await.unwrap().unwrap().adjusted, "David");
    }

    #[tokio::test]
    async fn put_same_value_reports_no_change() {
        let store = MemoryCorrectionStore::new();
        assert!(store.put("Monsieur", "John").await.unwrap());
        assert!(!store.put("Monsieur", "John").await.unwrap());
    }

    #[tokio::test]
    async fn scan_filters_with_predicate() {
        let store = MemoryCorrectionStore::with_rules([
            ("Sncf", "SNCF"),
            ("Redemption Ro", "Redemption Roasters"),
        ]);
        let hits = store.scan(|r| r.original == "Sncf").await.unwrap();
        assert_eq!(hits, vec![CorrectionRule::new("Sncf", "SNCF")]);
        assert_eq!(store.scan(|_| true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeding_skips_existing_rules() {
        let store = MemoryCorrectionStore::with_rules([("Sncf", "Trains")]);
        let added = seed_corrections(&store, DEFAULT_CORRECTIONS.iter().copied())
            .await
            .unwrap();
        assert_eq!(added, DEFAULT_CORRECTIONS.len() - 1);
        assert_eq!(store.get("Sncf").await.unwrap().unwrap().adjusted, "Trains");

        let again = seed_corrections(&store, DEFAULT_CORRECTIONS.iter().copied())
            .await
            .unwrap();
        assert_eq!(again, 0);
    }
}
