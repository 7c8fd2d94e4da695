use releve_core::{CorrectionStore, StoreError};
use tracing::{debug, info};

/// Applies learned payee corrections and records new ones.
pub struct PayeeFormatter<'s, S> {
    store: &'s S,
}

impl<'s, S: CorrectionStore> PayeeFormatter<'s, S> {
    pub fn new(store: &'s S) -> Self {
        PayeeFormatter { store }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    /// The corrected name for `payee`, or `payee` unchanged when no rule exists.
    pub async fn format(&self, payee: &str) -> Result<String, StoreError> {
        match self.store.get(payee).await? {
            Some(rule) => {
                debug!(original = payee, adjusted = %rule.adjusted, "applied payee correction");
                Ok(rule.adjusted)
            }
            None => Ok(payee.to_string()),
        }
    }

    pub async fn format_opt(&self, payee: Option<&str>) -> Result<Option<String>, StoreError> {
        match payee {
            Some(p) => self.format(p).await.map(Some),
            None => Ok(None),
        }
    }

    /// Records `original → adjusted` unless formatting `original` already
    /// yields `adjusted`. Returns `true` when a rule was created or changed.
    pub async fn learn(&self, original: &str, adjusted: &str) -> Result<bool, StoreError> {
        if original.is_empty() {
            return Ok(false);
        }
        if self.format(original).await? == adjusted {
            return Ok(false);
        }

        let changed = self.store.put(original, adjusted).await?;
        if changed {
            info!(original, adjusted, "learned payee correction");
        }
        Ok(changed)
    }
}
