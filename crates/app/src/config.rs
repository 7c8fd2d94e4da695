use anyhow::{Context, Result};
use releve_core::{AccountType, CorrectionRule};
use releve_ledger::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "releve.toml";
pub const DB_FILE: &str = "corrections.db";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(flatten)]
    pub ids: LedgerIds,
    /// Seed rules, inserted only where no rule exists yet.
    #[serde(default)]
    pub corrections: Vec<CorrectionRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Budget and account ids per user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerIds {
    #[serde(default)]
    pub budgets: BTreeMap<String, String>,
    #[serde(default)]
    pub accounts: BTreeMap<String, UserAccounts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAccounts {
    pub perso: Option<String>,
    pub joint: Option<String>,
}

impl LedgerIds {
    pub fn budget_id(&self, user: &str) -> Result<&str> {
        self.budgets
            .get(user)
            .map(String::as_str)
            .with_context(|| format!("No budget configured for user '{user}'"))
    }

    pub fn account_id(&self, user: &str, account_type: AccountType) -> Result<&str> {
        let accounts = self
            .accounts
            .get(user)
            .with_context(|| format!("No accounts configured for user '{user}'"))?;
        let id = match account_type {
            AccountType::Perso => accounts.perso.as_deref(),
            AccountType::Joint => accounts.joint.as_deref(),
        };
        id.with_context(|| format!("No {account_type} account configured for user '{user}'"))
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Loads `path`, or the default config file when it exists. An explicit
    /// path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Config::default()),
            },
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("In {}", path.display()))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "releve", "Releve")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn default_db_path() -> Result<PathBuf> {
    let dirs = project_dirs().context("Failed to get app directory")?;
    Ok(dirs.data_dir().join(DB_FILE))
}
