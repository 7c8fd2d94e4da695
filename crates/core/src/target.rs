use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetId(pub String);

impl fmt::Display for BudgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a batch lands in the budgeting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTarget {
    pub budget_id: BudgetId,
    pub account_id: AccountId,
}

impl LedgerTarget {
    pub fn new(budget_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        LedgerTarget {
            budget_id: BudgetId(budget_id.into()),
            account_id: AccountId(account_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Perso,
    Joint,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Perso => write!(f, "perso"),
            AccountType::Joint => write!(f, "joint"),
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "perso" => Ok(AccountType::Perso),
            "joint" => Ok(AccountType::Joint),
            other => Err(format!("Unknown account type: '{other}'")),
        }
    }
}
