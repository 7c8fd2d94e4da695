use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use releve_core::AccountType;
use std::path::PathBuf;

/// Push bank statement exports to a budgeting ledger.
#[derive(Parser, Debug)]
#[command(name = "releve", version)]
pub struct Args {
    /// Configuration file (defaults to releve.toml in the config directory)
    #[arg(long, global = true, env = "RELEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Payee corrections database (defaults to the data directory)
    #[arg(long, global = true, env = "RELEVE_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read an export and push its transactions to the ledger
    Push(PushArgs),

    /// Print the transactions an export would produce
    Preview {
        file: PathBuf,

        /// Show payees as inferred, without learned corrections
        #[arg(long)]
        no_corrections: bool,
    },

    /// Record a payee correction
    Learn { original: String, adjusted: String },

    /// List learned payee corrections
    Corrections {
        /// Only rules whose original or adjusted name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct PushArgs {
    pub file: PathBuf,

    #[arg(long, env = "LEDGER_BUDGET_ID")]
    pub budget_id: Option<String>,

    #[arg(long, env = "LEDGER_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Look ids up in the config for this user
    #[arg(long)]
    pub user: Option<String>,

    /// perso | joint
    #[arg(long)]
    pub account_type: Option<AccountType>,

    /// JSON list of row edits (`{"index", "payee", "memo"}`) applied before pushing
    #[arg(long)]
    pub edits: Option<PathBuf>,

    /// Neither apply nor learn payee corrections
    #[arg(long)]
    pub no_corrections: bool,

    /// Reference date for dropping future-dated rows (defaults to today)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Build and number the batch without contacting the ledger
    #[arg(long)]
    pub dry_run: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_flags() {
        let args = Args::try_parse_from([
            "releve",
            "push",
            "export.csv",
            "--user",
            "alice",
            "--account-type",
            "Joint",
            "--today",
            "2022-06-14",
            "--dry-run",
        ])
        .unwrap();
        let Command::Push(push) = args.command else {
            panic!("expected push");
        };
        assert_eq!(push.file, PathBuf::from("export.csv"));
        assert_eq!(push.user.as_deref(), Some("alice"));
        assert_eq!(push.account_type, Some(AccountType::Joint));
        assert_eq!(push.today, NaiveDate::from_ymd_opt(2022, 6, 14));
        assert!(push.dry_run);
        assert!(!push.no_corrections);
    }

    #[test]
    fn bad_account_type_is_rejected() {
        assert!(Args::try_parse_from(["releve", "push", "x.csv", "--account-type", "savings"]).is_err());
    }

    #[test]
    fn global_db_flag() {
        let args = Args::try_parse_from(["releve", "learn", "Monsieur", "John", "--db", "/tmp/c.db"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/c.db")));
        assert!(matches!(args.command, Command::Learn { .. }));
    }
}
