pub mod amount;
pub mod batch;
pub mod correction;
pub mod target;
pub mod transaction;

pub use amount::{parse_amount, to_milliunits, AmountError};
pub use batch::{deduplicate, filter_future};
pub use correction::{
    seed_corrections, CorrectionRule, CorrectionStore, MemoryCorrectionStore, StoreError,
    DEFAULT_CORRECTIONS,
};
pub use target::{AccountId, AccountType, BudgetId, LedgerTarget};
pub use transaction::{RawRow, Transaction, TransactionType, IMPORT_ID_PREFIX};
