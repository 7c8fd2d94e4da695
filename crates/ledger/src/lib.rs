pub mod client;
pub mod sink;
pub mod submit;

pub use client::{BudgetApiClient, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL};
pub use sink::{LedgerError, LedgerSink, RecordingSink, SubmitSummary};
pub use submit::submit_batch;
