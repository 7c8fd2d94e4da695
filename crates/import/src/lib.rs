pub mod builder;
pub mod csv;
pub mod formatter;
pub mod label;
pub mod normalize;
pub mod review;
pub(crate) mod util;

pub use builder::{parse_row, ImportError, RowError, TransactionBuilder};
pub use crate::csv::{read_rows, CsvError};
pub use formatter::PayeeFormatter;
pub use label::{LabelError, LabelMatch};
pub use normalize::{normalize, NormalizedPayee};
pub use review::{AcceptedBatch, ReviewBatch, ReviewEntry, ReviewError, RowEdit};

