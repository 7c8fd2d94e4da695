pub mod db;

pub use db::{
    create_db, get_all_corrections, get_correction, upsert_correction, DbPool,
    SqliteCorrectionStore,
};
