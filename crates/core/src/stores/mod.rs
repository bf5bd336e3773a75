pub mod sqlite_fts;

pub use sqlite_fts::{SqliteFtsStore, DEFAULT_INDEX_TABLE};
