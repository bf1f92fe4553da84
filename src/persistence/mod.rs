//! Fjall-backed persistence for the index tables.

mod index_tables;

pub use index_tables::{IndexTables, StoredIndex, TableBatch, FORMAT_VERSION};
