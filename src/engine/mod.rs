//! Query execution and whole-index helpers built on [`IndexStore`].
//!
//! [`IndexStore`]: crate::index::IndexStore

mod maintenance;
mod query_engine;
mod results;
mod sort;

pub use maintenance::{owner_summary, purge_expired, OwnerSummary, PurgeReport};
pub use query_engine::QueryEngine;
pub use results::{QueryResults, DEFAULT_PAGE_SIZE};
pub use sort::{compare, sort_entries};
