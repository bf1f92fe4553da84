pub mod caller;
pub mod document;
pub mod entry;
pub mod query;

pub use caller::{split_list, Caller, VisibilityMode};
pub use document::{current_timestamp_ms, DocId, DocNode, LoadedDocument};
pub use entry::IndexEntry;
pub use query::{AgeQuery, QueryRequest, SortOrder, FREETEXT_FIELD};
