//! The persistent document index: per-field inverted indexes, cached
//! entries and the path/ID tables, kept consistent by [`IndexStore`].

mod cancel;
mod extract;
mod field_index;
pub mod integrity;
mod path;
mod store;

pub use cancel::CancellationToken;
pub use extract::{build_entry, field_text, patient_age_days};
pub use field_index::{FieldIndex, RemovedDoc};
pub use integrity::Violation;
pub use path::fix_path;
pub use store::{IndexStats, IndexStore, IndexView, RebuildReport};
