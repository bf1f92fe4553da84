//! Where documents come from.
//!
//! The index never reads files itself; it asks a [`DocumentSource`] to
//! enumerate document paths and to load one path into a [`LoadedDocument`].

mod fs;
mod memory;

pub use fs::FsDocumentSource;
pub use memory::MemoryDocumentSource;

use crate::models::LoadedDocument;
use crate::Result;

/// Loads documents by their index path
pub trait DocumentSource: Send + Sync {
    /// Parse the document stored at `path`. Returns `ParseFailure` for
    /// malformed documents and `DocumentNotFound` for missing ones.
    fn load(&self, path: &str) -> Result<LoadedDocument>;

    /// Every document path, in a stable depth-first order with siblings
    /// sorted by name.
    fn document_paths(&self) -> Result<Vec<String>>;
}
