//! Field-structured persistent document index and query engine.
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio::{Caller, IndexStore, QueryEngine, QueryRequest, VisibilityMode};
//!
//! # fn main() -> folio::Result<()> {
//! let store = IndexStore::open_fs("./documents", "./index")?;
//! store.rebuild_index()?;
//!
//! let engine = QueryEngine::new(Arc::new(store));
//! let request = QueryRequest::new().field("title", "chest | lung");
//! let results = engine.query(&request, VisibilityMode::Restricted, &Caller::anonymous())?;
//! for title in results.titles() {
//!     println!("{}", title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod persistence;
pub mod query;
pub mod source;
pub mod tokenizer;

pub use access::AccessFilter;
pub use config::{FieldSpec, IndexSettings, TokenizerConfig, UnknownFieldPolicy};
pub use engine::{QueryEngine, QueryResults};
pub use error::{FolioError, Result};
pub use index::{fix_path, CancellationToken, FieldIndex, IndexStats, IndexStore, RebuildReport};
pub use models::*;
pub use query::{AgeRange, CompiledQuery, QueryCompiler, QueryExpr};
pub use source::{DocumentSource, FsDocumentSource, MemoryDocumentSource};
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
