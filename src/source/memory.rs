use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::FolioError;
use crate::models::{current_timestamp_ms, DocNode, LoadedDocument};
use crate::source::DocumentSource;
use crate::Result;

/// Documents held in memory, keyed by path. Used by tests and benchmarks,
/// and by embedders that parse documents themselves.
#[derive(Debug, Default)]
pub struct MemoryDocumentSource {
    docs: RwLock<BTreeMap<String, std::result::Result<LoadedDocument, String>>>,
}

impl MemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document, stamped with the current time
    pub fn insert(&self, path: impl Into<String>, root: DocNode) {
        self.insert_loaded(path, LoadedDocument::new(root, current_timestamp_ms()));
    }

    pub fn insert_loaded(&self, path: impl Into<String>, doc: LoadedDocument) {
        self.docs.write().insert(path.into(), Ok(doc));
    }

    /// Store a JSON document under a root node named `document`
    pub fn insert_json(&self, path: impl Into<String>, value: &serde_json::Value) {
        self.insert(path, DocNode::from_json(super::fs::ROOT_NODE, value));
    }

    /// Register a path whose document fails to parse
    pub fn insert_unparseable(&self, path: impl Into<String>, reason: impl Into<String>) {
        self.docs.write().insert(path.into(), Err(reason.into()));
    }

    pub fn remove(&self, path: &str) -> bool {
        self.docs.write().remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl DocumentSource for MemoryDocumentSource {
    fn load(&self, path: &str) -> Result<LoadedDocument> {
        match self.docs.read().get(path) {
            Some(Ok(doc)) => Ok(doc.clone()),
            Some(Err(reason)) => Err(FolioError::parse(path, reason)),
            None => Err(FolioError::DocumentNotFound(path.to_string())),
        }
    }

    fn document_paths(&self) -> Result<Vec<String>> {
        Ok(self.docs.read().keys().cloned().collect())
    }
}
