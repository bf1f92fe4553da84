use thiserror::Error;

/// Main error type for folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Index storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Incompatible index: {0}")]
    IncompatibleIndex(String),

    #[error("Index format version {actual} is not supported, expected {expected}")]
    IncompatibleVersion { expected: u32, actual: u32 },

    #[error("Corrupt index table '{table}': {reason}")]
    CorruptIndex { table: &'static str, reason: String },

    #[error("Unable to parse document {path}: {reason}")]
    ParseFailure { path: String, reason: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for folio operations
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    /// Errors after which the index cannot be used without operator action.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FolioError::StorageUnavailable(_)
                | FolioError::IncompatibleIndex(_)
                | FolioError::IncompatibleVersion { .. }
                | FolioError::CorruptIndex { .. }
        )
    }

    /// Per-document failures that a rebuild skips over.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            FolioError::ParseFailure { .. } | FolioError::DocumentNotFound(_)
        )
    }

    pub(crate) fn parse(path: impl Into<String>, reason: impl ToString) -> Self {
        FolioError::ParseFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(table: &'static str, reason: impl ToString) -> Self {
        FolioError::CorruptIndex {
            table,
            reason: reason.to_string(),
        }
    }
}
