use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde_json::Value;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::FolioError;
use crate::models::{DocNode, LoadedDocument};
use crate::source::DocumentSource;
use crate::Result;

/// Name given to the root node of every loaded document
pub const ROOT_NODE: &str = "document";

/// JSON documents stored under a directory. Index paths are relative to the
/// root, with `/` separators.
#[derive(Clone, Debug)]
pub struct FsDocumentSource {
    root: PathBuf,
    extension: String,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "json".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_lowercase();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FolioError::DocumentNotFound(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

impl DocumentSource for FsDocumentSource {
    fn load(&self, path: &str) -> Result<LoadedDocument> {
        let full = self.resolve(path)?;
        let metadata = match std::fs::metadata(&full) {
            Ok(m) if m.is_file() => m,
            _ => return Err(FolioError::DocumentNotFound(path.to_string())),
        };

        let bytes = std::fs::read(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FolioError::DocumentNotFound(path.to_string()),
            _ => FolioError::parse(path, e),
        })?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| FolioError::parse(path, e))?;
        if !value.is_object() {
            return Err(FolioError::parse(path, "top-level value is not an object"));
        }

        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(LoadedDocument::new(
            DocNode::from_json(ROOT_NODE, &value),
            last_modified,
        ))
    }

    fn document_paths(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(FolioError::StorageUnavailable(format!(
                "document root {} is not a directory",
                self.root.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            paths.push(parts.join("/"));
        }
        Ok(paths)
    }
}
