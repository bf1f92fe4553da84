//! Persistent document index
//!
//! Authoritative state lives in memory behind a read-write lock: the path/ID
//! tables, the cached entries and one [`FieldIndex`] per configured field plus
//! freetext. Mutations mark the keys they touch; `commit` flushes the current
//! value of every touched key to the fjall tables in one atomic batch.
//!
//! Writers serialize on a separate mutex so that parsing and tokenizing run
//! without blocking readers. Only the final application of a document's
//! postings takes the state write lock.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{FieldSpec, IndexSettings};
use crate::error::FolioError;
use crate::index::cancel::CancellationToken;
use crate::index::extract;
use crate::index::field_index::FieldIndex;
use crate::index::integrity::{self, Violation};
use crate::index::path::fix_path;
use crate::models::{DocId, IndexEntry, LoadedDocument, FREETEXT_FIELD};
use crate::persistence::{IndexTables, StoredIndex, TableBatch};
use crate::source::{DocumentSource, FsDocumentSource};
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Outcome of a rebuild
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub indexed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

impl RebuildReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }
}

/// Size summary of an open index
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub freetext_words: usize,
    /// Distinct tokens per field
    pub fields: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub(crate) struct IndexState {
    pub(crate) path_to_id: HashMap<String, DocId>,
    pub(crate) id_to_path: HashMap<DocId, String>,
    pub(crate) entries: HashMap<DocId, Arc<IndexEntry>>,
    pub(crate) freetext: FieldIndex,
    pub(crate) fields: BTreeMap<String, FieldIndex>,
}

impl IndexState {
    fn empty(settings: &IndexSettings) -> Self {
        Self {
            path_to_id: HashMap::new(),
            id_to_path: HashMap::new(),
            entries: HashMap::new(),
            freetext: FieldIndex::new(FieldSpec::text(FREETEXT_FIELD)),
            fields: settings
                .fields
                .iter()
                .map(|spec| (spec.name.clone(), FieldIndex::new(spec.clone())))
                .collect(),
        }
    }

    fn from_stored(settings: &IndexSettings, stored: StoredIndex) -> Result<Self> {
        let mut state = Self::empty(settings);

        for (path, id) in stored.path_to_id {
            state.path_to_id.insert(path, id);
        }
        for (id, path) in stored.id_to_path {
            if state.path_to_id.get(&path) != Some(&id) {
                return Err(FolioError::corrupt(
                    "id_to_path",
                    format!("document {} maps to {} but the path does not map back", id, path),
                ));
            }
            state.id_to_path.insert(id, path);
        }
        if state.id_to_path.len() != state.path_to_id.len() {
            return Err(FolioError::corrupt(
                "path_to_id",
                "path and id tables disagree on document count",
            ));
        }

        for entry in stored.entries {
            if state.id_to_path.get(&entry.id) != Some(&entry.path) {
                return Err(FolioError::corrupt(
                    "entries",
                    format!("entry {} has no matching path", entry.id),
                ));
            }
            state.entries.insert(entry.id, Arc::new(entry));
        }
        if state.entries.len() != state.id_to_path.len() {
            return Err(FolioError::corrupt(
                "entries",
                "documents without a cached entry",
            ));
        }

        for (field, token, list) in stored.postings {
            state.field_mut_or_corrupt(&field)?.restore_postings(token, list);
        }
        for (field, id, tokens) in stored.forward {
            state.field_mut_or_corrupt(&field)?.restore_forward(id, tokens);
        }
        Ok(state)
    }

    fn field_mut_or_corrupt(&mut self, name: &str) -> Result<&mut FieldIndex> {
        if name == FREETEXT_FIELD {
            return Ok(&mut self.freetext);
        }
        self.fields
            .get_mut(name)
            .ok_or_else(|| FolioError::corrupt("postings", format!("unknown field '{}'", name)))
    }

    fn field_indexes_mut(&mut self) -> impl Iterator<Item = &mut FieldIndex> {
        std::iter::once(&mut self.freetext).chain(self.fields.values_mut())
    }

    /// Forget everything about `id`. Returns false when postings disagreed
    /// with the forward lists.
    fn remove_id(&mut self, id: DocId, pending: &mut PendingWrites) -> bool {
        let mut consistent = true;
        for field in self.field_indexes_mut() {
            let removed = field.remove_doc(id);
            consistent &= removed.consistent;
            let name = field.name().to_string();
            for token in removed.tokens {
                pending.postings.insert((name.clone(), token));
            }
            pending.forward.insert((name, id));
        }

        if let Some(path) = self.id_to_path.remove(&id) {
            self.path_to_id.remove(&path);
            pending.paths.insert(path);
        }
        self.entries.remove(&id);
        pending.ids.insert(id);
        pending.entries.insert(id);
        consistent
    }

    fn apply(&mut self, prepared: PreparedDocument, pending: &mut PendingWrites) {
        let PreparedDocument { id, entry, tokens } = prepared;
        let path = entry.path.clone();

        self.path_to_id.insert(path.clone(), id);
        self.id_to_path.insert(id, path.clone());
        self.entries.insert(id, Arc::new(entry));
        pending.paths.insert(path);
        pending.ids.insert(id);
        pending.entries.insert(id);

        for (name, field_tokens) in tokens {
            let field = if name == FREETEXT_FIELD {
                &mut self.freetext
            } else if let Some(field) = self.fields.get_mut(&name) {
                field
            } else {
                continue;
            };
            for token in field.insert_tokens(id, field_tokens) {
                pending.postings.insert((name.clone(), token));
            }
            pending.forward.insert((name, id));
        }
    }

    fn field(&self, name: &str) -> Option<&FieldIndex> {
        if name == FREETEXT_FIELD {
            return Some(&self.freetext);
        }
        self.fields.get(name)
    }

    /// Snapshot the current value of every pending key
    fn batch_for(&self, pending: &PendingWrites, last_id: Option<DocId>) -> TableBatch {
        let mut batch = TableBatch {
            last_id: if pending.last_id_dirty { last_id } else { None },
            ..Default::default()
        };
        for path in &pending.paths {
            batch
                .paths
                .push((path.clone(), self.path_to_id.get(path).copied()));
        }
        for id in &pending.ids {
            batch.ids.push((*id, self.id_to_path.get(id).cloned()));
        }
        for id in &pending.entries {
            batch
                .entries
                .push((*id, self.entries.get(id).map(|e| e.as_ref().clone())));
        }
        for (name, token) in &pending.postings {
            let list = self.field(name).and_then(|f| f.postings(token)).cloned();
            batch.postings.push((name.clone(), token.clone(), list));
        }
        for (name, id) in &pending.forward {
            let tokens = self
                .field(name)
                .and_then(|f| f.tokens_for(*id))
                .map(<[String]>::to_vec);
            batch.forward.push((name.clone(), *id, tokens));
        }
        batch
    }
}

/// Keys touched since the last commit
#[derive(Debug, Default)]
struct PendingWrites {
    last_id_dirty: bool,
    paths: HashSet<String>,
    ids: HashSet<DocId>,
    entries: HashSet<DocId>,
    postings: HashSet<(String, String)>,
    forward: HashSet<(String, DocId)>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        !self.last_id_dirty
            && self.paths.is_empty()
            && self.ids.is_empty()
            && self.entries.is_empty()
            && self.postings.is_empty()
            && self.forward.is_empty()
    }
}

struct Writer {
    tables: Option<IndexTables>,
    pending: PendingWrites,
    last_id: Option<DocId>,
}

impl Writer {
    fn tables(&self) -> Result<&IndexTables> {
        self.tables
            .as_ref()
            .ok_or_else(|| FolioError::StorageUnavailable("index is closed".to_string()))
    }

    fn allocate_id(&mut self) -> Result<DocId> {
        let next = match self.last_id {
            None => 0,
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| FolioError::Internal("document id space exhausted".to_string()))?,
        };
        self.last_id = Some(next);
        self.pending.last_id_dirty = true;
        Ok(next)
    }
}

/// A document parsed and tokenized outside the state lock
struct PreparedDocument {
    id: DocId,
    entry: IndexEntry,
    tokens: Vec<(String, BTreeSet<String>)>,
}

/// Flush pending writes. On failure they stay pending for the next attempt.
fn flush(state: &RwLock<IndexState>, writer: &mut Writer) -> Result<()> {
    if writer.pending.is_empty() {
        return Ok(());
    }
    let batch = state.read().batch_for(&writer.pending, writer.last_id);
    writer.tables()?.write(&batch)?;
    debug!(records = batch.len(), "committed index batch");
    writer.pending = PendingWrites::default();
    Ok(())
}

/// Persistent, concurrently readable document index
pub struct IndexStore {
    settings: IndexSettings,
    tokenizer: Tokenizer,
    source: Arc<dyn DocumentSource>,
    writer: Mutex<Writer>,
    state: RwLock<IndexState>,
}

impl IndexStore {
    /// Open the index in `settings.index_dir`, creating it if absent
    pub fn open(settings: IndexSettings, source: Arc<dyn DocumentSource>) -> Result<Self> {
        let tables = IndexTables::open(&settings.index_dir, &settings.schema_fingerprint())?;
        let stored = tables.load()?;
        let last_id = stored.last_id;
        let state = IndexState::from_stored(&settings, stored)?;

        info!(
            dir = %settings.index_dir.display(),
            documents = state.entries.len(),
            "opened index"
        );

        Ok(Self {
            tokenizer: Tokenizer::new(&settings.tokenizer),
            settings,
            source,
            writer: Mutex::new(Writer {
                tables: Some(tables),
                pending: PendingWrites::default(),
                last_id,
            }),
            state: RwLock::new(state),
        })
    }

    /// Open an index of the JSON documents under `documents_root`, stored in
    /// `index_dir` with default settings
    pub fn open_fs(documents_root: impl AsRef<Path>, index_dir: impl AsRef<Path>) -> Result<Self> {
        let settings = IndexSettings::new(index_dir.as_ref());
        let source = Arc::new(FsDocumentSource::new(documents_root.as_ref()));
        Self::open(settings, source)
    }

    /// Discard whatever is stored in `settings.index_dir` and open an empty
    /// index there. The way out of an incompatible or corrupt index.
    pub fn recreate(settings: IndexSettings, source: Arc<dyn DocumentSource>) -> Result<Self> {
        if settings.index_dir.exists() {
            warn!(dir = %settings.index_dir.display(), "discarding existing index");
            std::fs::remove_dir_all(&settings.index_dir)?;
        }
        Self::open(settings, source)
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn source(&self) -> &Arc<dyn DocumentSource> {
        &self.source
    }

    /// Parse, tokenize and index one document, replacing any previous
    /// version at the same path, then commit. On a parse failure the index
    /// is left exactly as it was.
    pub fn insert_document(&self, path: &str) -> Result<DocId> {
        let path = fix_path(path);
        let mut writer = self.writer.lock();
        writer.tables()?;

        let doc = self.source.load(&path)?;
        let id = self.index_loaded(&mut writer, &path, &doc)?;
        flush(&self.state, &mut writer)?;

        debug!(path = %path, id, "indexed document");
        Ok(id)
    }

    fn index_loaded(&self, writer: &mut Writer, path: &str, doc: &LoadedDocument) -> Result<DocId> {
        let existing = self.state.read().path_to_id.get(path).copied();
        let id = match existing {
            Some(id) => id,
            None => writer.allocate_id()?,
        };
        let prepared = self.prepare(id, path, doc);

        let mut state = self.state.write();
        if let Some(old) = existing {
            if !state.remove_id(old, &mut writer.pending) {
                warn!(path = %path, id = old, "postings out of step with forward lists");
            }
        }
        state.apply(prepared, &mut writer.pending);
        Ok(id)
    }

    fn prepare(&self, id: DocId, path: &str, doc: &LoadedDocument) -> PreparedDocument {
        let mut tokens = Vec::with_capacity(self.settings.fields.len() + 1);

        let freetext_spec = FieldSpec::text(FREETEXT_FIELD);
        tokens.push((
            FREETEXT_FIELD.to_string(),
            self.tokenizer
                .index_tokens(&extract::freetext(&doc.root), &freetext_spec),
        ));
        for spec in &self.settings.fields {
            let text = extract::field_text(&doc.root, &spec.name);
            let field_tokens = self.tokenizer.index_tokens(&text, spec);
            if !field_tokens.is_empty() {
                tokens.push((spec.name.clone(), field_tokens));
            }
        }

        PreparedDocument {
            id,
            entry: extract::build_entry(id, path, doc),
            tokens,
        }
    }

    /// Remove the document at `path` and commit. Returns `Ok(true)` when the
    /// path was absent or removed cleanly, `Ok(false)` when index tables
    /// disagreed with each other along the way.
    pub fn remove_document(&self, path: &str) -> Result<bool> {
        self.remove_documents(std::iter::once(path))
    }

    /// Remove several documents under one commit
    pub fn remove_documents<'a, I>(&self, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut writer = self.writer.lock();
        writer.tables()?;

        let mut clean = true;
        {
            let mut state = self.state.write();
            for path in paths {
                clean &= Self::remove_path(&mut state, &mut writer.pending, &fix_path(path));
            }
        }
        flush(&self.state, &mut writer)?;
        Ok(clean)
    }

    /// Remove, under one commit, every document whose entry matches
    /// `predicate`. The predicate sees the entries as they are while the
    /// writer lock is held. Returns the removed paths and whether removal
    /// was clean.
    pub fn remove_matching<F>(&self, predicate: F) -> Result<(Vec<String>, bool)>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        let mut writer = self.writer.lock();
        writer.tables()?;

        let mut removed = Vec::new();
        let mut clean = true;
        {
            let mut state = self.state.write();
            let mut paths: Vec<String> = state
                .entries
                .values()
                .map(Arc::as_ref)
                .filter(|entry| predicate(*entry))
                .map(|entry| entry.path.clone())
                .collect();
            paths.sort();
            for path in paths {
                clean &= Self::remove_path(&mut state, &mut writer.pending, &path);
                removed.push(path);
            }
        }
        flush(&self.state, &mut writer)?;
        Ok((removed, clean))
    }

    fn remove_path(state: &mut IndexState, pending: &mut PendingWrites, path: &str) -> bool {
        let Some(id) = state.path_to_id.get(path).copied() else {
            return true;
        };
        debug!(path = %path, id, "removing document");
        if state.remove_id(id, pending) {
            true
        } else {
            warn!(path = %path, id, "postings out of step with forward lists");
            false
        }
    }

    /// Flush buffered mutations to durable storage
    pub fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        flush(&self.state, &mut writer)
    }

    /// Rebuild from scratch from every path the source enumerates
    pub fn rebuild_index(&self) -> Result<RebuildReport> {
        self.rebuild_index_with(&CancellationToken::new())
    }

    /// Rebuild, checking `cancel` between documents. A cancelled rebuild
    /// leaves a consistent, committed index of the documents seen so far.
    pub fn rebuild_index_with(&self, cancel: &CancellationToken) -> Result<RebuildReport> {
        let mut writer = self.writer.lock();
        writer.tables()?;
        // an unreachable source leaves the existing index untouched
        let paths = self.source.document_paths()?;

        writer
            .tables()?
            .clear(&self.settings.schema_fingerprint())?;
        writer.pending = PendingWrites::default();
        writer.last_id = None;
        *self.state.write() = IndexState::empty(&self.settings);

        info!(dir = %self.settings.index_dir.display(), documents = paths.len(), "rebuilding index");

        let interval = self.settings.commit_interval.max(1);
        let mut report = RebuildReport::default();
        for path in paths {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let path = fix_path(&path);
            let doc = match self.source.load(&path) {
                Ok(doc) => doc,
                Err(e) if e.is_document_error() => {
                    warn!(path = %path, error = %e, "skipping document");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.index_loaded(&mut writer, &path, &doc)?;
            report.indexed += 1;

            if report.indexed % interval == 0 {
                flush(&self.state, &mut writer)?;
                debug!(indexed = report.indexed, "rebuild progress");
            }
        }
        flush(&self.state, &mut writer)?;

        info!(
            indexed = report.indexed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "rebuild finished"
        );
        Ok(report)
    }

    /// Commit and release storage. Later mutations fail with
    /// `StorageUnavailable`; reads keep serving the in-memory state.
    pub fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        if writer.tables.is_none() {
            return Ok(());
        }
        flush(&self.state, &mut writer)?;
        writer.tables = None;
        info!(dir = %self.settings.index_dir.display(), "closed index");
        Ok(())
    }

    /// Read view of the whole index, held for the duration of one query
    pub fn reader(&self) -> IndexView<'_> {
        IndexView {
            state: self.state.read(),
        }
    }

    pub fn entry(&self, path: &str) -> Option<Arc<IndexEntry>> {
        let state = self.state.read();
        let id = state.path_to_id.get(&fix_path(path))?;
        state.entries.get(id).cloned()
    }

    pub fn entry_for(&self, id: DocId) -> Option<Arc<IndexEntry>> {
        self.state.read().entries.get(&id).cloned()
    }

    pub fn id_for(&self, path: &str) -> Option<DocId> {
        self.state.read().path_to_id.get(&fix_path(path)).copied()
    }

    pub fn path_for(&self, id: DocId) -> Option<String> {
        self.state.read().id_to_path.get(&id).cloned()
    }

    pub fn all_ids(&self) -> RoaringBitmap {
        self.reader().all_ids()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct freetext tokens
    pub fn word_count(&self) -> usize {
        self.state.read().freetext.word_count()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            documents: state.entries.len(),
            freetext_words: state.freetext.word_count(),
            fields: state
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.word_count()))
                .collect(),
        }
    }

    /// Dump the path and ID tables to the log
    pub fn log_state(&self, title: &str) {
        let state = self.state.read();
        info!(title, documents = state.entries.len(), "index state");
        let mut paths: Vec<_> = state.path_to_id.iter().collect();
        paths.sort();
        for (path, id) in paths {
            info!(title, path = %path, id, "path -> id");
        }
        let mut ids: Vec<_> = state.id_to_path.iter().collect();
        ids.sort();
        for (id, path) in ids {
            info!(title, id, path = %path, "id -> path");
        }
    }

    /// Check the cross-table invariants of the in-memory state
    pub fn check_integrity(&self) -> Vec<Violation> {
        integrity::check_all(&self.reader())
    }
}

impl Drop for IndexStore {
    fn drop(&mut self) {
        let writer = self.writer.get_mut();
        if writer.tables.is_some() {
            if let Err(e) = flush(&self.state, writer) {
                warn!(error = %e, "failed to commit index on drop");
            }
        }
    }
}

/// Consistent read snapshot of the index. Writers wait while a view is held.
pub struct IndexView<'a> {
    state: RwLockReadGuard<'a, IndexState>,
}

impl<'a> IndexView<'a> {
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn entry(&self, id: DocId) -> Option<&Arc<IndexEntry>> {
        self.state.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<IndexEntry>> {
        self.state.entries.values()
    }

    pub fn all_ids(&self) -> RoaringBitmap {
        self.state.entries.keys().copied().collect()
    }

    pub fn freetext(&self) -> &FieldIndex {
        &self.state.freetext
    }

    /// Index for `name`, or `None` when the field is not configured
    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.state.field(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldIndex> {
        std::iter::once(&self.state.freetext).chain(self.state.fields.values())
    }

    pub fn id_for(&self, path: &str) -> Option<DocId> {
        self.state.path_to_id.get(path).copied()
    }

    pub fn path_for(&self, id: DocId) -> Option<&str> {
        self.state.id_to_path.get(&id).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, DocId)> {
        self.state.path_to_id.iter().map(|(p, id)| (p.as_str(), *id))
    }
}
