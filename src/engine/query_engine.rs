use std::sync::Arc;

use chrono::Duration;
use roaring::RoaringBitmap;
use tracing::{debug, warn};

use crate::access::AccessFilter;
use crate::config::{FieldSpec, UnknownFieldPolicy};
use crate::engine::maintenance::{self, OwnerSummary, PurgeReport};
use crate::engine::results::QueryResults;
use crate::engine::sort::sort_entries;
use crate::index::{field_text, FieldIndex, IndexStore, IndexView};
use crate::models::{
    current_timestamp_ms, Caller, IndexEntry, QueryRequest, SortOrder, VisibilityMode, FREETEXT_FIELD,
};
use crate::query::{AgeRange, CompiledQuery, QueryCompiler, QueryExpr};
use crate::Result;

/// Runs structured queries against an [`IndexStore`]
pub struct QueryEngine {
    store: Arc<IndexStore>,
    compiler: QueryCompiler,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>) -> Self {
        let compiler = QueryCompiler::new(store.tokenizer().clone());
        Self { store, compiler }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Compile, execute and sort `request`
    pub fn query(
        &self,
        request: &QueryRequest,
        mode: VisibilityMode,
        caller: &Caller,
    ) -> Result<QueryResults> {
        let compiled = self.compiler.compile(request);
        let mut entries = self.execute(&compiled, mode, caller)?;
        sort_entries(&mut entries, compiled.order_by);
        debug!(
            results = entries.len(),
            fast_path = compiled.is_fast_path(),
            "query finished"
        );
        Ok(QueryResults::new(entries, compiled.unknown))
    }

    /// Unsorted matches of an already compiled query
    pub fn execute(
        &self,
        compiled: &CompiledQuery,
        mode: VisibilityMode,
        caller: &Caller,
    ) -> Result<Vec<Arc<IndexEntry>>> {
        let view = self.store.reader();

        if compiled.is_fast_path() {
            let check_access = mode == VisibilityMode::Restricted;
            return Ok(view
                .entries()
                .filter(|e| !check_access || AccessFilter::is_readable(e, caller))
                .filter(|e| age_matches(e, compiled.age.as_ref()))
                .cloned()
                .collect());
        }

        let Some(ids) = self.resolve_ids(&view, compiled)? else {
            return Ok(Vec::new());
        };

        let check_access = mode == VisibilityMode::Restricted && !caller.is_admin;
        Ok(ids
            .iter()
            .filter_map(|id| view.entry(id))
            .filter(|e| !check_access || AccessFilter::is_readable(e, caller))
            .filter(|e| age_matches(e, compiled.age.as_ref()))
            .cloned()
            .collect())
    }

    /// Intersection of every field's matches; `None` as soon as one field
    /// matches nothing.
    fn resolve_ids(&self, view: &IndexView<'_>, compiled: &CompiledQuery) -> Result<Option<RoaringBitmap>> {
        let mut running: Option<RoaringBitmap> = None;

        let clauses = compiled
            .freetext
            .iter()
            .map(|expr| (FREETEXT_FIELD, expr))
            .chain(compiled.fields.iter().map(|(name, expr)| (name.as_str(), expr)));

        for (name, expr) in clauses {
            let found = match view.field(name) {
                Some(field) => expr.evaluate(field),
                None => self.resolve_unknown_field(view, name, expr)?,
            };
            let next = match running {
                None => found,
                Some(acc) => FieldIndex::intersection(&acc, &found),
            };
            if next.is_empty() {
                debug!(field = name, "no matches, short-circuiting");
                return Ok(None);
            }
            running = Some(next);
        }
        Ok(running)
    }

    fn resolve_unknown_field(
        &self,
        view: &IndexView<'_>,
        name: &str,
        expr: &QueryExpr,
    ) -> Result<RoaringBitmap> {
        match self.store.settings().unknown_fields {
            UnknownFieldPolicy::Empty => {
                debug!(field = name, "query on field without an index");
                Ok(RoaringBitmap::new())
            }
            UnknownFieldPolicy::ScanDocuments => self.scan_field(view, name, expr),
        }
    }

    /// Re-read every indexed document and match its `name` descendants
    fn scan_field(&self, view: &IndexView<'_>, name: &str, expr: &QueryExpr) -> Result<RoaringBitmap> {
        let spec = FieldSpec::text(name);
        let tokenizer = self.store.tokenizer();
        let mut scratch = FieldIndex::new(spec.clone());

        for entry in view.entries() {
            let doc = match self.store.source().load(&entry.path) {
                Ok(doc) => doc,
                Err(e) if e.is_document_error() => {
                    warn!(path = %entry.path, error = %e, "skipping document during field scan");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let text = field_text(&doc.root, name);
            scratch.insert_tokens(entry.id, tokenizer.index_tokens(&text, &spec));
        }
        debug!(field = name, documents = scratch.doc_count(), "scanned field");
        Ok(expr.evaluate(&scratch))
    }

    /// Administrative freetext search: every matching document, no access
    /// filtering, ordered by title.
    pub fn query_freetext(&self, text: &str) -> Result<QueryResults> {
        let request = QueryRequest::new().freetext(text).order_by(SortOrder::Title);
        let compiled = self.compiler.compile(&request);
        if compiled.is_blank_query() {
            return Ok(QueryResults::default());
        }
        let mut entries = self.execute(&compiled, VisibilityMode::Open, &Caller::anonymous())?;
        sort_entries(&mut entries, SortOrder::Title);
        Ok(QueryResults::new(entries, false))
    }

    /// Remove documents not modified within `max_age`
    pub fn purge_expired(&self, max_age: Duration) -> Result<PurgeReport> {
        maintenance::purge_expired(&self.store, max_age, current_timestamp_ms())
    }

    pub fn owner_summary(&self, from: &str, to: &str) -> OwnerSummary {
        maintenance::owner_summary(&self.store.reader(), from, to)
    }
}

fn age_matches(entry: &IndexEntry, age: Option<&AgeRange>) -> bool {
    match age {
        None => true,
        Some(range) => entry.has_patient_in_age_range(range.min_days, range.max_days),
    }
}
