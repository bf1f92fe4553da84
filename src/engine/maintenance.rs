//! Housekeeping over a whole index: expiry sweeps and owner summaries.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::info;

use crate::engine::sort::sort_entries;
use crate::index::{IndexStore, IndexView};
use crate::models::{IndexEntry, SortOrder};
use crate::Result;

/// Outcome of an expiry sweep
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub removed: Vec<String>,
    /// False when some removal found the index tables out of step
    pub clean: bool,
}

/// Remove every document last modified before `now_ms - max_age`
pub fn purge_expired(store: &IndexStore, max_age: Duration, now_ms: u64) -> Result<PurgeReport> {
    let max_age_ms = u64::try_from(max_age.num_milliseconds()).unwrap_or(0);
    let cutoff = now_ms.saturating_sub(max_age_ms);

    let (removed, clean) = store.remove_matching(|entry| entry.last_modified < cutoff)?;
    if !removed.is_empty() {
        info!(removed = removed.len(), cutoff, "purged expired documents");
    }
    Ok(PurgeReport { removed, clean })
}

/// Documents grouped by owner, for those published in a date window
#[derive(Clone, Debug, Default)]
pub struct OwnerSummary {
    pub from: String,
    pub to: String,
    pub total_documents: usize,
    pub public_documents: usize,
    pub published_in_window: usize,
    pub by_owner: BTreeMap<String, Vec<Arc<IndexEntry>>>,
    pub unowned: Vec<Arc<IndexEntry>>,
}

/// Summarize documents with `from <= publication_date <= to`. Dates compare
/// as strings; an empty bound is open.
pub fn owner_summary(view: &IndexView<'_>, from: &str, to: &str) -> OwnerSummary {
    let mut summary = OwnerSummary {
        from: from.to_string(),
        to: to.to_string(),
        ..Default::default()
    };

    for entry in view.entries() {
        summary.total_documents += 1;
        if entry.is_public() {
            summary.public_documents += 1;
        }

        let date = entry.publication_date.as_str();
        let in_window = (from.is_empty() || date >= from) && (to.is_empty() || date <= to);
        if !in_window {
            continue;
        }
        summary.published_in_window += 1;
        if entry.owners.is_empty() {
            summary.unowned.push(entry.clone());
        }
        for owner in &entry.owners {
            summary
                .by_owner
                .entry(owner.clone())
                .or_default()
                .push(entry.clone());
        }
    }

    for list in summary.by_owner.values_mut() {
        sort_entries(list, SortOrder::Title);
    }
    sort_entries(&mut summary.unowned, SortOrder::Title);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::models::{DocNode, LoadedDocument};
    use crate::source::MemoryDocumentSource;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value, last_modified: u64) -> LoadedDocument {
        LoadedDocument::new(DocNode::from_json("document", &value), last_modified)
    }

    fn setup() -> (TempDir, IndexStore) {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MemoryDocumentSource::new());
        source.insert_loaded(
            "old.json",
            doc(
                json!({ "title": "Old", "publication-date": "2019-05-01",
                        "authorization": { "owner": "alice", "read": "staff" } }),
                1_000,
            ),
        );
        source.insert_loaded(
            "new.json",
            doc(
                json!({ "title": "New", "publication-date": "2021-02-01",
                        "authorization": { "owner": "alice bob" } }),
                9_000,
            ),
        );
        source.insert_loaded(
            "orphan.json",
            doc(json!({ "title": "Orphan", "publication-date": "2021-03-01" }), 9_500),
        );
        let store = IndexStore::open(IndexSettings::new(dir.path()), source).unwrap();
        store.rebuild_index().unwrap();
        (dir, store)
    }

    #[test]
    fn test_purge_expired() {
        let (_dir, store) = setup();
        let report = purge_expired(&store, Duration::milliseconds(5_000), 10_000).unwrap();
        assert_eq!(report.removed, vec!["old.json"]);
        assert!(report.clean);
        assert_eq!(store.len(), 2);
        assert!(store.entry("old.json").is_none());

        let again = purge_expired(&store, Duration::milliseconds(5_000), 10_000).unwrap();
        assert!(again.removed.is_empty());
    }

    #[test]
    fn test_owner_summary() {
        let (_dir, store) = setup();
        let summary = owner_summary(&store.reader(), "2020-01-01", "2021-12-31");

        assert_eq!(summary.total_documents, 3);
        assert_eq!(summary.public_documents, 2);
        assert_eq!(summary.published_in_window, 2);
        assert_eq!(summary.by_owner["alice"].len(), 1);
        assert_eq!(summary.by_owner["bob"][0].title, "New");
        assert_eq!(summary.unowned[0].title, "Orphan");

        let all = owner_summary(&store.reader(), "", "");
        assert_eq!(all.published_in_window, 3);
        assert_eq!(all.by_owner["alice"].len(), 2);
    }
}
