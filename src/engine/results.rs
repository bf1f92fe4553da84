use std::sync::Arc;

use crate::models::IndexEntry;

/// Page size used when a request does not name one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Ordered, filtered result of one query
#[derive(Clone, Debug, Default)]
pub struct QueryResults {
    entries: Vec<Arc<IndexEntry>>,
    unknown: bool,
}

impl QueryResults {
    pub fn new(entries: Vec<Arc<IndexEntry>>, unknown: bool) -> Self {
        Self { entries, unknown }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Arc<IndexEntry>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Arc<IndexEntry>> {
        self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexEntry>> {
        self.entries.iter()
    }

    /// Titles as they should be shown; withheld in unknown mode
    pub fn titles(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.display_title(self.unknown))
            .collect()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    /// One page of results. `first_result` is 1-based and defaults to 1;
    /// `max_results` defaults to [`DEFAULT_PAGE_SIZE`].
    pub fn page(&self, first_result: Option<usize>, max_results: Option<usize>) -> &[Arc<IndexEntry>] {
        let start = first_result.unwrap_or(1).max(1) - 1;
        let size = max_results.unwrap_or(DEFAULT_PAGE_SIZE);
        if start >= self.entries.len() {
            return &[];
        }
        let end = start.saturating_add(size).min(self.entries.len());
        &self.entries[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: u32) -> QueryResults {
        let entries = (0..n)
            .map(|id| Arc::new(IndexEntry::new(id, format!("{}.json", id))))
            .collect();
        QueryResults::new(entries, false)
    }

    fn ids(page: &[Arc<IndexEntry>]) -> Vec<u32> {
        page.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_default_page() {
        let r = results(25);
        assert_eq!(r.page(None, None).len(), DEFAULT_PAGE_SIZE);
        assert_eq!(ids(r.page(None, None))[0], 0);
    }

    #[test]
    fn test_page_is_one_based() {
        let r = results(25);
        assert_eq!(ids(r.page(Some(21), None)), vec![20, 21, 22, 23, 24]);
        assert_eq!(ids(r.page(Some(2), Some(3))), vec![1, 2, 3]);
        assert_eq!(ids(r.page(Some(0), Some(2))), vec![0, 1]);
    }

    #[test]
    fn test_page_past_end() {
        let r = results(3);
        assert!(r.page(Some(4), None).is_empty());
        assert!(r.page(Some(1), Some(0)).is_empty());
    }

    #[test]
    fn test_titles_in_unknown_mode() {
        let mut entry = IndexEntry::new(0, "a.json");
        entry.title = "Pneumothorax".to_string();
        entry.category = Some("Chest".to_string());
        let entry = Arc::new(entry);

        assert_eq!(
            QueryResults::new(vec![entry.clone()], false).titles(),
            vec!["Pneumothorax"]
        );
        assert_eq!(
            QueryResults::new(vec![entry], true).titles(),
            vec!["Unknown - Chest"]
        );
    }
}
