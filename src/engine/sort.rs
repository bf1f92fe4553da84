//! Result ordering. Every order is total: ties fall back to ascending ID.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{IndexEntry, SortOrder};

pub fn compare(a: &IndexEntry, b: &IndexEntry, order: SortOrder) -> Ordering {
    let primary = match order {
        SortOrder::Title => a.title.cmp(&b.title),
        // most recent first
        SortOrder::LastModified => b.last_modified.cmp(&a.last_modified),
        SortOrder::PublicationDate => a.publication_date.cmp(&b.publication_date),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

pub fn sort_entries(entries: &mut [Arc<IndexEntry>], order: SortOrder) {
    entries.sort_by(|a, b| compare(a, b, order));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, title: &str, last_modified: u64, pubdate: &str) -> Arc<IndexEntry> {
        let mut e = IndexEntry::new(id, format!("{}.json", id));
        e.title = title.to_string();
        e.last_modified = last_modified;
        e.publication_date = pubdate.to_string();
        Arc::new(e)
    }

    fn ids(entries: &[Arc<IndexEntry>]) -> Vec<u32> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_title_ascending() {
        let mut entries = vec![entry(0, "Chest X-ray", 0, ""), entry(1, "Brain MR", 0, "")];
        sort_entries(&mut entries, SortOrder::Title);
        assert_eq!(ids(&entries), vec![1, 0]);
    }

    #[test]
    fn test_last_modified_descending() {
        let mut entries = vec![entry(0, "a", 100, ""), entry(1, "b", 300, ""), entry(2, "c", 200, "")];
        sort_entries(&mut entries, SortOrder::LastModified);
        assert_eq!(ids(&entries), vec![1, 2, 0]);
    }

    #[test]
    fn test_publication_date_ascending() {
        let mut entries = vec![
            entry(0, "a", 0, "2022-01-01"),
            entry(1, "b", 0, "2020-06-30"),
            entry(2, "c", 0, ""),
        ];
        sort_entries(&mut entries, SortOrder::PublicationDate);
        assert_eq!(ids(&entries), vec![2, 1, 0]);
    }

    #[test]
    fn test_ties_break_on_id() {
        for order in [SortOrder::Title, SortOrder::LastModified, SortOrder::PublicationDate] {
            let mut entries = vec![
                entry(5, "Same", 10, "2021"),
                entry(2, "Same", 10, "2021"),
                entry(9, "Same", 10, "2021"),
            ];
            sort_entries(&mut entries, order);
            assert_eq!(ids(&entries), vec![2, 5, 9], "order {:?}", order);
        }
    }
}
