use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::document::DocId;

/// Cached per-document metadata used for filtering and sorting without
/// re-reading the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: DocId,
    pub path: String,
    pub title: String,
    pub alternative_title: Option<String>,
    pub category: Option<String>,
    pub publication_date: String,
    /// Unix milliseconds
    pub last_modified: u64,
    /// `None` when the document carries no read list at all
    pub read_access: Option<Vec<String>>,
    pub owners: BTreeSet<String>,
    /// Patient ages in days, one per patient with a usable age
    pub patient_ages: Vec<u32>,
}

impl IndexEntry {
    pub fn new(id: DocId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            title: String::new(),
            alternative_title: None,
            category: None,
            publication_date: String::new(),
            last_modified: 0,
            read_access: None,
            owners: BTreeSet::new(),
            patient_ages: Vec::new(),
        }
    }

    /// Readable by anyone, including anonymous callers
    pub fn is_public(&self) -> bool {
        match &self.read_access {
            None => true,
            Some(list) => list.iter().any(|r| r == "*"),
        }
    }

    pub fn has_patient_in_age_range(&self, min_days: u32, max_days: u32) -> bool {
        self.patient_ages
            .iter()
            .any(|&age| age >= min_days && age <= max_days)
    }

    /// Title to show in result lists. In unknown mode the real title is
    /// withheld in favour of the alternative title, or a category hint.
    pub fn display_title(&self, unknown: bool) -> String {
        if !unknown {
            return self.title.clone();
        }
        if let Some(alt) = self.alternative_title.as_deref().filter(|t| !t.is_empty()) {
            return alt.to_string();
        }
        match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => format!("Unknown - {}", category),
            None => "Unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_entries() {
        let mut entry = IndexEntry::new(1, "docs/a.json");
        assert!(entry.is_public());

        entry.read_access = Some(vec!["radiologist".to_string()]);
        assert!(!entry.is_public());

        entry.read_access = Some(vec!["radiologist".to_string(), "*".to_string()]);
        assert!(entry.is_public());

        entry.read_access = Some(Vec::new());
        assert!(!entry.is_public());
    }

    #[test]
    fn test_age_range_is_inclusive() {
        let mut entry = IndexEntry::new(1, "docs/a.json");
        entry.patient_ages = vec![365, 4000];
        assert!(entry.has_patient_in_age_range(365, 365));
        assert!(entry.has_patient_in_age_range(300, 400));
        assert!(entry.has_patient_in_age_range(3000, 5000));
        assert!(!entry.has_patient_in_age_range(366, 3999));

        entry.patient_ages.clear();
        assert!(!entry.has_patient_in_age_range(0, u32::MAX));
    }

    #[test]
    fn test_display_title() {
        let mut entry = IndexEntry::new(1, "docs/a.json");
        entry.title = "Pneumothorax".to_string();
        assert_eq!(entry.display_title(false), "Pneumothorax");
        assert_eq!(entry.display_title(true), "Unknown");

        entry.category = Some("Chest".to_string());
        assert_eq!(entry.display_title(true), "Unknown - Chest");

        entry.alternative_title = Some("Case 12".to_string());
        assert_eq!(entry.display_title(true), "Case 12");
    }
}
