//! Pulls the cached metadata and per-field text out of a parsed document.

use std::collections::BTreeSet;

use crate::models::{split_list, DocId, DocNode, IndexEntry, LoadedDocument};

const DAYS_PER_YEAR: u32 = 365;
const DAYS_PER_MONTH: u32 = 30;
const DAYS_PER_WEEK: u32 = 7;

/// Build the cached entry for a document stored at `path`
pub fn build_entry(id: DocId, path: &str, doc: &LoadedDocument) -> IndexEntry {
    let root = &doc.root;
    let mut entry = IndexEntry::new(id, path);
    entry.title = first_text(root, "title").unwrap_or_default();
    entry.alternative_title = first_text(root, "alternative-title");
    entry.category = first_text(root, "category");
    entry.publication_date = first_text(root, "publication-date").unwrap_or_default();
    entry.last_modified = doc.last_modified;
    entry.read_access = read_access(root);
    entry.owners = owners(root);
    entry.patient_ages = root
        .descendants("pt-age")
        .into_iter()
        .filter_map(patient_age_days)
        .collect();
    entry
}

/// Text of every descendant named `field`, concatenated
pub fn field_text(root: &DocNode, field: &str) -> String {
    root.descendants(field)
        .into_iter()
        .map(DocNode::text_content)
        .collect::<Vec<_>>()
        .join(" ")
}

/// All text in the document
pub fn freetext(root: &DocNode) -> String {
    root.text_content()
}

fn first_text(root: &DocNode, name: &str) -> Option<String> {
    root.first_descendant(name).map(|node| collapse(&node.text_content()))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `None` unless the document's authorization section has at least one
/// `read` element; an empty read list then yields `Some(vec![])`.
fn read_access(root: &DocNode) -> Option<Vec<String>> {
    let auth = root.first_descendant("authorization")?;
    let reads = auth.descendants("read");
    if reads.is_empty() {
        return None;
    }
    let mut list = Vec::new();
    for read in reads {
        list.extend(split_list(&read.text_content()));
    }
    Some(list)
}

fn owners(root: &DocNode) -> BTreeSet<String> {
    let Some(auth) = root.first_descendant("authorization") else {
        return BTreeSet::new();
    };
    auth.descendants("owner")
        .into_iter()
        .flat_map(|owner| split_list(&owner.text_content()).collect::<Vec<_>>())
        .collect()
}

/// Age in days from a `pt-age` node: `years`, `months`, `weeks` and `days`
/// children are summed; a bare number counts as years.
pub fn patient_age_days(node: &DocNode) -> Option<u32> {
    let units = [
        ("years", DAYS_PER_YEAR),
        ("months", DAYS_PER_MONTH),
        ("weeks", DAYS_PER_WEEK),
        ("days", 1),
    ];

    let mut total: u64 = 0;
    let mut found = false;
    for (unit, multiplier) in units {
        for child in node.children_named(unit) {
            if let Some(value) = leading_number(&child.text_content()) {
                total += u64::from(value) * u64::from(multiplier);
                found = true;
            }
        }
    }

    if !found {
        let value = leading_number(node.text.as_deref()?)?;
        total = u64::from(value) * u64::from(DAYS_PER_YEAR);
    }
    Some(u32::try_from(total).unwrap_or(u32::MAX))
}

fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
