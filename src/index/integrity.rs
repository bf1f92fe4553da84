//! Cross-table invariants of an index
//!
//! The path, ID, entry and postings tables are maintained separately; these
//! checks confirm they still describe the same set of documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::index::store::IndexView;

/// A violation of an invariant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub invariant: String,
    pub description: String,
    pub context: BTreeMap<String, String>,
}

impl Violation {
    fn new(invariant: &str, description: impl Into<String>) -> Self {
        Self {
            invariant: invariant.to_string(),
            description: description.into(),
            context: BTreeMap::new(),
        }
    }

    fn with_context(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "INVARIANT VIOLATION: {}", self.invariant)?;
        writeln!(f, "  Description: {}", self.description)?;
        if !self.context.is_empty() {
            writeln!(f, "  Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "    {}: {}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Trait for invariant checkers
pub trait Invariant: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, view: &IndexView<'_>) -> Result<(), Violation>;

    fn description(&self) -> &str {
        "No description provided"
    }
}

/// Every invariant an index must satisfy
pub fn standard_invariants() -> Vec<Box<dyn Invariant>> {
    vec![
        Box::new(PathIdBijection),
        Box::new(EntryPerDocument),
        Box::new(PostingsMatchForwardLists),
    ]
}

pub fn check_all(view: &IndexView<'_>) -> Vec<Violation> {
    standard_invariants()
        .iter()
        .filter_map(|invariant| invariant.check(view).err())
        .collect()
}

/// Path → ID and ID → path are inverse bijections
pub struct PathIdBijection;

impl Invariant for PathIdBijection {
    fn name(&self) -> &str {
        "PathIdBijection"
    }

    fn description(&self) -> &str {
        "Every path maps to one ID and that ID maps back to the same path"
    }

    fn check(&self, view: &IndexView<'_>) -> Result<(), Violation> {
        for (path, id) in view.paths() {
            match view.path_for(id) {
                Some(back) if back == path => {}
                back => {
                    return Err(Violation::new(self.name(), "path does not round-trip")
                        .with_context("path", path)
                        .with_context("id", id)
                        .with_context("reverse", back.unwrap_or("<none>")));
                }
            }
        }
        Ok(())
    }
}

/// An entry exists exactly for the allocated IDs
pub struct EntryPerDocument;

impl Invariant for EntryPerDocument {
    fn name(&self) -> &str {
        "EntryPerDocument"
    }

    fn description(&self) -> &str {
        "A cached entry exists for an ID iff the ID is allocated to a path"
    }

    fn check(&self, view: &IndexView<'_>) -> Result<(), Violation> {
        for entry in view.entries() {
            if view.path_for(entry.id) != Some(entry.path.as_str()) {
                return Err(Violation::new(self.name(), "entry without matching path")
                    .with_context("id", entry.id)
                    .with_context("entry_path", &entry.path));
            }
        }
        for (path, id) in view.paths() {
            if view.entry(id).is_none() {
                return Err(Violation::new(self.name(), "allocated ID without entry")
                    .with_context("id", id)
                    .with_context("path", path));
            }
        }
        Ok(())
    }
}

/// Postings and forward lists agree, and only name live documents
pub struct PostingsMatchForwardLists;

impl Invariant for PostingsMatchForwardLists {
    fn name(&self) -> &str {
        "PostingsMatchForwardLists"
    }

    fn description(&self) -> &str {
        "Every posted ID is live and listed under the same token in its forward list"
    }

    fn check(&self, view: &IndexView<'_>) -> Result<(), Violation> {
        for field in view.fields() {
            for (token, list) in field.iter_postings() {
                for id in list {
                    let listed = field
                        .tokens_for(id)
                        .is_some_and(|tokens| tokens.iter().any(|t| t == token));
                    if view.entry(id).is_none() || !listed {
                        return Err(Violation::new(self.name(), "stale posting")
                            .with_context("field", field.name())
                            .with_context("token", token)
                            .with_context("id", id));
                    }
                }
            }
            for (id, tokens) in field.iter_forward() {
                for token in tokens {
                    if !field.postings(token).is_some_and(|list| list.contains(id)) {
                        return Err(Violation::new(self.name(), "forward list names a missing posting")
                            .with_context("field", field.name())
                            .with_context("token", token)
                            .with_context("id", id));
                    }
                }
            }
        }
        Ok(())
    }
}
