use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::FolioError;

/// Name of the synthetic field spanning all document text
pub const FREETEXT_FIELD: &str = "freetext";

/// Structured query as produced by the request layer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Per-field query text, keyed by field name (including `freetext`)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub age: AgeQuery,
    /// Hide real titles in result lists
    #[serde(default)]
    pub unknown: bool,
    #[serde(default)]
    pub order_by: SortOrder,
    /// 1-based index of the first result on the requested page
    #[serde(default)]
    pub first_result: Option<usize>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freetext(self, text: impl Into<String>) -> Self {
        self.field(FREETEXT_FIELD, text)
    }

    pub fn field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn age(mut self, age: AgeQuery) -> Self {
        self.age = age;
        self
    }

    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.order_by = order;
        self
    }

    pub fn unknown(mut self, unknown: bool) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn page(mut self, first_result: usize, max_results: usize) -> Self {
        self.first_result = Some(first_result);
        self.max_results = Some(max_results);
        self
    }
}

/// Patient age constraint. Each part is a number (`5`) or a range (`1-2`)
/// in its own unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeQuery {
    #[serde(default)]
    pub years: Option<String>,
    #[serde(default)]
    pub months: Option<String>,
    #[serde(default)]
    pub weeks: Option<String>,
    #[serde(default)]
    pub days: Option<String>,
}

impl AgeQuery {
    pub fn years(value: impl Into<String>) -> Self {
        Self {
            years: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_months(mut self, value: impl Into<String>) -> Self {
        self.months = Some(value.into());
        self
    }

    pub fn with_weeks(mut self, value: impl Into<String>) -> Self {
        self.weeks = Some(value.into());
        self
    }

    pub fn with_days(mut self, value: impl Into<String>) -> Self {
        self.days = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        [&self.years, &self.months, &self.weeks, &self.days]
            .iter()
            .all(|part| part.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

/// Result ordering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Title, ascending
    Title,
    /// Last-modified time, most recent first
    #[default]
    LastModified,
    /// Publication date, ascending
    PublicationDate,
}

impl FromStr for SortOrder {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SortOrder::Title),
            "lmdate" | "last_modified" | "last-modified" => Ok(SortOrder::LastModified),
            "pubdate" | "publication_date" | "publication-date" => Ok(SortOrder::PublicationDate),
            other => Err(FolioError::Internal(format!("unknown sort order '{}'", other))),
        }
    }
}
