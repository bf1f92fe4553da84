use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Fields indexed by default, in addition to the synthetic freetext field.
pub const DEFAULT_FIELDS: &[&str] = &[
    "title",
    "author",
    "abstract",
    "keywords",
    "history",
    "findings",
    "diagnosis",
    "differential-diagnosis",
    "discussion",
    "pathology",
    "anatomy",
    "organ-system",
    "code",
    "modality",
    "patient",
    "document-type",
    "category",
    "level",
    "access",
    "peer-review",
    "language",
];

/// Index settings configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Directory holding the index database
    pub index_dir: PathBuf,
    /// Number of documents between commits during a rebuild
    #[serde(default = "default_commit_interval")]
    pub commit_interval: usize,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
}

fn default_commit_interval() -> usize {
    10
}

fn default_fields() -> Vec<FieldSpec> {
    DEFAULT_FIELDS
        .iter()
        .map(|name| match *name {
            "patient" => FieldSpec::text(*name).with_whole_words(["male", "female"]),
            _ => FieldSpec::text(*name),
        })
        .collect()
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./index"),
            commit_interval: default_commit_interval(),
            tokenizer: TokenizerConfig::default(),
            fields: default_fields(),
            unknown_fields: UnknownFieldPolicy::default(),
        }
    }
}

impl IndexSettings {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            ..Default::default()
        }
    }

    /// Load settings from a JSON file; missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_commit_interval(mut self, interval: usize) -> Self {
        self.commit_interval = interval.max(1);
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn with_min_fragment_len(mut self, len: usize) -> Self {
        self.tokenizer.min_fragment_len = len.max(1);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Stable description of the schema, persisted so that a changed field
    /// list forces a rebuild instead of silently mixing generations.
    pub fn schema_fingerprint(&self) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                let mut words = f.whole_words.clone();
                words.sort();
                format!("{}:{}:{}", f.name, f.fragmented, words.join(","))
            })
            .collect();
        parts.sort();
        format!(
            "fragments={}..{};{}",
            self.tokenizer.min_fragment_len,
            self.tokenizer.max_fragmented_word_len,
            parts.join(";")
        )
    }
}

/// Tokenizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Shortest suffix fragment generated for fragmented fields
    pub min_fragment_len: usize,
    /// Words longer than this are indexed whole, never fragmented
    pub max_fragmented_word_len: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_fragment_len: 3,
            max_fragmented_word_len: 40,
        }
    }
}

/// Indexing options for one named field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Whether words are expanded into suffix fragments at index time
    #[serde(default = "default_true")]
    pub fragmented: bool,
    /// Categorical values that are always indexed verbatim
    #[serde(default)]
    pub whole_words: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    /// A fragmented text field
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragmented: true,
            whole_words: Vec::new(),
        }
    }

    /// A field whose tokens are only ever matched whole
    pub fn keyword(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragmented: false,
            whole_words: Vec::new(),
        }
    }

    pub fn with_whole_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whole_words = words.into_iter().map(|w| w.into().to_lowercase()).collect();
        self
    }
}

/// What a query on a field without a FieldIndex does
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// The query matches nothing
    #[default]
    Empty,
    /// Every indexed document is re-read and its descendants with the
    /// field's name are matched against the query
    ScanDocuments,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = IndexSettings::default();
        assert_eq!(settings.commit_interval, 10);
        assert_eq!(settings.tokenizer.min_fragment_len, 3);
        assert_eq!(settings.fields.len(), DEFAULT_FIELDS.len());
        assert_eq!(settings.unknown_fields, UnknownFieldPolicy::Empty);

        let patient = settings.field("patient").unwrap();
        assert!(patient.fragmented);
        assert_eq!(patient.whole_words, vec!["male", "female"]);
    }

    #[test]
    fn test_settings_builder() {
        let settings = IndexSettings::new("/tmp/idx")
            .with_commit_interval(0)
            .with_min_fragment_len(2)
            .with_fields(vec![FieldSpec::text("title"), FieldSpec::keyword("modality")])
            .with_unknown_fields(UnknownFieldPolicy::ScanDocuments);

        assert_eq!(settings.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(settings.commit_interval, 1);
        assert_eq!(settings.tokenizer.min_fragment_len, 2);
        assert!(!settings.field("modality").unwrap().fragmented);
        assert!(settings.field("author").is_none());
    }

    #[test]
    fn test_schema_fingerprint_is_order_independent() {
        let a = IndexSettings::default()
            .with_fields(vec![FieldSpec::text("title"), FieldSpec::keyword("modality")]);
        let b = IndexSettings::default()
            .with_fields(vec![FieldSpec::keyword("modality"), FieldSpec::text("title")]);
        let c = IndexSettings::default().with_fields(vec![FieldSpec::text("title")]);

        assert_eq!(a.schema_fingerprint(), b.schema_fingerprint());
        assert_ne!(a.schema_fingerprint(), c.schema_fingerprint());
    }

    #[test]
    fn test_settings_from_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "index_dir": "/data/index", "fields": [ { "name": "title" },
                 { "name": "modality", "fragmented": false } ],
                 "unknown_fields": "scan_documents" }"#,
        )
        .unwrap();

        let settings = IndexSettings::from_json_file(&path).unwrap();
        assert_eq!(settings.commit_interval, 10);
        assert_eq!(settings.fields.len(), 2);
        assert!(settings.field("title").unwrap().fragmented);
        assert!(!settings.field("modality").unwrap().fragmented);
        assert_eq!(settings.unknown_fields, UnknownFieldPolicy::ScanDocuments);
    }
}
