use std::collections::{BTreeSet, HashSet};

use crate::config::{FieldSpec, TokenizerConfig};

/// Text tokenizer with suffix fragmenting
///
/// Words are maximal runs of letters, lowercased. Everything else (digits,
/// punctuation, whitespace) separates words.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Split text into lowercase letter-run words, in order
    pub fn words(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect()
    }

    /// Get unique words from text
    pub fn unique_words(&self, text: &str) -> HashSet<String> {
        self.words(text).into_iter().collect()
    }

    /// Expand a word into itself plus every suffix of at least
    /// `min_fragment_len` characters.
    ///
    /// # Example
    ///
    /// ```
    /// use folio::config::TokenizerConfig;
    /// use folio::tokenizer::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new(&TokenizerConfig::default());
    /// assert_eq!(tokenizer.fragments("chest"), vec!["chest", "hest", "est"]);
    /// ```
    pub fn fragments(&self, word: &str) -> Vec<String> {
        let char_len = word.chars().count();
        if char_len > self.config.max_fragmented_word_len {
            return vec![word.to_string()];
        }

        let mut out = vec![word.to_string()];
        for (skipped, (offset, _)) in word.char_indices().enumerate().skip(1) {
            if char_len - skipped < self.config.min_fragment_len {
                break;
            }
            out.push(word[offset..].to_string());
        }
        out
    }

    /// All tokens a field stores for `text`: whole words for unfragmented
    /// fields and whole-word vocabulary, suffix fragments otherwise.
    pub fn index_tokens(&self, text: &str, field: &FieldSpec) -> BTreeSet<String> {
        let mut tokens = BTreeSet::new();
        for word in self.unique_words(text) {
            if !field.fragmented || field.whole_words.iter().any(|w| *w == word) {
                tokens.insert(word);
            } else {
                tokens.extend(self.fragments(&word));
            }
        }
        tokens
    }
}
