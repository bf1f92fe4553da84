//! Inverted index for a single field
//!
//! Postings map every stored token to the set of documents containing it.
//! A forward list per document records which tokens it was posted under, so
//! that removal touches only those postings instead of scanning the field.

use std::collections::{BTreeSet, HashMap};

use roaring::RoaringBitmap;

use crate::config::FieldSpec;
use crate::models::DocId;
use crate::tokenizer::Tokenizer;

/// Tokens touched by a removal, and whether postings agreed with the
/// forward list while removing them.
#[derive(Debug, Default)]
pub struct RemovedDoc {
    pub tokens: Vec<String>,
    pub consistent: bool,
}

#[derive(Clone, Debug)]
pub struct FieldIndex {
    spec: FieldSpec,
    postings: HashMap<String, RoaringBitmap>,
    forward: HashMap<DocId, Vec<String>>,
}

impl FieldIndex {
    pub fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            postings: HashMap::new(),
            forward: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Tokenize `text` for this field and post `id` under every token.
    /// Returns the tokens posted.
    pub fn index_string(&mut self, tokenizer: &Tokenizer, id: DocId, text: &str) -> Vec<String> {
        let tokens = tokenizer.index_tokens(text, &self.spec);
        self.insert_tokens(id, tokens)
    }

    /// Post `id` under already-tokenized `tokens`
    pub fn insert_tokens(&mut self, id: DocId, tokens: BTreeSet<String>) -> Vec<String> {
        if tokens.is_empty() {
            return Vec::new();
        }
        for token in &tokens {
            self.postings.entry(token.clone()).or_default().insert(id);
        }

        let forward = self.forward.entry(id).or_default();
        let mut merged: BTreeSet<String> = forward.drain(..).collect();
        merged.extend(tokens.iter().cloned());
        *forward = merged.into_iter().collect();

        tokens.into_iter().collect()
    }

    pub fn postings(&self, token: &str) -> Option<&RoaringBitmap> {
        self.postings.get(token)
    }

    /// Documents posted under one token. Fragments were materialized at
    /// index time, so this is a plain lookup.
    pub fn query_token(&self, token: &str) -> RoaringBitmap {
        self.postings.get(token).cloned().unwrap_or_default()
    }

    /// Documents posted under every one of `tokens`
    pub fn query_tokens(&self, tokens: &[String]) -> RoaringBitmap {
        let mut lists: Vec<&RoaringBitmap> = Vec::with_capacity(tokens.len());
        for token in tokens {
            match self.postings.get(token) {
                Some(list) => lists.push(list),
                None => return RoaringBitmap::new(),
            }
        }
        // Smallest first keeps the running intersection small
        lists.sort_by_key(|l| l.len());

        let mut iter = lists.into_iter();
        let Some(first) = iter.next() else {
            return RoaringBitmap::new();
        };
        let mut acc = first.clone();
        for list in iter {
            acc &= list;
            if acc.is_empty() {
                break;
            }
        }
        acc
    }

    /// Remove `id` from every posting it appears in
    pub fn remove_doc(&mut self, id: DocId) -> RemovedDoc {
        let Some(tokens) = self.forward.remove(&id) else {
            return RemovedDoc {
                tokens: Vec::new(),
                consistent: true,
            };
        };

        let mut consistent = true;
        for token in &tokens {
            match self.postings.get_mut(token) {
                Some(list) => {
                    consistent &= list.remove(id);
                    if list.is_empty() {
                        self.postings.remove(token);
                    }
                }
                None => consistent = false,
            }
        }
        RemovedDoc { tokens, consistent }
    }

    pub fn intersection(a: &RoaringBitmap, b: &RoaringBitmap) -> RoaringBitmap {
        a & b
    }

    /// Number of distinct tokens (words and fragments)
    pub fn word_count(&self) -> usize {
        self.postings.len()
    }

    pub fn tokens_for(&self, id: DocId) -> Option<&[String]> {
        self.forward.get(&id).map(Vec::as_slice)
    }

    pub fn contains_doc(&self, id: DocId) -> bool {
        self.forward.contains_key(&id)
    }

    pub fn doc_count(&self) -> usize {
        self.forward.len()
    }

    pub fn iter_postings(&self) -> impl Iterator<Item = (&String, &RoaringBitmap)> {
        self.postings.iter()
    }

    pub fn iter_forward(&self) -> impl Iterator<Item = (DocId, &[String])> {
        self.forward.iter().map(|(id, tokens)| (*id, tokens.as_slice()))
    }

    pub(crate) fn restore_postings(&mut self, token: String, list: RoaringBitmap) {
        if !list.is_empty() {
            self.postings.insert(token, list);
        }
    }

    pub(crate) fn restore_forward(&mut self, id: DocId, tokens: Vec<String>) {
        self.forward.insert(id, tokens);
    }
}
