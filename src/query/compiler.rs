//! Turns a [`QueryRequest`] into per-field boolean expressions.

use std::collections::BTreeMap;

use serde::Serialize;

use super::age::AgeRange;
use super::ast::QueryExpr;
use super::parser::QueryParser;
use crate::models::{QueryRequest, SortOrder, FREETEXT_FIELD};
use crate::tokenizer::Tokenizer;

/// A request ready for execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    pub freetext: Option<QueryExpr>,
    /// Non-freetext fields with a searchable expression
    pub fields: BTreeMap<String, QueryExpr>,
    pub age: Option<AgeRange>,
    pub order_by: SortOrder,
    pub unknown: bool,
}

/// Query shape reported by [`CompiledQuery::summary`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub is_blank_query: bool,
    pub contains_non_freetext_queries: bool,
    pub contains_age_query: bool,
}

impl CompiledQuery {
    /// No field (freetext included) carries a searchable expression
    pub fn is_blank_query(&self) -> bool {
        self.freetext.is_none() && self.fields.is_empty()
    }

    /// Some field other than freetext carries a searchable expression
    pub fn contains_non_freetext_queries(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn contains_age_query(&self) -> bool {
        self.age.is_some()
    }

    /// Blank queries skip the postings entirely and walk the entries
    pub fn is_fast_path(&self) -> bool {
        self.is_blank_query() && !self.contains_non_freetext_queries()
    }

    pub fn summary(&self) -> QuerySummary {
        QuerySummary {
            is_blank_query: self.is_blank_query(),
            contains_non_freetext_queries: self.contains_non_freetext_queries(),
            contains_age_query: self.contains_age_query(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueryCompiler {
    tokenizer: Tokenizer,
}

impl QueryCompiler {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Parse one field's query text. `None` when nothing searchable is left.
    pub fn parse_expr(&self, text: &str) -> Option<QueryExpr> {
        QueryParser::new(text, &self.tokenizer).parse()
    }

    pub fn compile(&self, request: &QueryRequest) -> CompiledQuery {
        let mut freetext = None;
        let mut fields = BTreeMap::new();

        for (name, text) in &request.fields {
            let name = name.trim();
            let Some(expr) = self.parse_expr(text) else {
                continue;
            };
            if name == FREETEXT_FIELD {
                freetext = Some(expr);
            } else if !name.is_empty() {
                fields.insert(name.to_string(), expr);
            }
        }

        CompiledQuery {
            freetext,
            fields,
            age: AgeRange::from_query(&request.age),
            order_by: request.order_by,
            unknown: request.unknown,
        }
    }
}
