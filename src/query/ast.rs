//! Compiled boolean expression over one field

use std::fmt;

use roaring::RoaringBitmap;

use crate::index::FieldIndex;

/// Boolean expression evaluated against a single [`FieldIndex`].
///
/// A `Term` holds the normalized words of one query term or phrase, all of
/// which must match. `And` and `Or` never hold fewer than two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    Term(Vec<String>),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
}

impl QueryExpr {
    /// Conjunction of `parts`, flattening nested ANDs. `None` when empty.
    pub fn and(parts: Vec<QueryExpr>) -> Option<QueryExpr> {
        Self::combine(parts, true)
    }

    /// Disjunction of `parts`, flattening nested ORs. `None` when empty.
    pub fn or(parts: Vec<QueryExpr>) -> Option<QueryExpr> {
        Self::combine(parts, false)
    }

    fn combine(parts: Vec<QueryExpr>, conjunction: bool) -> Option<QueryExpr> {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                QueryExpr::And(children) if conjunction => flat.extend(children),
                QueryExpr::Or(children) if !conjunction => flat.extend(children),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ if conjunction => Some(QueryExpr::And(flat)),
            _ => Some(QueryExpr::Or(flat)),
        }
    }

    /// Documents of `field` matching this expression
    pub fn evaluate(&self, field: &FieldIndex) -> RoaringBitmap {
        match self {
            QueryExpr::Term(words) => field.query_tokens(words),
            QueryExpr::And(parts) => {
                let mut iter = parts.iter();
                let Some(first) = iter.next() else {
                    return RoaringBitmap::new();
                };
                let mut acc = first.evaluate(field);
                for part in iter {
                    if acc.is_empty() {
                        break;
                    }
                    acc &= part.evaluate(field);
                }
                acc
            }
            QueryExpr::Or(parts) => {
                let mut acc = RoaringBitmap::new();
                for part in parts {
                    acc |= part.evaluate(field);
                }
                acc
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Term(words) if words.len() == 1 => write!(f, "{}", words[0]),
            QueryExpr::Term(words) => write!(f, "\"{}\"", words.join(" ")),
            QueryExpr::And(parts) => write_joined(f, parts, " AND "),
            QueryExpr::Or(parts) => write_joined(f, parts, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[QueryExpr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldSpec, TokenizerConfig};
    use crate::tokenizer::Tokenizer;

    fn term(word: &str) -> QueryExpr {
        QueryExpr::Term(vec![word.to_string()])
    }

    fn field() -> FieldIndex {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default());
        let mut field = FieldIndex::new(FieldSpec::text("title"));
        field.index_string(&tokenizer, 1, "Chest X-ray");
        field.index_string(&tokenizer, 2, "Brain MR");
        field.index_string(&tokenizer, 3, "Chest CT");
        field
    }

    #[test]
    fn test_combine_flattens() {
        let inner = QueryExpr::and(vec![term("a"), term("b")]).unwrap();
        let outer = QueryExpr::and(vec![inner, term("c")]).unwrap();
        assert_eq!(outer, QueryExpr::And(vec![term("a"), term("b"), term("c")]));

        assert_eq!(QueryExpr::or(vec![term("a")]), Some(term("a")));
        assert_eq!(QueryExpr::or(Vec::new()), None);
    }

    #[test]
    fn test_evaluate() {
        let field = field();
        let ids = |expr: QueryExpr| expr.evaluate(&field).iter().collect::<Vec<_>>();

        assert_eq!(ids(term("chest")), vec![1, 3]);
        assert_eq!(
            ids(QueryExpr::And(vec![term("chest"), term("ct")])),
            vec![3]
        );
        assert_eq!(
            ids(QueryExpr::Or(vec![term("brain"), term("ct")])),
            vec![2, 3]
        );
        assert!(ids(QueryExpr::And(vec![term("brain"), term("ct")])).is_empty());
        assert_eq!(
            ids(QueryExpr::Term(vec!["chest".to_string(), "ray".to_string()])),
            vec![1]
        );
    }

    #[test]
    fn test_display() {
        let expr = QueryExpr::And(vec![
            term("chest"),
            QueryExpr::Or(vec![term("ct"), QueryExpr::Term(vec!["x".into(), "ray".into()])]),
        ]);
        assert_eq!(expr.to_string(), "(chest AND (ct OR \"x ray\"))");
    }
}
