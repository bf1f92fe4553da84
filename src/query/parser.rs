//! Recursive descent parser for field query text
//!
//! # Grammar
//!
//! ```text
//! query    := or_expr*
//! or_expr  := and_expr ('|' and_expr)*
//! and_expr := primary*
//! primary  := TERM | PHRASE | '(' or_expr ')'?
//! ```
//!
//! AND binds tighter than OR. Malformed input degrades instead of failing:
//! a `)` with no open group is skipped, unclosed groups close at end of
//! input, empty operands vanish and terms without letters are dropped.

use super::ast::QueryExpr;
use super::lexer::{Lexer, Token};
use crate::tokenizer::Tokenizer;

pub struct QueryParser<'t> {
    lexer: Lexer,
    current_token: Token,
    tokenizer: &'t Tokenizer,
}

impl<'t> QueryParser<'t> {
    pub fn new(input: &str, tokenizer: &'t Tokenizer) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            tokenizer,
        }
    }

    /// Parse the whole input. `None` when nothing searchable remains.
    pub fn parse(mut self) -> Option<QueryExpr> {
        let mut parts = Vec::new();
        loop {
            match self.current_token {
                Token::Eof => break,
                Token::RightParen => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            if let Some(expr) = self.parse_or_expr() {
                parts.push(expr);
            }
        }
        QueryExpr::and(parts)
    }

    fn parse_or_expr(&mut self) -> Option<QueryExpr> {
        let mut alternatives = Vec::new();
        alternatives.extend(self.parse_and_expr());
        while self.current_token == Token::Pipe {
            self.advance();
            alternatives.extend(self.parse_and_expr());
        }
        QueryExpr::or(alternatives)
    }

    fn parse_and_expr(&mut self) -> Option<QueryExpr> {
        let mut parts = Vec::new();
        loop {
            match &self.current_token {
                Token::Term(text) | Token::Phrase(text) => {
                    parts.extend(self.term(text));
                    self.advance();
                }
                Token::LeftParen => {
                    self.advance();
                    parts.extend(self.parse_or_expr());
                    if self.current_token == Token::RightParen {
                        self.advance();
                    }
                }
                Token::Pipe | Token::RightParen | Token::Eof => break,
            }
        }
        QueryExpr::and(parts)
    }

    fn term(&self, text: &str) -> Option<QueryExpr> {
        let words = self.tokenizer.words(text);
        if words.is_empty() {
            None
        } else {
            Some(QueryExpr::Term(words))
        }
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }
}
