//! Query compilation
//!
//! Each field of a request is parsed into a [`QueryExpr`] by a small
//! recursive-descent parser; the age inputs become an [`AgeRange`].

mod age;
mod ast;
mod compiler;
mod lexer;
mod parser;

pub use age::AgeRange;
pub use ast::QueryExpr;
pub use compiler::{CompiledQuery, QueryCompiler, QuerySummary};
pub use lexer::{Lexer, Token};
pub use parser::QueryParser;
