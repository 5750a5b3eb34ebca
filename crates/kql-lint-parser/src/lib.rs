//! Query front end for kql-lint
//!
//! This crate reads query text into a `QueryDocument`: a token stream with spans,
//! split into blocks and statements, plus the explicit `cluster(...)` and
//! `database(...)` references that drive schema resolution.

mod document;
mod lexer;
mod references;

pub use document::{Block, QueryDocument, Statement};
pub use lexer::{lex, Token, TokenKind};
pub use references::{ClusterReference, DatabaseReference, References};
