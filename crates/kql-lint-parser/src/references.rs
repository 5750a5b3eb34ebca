//! Explicit cluster and database references
//!
//! Only calls whose argument is a string literal count as references;
//! computed names cannot be resolved ahead of analysis.

use crate::lexer::{Token, TokenKind};
use kql_lint_diagnostics::Span;
use smallvec::SmallVec;

/// Reference lists are short in practice
pub type References<T> = SmallVec<[T; 4]>;

/// `cluster('name')`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterReference {
    pub cluster: String,
    pub span: Span,
}

/// `database('name')`, optionally qualified as `cluster('c').database('name')`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseReference {
    /// Explicit cluster, or `None` for the default cluster
    pub cluster: Option<String>,
    pub database: String,
    pub span: Span,
}

/// Match `name ( 'literal' )` starting at `tokens[i]`
fn call_at<'t>(tokens: &'t [Token], i: usize, name: &str) -> Option<(&'t str, Span)> {
    match tokens.get(i..i + 4)? {
        [callee, open, arg, close]
            if callee.is_keyword(name)
                && open.is_punct("(")
                && arg.kind == TokenKind::String
                && close.is_punct(")") =>
        {
            Some((arg.value.as_str(), callee.span.merge(close.span)))
        }
        _ => None,
    }
}

pub(crate) fn find_cluster_references(tokens: &[Token]) -> References<ClusterReference> {
    (0..tokens.len())
        .filter_map(|i| call_at(tokens, i, "cluster"))
        .map(|(name, span)| ClusterReference {
            cluster: name.to_string(),
            span,
        })
        .collect()
}

pub(crate) fn find_database_references(tokens: &[Token]) -> References<DatabaseReference> {
    let mut references = References::new();
    for i in 0..tokens.len() {
        let Some((database, span)) = call_at(tokens, i, "database") else {
            continue;
        };

        let qualifier = i
            .checked_sub(5)
            .filter(|&start| tokens[start + 4].is_punct("."))
            .and_then(|start| call_at(tokens, start, "cluster"));

        references.push(match qualifier {
            Some((cluster, cluster_span)) => DatabaseReference {
                cluster: Some(cluster.to_string()),
                database: database.to_string(),
                span: cluster_span.merge(span),
            },
            None => DatabaseReference {
                cluster: None,
                database: database.to_string(),
                span,
            },
        });
    }
    references
}
