//! Query documents: blocks and statements
//!
//! A document is split into blocks separated by one or more blank lines, and each
//! block into `;`-separated statements. All spans index into the full document text.

use crate::lexer::{lex, Token};
use crate::references::{find_cluster_references, find_database_references};
use crate::{ClusterReference, DatabaseReference, References};
use kql_lint_diagnostics::{Diagnostic, Span};

/// One `;`-terminated statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub span: Span,
    pub tokens: Vec<Token>,
}

/// A run of statements not interrupted by a blank line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDocument {
    text: String,
    tokens: Vec<Token>,
    blocks: Vec<Block>,
    diagnostics: Vec<Diagnostic>,
}

impl QueryDocument {
    /// Parse query text. Lexical errors are kept as diagnostics on the document.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let (tokens, diagnostics) = lex(&text);
        let blocks = split_blocks(&text, &tokens);
        Self {
            text,
            tokens,
            blocks,
            diagnostics,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.blocks.iter().flat_map(|b| b.statements.iter())
    }

    /// Syntax diagnostics found while reading the text
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every `cluster('name')` call, in document order
    pub fn cluster_references(&self) -> References<ClusterReference> {
        find_cluster_references(&self.tokens)
    }

    /// Every `database('name')` call, in document order
    pub fn database_references(&self) -> References<DatabaseReference> {
        find_database_references(&self.tokens)
    }
}

/// Whether the text between two tokens contains a whitespace-only line
fn has_blank_line(gap: &str) -> bool {
    let lines: Vec<&str> = gap.split('\n').collect();
    lines.len() > 2 && lines[1..lines.len() - 1].iter().any(|l| l.trim().is_empty())
}

fn split_blocks(text: &str, tokens: &[Token]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<Token> = Vec::new();

    for token in tokens {
        if let Some(prev) = current.last() {
            let gap = text.get(prev.span.end..token.span.start).unwrap_or_default();
            if has_blank_line(gap) {
                blocks.push(make_block(std::mem::take(&mut current)));
            }
        }
        current.push(token.clone());
    }
    if !current.is_empty() {
        blocks.push(make_block(current));
    }
    blocks
}

/// Split a block on `;` outside of brackets, so function bodies stay whole
fn make_block(tokens: Vec<Token>) -> Block {
    let span = span_of(&tokens);
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        if token.is_punct("(") || token.is_punct("[") || token.is_punct("{") {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(";") {
            push_statement(&mut statements, std::mem::take(&mut current));
            continue;
        }
        current.push(token);
    }
    push_statement(&mut statements, current);
    Block { span, statements }
}

fn push_statement(statements: &mut Vec<Statement>, tokens: Vec<Token>) {
    if !tokens.is_empty() {
        statements.push(Statement {
            span: span_of(&tokens),
            tokens,
        });
    }
}

fn span_of(tokens: &[Token]) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => Span::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_split_blocks() {
        let doc = QueryDocument::parse("T\n| take 1\n\n  \nU | count; V");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0].statements.len(), 1);
        assert_eq!(doc.blocks()[1].statements.len(), 2);
        assert_eq!(doc.blocks()[1].statements[1].span.text(doc.text()), Some("V"));
    }

    #[test]
    fn test_comment_line_does_not_split_block() {
        let doc = QueryDocument::parse("T\n// note\n| take 1");
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn test_empty_statements_are_dropped() {
        let doc = QueryDocument::parse(";; print 1 ;");
        assert_eq!(doc.statements().count(), 1);
        assert!(QueryDocument::parse("  // only a comment").is_empty());
    }

    #[test]
    fn test_function_body_is_one_statement() {
        let doc = QueryDocument::parse("let f = () { let x = 1; T | take x }; f()");
        let statements: Vec<_> = doc.statements().collect();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].span.text(doc.text()), Some("f()"));
    }

    #[test]
    fn test_has_blank_line() {
        assert!(!has_blank_line(" "));
        assert!(!has_blank_line("\n"));
        assert!(has_blank_line("\n\n"));
        assert!(has_blank_line("\n \t\n"));
        assert!(!has_blank_line("\n// c\n"));
    }
}
