//! Tests for reading whole query documents

use kql_lint_parser::{QueryDocument, TokenKind};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_multi_block_document_keeps_absolute_offsets() {
    let text = "let x = 1;\nprint x\n\ncluster('help').database('Samples').StormEvents\n| take 10";
    let doc = QueryDocument::parse(text);

    assert!(doc.diagnostics().is_empty());
    assert_eq!(doc.blocks().len(), 2);

    let second = &doc.blocks()[1];
    assert_eq!(second.statements.len(), 1);
    assert_eq!(
        second.span.text(text),
        Some("cluster('help').database('Samples').StormEvents\n| take 10")
    );

    let refs = doc.database_references();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].span.start, text.find("cluster").unwrap());
}

#[rstest]
#[case("print x=10", 0)]
#[case("print s = 'unterminated", 1)]
#[case("StormEvents | where State == \"TEXAS\"", 0)]
fn test_document_diagnostics(#[case] text: &str, #[case] expected: usize) {
    assert_eq!(QueryDocument::parse(text).diagnostics().len(), expected);
}

#[test]
fn test_statement_tokens() {
    let doc = QueryDocument::parse("T | project-rename New = Old");
    let statement = doc.statements().next().unwrap();
    let kinds: Vec<_> = statement.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Punct,
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::Punct,
            TokenKind::Identifier,
        ]
    );
}
