//! Query tokenizer using winnow
//!
//! The tokenizer is deliberately shallow: it knows the lexical forms of the
//! query language (names, literals, operators) but nothing about its grammar.

use kql_lint_diagnostics::{Diagnostic, Span, KQL0001, KQL0002, KQL0003};
use winnow::ascii::{digit1, multispace1};
use winnow::combinator::{alt, opt, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

pub(crate) type Input<'a> = &'a str;
pub(crate) type PResult<T> = ModalResult<T>;

/// Dashed operator names that lex as a single identifier
const DASHED_KEYWORDS: &[&str] = &[
    "project-away",
    "project-keep",
    "project-rename",
    "project-reorder",
    "mv-expand",
    "mv-apply",
    "make-series",
    "parse-where",
    "parse-kv",
    "materialized-view",
    "external-table",
];

/// Multi-character operators, longest first
const OPERATORS: &[&str] = &[
    "!contains", "!has", "==", "!=", "<>", "<=", ">=", "=~", "!~", "=>", "..",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Plain or dashed name, including keywords
    Identifier,
    /// `['name']` or `["name"]`
    BracketedName,
    /// String literal; the token value is the decoded string
    String,
    Number,
    Punct,
}

/// A token with its decoded value and location in the document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    /// Whether this is the punctuation or operator `p`
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.value == p
    }

    /// Whether this is the plain identifier `keyword` (case-sensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.value == keyword
    }

    /// The referenced name for identifiers and bracketed names
    pub fn name(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Identifier | TokenKind::BracketedName => Some(&self.value),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        (self.kind == TokenKind::String).then_some(self.value.as_str())
    }
}

/// Tokenize query text.
///
/// Lexical errors are reported as diagnostics and the offending text is skipped,
/// so a token stream is always produced.
pub fn lex(text: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut input: Input<'_> = text;
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    loop {
        // trivia cannot fail
        let _ = trivia.parse_next(&mut input);
        if input.is_empty() {
            break;
        }

        let start = text.len() - input.len();
        let checkpoint = input;
        match token.parse_next(&mut input) {
            Ok((kind, value)) => {
                let end = text.len() - input.len();
                tokens.push(Token::new(kind, value, Span::new(start, end)));
            }
            Err(ErrMode::Cut(_)) => {
                input = checkpoint;
                let code = if input.starts_with('[') { KQL0003 } else { KQL0002 };
                let message = if code == KQL0003 {
                    "Unterminated bracketed name"
                } else {
                    "Unterminated string literal"
                };
                let rest: PResult<&str> = take_till(0.., '\n').parse_next(&mut input);
                let end = text.len() - input.len();
                if let Ok(skipped) = rest {
                    tokens.push(Token::new(TokenKind::String, skipped, Span::new(start, end)));
                }
                diagnostics.push(Diagnostic::error(code, message).with_span(Span::new(start, end), text));
            }
            Err(_) => {
                input = checkpoint;
                let ch = input.chars().next().unwrap_or_default();
                input = &input[ch.len_utf8()..];
                diagnostics.push(
                    Diagnostic::error(KQL0001, format!("Unexpected character '{}'", ch))
                        .with_span(Span::new(start, start + ch.len_utf8()), text),
                );
            }
        }
    }

    (tokens, diagnostics)
}

fn trivia(input: &mut Input<'_>) -> PResult<()> {
    repeat(0.., alt((multispace1.void(), comment))).parse_next(input)
}

fn comment(input: &mut Input<'_>) -> PResult<()> {
    ("//", take_till(0.., '\n')).void().parse_next(input)
}

fn token(input: &mut Input<'_>) -> PResult<(TokenKind, String)> {
    alt((
        string_literal.map(|s| (TokenKind::String, s)),
        bracketed_name.map(|s| (TokenKind::BracketedName, s)),
        number.map(|s| (TokenKind::Number, s.to_string())),
        identifier.map(|s| (TokenKind::Identifier, s)),
        punct.map(|s| (TokenKind::Punct, s.to_string())),
    ))
    .parse_next(input)
}

fn identifier(input: &mut Input<'_>) -> PResult<String> {
    let word = word.parse_next(input)?;
    let mut name = word.to_string();

    // join dashed keywords such as `project-away`
    let checkpoint = *input;
    let joined = opt(('-', word)).parse_next(input)?;
    match joined {
        Some((_, tail)) if DASHED_KEYWORDS.contains(&format!("{}-{}", name, tail).as_str()) => {
            name.push('-');
            name.push_str(tail);
        }
        _ => *input = checkpoint,
    }
    Ok(name)
}

fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn number<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    // digits with an optional fraction and unit suffix (`1d`, `10ms`, `1.5e3`)
    (
        digit1,
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
        opt(('.', digit1, take_while(0.., |c: char| c.is_ascii_alphanumeric()))),
    )
        .take()
        .parse_next(input)
}

fn punct<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    for op in OPERATORS {
        if let Some(rest) = input.strip_prefix(op) {
            let matched = &input[..op.len()];
            *input = rest;
            return Ok(matched);
        }
    }
    one_of([
        '|', ';', ',', '.', '(', ')', '[', ']', '{', '}', '=', '<', '>', '+', '-', '*', '/', '%',
        ':', '!', '?', '@', '~',
    ])
    .take()
    .parse_next(input)
}

fn bracketed_name(input: &mut Input<'_>) -> PResult<String> {
    ('[', opt(multispace1)).parse_next(input)?;
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let name = quoted_body(input, quote, false)?;
    // `['a', 1]` in a datatable is a bracket followed by literals
    (opt(multispace1), ']').parse_next(input)?;
    Ok(name)
}

fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    let prefix = opt(alt(("@", "h@", "H@", "h", "H"))).parse_next(input)?;
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let verbatim = prefix.is_some_and(|p| p.ends_with('@'));
    quoted_body(input, quote, !verbatim)
}

/// Read up to and including the closing quote. Hitting a line end or the end
/// of input first is a cut error: the literal is unterminated.
fn quoted_body(input: &mut Input<'_>, quote: char, escapes: bool) -> PResult<String> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => {
                *input = &input[i + c.len_utf8()..];
                return Ok(value);
            }
            '\n' => break,
            '\\' if escapes => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, escaped)) if escaped != '\n' => value.push(escaped),
                _ => break,
            },
            c => value.push(c),
        }
    }
    Err(ErrMode::Cut(ContextError::new()))
}
