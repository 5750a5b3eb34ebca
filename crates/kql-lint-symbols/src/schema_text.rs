//! Schema text parsing and rendering
//!
//! Schema text is the compact column-list form used by the schema cache and by
//! the remote `cslschema` commands: `(Name: string, ['Event Count']: long)`.
//! The surrounding parentheses are optional and whitespace is insignificant.

use crate::{ColumnSymbol, ScalarType, SymbolError};
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, separated};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Parse schema text into its columns
pub fn parse_schema(text: &str) -> Result<Vec<ColumnSymbol>, SymbolError> {
    schema.parse(text).map_err(|e| SymbolError::InvalidSchema {
        text: text.to_string(),
        message: e.to_string(),
    })
}

/// Render columns as canonical schema text
pub fn format_schema(columns: &[ColumnSymbol]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("{}: {}", quote_name(c.name()), c.scalar_type()))
        .collect();
    format!("({})", parts.join(", "))
}

/// Bracket-quote a name when it is not a plain identifier.
///
/// Single quotes are preferred; a name holding only `'` uses double quotes.
/// The chosen quote and `\` are backslash-escaped inside the brackets.
pub fn quote_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        return name.to_string();
    }

    let quote = if name.contains('\'') && !name.contains('"') { '"' } else { '\'' };
    let mut quoted = String::with_capacity(name.len() + 4);
    quoted.push('[');
    quoted.push(quote);
    for c in name.chars() {
        if c == quote || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push(quote);
    quoted.push(']');
    quoted
}

fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn schema(input: &mut &str) -> ModalResult<Vec<ColumnSymbol>> {
    ws.parse_next(input)?;
    let columns = alt((delimited('(', column_list, ')'), column_list)).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(columns)
}

fn column_list(input: &mut &str) -> ModalResult<Vec<ColumnSymbol>> {
    let columns: Vec<ColumnSymbol> =
        separated(0.., delimited(ws, column, ws), ',').parse_next(input)?;
    opt((',', ws)).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(columns)
}

fn column(input: &mut &str) -> ModalResult<ColumnSymbol> {
    let (name, _, _, _, ty) = (column_name, ws, ':', ws, scalar_type).parse_next(input)?;
    Ok(ColumnSymbol::new(name, ty))
}

fn column_name(input: &mut &str) -> ModalResult<String> {
    alt((bracketed_name, plain_name.map(str::to_string))).parse_next(input)
}

fn plain_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn bracketed_name(input: &mut &str) -> ModalResult<String> {
    delimited(('[', ws), quoted, (ws, ']')).parse_next(input)
}

/// A single or double quoted string; `\` escapes the next character
fn quoted(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut text = String::new();
    loop {
        match any.parse_next(input)? {
            c if c == quote => return Ok(text),
            '\\' => text.push(any.parse_next(input)?),
            c => text.push(c),
        }
    }
}

fn scalar_type(input: &mut &str) -> ModalResult<ScalarType> {
    plain_name
        .verify_map(ScalarType::from_kql_name)
        .parse_next(input)
}
