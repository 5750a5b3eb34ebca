//! Token slice helpers for the binder

use kql_lint_parser::{Token, TokenKind};

fn opens(token: &Token) -> bool {
    token.is_punct("(") || token.is_punct("[") || token.is_punct("{")
}

fn closes(token: &Token) -> bool {
    token.is_punct(")") || token.is_punct("]") || token.is_punct("}")
}

/// Index of the bracket closing the one at `open`
pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if opens(token) {
            depth += 1;
        } else if closes(token) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on a punctuation separator outside of brackets. Empty parts are kept.
pub(crate) fn split_top_level<'t>(tokens: &'t [Token], separator: &str) -> Vec<&'t [Token]> {
    split_where(tokens, |t| t.is_punct(separator))
}

/// Split at the first keyword outside of brackets
pub(crate) fn split_at_keyword<'t>(tokens: &'t [Token], keyword: &str) -> (&'t [Token], Option<&'t [Token]>) {
    let parts = split_where(tokens, |t| t.is_keyword(keyword));
    match parts.as_slice() {
        [] => (tokens, None),
        [only] => (only, None),
        [head, ..] => {
            let rest_start = head.len() + 1;
            (head, Some(&tokens[rest_start..]))
        }
    }
}

fn split_where<'t>(tokens: &'t [Token], is_separator: impl Fn(&Token) -> bool) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if opens(token) {
            depth += 1;
        } else if closes(token) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && is_separator(token) {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// `name = expr`, as in `extend`, `project` and `summarize` items
pub(crate) fn assignment(item: &[Token]) -> Option<(&Token, &[Token])> {
    match item {
        [name, eq, value @ ..] if name.name().is_some() && eq.is_punct("=") => Some((name, value)),
        _ => None,
    }
}

/// A lone column name
pub(crate) fn single_name(item: &[Token]) -> Option<&Token> {
    match item {
        [token] if token.name().is_some() => Some(token),
        _ => None,
    }
}

/// `keyword ( 'literal' )` starting at `at`: the literal and the index after `)`
pub(crate) fn literal_call<'t>(tokens: &'t [Token], at: usize, keyword: &str) -> Option<(&'t Token, usize)> {
    match tokens.get(at..at + 4)? {
        [call, open, literal, close]
            if call.is_keyword(keyword)
                && open.is_punct("(")
                && literal.kind == TokenKind::String
                && close.is_punct(")") =>
        {
            Some((literal, at + 4))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kql_lint_parser::lex;

    fn values(parts: &[&[Token]]) -> Vec<Vec<String>> {
        parts
            .iter()
            .map(|p| p.iter().map(|t| t.value.clone()).collect())
            .collect()
    }

    #[test]
    fn test_split_top_level() {
        let (tokens, _) = lex("a = f(x, y), b");
        let parts = split_top_level(&tokens, ",");
        assert_eq!(
            values(&parts),
            vec![vec!["a", "=", "f", "(", "x", ",", "y", ")"], vec!["b"]]
        );
    }

    #[test]
    fn test_split_at_keyword() {
        let (tokens, _) = lex("count() by bin(T, 1h), State");
        let (aggregates, groups) = split_at_keyword(&tokens, "by");
        assert_eq!(aggregates.len(), 3);
        assert_eq!(groups.map(<[Token]>::len), Some(8));

        let (tokens, _) = lex("count()");
        assert_eq!(split_at_keyword(&tokens, "by").1, None);
    }

    #[test]
    fn test_matching_close() {
        let (tokens, _) = lex("(a, [b], {c})");
        assert_eq!(matching_close(&tokens, 0), Some(tokens.len() - 1));
        assert_eq!(matching_close(&tokens[..3], 0), None);
    }

    #[test]
    fn test_literal_call() {
        let (tokens, _) = lex("database('Samples').T");
        let (literal, next) = literal_call(&tokens, 0, "database").unwrap();
        assert_eq!(literal.value, "Samples");
        assert!(tokens[next].is_punct("."));
        assert!(literal_call(&tokens, 0, "cluster").is_none());
    }
}
