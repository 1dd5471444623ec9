//! Selector string parser
//!
//! Parses strings like `template=product, title|body*=widget, sort=-created`.

use super::{Operator, Selector, Selectors};
use crate::error::{FinderError, Result};

const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '*', '~', '%', '^', '$', '&'];

/// Parse a full selector string into its terms
pub fn parse(input: &str) -> Result<Selectors> {
    let mut selectors = Selectors::new();

    for term in split_outside_quotes(input, ',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        selectors.add(parse_term(term)?);
    }

    Ok(selectors)
}

/// Parse a single `[!]field[|field]op value[|value]` term
fn parse_term(term: &str) -> Result<Selector> {
    let invalid = |message: &str| FinderError::InvalidSelector {
        selector: term.to_string(),
        message: message.to_string(),
    };

    let (not, rest) = match term.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, term),
    };

    let field_end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '|'))
        .unwrap_or(rest.len());
    let field_str = &rest[..field_end];
    let after_field = rest[field_end..].trim_start();

    let op_end = after_field
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(after_field.len());

    if field_str.is_empty() {
        return Err(invalid("missing field name"));
    }
    if op_end == 0 {
        return Err(invalid("missing operator"));
    }

    let (operator, op_len) = split_operator(&after_field[..op_end]).map_err(|e| invalid(&e))?;
    let value_str = after_field[op_len..].trim();

    let fields: Vec<String> = field_str.split('|').map(|f| f.trim().to_string()).collect();
    if fields.iter().any(String::is_empty) {
        return Err(invalid("empty field name"));
    }

    let values = split_outside_quotes(value_str, '|')
        .into_iter()
        .map(|v| unquote(v.trim()).to_string())
        .collect();

    Ok(Selector {
        fields,
        values,
        operator,
        not,
        text: term.to_string(),
    })
}

/// Operator at the start of a run of operator characters. Characters after
/// the first `=` belong to the value (`title%=%bike`) unless they start
/// another comparison.
fn split_operator(run: &str) -> std::result::Result<(Operator, usize), String> {
    if let Ok(operator) = run.parse::<Operator>() {
        return Ok((operator, run.len()));
    }

    if let Some(eq) = run.find('=') {
        let rest = &run[eq + 1..];
        if !rest.starts_with(['=', '<', '>']) {
            if let Ok(operator) = run[..=eq].parse::<Operator>() {
                return Ok((operator, eq + 1));
            }
        }
    }

    Err(format!("unknown operator '{}'", run))
}

/// Split on `sep` where it is not inside single or double quotes
fn split_outside_quotes(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '"' | '\'' if quote == Some(c) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(c),
            c if c == sep && quote.is_none() => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
