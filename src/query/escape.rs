//! Literal escaping for values embedded in SQL text

/// Escape a string for use inside a single-quoted SQL literal
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\0' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Quote a value: digit-only strings stay bare integers, everything else is
/// escaped and single-quoted
pub fn quote_value(value: &str) -> String {
    if is_digits(value) {
        value.to_string()
    } else {
        format!("'{}'", escape_string(value))
    }
}

/// Escape character for LIKE patterns built with [`escape_like`]
pub const LIKE_ESCAPE: char = '!';

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
/// Patterns must be followed by `ESCAPE '!'`.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// True when every character is an ASCII digit (and there is at least one)
pub fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
