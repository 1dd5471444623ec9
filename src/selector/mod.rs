//! Selector module - the `field operator value` query language

mod operator;
mod parser;

pub use operator::Operator;
pub use parser::parse;

use std::fmt;

/// One `field operator value` term of a selector string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Field names; more than one means "match any of these fields"
    pub fields: Vec<String>,

    /// Values; more than one means "match any of these values"
    pub values: Vec<String>,

    pub operator: Operator,

    /// Negated with a leading `!`
    pub not: bool,

    /// The term as originally written. Terms with identical text form one
    /// OR group.
    pub text: String,
}

impl Selector {
    /// Build a single-field, single-value term
    pub fn new(field: &str, operator: Operator, value: impl Into<String>) -> Self {
        let value = value.into();
        Selector {
            text: format!("{}{}{}", field, operator, value),
            fields: vec![field.to_string()],
            values: vec![value],
            operator,
            not: false,
        }
    }

    /// The first (usually only) field name
    pub fn field(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// The first (usually only) value
    pub fn value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An ordered list of selector terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    items: Vec<Selector>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, selector: Selector) {
        self.items.push(selector);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Selector> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<Selector>> for Selectors {
    fn from(items: Vec<Selector>) -> Self {
        Selectors { items }
    }
}

impl<'a> IntoIterator for &'a Selectors {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Selectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.items.iter().map(|s| s.text.as_str()).collect();
        f.write_str(&parts.join(", "))
    }
}
