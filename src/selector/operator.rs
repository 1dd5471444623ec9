//! Selector comparison operators

use std::fmt;
use std::str::FromStr;

/// Operator between a selector's field and value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=` (also written `<>`)
    NotEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessThanEqual,
    /// `>=`
    GreaterThanEqual,
    /// `*=` value contains the phrase
    ContainsPhrase,
    /// `~=` value contains all the words
    ContainsWords,
    /// `%=` SQL LIKE match
    Like,
    /// `^=` value starts with
    StartsWith,
    /// `$=` value ends with
    EndsWith,
    /// `&` bitwise AND
    BitwiseAnd,
}

impl Operator {
    /// All operators, longest token first so prefix matching is unambiguous
    pub const ALL: [Operator; 12] = [
        Operator::NotEqual,
        Operator::LessThanEqual,
        Operator::GreaterThanEqual,
        Operator::ContainsPhrase,
        Operator::ContainsWords,
        Operator::Like,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Equal,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::BitwiseAnd,
    ];

    /// The selector token
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThanEqual => ">=",
            Operator::ContainsPhrase => "*=",
            Operator::ContainsWords => "~=",
            Operator::Like => "%=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::BitwiseAnd => "&",
        }
    }

    /// SQL spelling for operators that compare a column to a value directly
    pub fn sql_comparison(&self) -> Option<&'static str> {
        match self {
            Operator::Equal => Some("="),
            Operator::NotEqual => Some("!="),
            Operator::LessThan => Some("<"),
            Operator::GreaterThan => Some(">"),
            Operator::LessThanEqual => Some("<="),
            Operator::GreaterThanEqual => Some(">="),
            Operator::BitwiseAnd => Some("&"),
            _ => None,
        }
    }

    /// `=`, `!=`: the operators for which an empty value means "no row"
    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "<>" {
            return Ok(Operator::NotEqual);
        }
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}
