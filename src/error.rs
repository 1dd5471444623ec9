//! Errors raised while compiling or running a selector query

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinderError {
    /// A selector names a field that is neither native nor in the schema
    #[error("Field does not exist: {0}")]
    UnknownField(String),

    #[error("Operator '{operator}' is not supported for field '{field}'")]
    UnsupportedOperator { operator: String, field: String },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// A field declares a type with no registered matcher
    #[error("Unknown fieldtype '{fieldtype}' for field '{field}'")]
    UnknownFieldtype { fieldtype: String, field: String },

    /// The database rejected or failed the query
    #[error("Database error: {0}")]
    Execution(String),
}

impl From<rusqlite::Error> for FinderError {
    fn from(err: rusqlite::Error) -> Self {
        FinderError::Execution(err.to_string())
    }
}

pub type Result<T, E = FinderError> = std::result::Result<T, E>;
