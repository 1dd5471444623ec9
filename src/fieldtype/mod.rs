//! Fieldtype module - per-type matching of attached field values
//!
//! Each fieldtype knows how to turn `column operator value` into WHERE
//! fragments for its storage table. Types are looked up by name from the
//! schema, so new types can be registered without touching the finder.

mod datetime;
mod integer;
mod page;
mod text;

pub use datetime::{normalize_datetime, normalize_datetime_at, DatetimeFieldtype, DATETIME_FORMAT};
pub use integer::IntegerFieldtype;
pub(crate) use integer::to_integer;
pub use page::PageFieldtype;
pub use text::TextFieldtype;

use std::collections::HashMap;

use crate::error::{FinderError, Result};
use crate::query::SelectQuery;
use crate::selector::Operator;

/// Prefix of select columns that carry a relevance score
pub const SCORE_PREFIX: &str = "_score";

/// Matching behaviour of one kind of attached field
pub trait Fieldtype: Send + Sync {
    /// Name used in schema.yaml
    fn name(&self) -> &'static str;

    /// SQL column type of the `data` column
    fn column_type(&self) -> &'static str {
        "TEXT"
    }

    /// Add WHERE fragments (AND-combined) matching `table_alias.column`
    /// against `value`. Types that rank results may also add `_score`
    /// columns and ORDER BY entries.
    fn match_query(
        &self,
        query: &mut SelectQuery,
        table_alias: &str,
        column: &str,
        operator: Operator,
        value: &str,
    ) -> Result<()>;
}

/// Error for an operator a fieldtype cannot handle
pub(crate) fn unsupported(operator: Operator, table_alias: &str, column: &str) -> FinderError {
    FinderError::UnsupportedOperator {
        operator: operator.to_string(),
        field: format!("{}.{}", table_alias, column),
    }
}

/// Fieldtypes by name
pub struct FieldtypeRegistry {
    types: HashMap<String, Box<dyn Fieldtype>>,
}

impl FieldtypeRegistry {
    pub fn new() -> Self {
        FieldtypeRegistry {
            types: HashMap::new(),
        }
    }

    /// Registry with the built-in types
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TextFieldtype::text()));
        registry.register(Box::new(TextFieldtype::textarea()));
        registry.register(Box::new(IntegerFieldtype));
        registry.register(Box::new(DatetimeFieldtype));
        registry.register(Box::new(PageFieldtype));
        registry
    }

    pub fn register(&mut self, fieldtype: Box<dyn Fieldtype>) {
        self.types.insert(fieldtype.name().to_string(), fieldtype);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Fieldtype> {
        self.types.get(name).map(|t| t.as_ref())
    }
}

impl Default for FieldtypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
