//! Schema validator - checks field definitions before they reach SQL

use regex::Regex;

use super::{Schema, NATIVE_FIELDS};
use crate::fieldtype::FieldtypeRegistry;

lazy_static::lazy_static! {
    static ref FIELD_NAME_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    static ref TABLE_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Names with a meaning of their own in selectors
const RESERVED_NAMES: &[&str] = &["sort", "limit", "start", "path", "url", "has_parent", "score"];

/// Validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)
    }
}

/// Validate every field definition in the schema
pub fn validate_schema(schema: &Schema, fieldtypes: &FieldtypeRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (name, def) in &schema.fields {
        let mut error = |message: String| {
            errors.push(ValidationError {
                field: name.clone(),
                message,
            })
        };

        if !FIELD_NAME_REGEX.is_match(name) {
            error("Name must be lowercase letters, digits and underscores".to_string());
        }

        if NATIVE_FIELDS.contains(&name.as_str()) || RESERVED_NAMES.contains(&name.as_str()) {
            error("Name is reserved".to_string());
        }

        if let Some(table) = &def.table {
            if !TABLE_NAME_REGEX.is_match(table) || table == "pages" || table == "pages_parents" {
                error(format!("Invalid table name '{}'", table));
            }
        }

        if fieldtypes.get(&def.field_type).is_none() {
            error(format!("Unknown fieldtype '{}'", def.field_type));
        }
    }

    errors
}
