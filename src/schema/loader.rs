//! Schema loader - parses schema.yaml

use anyhow::{bail, Context, Result};
use std::path::Path;

use super::{validate_schema, Schema};
use crate::fieldtype::FieldtypeRegistry;

/// Load and validate the field schema from a YAML file.
/// A missing file yields an empty schema (native fields only).
pub fn load_schema(schema_path: &Path, fieldtypes: &FieldtypeRegistry) -> Result<Schema> {
    if !schema_path.exists() {
        return Ok(Schema::default());
    }

    let contents = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema file: {}", schema_path.display()))?;

    let schema: Schema = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse schema file: {}", schema_path.display()))?;

    let errors = validate_schema(&schema, fieldtypes);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid schema {}:\n  {}", schema_path.display(), messages.join("\n  "));
    }

    Ok(schema)
}

/// Create a default schema.yaml file
pub fn create_default_schema(schema_path: &Path) -> Result<()> {
    let default_schema = r#"# Field schema
# Attached fields are stored in their own table (field_<name> by default),
# one or more rows per page.

fields:
  title:
    type: text
    label: Title

  body:
    type: textarea

  # price:
  #   type: integer

  # published:
  #   type: datetime

  # related:
  #   type: page
  #   table: field_related_pages
"#;

    std::fs::write(schema_path, default_schema)
        .with_context(|| format!("Failed to write schema file: {}", schema_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_schema_is_empty() {
        let dir = tempdir().unwrap();
        let schema = load_schema(&dir.path().join("schema.yaml"), &FieldtypeRegistry::with_defaults()).unwrap();
        assert!(schema.fields.is_empty());
    }

    #[test]
    fn test_load_default_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        create_default_schema(&path).unwrap();

        let schema = load_schema(&path, &FieldtypeRegistry::with_defaults()).unwrap();
        assert_eq!(schema.fields["title"].field_type, "text");
        assert_eq!(schema.fields["body"].field_type, "textarea");
    }

    #[test]
    fn test_load_custom_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            r#"
fields:
  price:
    type: integer
  related:
    type: page
    table: field_related_pages
"#,
        )
        .unwrap();

        let schema = load_schema(&path, &FieldtypeRegistry::with_defaults()).unwrap();
        assert_eq!(schema.fields["related"].table.as_deref(), Some("field_related_pages"));
    }

    #[test]
    fn test_unknown_fieldtype_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, "fields:\n  colour:\n    type: rgb\n").unwrap();

        let err = load_schema(&path, &FieldtypeRegistry::with_defaults()).unwrap_err();
        assert!(err.to_string().contains("rgb"));
    }
}
