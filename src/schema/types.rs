//! Schema type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns that live directly on the `pages` table. `template` and `parent`
/// are aliases resolved to `templates_id` and `parent_id`.
pub const NATIVE_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "parent",
    "parent_id",
    "template",
    "templates_id",
    "created",
    "modified",
];

/// The complete schema definition loaded from schema.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

/// Definition of an attached field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Fieldtype name (text, textarea, integer, datetime, page)
    #[serde(rename = "type")]
    pub field_type: String,

    /// Storage table, defaults to `field_<name>`
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub label: Option<String>,
}

/// A resolved attached field: where it is stored and how it matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub table: String,
    pub fieldtype: String,
}

/// Field registry consulted by the finder
#[derive(Debug, Clone, Default)]
pub struct Fields {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl Fields {
    pub fn from_schema(schema: &Schema) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|(name, def)| {
                let descriptor = FieldDescriptor {
                    name: name.clone(),
                    table: def.table.clone().unwrap_or_else(|| format!("field_{}", name)),
                    fieldtype: def.field_type.clone(),
                };
                (name.clone(), descriptor)
            })
            .collect();

        Fields { fields }
    }

    /// Is this a column of the pages table rather than an attached field?
    pub fn is_native_name(&self, name: &str) -> bool {
        NATIVE_FIELDS.contains(&name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
