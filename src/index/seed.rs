//! Seed loader - imports templates and pages from YAML
//!
//! ```yaml
//! templates: [basic, product]
//! pages:
//!   - path: /products/
//!     template: basic
//!     fields:
//!       title: Products
//!   - path: /products/bike/
//!     template: product
//!     status: hidden
//!     created: 2024-01-15
//!     fields:
//!       price: 500
//! ```
//!
//! Pages are inserted in file order, so parents must be listed before their
//! children.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{Database, NewPage};
use crate::finder::{status_from_label, PageLookup, ROOT_ID, STATUS_ON};
use crate::schema::Fields;

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub templates: Vec<String>,

    #[serde(default)]
    pub pages: Vec<SeedPage>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPage {
    pub path: String,

    #[serde(default)]
    pub template: Option<String>,

    /// Bits, or space separated labels such as `hidden locked`
    #[serde(default)]
    pub status: Option<SeedStatus>,

    #[serde(default)]
    pub created: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedStatus {
    Bits(i64),
    Labels(String),
}

impl SeedStatus {
    fn bits(&self) -> i64 {
        match self {
            SeedStatus::Bits(bits) => *bits,
            SeedStatus::Labels(labels) => labels
                .split_whitespace()
                .fold(STATUS_ON, |status, label| status | status_from_label(label)),
        }
    }
}

/// What a seed import created
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub templates: usize,
    pub pages: usize,
    pub values: usize,
}

/// Load a seed file into the database
pub fn load_seed(db: &mut Database, fields: &Fields, path: &Path) -> Result<SeedReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    let seed: Seed = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))?;

    import_seed(db, fields, &seed)
}

pub fn import_seed(db: &mut Database, fields: &Fields, seed: &Seed) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for name in &seed.templates {
        db.add_template(name)?;
        report.templates += 1;
    }

    for page in &seed.pages {
        let trimmed = page.path.trim_matches('/');
        let (parent_path, name) = match trimmed.rsplit_once('/') {
            Some((parent, name)) => (format!("/{}/", parent), name),
            None => ("/".to_string(), trimmed),
        };
        if name.is_empty() {
            return Err(anyhow!("Seed page needs a name below the root: '{}'", page.path));
        }

        let parent_id = db
            .page_id(&parent_path)?
            .ok_or_else(|| anyhow!("Parent of '{}' does not exist: {}", page.path, parent_path))?;

        let templates_id = match &page.template {
            Some(template) => db.add_template(template)?,
            None => 0,
        };

        let mut new_page = NewPage::new(parent_id, templates_id, name);
        if let Some(status) = &page.status {
            new_page.status = status.bits();
        }
        new_page.created = page.created.clone();

        let id = db
            .insert_page(&new_page)
            .with_context(|| format!("Failed to insert page: {}", page.path))?;
        report.pages += 1;

        for (field, value) in &page.fields {
            let value = yaml_to_string(value, db)
                .with_context(|| format!("Invalid value for '{}' on {}", field, page.path))?;
            db.set_field(fields, field, id, &value)
                .with_context(|| format!("Failed to set '{}' on {}", field, page.path))?;
            report.values += 1;
        }
    }

    Ok(report)
}

/// Scalars are stored as text. A path string pointing at an existing page
/// stores that page's id, so page-reference fields can be written as paths.
fn yaml_to_string(value: &serde_yaml::Value, db: &Database) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) if s.starts_with('/') && s.ends_with('/') => {
            Ok(match db.page_id(s)? {
                Some(id) if id != ROOT_ID || s == "/" => id.to_string(),
                _ => s.clone(),
            })
        }
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        other => Err(anyhow!("expected a scalar, got {:?}", other)),
    }
}
