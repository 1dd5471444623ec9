//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::fieldtype::FieldtypeRegistry;
use crate::finder::{FindOptions, FinderContext, PageFinder, Row};
use crate::index::{load_seed, Database};
use crate::schema::{create_default_schema, load_schema, Fields};
use crate::selector::{parse, Operator, Selector, Selectors};

/// Database plus the field registry it was built for
struct Site {
    db: Database,
    fields: Fields,
    fieldtypes: FieldtypeRegistry,
}

impl Site {
    fn open(db_path: &Path, schema_path: &Path) -> Result<Self> {
        let fieldtypes = FieldtypeRegistry::with_defaults();
        let schema = load_schema(schema_path, &fieldtypes)?;
        let fields = Fields::from_schema(&schema);

        let db = Database::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        db.ensure_field_tables(&fields, &fieldtypes)
            .context("Failed to create field tables")?;

        Ok(Site { db, fields, fieldtypes })
    }

    fn finder(&self, page_num: Option<i64>) -> PageFinder<'_> {
        PageFinder::new(
            FinderContext {
                fields: &self.fields,
                fieldtypes: &self.fieldtypes,
                templates: &self.db,
                pages: &self.db,
                page_num,
            },
            &self.db,
        )
    }
}

/// Options of `pf find`
#[derive(Debug, Default)]
pub struct FindArgs {
    pub one: bool,
    pub all_status: bool,
    pub page: Option<i64>,
    pub json: bool,
}

/// Initialize a new site directory
pub fn init(path: &Path) -> Result<()> {
    println!("Initializing site at: {}", path.display());

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    let schema_path = path.join("schema.yaml");
    if schema_path.exists() {
        println!("• Keeping existing schema.yaml");
    } else {
        create_default_schema(&schema_path)?;
        println!("✓ Created schema.yaml");
    }

    let db_path = path.join("pages.db");
    Site::open(&db_path, &schema_path)?;
    println!("✓ Created pages.db");

    println!("\nSite initialized! Import pages with `pf seed <file>`.");

    Ok(())
}

/// Import templates and pages from a YAML seed file
pub fn seed(db_path: &Path, schema_path: &Path, file: &Path) -> Result<()> {
    let mut site = Site::open(db_path, schema_path)?;
    let report = load_seed(&mut site.db, &site.fields, file)?;

    println!("✓ Imported {}", file.display());
    println!("  {} templates", report.templates);
    println!("  {} pages", report.pages);
    println!("  {} field values", report.values);

    Ok(())
}

/// Run a selector and print the matching pages
pub fn find(db_path: &Path, schema_path: &Path, config: &Config, selector: &str, args: &FindArgs) -> Result<()> {
    let site = Site::open(db_path, schema_path)?;
    let selectors = prepare_selectors(selector, config)?;

    let mut finder = site.finder(args.page);
    finder.check_status(!args.all_status).debug(config.debug);

    let rows = finder.find(&selectors, FindOptions { find_one: args.one })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No pages found.");
        return Ok(());
    }

    for row in &rows {
        print_row(&site, row)?;
    }

    println!();
    if finder.limit() > 0 {
        println!(
            "Showing {}-{} of {} pages",
            finder.start() + 1,
            finder.start() + rows.len() as i64,
            finder.total()
        );
    } else {
        println!("{} pages", finder.total());
    }

    Ok(())
}

/// Print the SQL a selector compiles to
pub fn explain(db_path: &Path, schema_path: &Path, config: &Config, selector: &str, one: bool) -> Result<()> {
    let site = Site::open(db_path, schema_path)?;
    let selectors = prepare_selectors(selector, config)?;

    let mut finder = site.finder(None);
    finder.debug(config.debug);

    let compiled = finder.query_for(&selectors, FindOptions { find_one: one })?;
    println!("{}", compiled.query);

    Ok(())
}

/// Show statistics
pub fn stats(db_path: &Path, schema_path: &Path) -> Result<()> {
    let site = Site::open(db_path, schema_path)?;
    let stats = site.db.stats(&site.fields)?;

    println!("Site Statistics");
    println!("===============");
    println!("Pages:      {}", stats.page_count);
    println!("Hidden:     {}", stats.hidden_count);
    println!("Templates:  {}", stats.template_count);

    if !stats.field_counts.is_empty() {
        println!("\nField values:");
        for (name, count) in &stats.field_counts {
            println!("  {:<16} {}", name, count);
        }
    }

    Ok(())
}

/// Parse a selector and apply the configured page size when it sets no limit
fn prepare_selectors(selector: &str, config: &Config) -> Result<Selectors> {
    let mut selectors = parse(selector)?;

    if let Some(page_size) = config.page_size {
        if page_size > 0 && !selectors.iter().any(|s| s.field() == "limit") {
            selectors.add(Selector::new("limit", Operator::Equal, page_size.to_string()));
        }
    }

    Ok(selectors)
}

fn print_row(site: &Site, row: &Row) -> Result<()> {
    let id = row.get("id").and_then(|v| v.as_i64()).unwrap_or(0);
    let path = site.db.page_path(id)?.unwrap_or_else(|| format!("#{}", id));
    let template = row
        .get("templates_id")
        .and_then(|v| v.as_i64())
        .map(|t| template_label(site, t))
        .unwrap_or_default();
    let score = row.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);

    if score > 0.0 {
        println!("{:>5}  {:<40} {:<12} score {}", id, path, template, score);
    } else {
        println!("{:>5}  {:<40} {}", id, path, template);
    }

    Ok(())
}

fn template_label(site: &Site, id: i64) -> String {
    site.db
        .template_name(id)
        .ok()
        .flatten()
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::TemplateLookup;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_site() {
        let dir = tempdir().unwrap();
        let site_dir = dir.path().join("site");
        init(&site_dir).unwrap();

        assert!(site_dir.join("schema.yaml").exists());
        assert!(site_dir.join("pages.db").exists());

        let site = Site::open(&site_dir.join("pages.db"), &site_dir.join("schema.yaml")).unwrap();
        assert!(site.fields.get("title").is_some());
        assert!(site.db.template_id("basic").unwrap().is_none());
    }

    #[test]
    fn test_page_size_applies_without_limit() {
        let config = Config { page_size: Some(25), ..Config::default() };

        let selectors = prepare_selectors("template=basic", &config).unwrap();
        assert_eq!(selectors.to_string(), "template=basic, limit=25");

        let selectors = prepare_selectors("template=basic, limit=5", &config).unwrap();
        assert_eq!(selectors.to_string(), "template=basic, limit=5");
    }

    #[test]
    fn test_invalid_selector_reported() {
        let err = prepare_selectors("title", &Config::default()).unwrap_err();
        assert!(err.to_string().contains("missing operator"));
    }
}
