//! Finder module - selector compilation and execution
//!
//! `PageFinder::find` takes parsed selectors, adds the status filter,
//! compiles everything into one SELECT over `pages`, runs it through an
//! `Executor` and folds relevance columns into a single `score`.

mod compiler;
mod context;
mod joins;
mod native;
mod pagination;
mod path;
mod sort;
mod status;

pub use compiler::{compile, CompiledQuery};
pub use context::{Executor, FinderContext, PageLookup, ResultSet, TemplateLookup};
pub use path::ROOT_ID;
pub use status::{
    status_from_label, STATUS_HIDDEN, STATUS_LOCKED, STATUS_ON, STATUS_SYSTEM, STATUS_SYSTEM_ID, STATUS_TRASH,
    STATUS_UNPUBLISHED,
};

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::Result;
use crate::fieldtype::SCORE_PREFIX;
use crate::query::SelectQuery;
use crate::selector::Selectors;

/// One result row keyed by column name, plus `score`
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Single-page lookup: hidden pages stay visible and the window is
    /// forced to the first row
    pub find_one: bool,
}

/// Runs selectors against a database
pub struct PageFinder<'a> {
    ctx: FinderContext<'a>,
    executor: &'a dyn Executor,
    total: i64,
    limit: i64,
    start: i64,
    check_status: bool,
    debug: bool,
}

impl<'a> PageFinder<'a> {
    pub fn new(ctx: FinderContext<'a>, executor: &'a dyn Executor) -> Self {
        PageFinder {
            ctx,
            executor,
            total: 0,
            limit: 0,
            start: 0,
            check_status: true,
            debug: false,
        }
    }

    /// Toggle the automatic status filter for subsequent finds
    pub fn check_status(&mut self, enabled: bool) -> &mut Self {
        self.check_status = enabled;
        self
    }

    /// Attach the selector text to every query as an SQL comment
    pub fn debug(&mut self, enabled: bool) -> &mut Self {
        self.debug = enabled;
        self
    }

    /// Total matches of the last find, ignoring its LIMIT
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    /// Compile without executing or touching finder state
    pub fn query_for(&self, selectors: &Selectors, options: FindOptions) -> Result<CompiledQuery> {
        let mut selectors = selectors.clone();
        if self.check_status {
            status::setup_status_checks(&mut selectors, options.find_one);
        }
        if options.find_one {
            status::force_single(&mut selectors);
        }

        let mut compiled = compile(&self.ctx, &selectors)?;
        if self.debug {
            compiled.query.set_comment(format!("Selector: {}", selectors));
        }
        Ok(compiled)
    }

    pub fn find(&mut self, selectors: &Selectors, options: FindOptions) -> Result<Vec<Row>> {
        self.total = 0;
        self.limit = 0;
        self.start = 0;

        let compiled = self.query_for(selectors, options)?;
        self.limit = compiled.limit;
        self.start = compiled.start;

        debug!(sql = %compiled.query, "executing selector query");
        let result = self.executor.execute(&compiled.query)?;

        if result.rows.is_empty() {
            return Ok(Vec::new());
        }

        let rows = assemble_rows(result);
        self.total = self.resolve_total(&compiled.query, rows.len(), options)?;
        debug!(rows = rows.len(), total = self.total, "selector query done");

        Ok(rows)
    }

    /// First matching row, if any
    pub fn find_one(&mut self, selectors: &Selectors) -> Result<Option<Row>> {
        let rows = self.find(selectors, FindOptions { find_one: true })?;
        Ok(rows.into_iter().next())
    }

    fn resolve_total(&self, query: &SelectQuery, returned: usize, options: FindOptions) -> Result<i64> {
        if !options.find_one && query.has_limit() {
            self.executor.found_rows()
        } else {
            Ok(returned as i64)
        }
    }
}

/// Turn raw rows into maps, summing every score column into `score`.
/// Columns are walked by position since score aliases may repeat.
fn assemble_rows(result: ResultSet) -> Vec<Row> {
    let ResultSet { columns, rows } = result;

    rows.into_iter()
        .map(|values| {
            let mut row = Row::new();
            let mut score = 0.0;

            for (column, value) in columns.iter().zip(values) {
                if column.starts_with(SCORE_PREFIX) {
                    score += score_value(&value);
                } else {
                    row.insert(column.clone(), value);
                }
            }

            let score = Number::from_f64(score).map(Value::Number).unwrap_or(Value::Null);
            row.insert("score".to_string(), score);
            row
        })
        .collect()
}

fn score_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldtype::FieldtypeRegistry;
    use crate::index::{Database, NewPage};
    use crate::schema::{FieldDefinition, Fields, Schema};
    use crate::selector::parse;

    fn test_schema() -> Schema {
        let mut schema = Schema::default();
        for (name, field_type) in [
            ("title", "text"),
            ("body", "textarea"),
            ("price", "integer"),
            ("published", "datetime"),
        ] {
            schema.fields.insert(
                name.to_string(),
                FieldDefinition {
                    field_type: field_type.to_string(),
                    table: None,
                    label: None,
                },
            );
        }
        schema
    }

    /// Site tree:
    ///
    /// ```text
    /// /                     home
    /// /about/               basic, title "About us"
    /// /about/team/          basic, title "Our team", hidden
    /// /products/            basic, title "Products"
    /// /products/bike/       product, price 500, body mentions bike twice
    /// /products/trike/      product, price 150, body mentions bike once
    /// /products/draft/      product, unpublished
    /// ```
    fn fixture() -> (Database, Fields, FieldtypeRegistry) {
        let fields = Fields::from_schema(&test_schema());
        let fieldtypes = FieldtypeRegistry::with_defaults();
        let mut db = Database::open_in_memory().unwrap();
        db.ensure_field_tables(&fields, &fieldtypes).unwrap();

        let basic = db.add_template("basic").unwrap();
        let product = db.add_template("product").unwrap();

        let about = db.insert_page(&NewPage::new(ROOT_ID, basic, "about")).unwrap();
        db.set_field(&fields, "title", about, "About us").unwrap();

        let mut team = NewPage::new(about, basic, "team");
        team.status = STATUS_ON | STATUS_HIDDEN;
        let team = db.insert_page(&team).unwrap();
        db.set_field(&fields, "title", team, "Our team").unwrap();

        let products = db.insert_page(&NewPage::new(ROOT_ID, basic, "products")).unwrap();
        db.set_field(&fields, "title", products, "Products").unwrap();

        let bike = db.insert_page(&NewPage::new(products, product, "bike")).unwrap();
        db.set_field(&fields, "title", bike, "Bike").unwrap();
        db.set_field(&fields, "price", bike, "500").unwrap();
        db.set_field(&fields, "body", bike, "A bike is a bike").unwrap();

        let trike = db.insert_page(&NewPage::new(products, product, "trike")).unwrap();
        db.set_field(&fields, "title", trike, "Trike").unwrap();
        db.set_field(&fields, "price", trike, "150").unwrap();
        db.set_field(&fields, "body", trike, "Like a bike with three wheels").unwrap();

        let mut draft = NewPage::new(products, product, "draft");
        draft.status = STATUS_ON | STATUS_UNPUBLISHED;
        db.insert_page(&draft).unwrap();

        (db, fields, fieldtypes)
    }

    fn names(db: &Database, rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| {
                let path = db.page_path(row["id"].as_i64().unwrap()).unwrap().unwrap();
                path.trim_end_matches('/').rsplit('/').next().unwrap().to_string()
            })
            .collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|row| row["id"].as_i64().unwrap()).collect()
    }

    macro_rules! finder {
        ($db:expr, $fields:expr, $fieldtypes:expr) => {
            PageFinder::new(
                FinderContext {
                    fields: &$fields,
                    fieldtypes: &$fieldtypes,
                    templates: &$db,
                    pages: &$db,
                    page_num: None,
                },
                &$db,
            )
        };
    }

    #[test]
    fn test_status_filter_hides_hidden_and_unpublished() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("has_parent=/, sort=id").unwrap(), FindOptions::default()).unwrap();
        let ids = ids(&rows);
        assert_eq!(ids.len(), 4);
        assert_eq!(finder.total(), 4);
    }

    #[test]
    fn test_check_status_off_sees_everything() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);
        finder.check_status(false);

        let rows = finder.find(&parse("template=product").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_find_one_sees_hidden() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let row = finder.find_one(&parse("path=/about/team/").unwrap()).unwrap();
        assert!(row.is_some());
        assert_eq!(finder.total(), 1);
        assert_eq!((finder.start(), finder.limit()), (0, 1));

        let rows = finder.find(&parse("path=/about/team/").unwrap(), FindOptions::default()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(finder.total(), 0);
    }

    #[test]
    fn test_find_one_ignores_explicit_window() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("template=product, start=1, limit=10").unwrap(), FindOptions { find_one: true })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((finder.start(), finder.limit()), (0, 1));
    }

    #[test]
    fn test_unpublished_needs_explicit_status() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("status=unpublished").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(names(&db, &rows), vec!["draft"]);
    }

    #[test]
    fn test_limit_reports_unlimited_total() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("has_parent=/, sort=name, limit=2").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["about", "bike"]);
        assert_eq!(finder.total(), 4);
        assert_eq!(finder.limit(), 2);

        let rows = finder
            .find(&parse("has_parent=/, sort=name, start=2, limit=2").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["products", "trike"]);
        assert_eq!(finder.start(), 2);
        assert_eq!(finder.total(), 4);
    }

    #[test]
    fn test_limit_one_still_counts_all() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("template=product, limit=1").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(finder.total(), 2);
    }

    #[test]
    fn test_page_number_window() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = PageFinder::new(
            FinderContext {
                fields: &fields,
                fieldtypes: &fieldtypes,
                templates: &db,
                pages: &db,
                page_num: Some(2),
            },
            &db,
        );

        let rows = finder
            .find(&parse("has_parent=/, sort=name, limit=3").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["trike"]);
        assert_eq!(finder.start(), 3);
    }

    #[test]
    fn test_attached_and_native_fields() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("template=product, price>=200").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["bike"]);

        let rows = finder
            .find(&parse("parent=/products/, sort=-price").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["bike", "trike"]);
    }

    #[test]
    fn test_identical_terms_or_different_terms_and() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("title=Bike, title=Bike").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["bike"]);

        let rows = finder
            .find(&parse("title=Bike, price=150").unwrap(), FindOptions::default())
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(finder.total(), 0);
    }

    #[test]
    fn test_multi_field_or() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("title|body%=%three%, sort=name").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["trike"]);
    }

    #[test]
    fn test_blank_value_finds_missing_rows() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder
            .find(&parse("has_parent=/, price=, sort=name").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["about", "products"]);

        let rows = finder
            .find(&parse("price!=, sort=name").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["bike", "trike"]);
    }

    #[test]
    fn test_score_aggregation() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("body*=bike").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(names(&db, &rows), vec!["bike", "trike"]);
        assert_eq!(rows[0]["score"].as_f64(), Some(2.0));
        assert_eq!(rows[1]["score"].as_f64(), Some(1.0));
        assert!(rows[0].keys().all(|k| !k.starts_with(SCORE_PREFIX)));
    }

    #[test]
    fn test_rows_without_score_columns_score_zero() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("name=about").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(rows[0]["score"].as_f64(), Some(0.0));
        assert_eq!(rows[0]["templates_id"].as_i64(), Some(1));
    }

    #[test]
    fn test_path_lookup() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("path=/products/bike/").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(names(&db, &rows), vec!["bike"]);

        let rows = finder.find(&parse("path=/about/bike/").unwrap(), FindOptions::default()).unwrap();
        assert!(rows.is_empty());

        let rows = finder.find(&parse("path=/").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(ids(&rows), vec![ROOT_ID]);
    }

    #[test]
    fn test_has_parent_covers_descendants() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);
        finder.check_status(false);

        let rows = finder
            .find(&parse("has_parent=/about/, sort=name").unwrap(), FindOptions::default())
            .unwrap();
        assert_eq!(names(&db, &rows), vec!["team"]);
    }

    #[test]
    fn test_unknown_template_finds_nothing() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let rows = finder.find(&parse("template=nonexistent").unwrap(), FindOptions::default()).unwrap();
        assert!(rows.is_empty());

        // the root page carries no template row
        finder.check_status(false);
        let rows = finder.find(&parse("template=nonexistent").unwrap(), FindOptions::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_errors_propagate() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        let err = finder.find(&parse("missing=1").unwrap(), FindOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Field does not exist: missing");
    }

    #[test]
    fn test_debug_comment() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);
        finder.debug(true);

        let compiled = finder.query_for(&parse("title=Bike").unwrap(), FindOptions::default()).unwrap();
        assert!(compiled
            .query
            .render()
            .ends_with("/* Selector: title=Bike, status<1024 */"));
    }

    #[test]
    fn test_state_resets_between_finds() {
        let (db, fields, fieldtypes) = fixture();
        let mut finder = finder!(db, fields, fieldtypes);

        finder.find(&parse("template=product, limit=5").unwrap(), FindOptions::default()).unwrap();
        assert_eq!(finder.limit(), 5);

        finder.find(&parse("template=product").unwrap(), FindOptions::default()).unwrap();
        assert_eq!((finder.limit(), finder.start(), finder.total()), (0, 0, 2));
    }

    #[test]
    fn test_assemble_rows_sums_repeated_score_columns() {
        let result = ResultSet {
            columns: vec!["id".into(), "_score_a".into(), "_score_a".into()],
            rows: vec![vec![Value::from(7), Value::from(1.5), Value::from("2")]],
        };
        let rows = assemble_rows(result);
        assert_eq!(rows[0]["id"], Value::from(7));
        assert_eq!(rows[0]["score"].as_f64(), Some(3.5));
        assert_eq!(rows[0].len(), 2);
    }
}
