//! SQLite database operations

use std::cell::{Cell, RefCell};
use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{FinderError, Result};
use crate::fieldtype::{normalize_datetime, FieldtypeRegistry, DATETIME_FORMAT};
use crate::finder::{Executor, PageLookup, ResultSet, TemplateLookup, ROOT_ID, STATUS_ON};
use crate::query::SelectQuery;
use crate::schema::Fields;

/// Database handle
pub struct Database {
    conn: Connection,

    /// COUNT query for the last executed query that had a LIMIT
    count_sql: RefCell<Option<String>>,
    last_row_count: Cell<i64>,
}

/// A page to insert below an existing parent
#[derive(Debug, Clone)]
pub struct NewPage {
    pub parent_id: i64,
    pub templates_id: i64,
    pub name: String,
    pub status: i64,
    /// Any date `created=` accepts; now when absent
    pub created: Option<String>,
}

impl NewPage {
    pub fn new(parent_id: i64, templates_id: i64, name: impl Into<String>) -> Self {
        NewPage {
            parent_id,
            templates_id,
            name: name.into(),
            status: STATUS_ON,
            created: None,
        }
    }
}

impl Database {
    /// Open or create the database file
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.create_scalar_function("RAND", 0, FunctionFlags::SQLITE_UTF8, |_| {
            Ok(rand::random::<f64>())
        })?;

        let db = Database {
            conn,
            count_sql: RefCell::new(None),
            last_row_count: Cell::new(0),
        };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the page tree tables and the root page
    fn initialize(&self) -> Result<()> {
        // In-memory databases answer "memory"
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL DEFAULT 0,
                templates_id INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 1,
                created TEXT NOT NULL,
                modified TEXT NOT NULL,
                UNIQUE (parent_id, name)
            );

            -- Every page against each of its ancestors
            CREATE TABLE IF NOT EXISTS pages_parents (
                pages_id INTEGER NOT NULL,
                parents_id INTEGER NOT NULL,
                PRIMARY KEY (pages_id, parents_id)
            );

            CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent_id);
            CREATE INDEX IF NOT EXISTS idx_pages_template ON pages(templates_id);
            CREATE INDEX IF NOT EXISTS idx_pages_parents_parent ON pages_parents(parents_id);
        "#,
        )?;

        let now = now();
        self.conn.execute(
            "INSERT OR IGNORE INTO pages (id, parent_id, templates_id, name, status, created, modified)
             VALUES (?, 0, 0, 'home', ?, ?, ?)",
            params![ROOT_ID, STATUS_ON, now, now],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO pages_parents (pages_id, parents_id) VALUES (?, ?)",
            params![ROOT_ID, ROOT_ID],
        )?;

        Ok(())
    }

    /// Create the storage table of every attached field
    pub fn ensure_field_tables(&self, fields: &Fields, fieldtypes: &FieldtypeRegistry) -> Result<()> {
        for field in fields.iter() {
            let fieldtype = fieldtypes
                .get(&field.fieldtype)
                .ok_or_else(|| FinderError::UnknownFieldtype {
                    fieldtype: field.fieldtype.clone(),
                    field: field.name.clone(),
                })?;

            self.conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    pages_id INTEGER NOT NULL,
                    data {column_type},
                    sort INTEGER NOT NULL DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_pages ON {table}(pages_id);
                CREATE INDEX IF NOT EXISTS idx_{table}_data ON {table}(data);
            "#,
                table = field.table,
                column_type = fieldtype.column_type(),
            ))?;
        }

        Ok(())
    }

    /// Id of a template, creating it when missing
    pub fn add_template(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT OR IGNORE INTO templates (name) VALUES (?)", params![name])?;
        let id = self
            .conn
            .query_row("SELECT id FROM templates WHERE name = ?", params![name], |row| row.get(0))?;
        Ok(id)
    }

    pub fn template_name(&self, id: i64) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row("SELECT name FROM templates WHERE id = ?", params![id], |row| row.get(0))
            .optional()?;
        Ok(name)
    }

    /// Insert a page and record its ancestry
    pub fn insert_page(&mut self, page: &NewPage) -> Result<i64> {
        let created = match &page.created {
            Some(value) => normalize_datetime(value).ok_or_else(|| {
                FinderError::Execution(format!("Invalid created date for '{}': {}", page.name, value))
            })?,
            None => now(),
        };

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO pages (parent_id, templates_id, name, status, created, modified)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![page.parent_id, page.templates_id, page.name, page.status, created, created],
        )?;
        let id = tx.last_insert_rowid();

        if page.parent_id != 0 {
            tx.execute(
                "INSERT OR IGNORE INTO pages_parents (pages_id, parents_id) VALUES (?, ?)",
                params![id, page.parent_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO pages_parents (pages_id, parents_id)
                 SELECT ?, parents_id FROM pages_parents WHERE pages_id = ?",
                params![id, page.parent_id],
            )?;
        }

        tx.commit()?;
        debug!(id, name = %page.name, "inserted page");

        Ok(id)
    }

    /// Replace the value of an attached field for a page
    pub fn set_field(&mut self, fields: &Fields, name: &str, page_id: i64, value: &str) -> Result<()> {
        let field = fields
            .get(name)
            .ok_or_else(|| FinderError::UnknownField(name.to_string()))?;

        let value = if field.fieldtype == "datetime" {
            normalize_datetime(value).ok_or_else(|| {
                FinderError::Execution(format!("Invalid date for field '{}': {}", name, value))
            })?
        } else {
            value.to_string()
        };

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {} WHERE pages_id = ?", field.table), params![page_id])?;
        tx.execute(
            &format!("INSERT INTO {} (pages_id, data, sort) VALUES (?, ?, 0)", field.table),
            params![page_id, value],
        )?;
        tx.execute(
            "UPDATE pages SET modified = ? WHERE id = ?",
            params![now(), page_id],
        )?;
        tx.commit()?;

        Ok(())
    }

    /// Full path of a page, e.g. `/about/team/`
    pub fn page_path(&self, id: i64) -> Result<Option<String>> {
        let mut segments = Vec::new();
        let mut current = id;

        while current != ROOT_ID {
            let row: Option<(String, i64)> = self
                .conn
                .query_row(
                    "SELECT name, parent_id FROM pages WHERE id = ?",
                    params![current],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((name, parent_id)) => {
                    segments.push(name);
                    current = parent_id;
                }
                None => return Ok(None),
            }
        }

        segments.reverse();
        let mut path = String::from("/");
        for segment in segments {
            path.push_str(&segment);
            path.push('/');
        }

        Ok(Some(path))
    }

    /// Get statistics about the index
    pub fn stats(&self, fields: &Fields) -> Result<IndexStats> {
        let count = |sql: &str| -> Result<i64> { Ok(self.conn.query_row(sql, [], |row| row.get(0))?) };

        let mut field_counts = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            let exists: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                params![field.table],
                |row| row.get(0),
            )?;
            let rows = if exists > 0 {
                count(&format!("SELECT COUNT(*) FROM {}", field.table))?
            } else {
                0
            };
            field_counts.push((field.name.clone(), rows as usize));
        }

        Ok(IndexStats {
            page_count: count("SELECT COUNT(*) FROM pages")? as usize,
            template_count: count("SELECT COUNT(*) FROM templates")? as usize,
            hidden_count: count("SELECT COUNT(*) FROM pages WHERE status >= 1024")? as usize,
            field_counts,
        })
    }
}

/// Index statistics
#[derive(Debug)]
pub struct IndexStats {
    pub page_count: usize,
    pub template_count: usize,
    /// Pages at hidden status or above
    pub hidden_count: usize,
    /// Stored values per attached field
    pub field_counts: Vec<(String, usize)>,
}

impl TemplateLookup for Database {
    fn template_id(&self, name: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM templates WHERE name = ?", params![name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }
}

impl PageLookup for Database {
    fn page_id(&self, path: &str) -> Result<Option<i64>> {
        let mut current = ROOT_ID;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = self
                .conn
                .query_row(
                    "SELECT id FROM pages WHERE parent_id = ? AND name = ?",
                    params![current, segment],
                    |row| row.get(0),
                )
                .optional()?;

            match next {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }

        Ok(Some(current))
    }
}

impl Executor for Database {
    fn execute(&self, query: &SelectQuery) -> Result<ResultSet> {
        let sql = query.without_found_rows().render();

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(to_json(row.get_ref(i)?));
            }
            rows.push(values);
        }

        self.last_row_count.set(rows.len() as i64);
        *self.count_sql.borrow_mut() = if query.has_limit() {
            let unlimited = query.without_found_rows().without_limit().render();
            Some(format!("SELECT COUNT(*) FROM ({})", unlimited))
        } else {
            None
        };

        Ok(ResultSet { columns, rows })
    }

    fn found_rows(&self) -> Result<i64> {
        match self.count_sql.borrow().as_deref() {
            Some(sql) => Ok(self.conn.query_row(sql, [], |row| row.get(0))?),
            None => Ok(self.last_row_count.get()),
        }
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

fn now() -> String {
    chrono::Utc::now().format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SelectQuery;
    use crate::schema::{FieldDefinition, Schema};

    fn fields() -> Fields {
        let mut schema = Schema::default();
        schema.fields.insert(
            "title".to_string(),
            FieldDefinition { field_type: "text".to_string(), table: None, label: None },
        );
        schema.fields.insert(
            "published".to_string(),
            FieldDefinition { field_type: "datetime".to_string(), table: None, label: None },
        );
        Fields::from_schema(&schema)
    }

    fn database() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_field_tables(&fields(), &FieldtypeRegistry::with_defaults()).unwrap();
        db
    }

    #[test]
    fn test_database_initialization() {
        let db = database();
        let stats = db.stats(&fields()).unwrap();
        assert_eq!(stats.page_count, 1);
        assert_eq!(stats.template_count, 0);
        assert_eq!(db.page_path(ROOT_ID).unwrap().as_deref(), Some("/"));
    }

    #[test]
    fn test_insert_page_records_ancestry() {
        let mut db = database();
        let basic = db.add_template("basic").unwrap();
        let about = db.insert_page(&NewPage::new(ROOT_ID, basic, "about")).unwrap();
        let team = db.insert_page(&NewPage::new(about, basic, "team")).unwrap();

        let mut stmt = db
            .conn
            .prepare("SELECT parents_id FROM pages_parents WHERE pages_id = ? ORDER BY parents_id")
            .unwrap();
        let parents: Vec<i64> = stmt
            .query_map(params![team], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(parents, vec![ROOT_ID, about]);

        assert_eq!(db.page_path(team).unwrap().as_deref(), Some("/about/team/"));
        assert_eq!(db.page_id("/about/team/").unwrap(), Some(team));
        assert_eq!(db.page_id("/about/nobody/").unwrap(), None);
        assert_eq!(db.page_id("/").unwrap(), Some(ROOT_ID));
    }

    #[test]
    fn test_templates() {
        let db = database();
        let first = db.add_template("product").unwrap();
        assert_eq!(db.add_template("product").unwrap(), first);
        assert_eq!(db.template_id("product").unwrap(), Some(first));
        assert_eq!(db.template_id("missing").unwrap(), None);
        assert_eq!(db.template_name(first).unwrap().as_deref(), Some("product"));
    }

    #[test]
    fn test_set_field_replaces_value() {
        let mut db = database();
        let fields = fields();
        let page = db.insert_page(&NewPage::new(ROOT_ID, 0, "news")).unwrap();

        db.set_field(&fields, "title", page, "First").unwrap();
        db.set_field(&fields, "title", page, "Second").unwrap();
        db.set_field(&fields, "published", page, "2024-03-01").unwrap();

        let title: String = db
            .conn
            .query_row("SELECT data FROM field_title WHERE pages_id = ?", params![page], |row| row.get(0))
            .unwrap();
        assert_eq!(title, "Second");

        let published: String = db
            .conn
            .query_row("SELECT data FROM field_published WHERE pages_id = ?", params![page], |row| row.get(0))
            .unwrap();
        assert_eq!(published, "2024-03-01 00:00:00");

        let stats = db.stats(&fields).unwrap();
        assert!(stats.field_counts.contains(&("title".to_string(), 1)));
    }

    #[test]
    fn test_set_unknown_field() {
        let mut db = database();
        let err = db.set_field(&fields(), "nope", ROOT_ID, "x").unwrap_err();
        assert!(matches!(err, FinderError::UnknownField(_)));
    }

    #[test]
    fn test_execute_and_found_rows() {
        let mut db = database();
        for name in ["a", "b", "c"] {
            db.insert_page(&NewPage::new(ROOT_ID, 0, name)).unwrap();
        }

        let mut query = SelectQuery::new();
        query
            .select("SQL_CALC_FOUND_ROWS")
            .select("pages.id")
            .select("pages.name")
            .from("pages")
            .where_("pages.parent_id=1")
            .orderby("pages.name")
            .limit("1,1");

        let result = db.execute(&query).unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.rows, vec![vec![Value::from(3), Value::from("b")]]);
        assert_eq!(db.found_rows().unwrap(), 3);

        let mut unlimited = SelectQuery::new();
        unlimited.select("pages.id").from("pages");
        db.execute(&unlimited).unwrap();
        assert_eq!(db.found_rows().unwrap(), 4);
    }

    #[test]
    fn test_rand_function() {
        let db = database();
        let mut query = SelectQuery::new();
        query.select("pages.id").from("pages").orderby("RAND()");
        assert_eq!(db.execute(&query).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_execution_error() {
        let db = database();
        let mut query = SelectQuery::new();
        query.select("pages.id").from("missing_table");
        let err = db.execute(&query).unwrap_err();
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pages.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_page(&NewPage::new(ROOT_ID, 0, "kept")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.page_id("/kept/").unwrap().is_some());
    }
}
