//! Collaborators the finder needs from the rest of the system

use serde_json::Value;

use crate::error::Result;
use crate::fieldtype::FieldtypeRegistry;
use crate::query::SelectQuery;
use crate::schema::Fields;

/// Resolves template names to ids
pub trait TemplateLookup {
    fn template_id(&self, name: &str) -> Result<Option<i64>>;
}

/// Resolves page paths like `/about/team/` to ids
pub trait PageLookup {
    fn page_id(&self, path: &str) -> Result<Option<i64>>;
}

/// Raw rows as returned by the database, columns in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Runs compiled queries
pub trait Executor {
    fn execute(&self, query: &SelectQuery) -> Result<ResultSet>;

    /// Row count the last executed query would have returned without its
    /// LIMIT
    fn found_rows(&self) -> Result<i64>;
}

/// Everything a compilation reads
pub struct FinderContext<'a> {
    pub fields: &'a Fields,
    pub fieldtypes: &'a FieldtypeRegistry,
    pub templates: &'a dyn TemplateLookup,
    pub pages: &'a dyn PageLookup,

    /// 1-based page number used to derive `start` when only `limit` is given
    pub page_num: Option<i64>,
}
