//! Integer fieldtype

use super::{unsupported, Fieldtype};
use crate::error::Result;
use crate::query::SelectQuery;
use crate::selector::Operator;

pub struct IntegerFieldtype;

/// Read a selector value as an integer. Decimals are truncated, anything
/// unparseable counts as 0.
pub(crate) fn to_integer(value: &str) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f.trunc() as i64))
        .unwrap_or(0)
}

impl Fieldtype for IntegerFieldtype {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn column_type(&self) -> &'static str {
        "INTEGER"
    }

    fn match_query(
        &self,
        query: &mut SelectQuery,
        table_alias: &str,
        column: &str,
        operator: Operator,
        value: &str,
    ) -> Result<()> {
        let op = operator
            .sql_comparison()
            .ok_or_else(|| unsupported(operator, table_alias, column))?;
        query.where_(format!("{}.{}{}{}", table_alias, column, op, to_integer(value)));
        Ok(())
    }
}
