//! Page reference fieldtype: `data` holds the id of another page

use super::integer::to_integer;
use super::{unsupported, Fieldtype};
use crate::error::Result;
use crate::query::SelectQuery;
use crate::selector::Operator;

pub struct PageFieldtype;

impl Fieldtype for PageFieldtype {
    fn name(&self) -> &'static str {
        "page"
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
        let op = match operator {
            Operator::BitwiseAnd => None,
            other => other.sql_comparison(),
        }
        .ok_or_else(|| unsupported(operator, table_alias, column))?;

        query.where_(format!("{}.{}{}{}", table_alias, column, op, to_integer(value)));
        Ok(())
    }
}
