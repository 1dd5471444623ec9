//! Fields stored as columns of the pages table

use tracing::debug;

use super::compiler::QueryCompiler;
use crate::error::{FinderError, Result};
use crate::fieldtype::normalize_datetime;
use crate::query::{is_digits, quote_value, Condition};
use crate::selector::Selector;

/// Column on `pages` for a native field name
pub(super) fn native_column(name: &str) -> &str {
    match name {
        "template" => "templates_id",
        "parent" => "parent_id",
        other => other,
    }
}

impl QueryCompiler<'_> {
    /// Compare a pages column against each value, OR-ing the results.
    ///
    /// `template` takes names as well as ids, `parent` takes paths, and
    /// `created`/`modified` take timestamps or dates. A template name or
    /// parent path that does not resolve makes its branch never match.
    pub(super) fn add_native_field(&mut self, selector: &Selector) -> Result<()> {
        let field = selector.field();
        let op = selector
            .operator
            .sql_comparison()
            .ok_or_else(|| FinderError::UnsupportedOperator {
                operator: selector.operator.to_string(),
                field: field.to_string(),
            })?;
        let column = format!("pages.{}", native_column(field));

        let mut branches = Vec::with_capacity(selector.values.len());

        for value in &selector.values {
            let resolved = match field {
                "template" if !is_digits(value) => {
                    let id = self.ctx.templates.template_id(value)?;
                    if id.is_none() {
                        debug!(template = %value, "unknown template");
                    }
                    id.map(|id| id.to_string())
                }
                "parent" if !is_digits(value) => self.ctx.pages.page_id(value)?.map(|id| id.to_string()),
                "created" | "modified" => normalize_datetime(value),
                _ => Some(value.clone()),
            };

            branches.push(match resolved {
                Some(v) => Condition::compare(column.as_str(), op, quote_value(&v)),
                None => Condition::Never,
            });
        }

        let condition = Condition::or(branches).negate_if(selector.not);
        self.query.where_(format!("({})", condition.render()));

        Ok(())
    }
}
