//! `sort=` terms

use tracing::warn;

use super::compiler::{pages_link, QueryCompiler};
use super::joins::JoinKind;
use super::native::native_column;
use crate::query::Condition;
use crate::selector::Selector;

impl QueryCompiler<'_> {
    /// Apply sort terms after everything else. Keys go ahead of any ordering
    /// added by fieldtypes, and the last declared key is the primary one.
    pub(super) fn add_sorts(&mut self, sorts: &[&Selector]) {
        let mut keys = Vec::new();
        for selector in sorts {
            for value in &selector.values {
                if let Some(key) = self.sort_key(value) {
                    keys.push(key);
                }
            }
        }

        for key in keys {
            self.query.prepend_orderby(key);
        }
    }

    /// ORDER BY expression for one sort value, e.g. `-created` or
    /// `parent.title`
    fn sort_key(&mut self, value: &str) -> Option<String> {
        let descending = value.starts_with('-') || value.ends_with('-');
        let value = value.trim_matches(|c| c == '-' || c == '+');
        let (name, sub) = match value.split_once('.') {
            Some((name, sub)) => (name, Some(sub)),
            None => (value, None),
        };
        if let Some(sub) = sub.filter(|s| !is_identifier(s)) {
            warn!(column = %sub, "ignoring sort on invalid column name");
            return None;
        }
        let suffix = sub.map(|s| format!("_{}", s)).unwrap_or_default();
        let ctx = self.ctx;

        let expr = match name {
            "random" => "RAND()".to_string(),
            "parent" => {
                let alias = format!("_sort_parent{}", suffix);
                let on = Condition::compare(format!("{}.id", alias), "=", "pages.parent_id");
                self.joins.add(JoinKind::Left, "pages", &alias, on);
                format!("{}.{}", alias, sub.unwrap_or("name"))
            }
            native if ctx.fields.is_native_name(native) => format!("pages.{}", native_column(native)),
            _ => {
                let Some(field) = ctx.fields.get(name) else {
                    warn!(field = %name, "ignoring sort on unknown field");
                    return None;
                };

                let alias = format!("_sort_{}{}", field.name, suffix);
                self.joins.add(JoinKind::Left, &field.table, &alias, pages_link(&alias));

                if field.fieldtype == "page" {
                    // Referenced page ids sort meaninglessly; sort by the page instead
                    let page_alias = format!("_sort_page_{}{}", field.name, suffix);
                    let on = Condition::compare(format!("{}.id", page_alias), "=", format!("{}.data", alias));
                    self.joins.add(JoinKind::Left, "pages", &page_alias, on);
                    format!("{}.{}", page_alias, sub.unwrap_or("name"))
                } else {
                    format!("{}.{}", alias, sub.unwrap_or("data"))
                }
            }
        };

        Some(if descending { format!("{} DESC", expr) } else { expr })
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
