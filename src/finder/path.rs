//! Tree position: `path=`/`url=` and `has_parent=`

use super::compiler::QueryCompiler;
use super::joins::JoinKind;
use crate::error::Result;
use crate::query::{escape_string, is_digits, Condition};
use crate::selector::Selector;

/// Id of the root page
pub const ROOT_ID: i64 = 1;

impl QueryCompiler<'_> {
    /// Match a page by its full path. The last segment is the page name;
    /// every segment above it joins another copy of `pages`, deepest first.
    pub(super) fn add_path(&mut self, selector: &Selector) {
        let value = selector.value();
        let mut parts: Vec<&str>;

        if value == "/" {
            parts = Vec::new();
            self.query.where_(format!("pages.id={}", ROOT_ID));
        } else {
            parts = value.trim_end_matches('/').split('/').collect();
            let name = parts.pop().unwrap_or("");
            self.query.where_(format!("pages.name='{}'", escape_string(name)));
            if parts.is_empty() {
                self.query.where_(format!("pages.parent_id={}", ROOT_ID));
            }
        }

        let mut last_alias = "pages".to_string();

        while let Some(part) = parts.pop() {
            let n = parts.len() + 1;

            if part.is_empty() {
                // Empty segment: anchored at the root
                let on = Condition::and(vec![
                    Condition::compare(format!("{}.parent_id", last_alias), "=", "rootparent.id"),
                    Condition::compare("rootparent.id", "=", ROOT_ID.to_string()),
                ]);
                self.joins.add(JoinKind::Inner, "pages", "rootparent", on);
                continue;
            }

            let alias = format!("parent{}", n);
            let on = Condition::and(vec![
                Condition::compare(format!("{}.parent_id", last_alias), "=", format!("{}.id", alias)),
                Condition::compare(format!("{}.name", alias), "=", format!("'{}'", escape_string(part))),
            ]);
            self.joins.add(JoinKind::Inner, "pages", &alias, on);
            last_alias = alias;
        }
    }

    /// Limit to pages at any depth below the given page(s)
    pub(super) fn add_has_parent(&mut self, selector: &Selector) -> Result<()> {
        let mut ids = Vec::with_capacity(selector.values.len());
        for value in &selector.values {
            let id = if is_digits(value) {
                value.parse::<i64>().unwrap_or(0)
            } else {
                self.ctx.pages.page_id(value)?.unwrap_or(0)
            };
            ids.push(id);
        }

        let alias = self.next_alias("pages_parents");
        let targets = Condition::or(
            ids.iter()
                .map(|id| {
                    Condition::or(vec![
                        Condition::compare(format!("{}.parents_id", alias), "=", id.to_string()),
                        Condition::compare(format!("{}.pages_id", alias), "=", id.to_string()),
                    ])
                })
                .collect(),
        );
        let on = Condition::and(vec![
            Condition::compare(format!("{}.pages_id", alias), "=", "pages.parent_id"),
            targets,
        ]);
        self.joins.add(JoinKind::Inner, "pages_parents", &alias, on);

        Ok(())
    }
}
