//! Selector to SQL compilation
//!
//! A `QueryCompiler` lives for one compilation. Each selector term is handed
//! to exactly one handler; joins and the attached-field WHERE groups are
//! collected while the terms are walked and emitted once at the end, so
//! conditions that land on the same alias can be merged.

use std::collections::HashMap;

use tracing::debug;

use super::context::FinderContext;
use super::joins::{JoinKind, JoinSet};
use crate::error::{FinderError, Result};
use crate::query::{Condition, SelectQuery};
use crate::selector::{Operator, Selector, Selectors};

/// A compiled query plus the pagination it applies
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub query: SelectQuery,
    pub start: i64,
    pub limit: i64,
}

/// One attached-field condition waiting for its join
#[derive(Debug)]
struct GroupMember {
    table: String,
    alias: String,
    condition: Condition,
    /// Tests for a missing row, so the condition cannot live in the ON clause
    blank: bool,
}

/// Attached-field conditions that OR together
#[derive(Debug, Default)]
struct WhereGroup {
    members: Vec<GroupMember>,
}

pub(crate) struct QueryCompiler<'a> {
    pub(super) ctx: &'a FinderContext<'a>,
    pub(super) query: SelectQuery,
    pub(super) joins: JoinSet,
    field_cnt: HashMap<String, usize>,
    groups: Vec<WhereGroup>,
    last_text: Option<String>,
    pub(super) paginated: bool,
    pub(super) start: i64,
    pub(super) limit: i64,
}

/// Compile selectors into a single SELECT over `pages`
pub fn compile(ctx: &FinderContext<'_>, selectors: &Selectors) -> Result<CompiledQuery> {
    let mut compiler = QueryCompiler::new(ctx);
    let mut sorts: Vec<&Selector> = Vec::new();

    for selector in selectors {
        match selector.field() {
            "sort" => sorts.push(selector),
            "limit" | "start" => compiler.add_pagination(selectors),
            "path" | "url" => compiler.add_path(selector),
            "has_parent" => compiler.add_has_parent(selector)?,
            name if ctx.fields.is_native_name(name) => compiler.add_native_field(selector)?,
            _ => compiler.add_attached_field(selector)?,
        }
    }

    compiler.add_sorts(&sorts);
    Ok(compiler.finish())
}

impl<'a> QueryCompiler<'a> {
    fn new(ctx: &'a FinderContext<'a>) -> Self {
        let mut query = SelectQuery::new();
        query.select_all(["pages.id", "pages.templates_id"]);
        query.from("pages");
        query.groupby("pages.id");

        QueryCompiler {
            ctx,
            query,
            joins: JoinSet::new(),
            field_cnt: HashMap::new(),
            groups: Vec::new(),
            last_text: None,
            paginated: false,
            start: 0,
            limit: 0,
        }
    }

    /// Alias for the next use of `table`: `table`, then `table1`, `table2`...
    pub(super) fn next_alias(&mut self, table: &str) -> String {
        let count = self
            .field_cnt
            .entry(table.to_string())
            .and_modify(|n| *n += 1)
            .or_insert(0);

        if *count == 0 {
            table.to_string()
        } else {
            format!("{}{}", table, count)
        }
    }

    /// Match one or more attached fields against one or more values
    fn add_attached_field(&mut self, selector: &Selector) -> Result<()> {
        let ctx = self.ctx;

        for name in &selector.fields {
            // `field.column` picks a column other than `data`
            let (field_name, column) = name.split_once('.').unwrap_or((name.as_str(), "data"));

            let field = ctx
                .fields
                .get(field_name)
                .ok_or_else(|| FinderError::UnknownField(name.clone()))?;
            let fieldtype = ctx.fieldtypes.get(&field.fieldtype).ok_or_else(|| {
                FinderError::UnknownFieldtype {
                    fieldtype: field.fieldtype.clone(),
                    field: field.name.clone(),
                }
            })?;

            let table = field.table.clone();
            let alias = self.next_alias(&table);
            let mut branches = Vec::new();
            let mut blank = false;

            for value in &selector.values {
                if column == "data" && selector.operator.is_equality() && value.is_empty() {
                    // No row for this page at all
                    let pages_id = format!("{}.pages_id", alias);
                    branches.push(if selector.operator == Operator::Equal {
                        Condition::is_null(pages_id)
                    } else {
                        Condition::is_not_null(pages_id)
                    });
                    blank = true;
                    continue;
                }

                let mut partial = SelectQuery::new();
                fieldtype.match_query(&mut partial, &alias, column, selector.operator, value)?;

                self.query.select_all(partial.selects().iter().cloned());
                self.query.orderby_all(partial.orderbys().iter().cloned());

                if !partial.wheres().is_empty() {
                    branches.push(Condition::and(partial.wheres().iter().map(Condition::raw).collect()));
                }
            }

            if branches.is_empty() {
                continue;
            }

            let condition = Condition::or(branches).negate_if(selector.not);
            self.add_group_member(
                selector,
                GroupMember {
                    table,
                    alias,
                    condition,
                    blank,
                },
            );
        }

        Ok(())
    }

    /// Members of consecutive terms with identical text share an OR group;
    /// a term with different text starts a new group, AND-ed to the others.
    fn add_group_member(&mut self, selector: &Selector, member: GroupMember) {
        let same_text = self.last_text.as_deref() == Some(selector.text.as_str());

        match self.groups.last_mut() {
            Some(group) if same_text => group.members.push(member),
            _ => self.groups.push(WhereGroup {
                members: vec![member],
            }),
        }

        self.last_text = Some(selector.text.clone());
    }

    fn finish(mut self) -> CompiledQuery {
        let mut where_groups = Vec::new();

        for group in std::mem::take(&mut self.groups) {
            match group.members.as_slice() {
                [member] if !member.blank => {
                    let on = Condition::and(vec![pages_link(&member.alias), member.condition.clone()]);
                    self.joins.add(JoinKind::Inner, &member.table, &member.alias, on);
                }
                members => {
                    for member in members {
                        let on = if member.blank {
                            pages_link(&member.alias)
                        } else {
                            Condition::and(vec![pages_link(&member.alias), member.condition.clone()])
                        };
                        self.joins.add(JoinKind::Left, &member.table, &member.alias, on);
                    }
                    where_groups.push(Condition::or(members.iter().map(|m| m.condition.clone()).collect()));
                }
            }
        }

        if !where_groups.is_empty() {
            self.query.where_(format!("({})", Condition::and(where_groups).render()));
        }

        debug!(joins = self.joins.len(), "flushing joins");
        self.joins.flush_into(&mut self.query);

        CompiledQuery {
            query: self.query,
            start: self.start,
            limit: self.limit,
        }
    }
}

/// `alias.pages_id=pages.id`
pub(super) fn pages_link(alias: &str) -> Condition {
    Condition::compare(format!("{}.pages_id", alias), "=", "pages.id")
}
