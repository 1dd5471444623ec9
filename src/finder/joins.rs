//! Joins collected during compilation, keyed by table alias

use crate::query::{Condition, SelectQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinRecord {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on: Condition,
}

impl JoinRecord {
    pub fn render(&self) -> String {
        format!("{} AS {} ON {}", self.table, self.alias, self.on.render())
    }
}

/// Insertion-ordered joins with one entry per alias
#[derive(Debug, Default)]
pub struct JoinSet {
    records: Vec<JoinRecord>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a join. If the alias is already joined, `on` is AND-ed into the
    /// existing ON clause and the existing join kind is kept.
    pub fn add(&mut self, kind: JoinKind, table: &str, alias: &str, on: Condition) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.alias == alias) {
            if existing.on != on {
                let current = std::mem::replace(&mut existing.on, Condition::And(Vec::new()));
                existing.on = Condition::and(vec![current, on]);
            }
            return;
        }

        self.records.push(JoinRecord {
            kind,
            table: table.to_string(),
            alias: alias.to_string(),
            on,
        });
    }

    #[cfg(test)]
    pub fn get(&self, alias: &str) -> Option<&JoinRecord> {
        self.records.iter().find(|r| r.alias == alias)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Emit every join into the query
    pub fn flush_into(self, query: &mut SelectQuery) {
        for record in self.records {
            match record.kind {
                JoinKind::Inner => query.join(record.render()),
                JoinKind::Left => query.leftjoin(record.render()),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(alias: &str) -> Condition {
        Condition::compare(format!("{}.pages_id", alias), "=", "pages.id")
    }

    #[test]
    fn test_conditions_merge_per_alias() {
        let mut joins = JoinSet::new();
        joins.add(JoinKind::Inner, "field_title", "field_title", link("field_title"));
        joins.add(
            JoinKind::Left,
            "field_title",
            "field_title",
            Condition::compare("field_title.data", "=", "'a'"),
        );

        assert_eq!(joins.len(), 1);
        let record = joins.get("field_title").unwrap();
        assert_eq!(record.kind, JoinKind::Inner);
        assert_eq!(
            record.render(),
            "field_title AS field_title ON field_title.pages_id=pages.id AND field_title.data='a'"
        );
    }

    #[test]
    fn test_identical_join_not_duplicated() {
        let mut joins = JoinSet::new();
        joins.add(JoinKind::Left, "field_title", "_sort_title", link("_sort_title"));
        joins.add(JoinKind::Left, "field_title", "_sort_title", link("_sort_title"));
        assert_eq!(joins.get("_sort_title").unwrap().on, link("_sort_title"));
    }

    #[test]
    fn test_flush_order() {
        let mut joins = JoinSet::new();
        joins.add(JoinKind::Left, "field_body", "field_body", link("field_body"));
        joins.add(JoinKind::Inner, "field_title", "field_title", link("field_title"));

        let mut query = SelectQuery::new();
        query.from("pages");
        joins.flush_into(&mut query);
        assert_eq!(query.joins().len(), 1);
        assert_eq!(query.leftjoins().len(), 1);
    }
}
