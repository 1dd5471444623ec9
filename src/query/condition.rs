//! Boolean condition tree for WHERE and ON clauses
//!
//! Conditions are built as a tree and only turned into text at the end, so
//! nesting AND/OR/NOT always gets the parentheses it needs.

/// A boolean SQL condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `left<op>right`, both sides already escaped
    Compare {
        left: String,
        op: String,
        right: String,
    },
    /// `column IS NULL` / `column IS NOT NULL`
    IsNull { column: String, negated: bool },
    /// All must hold
    And(Vec<Condition>),
    /// At least one must hold
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Pre-rendered fragment, treated as opaque
    Raw(String),
    /// Never true (`1>2`)
    Never,
}

impl Condition {
    pub fn compare(left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        Condition::Compare {
            left: left.into(),
            op: op.into(),
            right: right.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
            negated: false,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
            negated: true,
        }
    }

    pub fn raw(fragment: impl Into<String>) -> Self {
        Condition::Raw(fragment.into())
    }

    /// Combine with AND, flattening nested ANDs
    pub fn and(conditions: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(conditions.len());
        for c in conditions {
            match c {
                Condition::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Condition::And(flat)
        }
    }

    /// Combine with OR, flattening nested ORs
    pub fn or(conditions: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(conditions.len());
        for c in conditions {
            match c {
                Condition::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Condition::Or(flat)
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Negate when `negate` is set
    pub fn negate_if(self, negate: bool) -> Self {
        if negate {
            Condition::not(self)
        } else {
            self
        }
    }

    /// True for an empty AND/OR, which renders to nothing useful
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        matches!(self, Condition::And(c) | Condition::Or(c) if c.is_empty())
    }

    pub fn render(&self) -> String {
        match self {
            Condition::Compare { left, op, right } => format!("{}{}{}", left, op, right),
            Condition::IsNull { column, negated } => {
                format!("{} IS {}NULL", column, if *negated { "NOT " } else { "" })
            }
            Condition::And(items) => render_list(items, " AND ", "1=1"),
            Condition::Or(items) => render_list(items, " OR ", "1>2"),
            Condition::Not(inner) => format!("NOT ({})", inner.render()),
            Condition::Raw(sql) => sql.clone(),
            Condition::Never => "1>2".to_string(),
        }
    }

    /// Render as a member of an AND/OR list
    fn render_operand(&self) -> String {
        match self {
            Condition::Compare { .. } | Condition::IsNull { .. } | Condition::Not(_) | Condition::Never => {
                self.render()
            }
            _ => format!("({})", self.render()),
        }
    }
}

fn render_list(items: &[Condition], sep: &str, empty: &str) -> String {
    match items {
        [] => empty.to_string(),
        [only] => only.render(),
        _ => items
            .iter()
            .map(Condition::render_operand)
            .collect::<Vec<_>>()
            .join(sep),
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
