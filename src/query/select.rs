//! SELECT statement accumulator

/// Pseudo-column that asks the engine to remember the unlimited row count
pub const SQL_CALC_FOUND_ROWS: &str = "SQL_CALC_FOUND_ROWS";

/// A SELECT query assembled from independently added clause fragments.
///
/// Methods that add to the query know nothing about each other, so a query
/// can be passed between handlers that each contribute what they need.
/// Fragments are raw SQL and must already be escaped by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    select: Vec<String>,
    from: Vec<String>,
    join: Vec<String>,
    leftjoin: Vec<String>,
    where_: Vec<String>,
    groupby: Vec<String>,
    orderby: Vec<String>,
    limit: Option<String>,
    comment: String,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column expression
    pub fn select(&mut self, column: impl Into<String>) -> &mut Self {
        self.select.push(column.into());
        self
    }

    /// Add several column expressions
    pub fn select_all<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a base table (each table appears once)
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        let table = table.into();
        if !self.from.contains(&table) {
            self.from.push(table);
        }
        self
    }

    /// Add an inner join fragment, e.g. `table AS alias ON condition`
    pub fn join(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.join.push(fragment.into());
        self
    }

    /// Add a left join fragment
    pub fn leftjoin(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.leftjoin.push(fragment.into());
        self
    }

    /// Add a WHERE fragment. Fragments are AND-joined as given.
    pub fn where_(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.where_.push(fragment.into());
        self
    }

    pub fn groupby(&mut self, expr: impl Into<String>) -> &mut Self {
        self.groupby.push(expr.into());
        self
    }

    /// Append an ORDER BY expression
    pub fn orderby(&mut self, expr: impl Into<String>) -> &mut Self {
        self.orderby.push(expr.into());
        self
    }

    /// Append several ORDER BY expressions
    pub fn orderby_all<I, S>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orderby.extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Put an ORDER BY expression ahead of all existing ones
    pub fn prepend_orderby(&mut self, expr: impl Into<String>) -> &mut Self {
        self.orderby.insert(0, expr.into());
        self
    }

    /// Set the LIMIT fragment (`"count"` or `"offset,count"`)
    pub fn limit(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.limit = Some(fragment.into());
        self
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = comment.into();
        self
    }

    pub fn selects(&self) -> &[String] {
        &self.select
    }

    #[cfg(test)]
    pub fn joins(&self) -> &[String] {
        &self.join
    }

    #[cfg(test)]
    pub fn leftjoins(&self) -> &[String] {
        &self.leftjoin
    }

    pub fn wheres(&self) -> &[String] {
        &self.where_
    }

    pub fn orderbys(&self) -> &[String] {
        &self.orderby
    }

    #[cfg(test)]
    pub fn limit_fragment(&self) -> Option<&str> {
        self.limit.as_deref()
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    /// Whether the deferred total was requested through `SQL_CALC_FOUND_ROWS`
    pub fn calc_found_rows(&self) -> bool {
        self.select.iter().any(|s| s == SQL_CALC_FOUND_ROWS)
    }

    /// Copy of this query without the `SQL_CALC_FOUND_ROWS` request
    pub fn without_found_rows(&self) -> Self {
        let mut query = self.clone();
        query.select.retain(|s| s != SQL_CALC_FOUND_ROWS);
        query
    }

    /// Copy of this query without LIMIT and ORDER BY, for counting matches
    pub fn without_limit(&self) -> Self {
        let mut query = self.clone();
        query.limit = None;
        query.orderby.clear();
        query
    }

    /// Render the SQL statement
    pub fn render(&self) -> String {
        let mut lines = vec![self.render_select(), self.render_from()];

        lines.extend(self.join.iter().map(|j| format!("JOIN {}", j)));
        lines.extend(self.leftjoin.iter().map(|j| format!("LEFT JOIN {}", j)));

        if !self.where_.is_empty() {
            lines.push(format!("WHERE {}", self.where_.join(" AND ")));
        }
        if !self.groupby.is_empty() {
            lines.push(format!("GROUP BY {}", self.groupby.join(",")));
        }
        if !self.orderby.is_empty() {
            lines.push(format!("ORDER BY {}", self.orderby.join(",")));
        }
        if let Some(limit) = &self.limit {
            lines.push(format!("LIMIT {}", limit));
        }
        if !self.comment.is_empty() {
            lines.push(format!("/* {} */", self.comment.replace("*/", "")));
        }

        lines.join("\n")
    }

    fn render_select(&self) -> String {
        let mut sql = String::from("SELECT ");

        // SQL_CALC_FOUND_ROWS must come before any column
        if self.calc_found_rows() {
            sql.push_str(SQL_CALC_FOUND_ROWS);
            sql.push(' ');
        }

        let columns: Vec<&str> = self
            .select
            .iter()
            .filter(|s| s.as_str() != SQL_CALC_FOUND_ROWS)
            .map(|s| s.trim().trim_matches(','))
            .filter(|s| !s.is_empty())
            .collect();

        sql.push_str(&columns.join(","));
        sql.trim_end().to_string()
    }

    fn render_from(&self) -> String {
        let tables: Vec<String> = self.from.iter().map(|t| format!("`{}`", t)).collect();
        format!("FROM {}", tables.join(","))
    }
}

impl std::fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
