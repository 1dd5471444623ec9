//! `limit=` and `start=` terms

use tracing::warn;

use super::compiler::QueryCompiler;
use crate::fieldtype::to_integer;
use crate::query::SQL_CALC_FOUND_ROWS;
use crate::selector::Selectors;

impl QueryCompiler<'_> {
    /// Set the LIMIT from the last `start`/`limit` terms. Without an explicit
    /// start, the current page number decides the offset.
    pub(super) fn add_pagination(&mut self, selectors: &Selectors) {
        if self.paginated {
            return;
        }
        self.paginated = true;

        let mut start: Option<i64> = None;
        let mut limit: Option<i64> = None;

        for selector in selectors {
            match selector.field() {
                "start" => start = Some(to_integer(selector.value()).max(0)),
                "limit" => limit = Some(to_integer(selector.value())),
                _ => {}
            }
        }

        let limit = match limit {
            Some(limit) if limit > 0 => limit,
            _ => return,
        };
        self.limit = limit;

        if start.is_none() {
            if let Some(page_num) = self.ctx.page_num {
                start = (page_num.max(1) - 1).checked_mul(limit);
                if start.is_none() {
                    warn!(page_num, limit, "page offset out of range, ignoring page number");
                }
            }
        }

        let fragment = match start {
            Some(start) => {
                self.start = start;
                format!("{},{}", start, limit)
            }
            None => limit.to_string(),
        };

        if limit > 1 {
            self.query.select(SQL_CALC_FOUND_ROWS);
        }
        self.query.limit(fragment);
    }
}
