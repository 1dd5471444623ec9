//! Page status bits and automatic status filtering

use crate::query::is_digits;
use crate::selector::{Operator, Selector, Selectors};

pub const STATUS_ON: i64 = 1;
pub const STATUS_LOCKED: i64 = 4;
pub const STATUS_SYSTEM_ID: i64 = 8;
pub const STATUS_SYSTEM: i64 = 16;
pub const STATUS_HIDDEN: i64 = 1024;
pub const STATUS_UNPUBLISHED: i64 = 2048;
pub const STATUS_TRASH: i64 = 8192;

/// Map a status label to its bit. Unknown labels mean "on".
pub fn status_from_label(label: &str) -> i64 {
    match label {
        "hidden" => STATUS_HIDDEN,
        "unpublished" => STATUS_UNPUBLISHED,
        "locked" => STATUS_LOCKED,
        "system" => STATUS_SYSTEM,
        "trash" => STATUS_TRASH,
        _ => STATUS_ON,
    }
}

/// Add the status filter a find should apply.
///
/// Status labels are replaced by their bits, and `status=label` becomes a
/// bitwise test. Unless the selectors already ask for unpublished pages,
/// unpublished pages are excluded; without any status term hidden pages are
/// excluded as well (single-page lookups still see hidden pages).
pub fn setup_status_checks(selectors: &mut Selectors, find_one: bool) {
    let mut max_status: Option<i64> = None;

    for selector in selectors.iter_mut() {
        if selector.fields.len() != 1 || selector.field() != "status" {
            continue;
        }

        let mut labelled = false;
        for value in selector.values.iter_mut() {
            if !is_digits(value) {
                *value = status_from_label(value).to_string();
                labelled = true;
            }
            let status = value.parse::<i64>().unwrap_or(STATUS_ON);
            max_status = Some(max_status.map_or(status, |max| max.max(status)));
        }

        if labelled && selector.operator == Operator::Equal {
            selector.operator = Operator::BitwiseAnd;
        }
    }

    match max_status {
        Some(max) if max < STATUS_UNPUBLISHED => {
            selectors.add(Selector::new("status", Operator::LessThan, STATUS_UNPUBLISHED.to_string()));
        }
        Some(_) => {}
        None if find_one => {
            selectors.add(Selector::new("status", Operator::LessThan, STATUS_UNPUBLISHED.to_string()));
        }
        None => {
            selectors.add(Selector::new("status", Operator::LessThan, STATUS_HIDDEN.to_string()));
        }
    }
}

/// Force a single-result window
pub fn force_single(selectors: &mut Selectors) {
    selectors.add(Selector::new("start", Operator::Equal, "0"));
    selectors.add(Selector::new("limit", Operator::Equal, "1"));
}
