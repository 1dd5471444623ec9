//! Query module - SQL SELECT assembly

mod condition;
mod escape;
mod select;

pub use condition::Condition;
pub use escape::{escape_like, escape_string, is_digits, quote_value, LIKE_ESCAPE};
pub use select::{SelectQuery, SQL_CALC_FOUND_ROWS};
