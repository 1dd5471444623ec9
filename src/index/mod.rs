//! Index module - SQLite storage for the page tree

mod database;
pub mod seed;

pub use database::{Database, IndexStats, NewPage};
pub use seed::load_seed;
