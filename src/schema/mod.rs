//! Schema module - attached field definitions from schema.yaml

mod types;
pub mod loader;
mod validator;

pub use types::*;
pub use loader::{load_schema, create_default_schema};
pub use validator::validate_schema;
