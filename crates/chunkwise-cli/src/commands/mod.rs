//! Command implementations.

pub mod extract;
pub mod profile;
pub mod schema;

pub use self::extract::{execute_extract, ExtractPlan};
pub use self::profile::execute_profile;
pub use self::schema::execute_schema;
