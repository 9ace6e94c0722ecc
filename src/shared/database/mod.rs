pub mod config;
pub mod deadline;
pub mod errors;
pub mod query_builder;
pub mod query_filter;
pub mod scanner;

pub use config::{ConfigError, DatabaseConfig};
pub use errors::DatabaseError;
pub use query_filter::{Pagination, QueryFilter};
