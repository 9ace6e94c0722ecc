pub mod fixtures;
pub mod pg_error;
pub mod rows;
