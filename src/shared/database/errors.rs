// src/shared/database/errors.rs

use sea_orm::{DbErr, RuntimeErr};
use std::time::Duration;
use thiserror::Error;

use super::query_builder::OutOfRange;

/// SQLSTATE Postgres reports for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("record not found")]
    NotFound,

    #[error("user already exists")]
    UserExists,

    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: DbErr,
    },
}

impl DatabaseError {
    /// Wraps a driver error with context. The driver's own no-rows error
    /// stays `NotFound`.
    pub fn from_db_err(e: DbErr, context: &'static str) -> Self {
        match e {
            DbErr::RecordNotFound(_) => DatabaseError::NotFound,
            source => DatabaseError::Query { context, source },
        }
    }

    pub fn deadline_exceeded(context: &'static str, deadline: Duration) -> Self {
        DatabaseError::Query {
            context,
            source: DbErr::Custom(format!(
                "statement deadline of {}ms exceeded",
                deadline.as_millis()
            )),
        }
    }

    /// For operations where an unmatchable argument is a failure rather
    /// than an empty answer.
    pub fn out_of_range(e: OutOfRange, context: &'static str) -> Self {
        DatabaseError::Query {
            context,
            source: DbErr::Custom(e.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound)
    }
}

/// SQLSTATE carried by a driver-level database error, if any.
pub fn sqlstate(e: &DbErr) -> Option<String> {
    match e {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => {
            db.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

pub fn is_unique_violation(e: &DbErr) -> bool {
    sqlstate(e).as_deref() == Some(UNIQUE_VIOLATION)
}
