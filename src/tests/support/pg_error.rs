use sea_orm::{DbErr, RuntimeErr};
use sqlx::error::{DatabaseError, ErrorKind};
use std::borrow::Cow;
use std::error::Error as StdError;

/// Stand-in for the Postgres driver error, carrying only a SQLSTATE.
#[derive(Debug, thiserror::Error)]
#[error("pg error {code}")]
pub struct FakePgError {
    code: String,
}

impl DatabaseError for FakePgError {
    fn message(&self) -> &str {
        "fake postgres error"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            "23505" => ErrorKind::UniqueViolation,
            "23503" => ErrorKind::ForeignKeyViolation,
            _ => ErrorKind::Other,
        }
    }
}

fn sqlx_error(code: &str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(FakePgError {
        code: code.to_string(),
    }))
}

pub fn pg_query_error(code: &str) -> DbErr {
    DbErr::Query(RuntimeErr::SqlxError(sqlx_error(code)))
}

pub fn pg_exec_error(code: &str) -> DbErr {
    DbErr::Exec(RuntimeErr::SqlxError(sqlx_error(code)))
}
