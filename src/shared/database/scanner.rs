// src/shared/database/scanner.rs

use sea_orm::{DbErr, QueryResult, TryGetable};
use tracing::error;

/// Column name Postgres gives the unaliased `COUNT(..)` subquery appended to
/// list queries.
pub const COUNT_COLUMN: &str = "count";

/// Typed, name-addressed reads from a single result row.
pub trait Scanner {
    fn scan<T: TryGetable>(&self, column: &str) -> Result<T, DbErr>;

    /// Reads a `BIGINT` column into an unsigned value. Negative values are
    /// rejected as a type error.
    fn scan_u64(&self, column: &str) -> Result<u64, DbErr> {
        let raw: i64 = self.scan(column)?;
        to_unsigned(column, raw)
    }

    fn scan_optional_u64(&self, column: &str) -> Result<Option<u64>, DbErr> {
        let raw: Option<i64> = self.scan(column)?;
        raw.map(|v| to_unsigned(column, v)).transpose()
    }
}

fn to_unsigned(column: &str, raw: i64) -> Result<u64, DbErr> {
    u64::try_from(raw)
        .map_err(|_| DbErr::Type(format!("column `{column}` holds negative value {raw}")))
}

impl Scanner for QueryResult {
    fn scan<T: TryGetable>(&self, column: &str) -> Result<T, DbErr> {
        self.try_get("", column)
    }
}

/// Cursor over a multi-row result.
pub trait ResultIterator {
    type Row: Scanner;

    fn next_row(&mut self) -> Option<Self::Row>;

    /// Error raised by the driver while iterating, if any.
    fn err(&mut self) -> Option<DbErr>;

    fn close(&mut self) -> Result<(), DbErr>;
}

/// A fully materialized `query_all` result.
pub struct Rows {
    inner: std::vec::IntoIter<QueryResult>,
}

impl From<Vec<QueryResult>> for Rows {
    fn from(rows: Vec<QueryResult>) -> Self {
        Self {
            inner: rows.into_iter(),
        }
    }
}

impl ResultIterator for Rows {
    type Row = QueryResult;

    fn next_row(&mut self) -> Option<QueryResult> {
        self.inner.next()
    }

    fn err(&mut self) -> Option<DbErr> {
        None
    }

    fn close(&mut self) -> Result<(), DbErr> {
        Ok(())
    }
}

/// Reads every row with `scan_row`, then checks the iterator error.
///
/// `scan_row` returns the row value plus the count column when
/// `include_count` is set; the total is taken from the first row. The
/// iterator is closed on every path and a close failure is only logged.
pub fn scan_rows<I, T, F>(mut rows: I, include_count: bool, scan_row: F) -> Result<(Vec<T>, u64), DbErr>
where
    I: ResultIterator,
    F: Fn(&I::Row, bool) -> Result<(T, u64), DbErr>,
{
    let result = collect_rows(&mut rows, include_count, scan_row);

    if let Err(e) = rows.close() {
        error!(error = %e, "closing database rows");
    }

    result
}

fn collect_rows<I, T, F>(rows: &mut I, include_count: bool, scan_row: F) -> Result<(Vec<T>, u64), DbErr>
where
    I: ResultIterator,
    F: Fn(&I::Row, bool) -> Result<(T, u64), DbErr>,
{
    let mut values = Vec::new();
    let mut total = None;

    while let Some(row) = rows.next_row() {
        let (value, count) = scan_row(&row, include_count)?;
        total.get_or_insert(count);
        values.push(value);
    }

    if let Some(e) = rows.err() {
        return Err(e);
    }

    Ok((values, total.unwrap_or(0)))
}
