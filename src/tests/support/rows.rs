use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult,
    QueryResult, Statement, Transaction, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::shared::database::query_builder::BuiltQuery;

pub type MockRow = BTreeMap<String, Value>;

/// Materializes mock rows into driver results so scanners can be exercised
/// without a repository in front of them.
pub async fn query_results(rows: Vec<MockRow>) -> Vec<QueryResult> {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([rows])
        .into_connection();

    db.query_all(Statement::from_string(DatabaseBackend::Postgres, "SELECT 1"))
        .await
        .unwrap()
}

pub fn exec_result(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

pub fn big_int(v: u64) -> Value {
    Value::BigInt(Some(v as i64))
}

pub fn opt_big_int(v: Option<u64>) -> Value {
    Value::BigInt(v.map(|v| v as i64))
}

pub fn string(v: &str) -> Value {
    Value::String(Some(Box::new(v.to_string())))
}

pub fn single(column: &str, value: Value) -> MockRow {
    BTreeMap::from([(column.to_string(), value)])
}

/// Statements the mock connection received. Every other handle to `db`
/// must be dropped first.
pub fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    Arc::try_unwrap(db)
        .expect("connection still shared")
        .into_transaction_log()
}

pub fn expected_log(queries: Vec<BuiltQuery>) -> Vec<Transaction> {
    queries
        .into_iter()
        .map(|q| Transaction::from_sql_and_values(DatabaseBackend::Postgres, q.sql, q.args))
        .collect()
}
