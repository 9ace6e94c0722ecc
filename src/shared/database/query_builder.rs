// src/shared/database/query_builder.rs

use sea_orm::{DatabaseBackend, Statement, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::error;

/// Postgres expression for "now" as whole Unix seconds.
pub const CURRENT_UNIX_TIME: &str = "extract(epoch FROM NOW())";

//
// ──────────────────────────────────────────────────────────
// Output
// ──────────────────────────────────────────────────────────
//

/// Rendered SQL plus its positional arguments, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BuiltQuery {
    pub fn into_statement(self) -> Statement {
        Statement::from_sql_and_values(DatabaseBackend::Postgres, self.sql, self.args)
    }

    /// Number of distinct `$N` placeholders in the SQL text.
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.sql.as_bytes();
        let mut seen = std::collections::BTreeSet::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    seen.insert(&self.sql[start..end]);
                }
                i = end.max(start);
            } else {
                i += 1;
            }
        }

        seen.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryBuildError {
    #[error("select statement has no columns")]
    NoColumns,

    #[error("statement has no table")]
    NoTable,

    #[error("update statement has no SET clauses")]
    NoAssignments,

    #[error("insert statement has no values")]
    NoValues,

    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
}

/// A bound unsigned argument that a `BIGINT` column cannot hold, so no stored
/// row can ever match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("argument {0} is outside the BIGINT range")]
pub struct OutOfRange(pub u64);

/// Structural failures only come from broken templates, which this crate
/// never produces. They are logged and an empty statement is handed on; the
/// driver rejects it downstream. An out-of-range argument comes from the
/// caller and is returned so the operation can answer without a round trip.
pub fn build_or_log(
    result: Result<BuiltQuery, QueryBuildError>,
) -> Result<BuiltQuery, OutOfRange> {
    match result {
        Ok(query) => Ok(query),
        Err(QueryBuildError::OutOfRange(e)) => Err(e),
        Err(e) => {
            error!(error = %e, "building query");
            Ok(BuiltQuery::default())
        }
    }
}

//
// ──────────────────────────────────────────────────────────
// Rendering
// ──────────────────────────────────────────────────────────
//

#[derive(Default)]
struct SqlWriter {
    sql: String,
    args: Vec<Value>,
    out_of_range: Option<u64>,
}

impl SqlWriter {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// The Postgres binder cannot encode unsigned values above `i64::MAX`;
    /// the first such argument fails the build.
    fn push_arg(&mut self, value: Value) {
        if let Value::BigUnsigned(Some(v)) = &value {
            if i64::try_from(*v).is_err() {
                self.out_of_range.get_or_insert(*v);
            }
        }
        self.args.push(value);
        // Writing into a String cannot fail.
        let _ = write!(self.sql, "${}", self.args.len());
    }

    fn push_value(&mut self, value: &ValueExpr) {
        match value {
            ValueExpr::Arg(v) => self.push_arg(v.clone()),
            ValueExpr::Raw(expr) => self.push(expr),
        }
    }

    fn push_predicates(&mut self, predicates: &[Predicate]) {
        let mut first = true;

        for predicate in predicates {
            if predicate.is_empty() {
                continue;
            }
            self.push(if first { " WHERE " } else { " AND " });
            first = false;
            predicate.render(self);
        }
    }

    fn finish(self) -> Result<BuiltQuery, QueryBuildError> {
        if let Some(v) = self.out_of_range {
            return Err(OutOfRange(v).into());
        }

        Ok(BuiltQuery {
            sql: self.sql,
            args: self.args,
        })
    }
}

/// Right-hand side of an assignment: a bound argument or a raw SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Arg(Value),
    Raw(String),
}

//
// ──────────────────────────────────────────────────────────
// Predicates
// ──────────────────────────────────────────────────────────
//

/// A set of equality terms. Terms render sorted by column name so the
/// output does not depend on insertion order. A `None` value renders as
/// `IS NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equals(BTreeMap<String, Option<Value>>);

impl Equals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), Some(value.into()));
        self
    }

    pub fn and_null(mut self, column: impl Into<String>) -> Self {
        self.0.insert(column.into(), None);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Equals),
    Gt(String, Value),
    Lt(String, Value),
}

impl Predicate {
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt(column.into(), value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt(column.into(), value.into())
    }

    fn is_empty(&self) -> bool {
        matches!(self, Predicate::Equals(eq) if eq.0.is_empty())
    }

    fn render(&self, w: &mut SqlWriter) {
        match self {
            Predicate::Equals(eq) => {
                for (i, (column, value)) in eq.0.iter().enumerate() {
                    if i > 0 {
                        w.push(" AND ");
                    }
                    w.push(column);
                    match value {
                        Some(v) => {
                            w.push(" = ");
                            w.push_arg(v.clone());
                        }
                        None => w.push(" IS NULL"),
                    }
                }
            }
            Predicate::Gt(column, value) => {
                w.push(column);
                w.push(" > ");
                w.push_arg(value.clone());
            }
            Predicate::Lt(column, value) => {
                w.push(column);
                w.push(" < ");
                w.push_arg(value.clone());
            }
        }
    }
}

impl From<Equals> for Predicate {
    fn from(eq: Equals) -> Self {
        Predicate::Equals(eq)
    }
}

//
// ──────────────────────────────────────────────────────────
// SELECT
// ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Table(String),
    Subquery(Box<SelectBuilder>, String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectBuilder {
    prefix: Option<String>,
    columns: Vec<String>,
    from: Option<Source>,
    joins: Vec<String>,
    predicates: Vec<Predicate>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    suffix: Option<String>,
}

pub fn select<I, S>(columns: I) -> SelectBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    SelectBuilder {
        columns: columns.into_iter().map(Into::into).collect(),
        ..Default::default()
    }
}

impl SelectBuilder {
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Text placed before `SELECT`, separated by a single space.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Text placed after the rest of the statement, separated by a single space.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(Source::Table(table.into()));
        self
    }

    pub fn from_subquery(mut self, subquery: SelectBuilder, alias: impl Into<String>) -> Self {
        self.from = Some(Source::Subquery(Box::new(subquery), alias.into()));
        self
    }

    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    pub fn and_where(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// A zero offset is not rendered.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_sql(&self) -> Result<BuiltQuery, QueryBuildError> {
        let mut w = SqlWriter::default();
        self.render(&mut w)?;
        w.finish()
    }

    fn render(&self, w: &mut SqlWriter) -> Result<(), QueryBuildError> {
        if self.columns.is_empty() {
            return Err(QueryBuildError::NoColumns);
        }

        if let Some(prefix) = &self.prefix {
            w.push(prefix);
            w.push(" ");
        }

        w.push("SELECT ");
        w.push(&self.columns.join(", "));

        match &self.from {
            Some(Source::Table(table)) => {
                w.push(" FROM ");
                w.push(table);
            }
            Some(Source::Subquery(subquery, alias)) => {
                w.push(" FROM (");
                subquery.render(w)?;
                w.push(") AS ");
                w.push(alias);
            }
            None => return Err(QueryBuildError::NoTable),
        }

        for join in &self.joins {
            w.push(" JOIN ");
            w.push(join);
        }

        w.push_predicates(&self.predicates);

        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            w.push(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            w.push(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            w.push(&format!(" OFFSET {offset}"));
        }

        if let Some(suffix) = &self.suffix {
            w.push(" ");
            w.push(suffix);
        }

        Ok(())
    }
}

//
// ──────────────────────────────────────────────────────────
// INSERT
// ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertBuilder {
    table: String,
    values: Vec<(String, ValueExpr)>,
    suffix: Option<String>,
}

pub fn insert_into(table: impl Into<String>) -> InsertBuilder {
    InsertBuilder {
        table: table.into(),
        ..Default::default()
    }
}

impl InsertBuilder {
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .push((column.into(), ValueExpr::Arg(value.into())));
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn to_sql(&self) -> Result<BuiltQuery, QueryBuildError> {
        if self.table.is_empty() {
            return Err(QueryBuildError::NoTable);
        }
        if self.values.is_empty() {
            return Err(QueryBuildError::NoValues);
        }

        let mut w = SqlWriter::default();
        w.push("INSERT INTO ");
        w.push(&self.table);
        w.push(" (");
        let columns: Vec<&str> = self.values.iter().map(|(c, _)| c.as_str()).collect();
        w.push(&columns.join(","));
        w.push(") VALUES (");
        for (i, (_, value)) in self.values.iter().enumerate() {
            if i > 0 {
                w.push(",");
            }
            w.push_value(value);
        }
        w.push(")");

        if let Some(suffix) = &self.suffix {
            w.push(" ");
            w.push(suffix);
        }

        w.finish()
    }
}

//
// ──────────────────────────────────────────────────────────
// UPDATE
// ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    table: String,
    assignments: Vec<(String, ValueExpr)>,
    predicates: Vec<Predicate>,
    suffix: Option<String>,
}

pub fn update(table: impl Into<String>) -> UpdateBuilder {
    UpdateBuilder {
        table: table.into(),
        ..Default::default()
    }
}

impl UpdateBuilder {
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments
            .push((column.into(), ValueExpr::Arg(value.into())));
        self
    }

    pub fn set_raw(mut self, column: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assignments
            .push((column.into(), ValueExpr::Raw(expr.into())));
        self
    }

    pub fn and_where(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn to_sql(&self) -> Result<BuiltQuery, QueryBuildError> {
        if self.table.is_empty() {
            return Err(QueryBuildError::NoTable);
        }
        if self.assignments.is_empty() {
            return Err(QueryBuildError::NoAssignments);
        }

        let mut w = SqlWriter::default();
        w.push("UPDATE ");
        w.push(&self.table);
        w.push(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(column);
            w.push(" = ");
            w.push_value(value);
        }

        w.push_predicates(&self.predicates);

        if let Some(suffix) = &self.suffix {
            w.push(" ");
            w.push(suffix);
        }

        w.finish()
    }
}
