use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityName, IdenStatic, Iterable};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, warn};

use super::sea_orm_entity::reports::{Column, Entity};
use crate::modules::report::application::domain::entities::{
    Report, ReportCreationInput, ReportList,
};
use crate::modules::report::application::ports::outgoing::ReportDataManager;
use crate::shared::database::deadline::run_with_deadline;
use crate::shared::database::query_builder::{
    build_or_log, insert_into, select, update, BuiltQuery, Equals, Predicate, QueryBuildError,
    CURRENT_UNIX_TIME,
};
use crate::shared::database::query_filter::MAX_LIMIT;
use crate::shared::database::scanner::{scan_rows, Rows, Scanner, COUNT_COLUMN};
use crate::shared::database::{DatabaseError, QueryFilter};

/// Width of the id range fetched per `get_all_reports` batch.
pub const REPORT_BATCH_SIZE: u64 = 1000;

static ALL_REPORTS_COUNT_QUERY: OnceLock<String> = OnceLock::new();

// ============================================================================
// Repository Implementation
// ============================================================================

#[derive(Clone)]
pub struct ReportRepositoryPostgres {
    db: Arc<DatabaseConnection>,
    deadline: Option<Duration>,
}

impl ReportRepositoryPostgres {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db, deadline: None }
    }

    /// Bounds every operation by `deadline`. `None` removes the bound.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    // =====================================================
    // SQL builders
    // =====================================================

    fn table() -> String {
        Entity.table_name().to_string()
    }

    fn qualified(column: Column) -> String {
        format!("{}.{}", Self::table(), column.as_str())
    }

    fn columns() -> Vec<String> {
        Column::iter().map(Self::qualified).collect()
    }

    fn report_exists_query(report_id: u64) -> Result<BuiltQuery, QueryBuildError> {
        select([Self::qualified(Column::Id)])
            .prefix("SELECT EXISTS (")
            .from(Self::table())
            .and_where(Equals::new().and(Self::qualified(Column::Id), report_id))
            .suffix(")")
            .to_sql()
    }

    fn get_report_query(report_id: u64) -> Result<BuiltQuery, QueryBuildError> {
        select(Self::columns())
            .from(Self::table())
            .and_where(Equals::new().and(Self::qualified(Column::Id), report_id))
            .to_sql()
    }

    fn get_all_reports_count_query() -> Result<BuiltQuery, QueryBuildError> {
        select([format!("COUNT({})", Self::qualified(Column::Id))])
            .from(Self::table())
            .and_where(Equals::new().and_null(Self::qualified(Column::ArchivedOn)))
            .to_sql()
    }

    /// The count query takes no arguments, so it is rendered once and reused.
    fn all_reports_count_query() -> &'static str {
        ALL_REPORTS_COUNT_QUERY
            .get_or_init(|| {
                build_or_log(Self::get_all_reports_count_query())
                    .unwrap_or_default()
                    .sql
            })
            .as_str()
    }

    fn get_reports_query(filter: &QueryFilter) -> Result<BuiltQuery, QueryBuildError> {
        let table = Self::table();

        let builder = select(Self::columns())
            .column(format!("({})", Self::all_reports_count_query()))
            .from(&table)
            .and_where(Equals::new().and_null(Self::qualified(Column::ArchivedOn)))
            .order_by(Self::qualified(Column::Id));

        filter.apply_to_query_builder(builder, &table).to_sql()
    }

    /// Both bounds are exclusive.
    fn get_batch_of_reports_query(begin: u64, end: u64) -> Result<BuiltQuery, QueryBuildError> {
        select(Self::columns())
            .from(Self::table())
            .and_where(Predicate::gt(Self::qualified(Column::Id), begin))
            .and_where(Predicate::lt(Self::qualified(Column::Id), end))
            .to_sql()
    }

    /// Ids are rendered into an array literal rather than bound. They are
    /// integers, so nothing in them needs escaping.
    fn get_reports_with_ids_query(limit: u8, ids: &[u64]) -> Result<BuiltQuery, QueryBuildError> {
        let table = Self::table();
        let id_list = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let inner = select(Self::columns())
            .from(&table)
            .join(format!(
                "unnest('{{{id_list}}}'::bigint[]) WITH ORDINALITY t(id, ord) USING (id)"
            ))
            .order_by("t.ord")
            .limit(u64::from(limit.clamp(1, MAX_LIMIT)));

        select(Self::columns())
            .from_subquery(inner, &table)
            .and_where(Equals::new().and_null(Self::qualified(Column::ArchivedOn)))
            .to_sql()
    }

    fn create_report_query(input: &ReportCreationInput) -> Result<BuiltQuery, QueryBuildError> {
        insert_into(Self::table())
            .value(Column::ReportType.as_str(), input.report_type.as_str())
            .value(Column::Concern.as_str(), input.concern.as_str())
            .value(Column::BelongsToUser.as_str(), input.belongs_to_user)
            .suffix(format!(
                "RETURNING {}, {}",
                Column::Id.as_str(),
                Column::CreatedOn.as_str()
            ))
            .to_sql()
    }

    fn update_report_query(report: &Report) -> Result<BuiltQuery, QueryBuildError> {
        update(Self::table())
            .set(Column::ReportType.as_str(), report.report_type.as_str())
            .set(Column::Concern.as_str(), report.concern.as_str())
            .set_raw(Column::UpdatedOn.as_str(), CURRENT_UNIX_TIME)
            .and_where(
                Equals::new()
                    .and(Column::Id.as_str(), report.id)
                    .and(Column::BelongsToUser.as_str(), report.belongs_to_user),
            )
            .suffix(format!("RETURNING {}", Column::UpdatedOn.as_str()))
            .to_sql()
    }

    fn archive_report_query(report_id: u64, user_id: u64) -> Result<BuiltQuery, QueryBuildError> {
        update(Self::table())
            .set_raw(Column::UpdatedOn.as_str(), CURRENT_UNIX_TIME)
            .set_raw(Column::ArchivedOn.as_str(), CURRENT_UNIX_TIME)
            .and_where(
                Equals::new()
                    .and_null(Column::ArchivedOn.as_str())
                    .and(Column::BelongsToUser.as_str(), user_id)
                    .and(Column::Id.as_str(), report_id),
            )
            .suffix(format!("RETURNING {}", Column::ArchivedOn.as_str()))
            .to_sql()
    }

    // =====================================================
    // Row scanning
    // =====================================================

    fn scan_report<R: Scanner>(row: &R, include_count: bool) -> Result<(Report, u64), DbErr> {
        let report = Report {
            id: row.scan_u64(Column::Id.as_str())?,
            report_type: row.scan(Column::ReportType.as_str())?,
            concern: row.scan(Column::Concern.as_str())?,
            created_on: row.scan_u64(Column::CreatedOn.as_str())?,
            updated_on: row.scan_optional_u64(Column::UpdatedOn.as_str())?,
            archived_on: row.scan_optional_u64(Column::ArchivedOn.as_str())?,
            belongs_to_user: row.scan_u64(Column::BelongsToUser.as_str())?,
        };

        let count = if include_count {
            row.scan_u64(COUNT_COLUMN)?
        } else {
            0
        };

        Ok((report, count))
    }

    async fn get_batch_of_reports(
        &self,
        begin: u64,
        end: u64,
    ) -> Result<Vec<Report>, DatabaseError> {
        const CONTEXT: &str = "querying database for batch of reports";

        let query = build_or_log(Self::get_batch_of_reports_query(begin, end))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let rows = self
                .db
                .query_all(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            let (reports, _) =
                scan_rows(Rows::from(rows), false, Self::scan_report).map_err(scan_error)?;

            Ok(reports)
        })
        .await
    }
}

fn scan_error(e: DbErr) -> DatabaseError {
    DatabaseError::from_db_err(e, "scanning response from database")
}

#[async_trait]
impl ReportDataManager for ReportRepositoryPostgres {
    async fn report_exists(&self, report_id: u64) -> Result<bool, DatabaseError> {
        const CONTEXT: &str = "checking report existence";

        let Ok(query) = build_or_log(Self::report_exists_query(report_id)) else {
            return Ok(false);
        };
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = match self.db.query_one(query.into_statement()).await {
                Ok(Some(row)) => row,
                Ok(None) | Err(DbErr::RecordNotFound(_)) => return Ok(false),
                Err(e) => {
                    return Err(DatabaseError::Query {
                        context: CONTEXT,
                        source: e,
                    })
                }
            };

            row.scan::<bool>("exists").map_err(scan_error)
        })
        .await
    }

    async fn get_report(&self, report_id: u64) -> Result<Report, DatabaseError> {
        const CONTEXT: &str = "fetching report from database";

        let query =
            build_or_log(Self::get_report_query(report_id)).map_err(|_| DatabaseError::NotFound)?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?
                .ok_or(DatabaseError::NotFound)?;

            Self::scan_report(&row, false)
                .map(|(report, _)| report)
                .map_err(scan_error)
        })
        .await
    }

    async fn get_all_reports_count(&self) -> Result<u64, DatabaseError> {
        const CONTEXT: &str = "fetching count of reports";

        let query = BuiltQuery {
            sql: Self::all_reports_count_query().to_string(),
            args: Vec::new(),
        };
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?
                .ok_or(DatabaseError::NotFound)?;

            row.scan_u64(COUNT_COLUMN)
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))
        })
        .await
    }

    async fn get_reports(&self, filter: &QueryFilter) -> Result<ReportList, DatabaseError> {
        const CONTEXT: &str = "querying database for reports";

        let query = build_or_log(Self::get_reports_query(filter))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let rows = self
                .db
                .query_all(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            let (reports, total_count) =
                scan_rows(Rows::from(rows), true, Self::scan_report).map_err(scan_error)?;

            Ok(ReportList {
                pagination: filter.pagination(total_count),
                reports,
            })
        })
        .await
    }

    async fn get_all_reports(&self, out: mpsc::Sender<Vec<Report>>) -> Result<(), DatabaseError> {
        let count = self.get_all_reports_count().await?;

        let mut begin = 0;
        while begin < count {
            let end = begin + REPORT_BATCH_SIZE + 1;

            match self.get_batch_of_reports(begin, end).await {
                Ok(reports) if reports.is_empty() => {}
                Ok(reports) => {
                    if out.send(reports).await.is_err() {
                        warn!(begin, end, "report batch receiver closed");
                        break;
                    }
                }
                Err(e) => error!(error = %e, begin, end, "fetching batch of reports"),
            }

            begin += REPORT_BATCH_SIZE;
        }

        Ok(())
    }

    async fn get_reports_with_ids(
        &self,
        limit: u8,
        ids: &[u64],
    ) -> Result<Vec<Report>, DatabaseError> {
        const CONTEXT: &str = "querying database for reports";

        // Ids outside BIGINT cannot match and would fail the array cast.
        let ids: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| i64::try_from(*id).is_ok())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_or_log(Self::get_reports_with_ids_query(limit, &ids))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let rows = self
                .db
                .query_all(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            let (reports, _) =
                scan_rows(Rows::from(rows), false, Self::scan_report).map_err(scan_error)?;

            Ok(reports)
        })
        .await
    }

    async fn create_report(&self, input: ReportCreationInput) -> Result<Report, DatabaseError> {
        const CONTEXT: &str = "error executing report creation query";

        let query = build_or_log(Self::create_report_query(&input))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?
                .ok_or(DatabaseError::Query {
                    context: CONTEXT,
                    source: DbErr::RecordNotInserted,
                })?;

            let mut report = Report::from(input);
            report.id = row
                .scan_u64(Column::Id.as_str())
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;
            report.created_on = row
                .scan_u64(Column::CreatedOn.as_str())
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            Ok(report)
        })
        .await
    }

    async fn update_report(&self, report: &mut Report) -> Result<(), DatabaseError> {
        const CONTEXT: &str = "updating report";

        let query =
            build_or_log(Self::update_report_query(report)).map_err(|_| DatabaseError::NotFound)?;
        let updated_on = run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?
                .ok_or(DatabaseError::NotFound)?;

            row.scan_u64(Column::UpdatedOn.as_str()).map_err(scan_error)
        })
        .await?;

        report.updated_on = Some(updated_on);
        Ok(())
    }

    async fn archive_report(&self, report_id: u64, user_id: u64) -> Result<(), DatabaseError> {
        const CONTEXT: &str = "archiving report";

        let query = build_or_log(Self::archive_report_query(report_id, user_id))
            .map_err(|_| DatabaseError::NotFound)?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let result = self
                .db
                .execute(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound);
            }

            Ok(())
        })
        .await
    }
}
