// src/modules/report/application/ports/outgoing/report_repository.rs

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::modules::report::application::domain::entities::{
    Report, ReportCreationInput, ReportList,
};
use crate::shared::database::{DatabaseError, QueryFilter};

#[async_trait]
pub trait ReportDataManager: Send + Sync {
    /// Archived reports still exist. A missing row is `Ok(false)`.
    async fn report_exists(&self, report_id: u64) -> Result<bool, DatabaseError>;

    async fn get_report(&self, report_id: u64) -> Result<Report, DatabaseError>;

    async fn get_all_reports_count(&self) -> Result<u64, DatabaseError>;

    async fn get_reports(&self, filter: &QueryFilter) -> Result<ReportList, DatabaseError>;

    /// Sends every report to `out`, one id range per batch. Only the initial
    /// count can fail the call; a failing batch is logged and skipped, and
    /// empty batches are not sent. Stops early once `out` is closed.
    async fn get_all_reports(&self, out: mpsc::Sender<Vec<Report>>) -> Result<(), DatabaseError>;

    /// Non-archived reports among `ids`, in the order given, at most `limit`.
    async fn get_reports_with_ids(
        &self,
        limit: u8,
        ids: &[u64],
    ) -> Result<Vec<Report>, DatabaseError>;

    async fn create_report(&self, input: ReportCreationInput) -> Result<Report, DatabaseError>;

    /// Requires `report.belongs_to_user` to own the row.
    async fn update_report(&self, report: &mut Report) -> Result<(), DatabaseError>;

    async fn archive_report(&self, report_id: u64, user_id: u64) -> Result<(), DatabaseError>;
}
