use serde::Serialize;

use crate::shared::database::Pagination;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: u64,
    pub report_type: String,
    pub concern: String,
    pub created_on: u64,
    pub updated_on: Option<u64>,
    pub archived_on: Option<u64>,
    pub belongs_to_user: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCreationInput {
    pub report_type: String,
    pub concern: String,
    pub belongs_to_user: u64,
}

impl From<ReportCreationInput> for Report {
    fn from(input: ReportCreationInput) -> Self {
        Self {
            id: 0,
            report_type: input.report_type,
            concern: input.concern,
            created_on: 0,
            updated_on: None,
            archived_on: None,
            belongs_to_user: input.belongs_to_user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportList {
    pub pagination: Pagination,
    pub reports: Vec<Report>,
}
