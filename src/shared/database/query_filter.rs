// src/shared/database/query_filter.rs

use sea_orm::Value;
use serde::{Deserialize, Serialize};

use super::query_builder::{Predicate, SelectBuilder};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u8 = 20;
pub const MAX_LIMIT: u8 = 50;

/// Largest OFFSET Postgres accepts.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Pagination and time-window filter shared by the list operations.
///
/// `page` is 1-based. A zero `limit` means "use the default"; anything above
/// [`MAX_LIMIT`] is clamped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub page: u64,
    pub limit: u8,
    pub created_after: Option<u64>,
    pub created_before: Option<u64>,
    pub updated_after: Option<u64>,
    pub updated_before: Option<u64>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            created_after: None,
            created_before: None,
            updated_after: None,
            updated_before: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u8,
    pub total_count: u64,
}

impl QueryFilter {
    /// Pagination block for a list response built with this filter.
    pub fn pagination(&self, total_count: u64) -> Pagination {
        Pagination {
            page: self.page(),
            limit: self.limit(),
            total_count,
        }
    }

    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u8 {
        match self.limit {
            0 => DEFAULT_LIMIT,
            l => l.min(MAX_LIMIT),
        }
    }

    /// Pages past the end of any table saturate at the largest offset
    /// Postgres accepts and come back empty.
    pub fn offset(&self) -> u64 {
        (self.page() - 1)
            .saturating_mul(u64::from(self.limit()))
            .min(MAX_OFFSET)
    }

    /// Appends the time-window predicates that are set, then LIMIT/OFFSET.
    pub fn apply_to_query_builder(&self, mut builder: SelectBuilder, table: &str) -> SelectBuilder {
        let windows: [(&str, Option<u64>, fn(String, Value) -> Predicate); 4] = [
            ("created_on", self.created_after, Predicate::Gt),
            ("created_on", self.created_before, Predicate::Lt),
            ("updated_on", self.updated_after, Predicate::Gt),
            ("updated_on", self.updated_before, Predicate::Lt),
        ];

        for (column, bound, predicate) in windows {
            if let Some(epoch) = bound {
                builder = builder.and_where(predicate(format!("{table}.{column}"), epoch.into()));
            }
        }

        builder
            .limit(u64::from(self.limit()))
            .offset(self.offset())
    }
}
