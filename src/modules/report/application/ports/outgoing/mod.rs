pub mod report_repository;

pub use report_repository::ReportDataManager;
