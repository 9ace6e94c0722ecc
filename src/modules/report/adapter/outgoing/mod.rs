mod report_repository_postgres;
pub mod sea_orm_entity;

pub use report_repository_postgres::ReportRepositoryPostgres;
