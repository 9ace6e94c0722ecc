use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use report_store::report::adapter::outgoing::ReportRepositoryPostgres;
use report_store::report::application::ports::outgoing::ReportDataManager;
use report_store::shared::database::DatabaseConfig;
use report_store::user::adapter::outgoing::UserRepositoryPostgres;
use report_store::user::application::ports::outgoing::UserDataManager;

/// Connects with the configured pool and reports what the store currently
/// holds. Exits non-zero when the database is unreachable.
#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn start() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting report store readiness check...");

    let config = DatabaseConfig::from_env().context("loading database configuration")?;

    let conn = config
        .connect()
        .await
        .context("connecting to database")?;
    let db_arc = Arc::new(conn);

    let users = UserRepositoryPostgres::new(db_arc.clone()).with_deadline(config.statement_deadline);
    let reports =
        ReportRepositoryPostgres::new(db_arc.clone()).with_deadline(config.statement_deadline);

    let user_count = users
        .get_all_user_count()
        .await
        .context("counting users")?;
    let report_count = reports
        .get_all_reports_count()
        .await
        .context("counting reports")?;

    info!(user_count, report_count, "database is ready");

    Ok(())
}

#[cfg(not(tarpaulin_include))]
fn main() {
    if let Err(e) = start() {
        error!(error = ?e, "report store readiness check failed");
        eprintln!("Error starting app: {e:#}");
        std::process::exit(1);
    }
}
