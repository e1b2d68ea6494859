use std::{path::PathBuf, process::ExitCode, sync::Arc};

use sqlx::postgres::PgPoolOptions;
use yamdb_api::{
    config::AppConfig,
    import,
    repository::{PostgresRepository, RepositoryState},
};

/// import_data
///
/// Loads `category.csv` and `genre.csv` from `IMPORT_DATA_DIR` (or the directory given as the
/// first argument) into the database. Any failure aborts the run with a non-zero exit code.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yamdb_api=info,import_data=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.import_dir));

    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to Postgres. Check DATABASE_URL.");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!(error = %e, "Failed to apply migrations");
        return ExitCode::FAILURE;
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    match import::run(repo.as_ref(), &dir).await {
        Ok(loaded) => {
            let total: u64 = loaded.iter().map(|(_, rows)| rows).sum();
            tracing::info!(dir = %dir.display(), total, "Import finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "Import aborted");
            ExitCode::FAILURE
        }
    }
}
