use crate::config::DatabaseConfig;
use crate::error::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub type DbPool = SqlitePool;

/// Open the raffle database. The SQLite file is created on first start so a
/// fresh deployment only needs the migrations to get its 130-number pool.
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
