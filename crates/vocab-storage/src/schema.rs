//! Pool setup and migrations: create-if-missing, foreign keys on, migrate,
//! connect.

use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

use crate::error::Result;

pub async fn init_db(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!(%db_path, "vocab-storage database initialized");
    Ok(pool)
}

pub async fn init_in_memory_db() -> Result<SqlitePool> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
