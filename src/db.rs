use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::EngineResult;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
///
/// In-memory URLs get a single connection, otherwise every pooled connection
/// would open its own empty database.
pub async fn initialize_db(database_url: &str) -> EngineResult<DbPool> {
  let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

  tracing::info!("Initializing database at: {}", database_url);

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}
