//! Pool setup and schema migrations.
//!
//! `main` calls [`init_pool`] once before the router is built; a failure
//! here stops the process. Live-database tests use it to get a migrated pool.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// How long a request waits for a free connection before the store sees
/// `PoolTimedOut` (and retries).
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect to `PostgreSQL` and apply pending migrations.
///
/// # Errors
///
/// Connection or migration failures.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let max_connections = max_connections.max(1);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    info!(max_connections, "database ready");

    Ok(pool)
}
