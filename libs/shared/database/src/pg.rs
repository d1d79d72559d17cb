use anyhow::{anyhow, Context, Result};
use diesel::{Connection, PgConnection};
use diesel_async::{
    pooled_connection::{bb8::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use shared_config::AppConfig;

pub type DbPool = Pool<AsyncPgConnection>;

/// Migrations embedded into the binary so deploys only need the executable.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Builds the process-wide connection pool. Created once at start-up and
/// handed to every cell service.
pub async fn create_pool(config: &AppConfig) -> Result<DbPool> {
    if config.database_url.is_empty() {
        return Err(anyhow!("DATABASE_URL is not configured"));
    }

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder()
        .max_size(config.database_max_connections)
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    info!(
        "Database pool ready (max {} connections)",
        config.database_max_connections
    );
    Ok(pool)
}

/// Runs pending migrations on a blocking thread with a synchronous connection.
pub async fn run_migrations_blocking(database_url: &str) -> Result<usize> {
    let url = database_url.to_string();

    tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut conn = PgConnection::establish(&url)
            .context("Failed to open migration connection")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;
        Ok(applied.len())
    })
    .await
    .context("Migration task panicked")?
}

/// Bounds how long statements in the current transaction wait on row locks.
/// Must be called inside a transaction; the setting ends with it.
pub async fn set_local_lock_timeout(
    conn: &mut AsyncPgConnection,
    timeout_ms: u64,
) -> Result<(), diesel::result::Error> {
    debug!("Setting transaction lock_timeout to {}ms", timeout_ms);
    diesel::sql_query(format!("SET LOCAL lock_timeout = '{}ms'", timeout_ms))
        .execute(conn)
        .await?;
    Ok(())
}
