//! Database configuration and connection pool management.
//!
//! SQLite connectivity with r2d2 pooling and embedded migrations.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use crate::utils::errors::StoreServiceError;
use crate::utils::metrics;

// =============================================================================
// TYPE DEFINITIONS
// =============================================================================

/// Database connection pool type.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Pooled database connection type.
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Per-connection setup: SQLite ships with foreign-key enforcement off,
/// and the schema's ON DELETE CASCADE clauses depend on it.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionOptions
{
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        use diesel::connection::SimpleConnection;

        conn.batch_execute("PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Helper to parse an environment variable with a default value.
fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// POOL INITIALIZATION
// =============================================================================

/// Initializes the database connection pool.
///
/// # Configuration (from environment variables with defaults)
/// - `DATABASE_URL`: The SQLite database path (required).
/// - `DB_MAX_POOL_SIZE`: Max connections (default: 8).
/// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout (default: 10).
///
/// # Panics
/// Panics if `DATABASE_URL` is not set or pool creation fails (fail-fast
/// for startup).
pub fn init_pool() -> DbPool {
    let database_url = env::var(DATABASE_URL_ENV).unwrap_or_else(|_| {
        error!("Missing {} environment variable", DATABASE_URL_ENV);
        panic!("DATABASE_URL must be set in .env or environment variables");
    });

    let max_size = get_env_var("DB_MAX_POOL_SIZE", 8u32);
    let connection_timeout = get_env_var("DB_CONNECTION_TIMEOUT_SECS", 10u64);

    info!("Initializing SQLite connection pool");

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(connection_timeout))
        .connection_customizer(Box::new(ConnectionOptions))
        .test_on_check_out(true)
        .build(manager)
        .unwrap_or_else(|e| {
            error!("Failed to create SQLite connection pool: {}", e);
            panic!("Failed to create database connection pool: {}", e);
        });

    info!(
        "SQLite pool initialized (max={}, timeout={}s)",
        max_size, connection_timeout
    );

    pool
}

// =============================================================================
// CONNECTION MANAGEMENT
// =============================================================================

/// Acquires a database connection from the pool.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, StoreServiceError> {
    match pool.get() {
        Ok(conn) => {
            metrics::db::query_success("connection_acquire");
            Ok(conn)
        }
        Err(e) => {
            error!("Failed to acquire database connection: {}", e);
            metrics::db::query_failure("connection_acquire");
            Err(StoreServiceError::database(
                "Failed to acquire database connection",
            ))
        }
    }
}

// =============================================================================
// DATABASE MIGRATIONS
// =============================================================================

/// Applies pending embedded migrations.
pub fn run_migrations(pool: &DbPool) -> Result<(), StoreServiceError> {
    let mut conn = get_connection(pool)?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            StoreServiceError::database(format!("Migration failure: {}", e))
        })
        .map(|applied| {
            info!("Applied {} pending migration(s)", applied.len());
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::make_pool;

    #[test]
    fn in_memory_pool_applies_migrations() {
        let pool = make_pool();
        let mut conn = pool.get().unwrap();

        // A migrated schema accepts a trivial query against each table.
        use crate::db::schema::users::dsl::*;
        let count: i64 = users.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }
}
