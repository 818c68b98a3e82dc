//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Every new connection gets
//! foreign keys enabled, and migrations run once when the pool is built.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use camstation_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a database pool backed by a file on disk.
///
/// Creates the SQLite file if it does not exist, enables foreign keys and
/// WAL journal mode on every new connection, and runs pending migrations.
///
/// # Example
///
/// ```no_run
/// use camstation_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/camstation/camstation.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;",
        )
    });

    build_pool(manager)
}

/// Initialize an in-memory database pool for testing.
///
/// Each call gets its own shared-cache in-memory database, so parallel
/// tests stay isolated while all connections of one pool see the same data.
pub fn init_memory_pool() -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:camstation_mem_{n}?mode=memory&cache=shared");

    let manager = SqliteConnectionManager::file(uri)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    build_pool(manager)
}

fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    let applied = migrations::run_migrations(&conn)?;
    if applied > 0 {
        tracing::info!(applied, "Applied database migrations");
    }

    Ok(pool)
}

/// Get a connection from the pool.
///
/// Convenience wrapper around `pool.get()` that converts the r2d2 error into
/// the common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_pool() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), 4);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_connections_share_state() {
        let pool = init_memory_pool().unwrap();

        {
            let conn = get_conn(&pool).unwrap();
            conn.execute(
                "INSERT INTO cameras (id, name, source, location, created_at)
                 VALUES ('cam-1', 'Porch', 'webcam', 'Front', '2024-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        }

        // Hold one connection so the next comes from a different slot.
        let _held = get_conn(&pool).unwrap();
        let conn = get_conn(&pool).unwrap();
        let name: String = conn
            .query_row("SELECT name FROM cameras WHERE id = 'cam-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(name, "Porch");
    }

    #[test]
    fn test_memory_pools_are_isolated() {
        let a = init_memory_pool().unwrap();
        let b = init_memory_pool().unwrap();

        get_conn(&a)
            .unwrap()
            .execute(
                "INSERT INTO cameras (id, name, source, location, created_at)
                 VALUES ('cam-a', 'A', 'webcam', '', '2024-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();

        let count: i64 = get_conn(&b)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM cameras", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
