use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, Executor, Pool, Sqlite,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
};
use tracing::info;
use utils::assets::database_path;

pub mod models;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Minimum idle connections to maintain.
const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Connection acquisition timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Get max connections from environment or use default.
fn get_max_connections() -> u32 {
    std::env::var("CORKBOARD_SQLITE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0 && n <= 100)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

/// Apply performance pragmas to a SQLite connection.
/// Applied on every new connection via `after_connect`.
///
/// `synchronous` must be set AFTER `mmap_size`: enabling mmap can affect
/// how SQLite handles fsync, and without an explicit synchronous setting
/// afterwards disk I/O errors can occur under heavy write load.
async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    // temp_store = MEMORY (2)
    conn.execute("PRAGMA temp_store = 2").await?;

    conn.execute("PRAGMA mmap_size = 67108864").await?; // 64MB

    conn.execute("PRAGMA synchronous = NORMAL").await?;

    // cache_size is in KB when negative
    conn.execute("PRAGMA cache_size = -64000").await?;

    conn.execute("PRAGMA foreign_keys = ON").await?;

    Ok(())
}

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if necessary) the on-disk database and run pending
    /// migrations.
    pub async fn new() -> Result<DBService, Error> {
        let db_path = database_path();
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

        let max_connections = get_max_connections();
        info!(
            max_connections = max_connections,
            path = %db_path.display(),
            "Initializing SQLite connection pool"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move { apply_performance_pragmas(conn).await })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(DBService { pool })
    }

    /// Open a shared in-memory database for demo mode.
    ///
    /// `cache=shared` makes every pool connection see the same database;
    /// all data is lost when the process exits, which is the point.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options =
            SqliteConnectOptions::from_str("sqlite:file:corkboard_demo?mode=memory&cache=shared")?
                .journal_mode(SqliteJournalMode::Memory);

        let pool = SqlitePoolOptions::new()
            .max_connections(get_max_connections())
            .min_connections(1)
            // Keep at least one connection alive or the shared in-memory
            // database is dropped between requests.
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("PRAGMA foreign_keys = ON").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Initialized in-memory demo database");
        Ok(DBService { pool })
    }

    /// Flush the WAL into the main database file and close the pool.
    /// Called on graceful shutdown so a kill after this point leaves the
    /// database consistent.
    pub async fn checkpoint_and_close(&self) {
        match sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            Ok(_) => info!("Final WAL checkpoint completed"),
            Err(e) => tracing::warn!("Final WAL checkpoint failed (data may still be in WAL): {e}"),
        }
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
