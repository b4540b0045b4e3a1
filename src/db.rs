//! Database connection helpers.
//!
//! Wraps the Diesel connection pool used by the SQLite store and provides the
//! maintenance utilities exposed to operators: pool status, backup, restore
//! and a liveness probe.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel::{RunQueryDsl, sql_query};
use log::{error, info};
use serde::Serialize;

use crate::repository::errors::{RepositoryError, RepositoryResult};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// File name prefix used for generated backups.
pub const BACKUP_PREFIX: &str = "crm_backup_";

#[derive(Debug)]
/// Options that are applied each time a connection is acquired from the pool.
pub struct ConnectionOptions {
    /// Enable Write Ahead Logging mode for SQLite.
    pub enable_wal: bool,
    /// Enforce foreign key checks for SQLite.
    pub enable_foreign_keys: bool,
    /// Timeout to wait for a locked database.
    pub busy_timeout: Option<Duration>,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        (|| {
            if self.enable_wal {
                conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
            }
            if self.enable_foreign_keys {
                conn.batch_execute("PRAGMA foreign_keys = ON;")?;
            }
            if let Some(d) = self.busy_timeout {
                conn.batch_execute(&format!("PRAGMA busy_timeout = {};", d.as_millis()))?;
            }
            Ok(())
        })()
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a Diesel connection pool for the given database URL.
pub fn establish_connection_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions {
            enable_wal: true,
            enable_foreign_keys: true,
            busy_timeout: Some(Duration::from_secs(30)),
        }))
        .build(manager)
}

/// Retrieve a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, PoolError> {
    match pool.get() {
        Ok(conn) => Ok(conn),
        Err(e) => {
            error!("Failed to get connection from pool: {e}");
            Err(e)
        }
    }
}

/// Snapshot of the connection pool.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: u32,
    pub connections: u32,
    pub idle: u32,
    pub in_use: u32,
}

impl PoolStatus {
    pub fn from_pool(pool: &DbPool) -> Self {
        let state = pool.state();
        Self {
            max_size: pool.max_size(),
            connections: state.connections,
            idle: state.idle_connections,
            in_use: state.connections.saturating_sub(state.idle_connections),
        }
    }
}

/// Result of a successful `SELECT 1` probe.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DatabaseCheck {
    pub latency_ms: f64,
}

/// Runs `SELECT 1` against the pool and reports the round-trip time.
pub fn check_database(pool: &DbPool) -> RepositoryResult<DatabaseCheck> {
    let started = Instant::now();
    let mut conn = get_connection(pool)?;
    sql_query("SELECT 1").execute(&mut conn)?;
    Ok(DatabaseCheck {
        latency_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}

fn quote_sqlite_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Writes a consistent copy of the database into `dir` using `VACUUM INTO`.
///
/// Returns the path of the created `crm_backup_<timestamp>.sqlite3` file.
pub fn backup_database(pool: &DbPool, dir: &Path) -> RepositoryResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        RepositoryError::Unexpected(format!("cannot create backup dir {}: {e}", dir.display()))
    })?;

    let file_name = format!(
        "{BACKUP_PREFIX}{}.sqlite3",
        Utc::now().format("%Y%m%d_%H%M%S%3f")
    );
    let target = dir.join(file_name);
    let target_str = target.to_str().ok_or_else(|| {
        RepositoryError::ValidationError(format!("non UTF-8 backup path {}", target.display()))
    })?;

    let mut conn = get_connection(pool)?;
    sql_query(format!("VACUUM INTO {}", quote_sqlite_literal(target_str))).execute(&mut conn)?;

    info!("Database backup written to {}", target.display());
    Ok(target)
}

/// Replaces the database file at `target` with the backup at `source`.
///
/// The server must not hold open connections to `target` while restoring.
pub fn restore_database(source: &Path, target: &Path) -> RepositoryResult<()> {
    if !source.is_file() {
        return Err(RepositoryError::NotFound);
    }
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = target.as_os_str().to_owned();
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        match std::fs::remove_file(&sidecar) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RepositoryError::Unexpected(format!(
                    "cannot remove stale {}: {e}",
                    sidecar.display()
                )));
            }
        }
    }
    std::fs::copy(source, target).map_err(|e| {
        RepositoryError::Unexpected(format!(
            "cannot restore {} into {}: {e}",
            source.display(),
            target.display()
        ))
    })?;
    info!(
        "Database restored from {} into {}",
        source.display(),
        target.display()
    );
    Ok(())
}

/// Lists backups in `dir`, newest first.
pub fn list_backups(dir: &Path) -> RepositoryResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(RepositoryError::Unexpected(e.to_string())),
    };
    let mut backups: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(".sqlite3"))
        })
        .collect();
    backups.sort();
    backups.reverse();
    Ok(backups)
}
