//! SQLite handle for the shelf service.
//!
//! A [`Database`] is opened explicitly at startup, cloned into whatever needs
//! it and closed explicitly at shutdown. All work runs on tokio's blocking
//! pool and every call is bounded by the configured operation timeout.

mod error;
mod migrate;

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, InterruptHandle};
use shelf_kernel::settings::DatabaseSettings;

pub use error::DbError;
pub use migrate::AppliedMigration;

const MEMORY_PATH: &str = ":memory:";

// Lifecycle of one `call`: waiting for the connection, running, or given up on.
const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const ABANDONED: u8 = 2;

/// Cloneable handle to the single SQLite connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Option<Connection>>,
    interrupt: InterruptHandle,
    op_timeout: Duration,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.inner.path)
            .field("op_timeout", &self.inner.op_timeout)
            .finish()
    }
}

impl Database {
    /// Open (creating if needed) the database described by `settings`.
    pub async fn open(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let path = settings.path.clone();
        let busy_timeout = Duration::from_millis(settings.busy_timeout_ms);

        tracing::info!(target: "shelf-db", path = %path, "opening database");

        let conn = tokio::task::spawn_blocking({
            let path = path.clone();
            move || open_connection(&path, busy_timeout)
        })
        .await
        .map_err(|e| DbError::Join(e.to_string()))??;

        let interrupt = conn.get_interrupt_handle();

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(Some(conn)),
                interrupt,
                op_timeout: Duration::from_millis(settings.op_timeout_ms),
                path,
            }),
        })
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::open(&DatabaseSettings::in_memory()).await
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn op_timeout(&self) -> Duration {
        self.inner.op_timeout
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// Fails with [`DbError::Timeout`] when `f` does not get the connection
    /// within the operation timeout; `f` is then never run. When `f` is
    /// already running at the deadline its SQL is interrupted and the call
    /// waits for it, so a timeout is only reported for work that did not
    /// complete. Callers that write must do so inside a transaction.
    pub async fn call<F, T, E>(&self, operation: &'static str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let state = Arc::new(AtomicU8::new(PENDING));
        let timed_out = DbError::Timeout {
            operation,
            after: self.inner.op_timeout,
        };

        let mut task = tokio::task::spawn_blocking({
            let state = Arc::clone(&state);
            move || {
                let mut guard = inner.conn.lock().map_err(|_| DbError::Poisoned)?;
                if state
                    .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    return Err(E::from(DbError::Timeout {
                        operation,
                        after: inner.op_timeout,
                    }));
                }
                let conn = guard.as_mut().ok_or(DbError::Closed)?;
                f(conn)
            }
        });

        if let Ok(joined) = tokio::time::timeout(self.inner.op_timeout, &mut task).await {
            return joined.unwrap_or_else(|e| Err(E::from(DbError::Join(e.to_string()))));
        }

        let timeout_ms = self.inner.op_timeout.as_millis() as u64;
        if state
            .compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::warn!(target: "shelf-db", operation, timeout_ms, "database operation timed out");
            return Err(E::from(timed_out));
        }

        tracing::warn!(
            target: "shelf-db",
            operation,
            timeout_ms,
            "database operation overran its timeout; interrupting"
        );
        self.inner.interrupt.interrupt();

        match task.await {
            Ok(Ok(value)) => Ok(value),
            // Interrupted statements fail and their transaction rolls back.
            Ok(Err(_)) => Err(E::from(timed_out)),
            Err(join_error) => Err(E::from(DbError::Join(join_error.to_string()))),
        }
    }

    /// Close the connection. Handles cloned before closing fail with
    /// [`DbError::Closed`] afterwards.
    pub async fn close(self) -> Result<(), DbError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.conn.lock().map_err(|_| DbError::Poisoned)?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, err)| DbError::Sqlite(err)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| DbError::Join(e.to_string()))??;

        tracing::info!(target: "shelf-db", path = %self.inner.path, "database closed");
        Ok(())
    }
}

fn open_connection(path: &str, busy_timeout: Duration) -> Result<Connection, DbError> {
    let conn = if path == MEMORY_PATH {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(target: "shelf-db", journal_mode = %mode, "journal mode set");
        conn
    };

    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}
