//! Transactional access to the job tables.
//!
//! Every operation opens its own connection, runs inside one transaction and
//! drops the connection before returning. Nothing holds a connection or a
//! lock between requests.

pub mod query;

use crate::clock::{Sleeper, ThreadSleeper};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::migrations::Migrator;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use query::{Field, Order};

/// Opens a fresh connection to the store.
pub trait Connector: Send + Sync {
    fn connect(&self) -> rusqlite::Result<Connection>;
}

pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total connection attempts, including the first.
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

#[derive(Clone)]
pub struct StoreClient {
    connector: Arc<dyn Connector>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
}

impl StoreClient {
    pub fn new(connector: Arc<dyn Connector>, sleeper: Arc<dyn Sleeper>, retry: RetryPolicy) -> Self {
        Self {
            connector,
            sleeper,
            retry,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let connector = SqliteConnector::new(
            &config.path,
            Duration::from_millis(config.busy_timeout_ms),
        );
        let retry = RetryPolicy {
            attempts: config.connect_attempts,
            delay: Duration::from_millis(config.retry_delay_ms),
        };
        Self::new(Arc::new(connector), Arc::new(ThreadSleeper), retry)
    }

    pub fn connect_with_retry(&self) -> Result<Connection, StoreError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            log::debug!("Connecting to store (attempt {}/{})", attempt, attempts);
            match self.connector.connect() {
                Ok(conn) => {
                    log::debug!("Connected to store");
                    return Ok(conn);
                }
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Store connection attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, attempts, e, self.retry.delay
                    );
                    self.sleeper.sleep(self.retry.delay);
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Store unavailable after {} attempt(s): {}", attempts, e);
                    return Err(StoreError::Unavailable {
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }

    /// Run `op` inside one write transaction.
    ///
    /// The transaction takes the database write lock when it begins, so
    /// concurrent callers are serialized for its whole duration. `Ok` commits,
    /// `Err` rolls back and is returned unchanged. The connection is released
    /// on every exit path, unwinding included.
    pub fn run_in_transaction<T, E, F>(&self, operation: &str, op: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StoreError> + std::fmt::Display,
    {
        log::info!("Store operation: {}", operation);
        let mut conn = self.connect_with_retry()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        match op(&tx) {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                log::debug!("Committed {}", operation);
                Ok(value)
            }
            Err(e) => {
                log::info!("Rolling back {}: {}", operation, e);
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback of {} failed: {}", operation, rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Bring the schema up to date.
    pub fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.connect_with_retry()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Store journal mode: {}", mode);
        let mut migrator = Migrator::new(conn);
        migrator.run_migrations()?;
        Ok(())
    }
}
