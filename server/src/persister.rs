//! Quote persistence.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use cotacao_common::{Deadline, Quote, StageError};

/// Trait for quote persisters.
///
/// Semantics are at-most-once-attempted: on deadline expiry mid-write the
/// attempt is abandoned and the record may or may not have been committed.
/// No compensating rollback is attempted.
#[async_trait]
pub trait QuotePersister: Send + Sync {
    /// Durably store one quote, bounded by the given deadline.
    async fn persist(&self, quote: &Quote, deadline: Deadline) -> Result<(), StageError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS quotes (
    id          TEXT PRIMARY KEY,
    code        TEXT NOT NULL,
    codein      TEXT NOT NULL,
    name        TEXT NOT NULL,
    high        TEXT NOT NULL,
    low         TEXT NOT NULL,
    var_bid     TEXT NOT NULL,
    pct_change  TEXT NOT NULL,
    bid         TEXT NOT NULL,
    ask         TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    create_date TEXT NOT NULL,
    recorded_at TEXT NOT NULL
)";

const INSERT: &str = "
INSERT INTO quotes (
    id, code, codein, name, high, low, var_bid, pct_change,
    bid, ask, timestamp, create_date, recorded_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Stores one row per fetched quote in SQLite.
pub struct SqliteQuotePersister {
    pool: SqlitePool,
}

impl SqliteQuotePersister {
    /// Connect to the database and bootstrap the schema.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Self::with_pool(pool).await
    }

    /// Bootstrap the schema on an already-configured pool.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QuotePersister for SqliteQuotePersister {
    async fn persist(&self, quote: &Quote, deadline: Deadline) -> Result<(), StageError> {
        // An already-expired deadline short-circuits without touching the
        // database.
        if deadline.is_expired() {
            return Err(StageError::TimedOut);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let insert = sqlx::query(INSERT)
            .bind(&id)
            .bind(&quote.code)
            .bind(&quote.codein)
            .bind(&quote.name)
            .bind(&quote.high)
            .bind(&quote.low)
            .bind(&quote.var_bid)
            .bind(&quote.pct_change)
            .bind(&quote.bid)
            .bind(&quote.ask)
            .bind(&quote.timestamp)
            .bind(&quote.create_date)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool);

        let result = match deadline.remaining() {
            Some(remaining) => match tokio::time::timeout(remaining, insert).await {
                Ok(result) => result,
                Err(_) => return Err(StageError::TimedOut),
            },
            None => insert.await,
        };

        result.map_err(|e| StageError::Storage(e.to_string()))?;

        debug!(row_id = %id, pair = %quote.pair(), "Quote persisted");
        Ok(())
    }
}

/// Recording persister for tests: captures calls and the deadline it was
/// handed, and optionally sleeps or fails.
#[cfg(test)]
pub(crate) struct RecordingPersister {
    delay: std::time::Duration,
    failure: Option<StageError>,
    calls: std::sync::atomic::AtomicUsize,
    last_remaining: std::sync::Mutex<Option<std::time::Duration>>,
}

#[cfg(test)]
impl RecordingPersister {
    pub(crate) fn ok() -> Self {
        Self {
            delay: std::time::Duration::ZERO,
            failure: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_remaining: std::sync::Mutex::new(None),
        }
    }

    pub(crate) fn failing(err: StageError) -> Self {
        Self {
            failure: Some(err),
            ..Self::ok()
        }
    }

    /// Take this long per write; the deadline still cuts it short.
    pub(crate) fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Remaining budget observed on the most recent call, if any was bounded.
    pub(crate) fn last_remaining(&self) -> Option<std::time::Duration> {
        *self.last_remaining.lock().unwrap()
    }
}

#[cfg(test)]
#[async_trait]
impl QuotePersister for RecordingPersister {
    async fn persist(&self, _quote: &Quote, deadline: Deadline) -> Result<(), StageError> {
        if deadline.is_expired() {
            return Err(StageError::TimedOut);
        }

        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_remaining.lock().unwrap() = deadline.remaining();

        let write = tokio::time::sleep(self.delay);
        match deadline.remaining() {
            Some(remaining) => {
                if tokio::time::timeout(remaining, write).await.is_err() {
                    return Err(StageError::TimedOut);
                }
            }
            None => write.await,
        }

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
