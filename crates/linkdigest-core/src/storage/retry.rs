//! Retry with exponential backoff for transient SQLite errors (busy, locked, I/O).

use std::future::Future;
use std::time::Duration;

/// Primary and extended SQLite result codes worth retrying
const TRANSIENT_CODES: &[&str] = &[
    "5",    // SQLITE_BUSY
    "6",    // SQLITE_LOCKED
    "10",   // SQLITE_IOERR
    "266",  // SQLITE_IOERR_READ
    "522",  // SQLITE_IOERR_SHORT_READ
    "517",  // SQLITE_BUSY_RECOVERY
    "1032", // SQLITE_BUSY_SNAPSHOT
    "2314", // SQLITE_IOERR_WRITE
    "3338", // SQLITE_IOERR_FSYNC
    "5386", // SQLITE_IOERR_LOCK
];

pub fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| TRANSIENT_CODES.contains(&&*code))
            .unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `operation`, retrying transient errors
    pub async fn run<F, Fut, T>(&self, operation: F) -> std::result::Result<T, sqlx::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let mut retries = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient_error(&e) && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.delay(retries);
                    tracing::debug!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        "Transient database error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Run a statement with the default policy, returning rows affected
pub async fn execute_with_retry<F, Fut>(operation: F) -> std::result::Result<u64, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>>,
{
    RetryPolicy::default()
        .run(|| {
            let fut = operation();
            async move { fut.await.map(|r| r.rows_affected()) }
        })
        .await
}

/// Run a query with the default policy
pub async fn query_with_retry<F, Fut, T>(operation: F) -> std::result::Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    RetryPolicy::default().run(operation).await
}
