//! # Database Operations
//!
//! The storage collaborator behind a list query: executing generated
//! statements, reading rows by column name, and the keyed stored-state table.
//!
//! ## Key Components
//!
//! - [`QueryStorage`] - execute a statement, return rows or a row count
//! - [`DbQueryBackend`] - storage plus the [`QueryStateRepo`] table, what a
//!   `DbQuery` holds
//! - [`migrations`] - DDL and DML for the stored-state table
//! - `postgres` / `sqlite` - sqlx backends, behind the features of the same name
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dbquery_core::database::{QueryStorage, SqliteBackend};
//! use dbquery_core::DbQueryConfig;
//!
//! # async fn example() -> dbquery_core::Result<()> {
//! let backend = SqliteBackend::in_memory(&DbQueryConfig::default()).await?;
//! let total = backend.fetch_count("SELECT COUNT(*) FROM dbquery_result").await?;
//! assert_eq!(total, 0);
//! # Ok(())
//! # }
//! ```

pub mod migrations;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod row;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use migrations::StateTableSchema;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
pub use row::{ColumnValue, ResultRow};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

use crate::error::{DbQueryError, Result};
use crate::query_builder::Dialect;
use crate::store::QueryStateRepo;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Executes generated statements.
#[async_trait]
pub trait QueryStorage: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// All rows produced by `sql`.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<ResultRow>>;

    /// The single integer produced by a COUNT statement.
    async fn fetch_count(&self, sql: &str) -> Result<u64>;
}

/// Everything a query object needs from storage.
pub trait DbQueryBackend: QueryStorage + QueryStateRepo {}

impl<T> DbQueryBackend for T where T: QueryStorage + QueryStateRepo {}

/// Await `future`, failing with [`DbQueryError::Timeout`] once `timeout` elapses.
pub async fn with_statement_timeout<T, F>(
    operation: &str,
    timeout: Option<Duration>,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = timeout else {
        return future.await;
    };

    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(
                operation = %operation,
                timeout_ms = timeout_ms,
                "Storage call timed out"
            );
            Err(DbQueryError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            })
        }
    }
}

/// Counts come back as `i64`; anything negative is treated as no rows.
pub(crate) fn count_from_i64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
