use super::migrations::StateTableSchema;
use super::{count_from_i64, ColumnValue, QueryStorage, ResultRow};
use crate::config::DbQueryConfig;
use crate::error::Result;
use crate::query_builder::Dialect;
use crate::store::{QueryStateRepo, StoreKey, StoredQueryRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

/// SQLite storage collaborator, for embedded use and tests.
pub struct SqliteBackend {
    pool: SqlitePool,
    schema: StateTableSchema,
}

impl SqliteBackend {
    /// Open (creating if missing) the database at `url` and migrate the state table.
    pub async fn connect(url: &str, config: &DbQueryConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // One writer at a time avoids "database is locked" under concurrent use
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::from_pool(pool, &config.store_table).await
    }

    /// Private in-memory database; lives as long as the backend.
    pub async fn in_memory(config: &DbQueryConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every new connection would be a new empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool, &config.store_table).await
    }

    pub async fn from_pool(pool: SqlitePool, store_table: &str) -> Result<Self> {
        let backend = Self {
            pool,
            schema: StateTableSchema::new(Dialect::Sqlite, store_table)?,
        };
        backend.migrate().await?;
        Ok(backend)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in self.schema.migration_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        tracing::debug!(table = %self.schema.table(), "State table migrated");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        let health: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Decode by the stored value's storage class; declared types are advisory in SQLite.
fn decode_column(row: &SqliteRow, index: usize) -> Result<ColumnValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(ColumnValue::Null);
    }
    let storage_class = raw.type_info().name().to_string();

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => ColumnValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => ColumnValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            ColumnValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => ColumnValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn decode_row(row: &SqliteRow) -> Result<ResultRow> {
    let mut result = ResultRow::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        result.push(column.name(), value);
    }
    Ok(result)
}

#[async_trait]
impl QueryStorage for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<ResultRow>> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);
        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }

    async fn fetch_count(&self, sql: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count_from_i64(count))
    }
}

#[async_trait]
impl QueryStateRepo for SqliteBackend {
    async fn upsert_state(&self, row: &StoredQueryRow) -> Result<()> {
        sqlx::query(&self.schema.upsert_sql())
            .bind(&row.session_id)
            .bind(&row.qualifier)
            .bind(row.toplevel)
            .bind(&row.slot)
            .bind(&row.name)
            .bind(&row.dbquery_condition)
            .bind(&row.joins)
            .bind(&row.keyword)
            .bind(&row.sorting)
            .bind(&row.filter)
            .bind(row.paging)
            .bind(&row.first_character)
            .bind(row.date_time)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_state(
        &self,
        key: &StoreKey,
        not_before: DateTime<Utc>,
    ) -> Result<Option<StoredQueryRow>> {
        let row = sqlx::query_as::<_, StoredQueryRow>(&self.schema.find_sql())
            .bind(key.session_id())
            .bind(key.qualifier())
            .bind(key.toplevel())
            .bind(key.slot())
            .bind(key.name())
            .bind(not_before)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn purge_older_than(
        &self,
        qualifier: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let sql = self.schema.purge_sql(qualifier.is_some());
        let mut query = sqlx::query::<sqlx::Sqlite>(&sql).bind(cutoff);
        if let Some(qualifier) = qualifier {
            query = query.bind(qualifier);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
