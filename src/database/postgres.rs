use super::migrations::StateTableSchema;
use super::{count_from_i64, ColumnValue, QueryStorage, ResultRow};
use crate::config::DbQueryConfig;
use crate::error::{DbQueryError, Result};
use crate::query_builder::Dialect;
use crate::store::{QueryStateRepo, StoreKey, StoredQueryRow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{Column, PgPool, Row, TypeInfo};

/// PostgreSQL storage collaborator.
pub struct PostgresBackend {
    pool: PgPool,
    schema: StateTableSchema,
}

impl PostgresBackend {
    /// Connect using `database_url` and `max_connections` from `config`.
    ///
    /// The state table is not created here; call [`PostgresBackend::migrate`].
    pub async fn connect(config: &DbQueryConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            store_table = %config.store_table,
            "Connected to PostgreSQL"
        );

        Self::from_pool(pool, &config.store_table)
    }

    pub fn from_pool(pool: PgPool, store_table: &str) -> Result<Self> {
        Ok(Self {
            pool,
            schema: StateTableSchema::new(Dialect::Postgres, store_table)?,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the stored-state table and its indexes if missing.
    pub async fn migrate(&self) -> Result<()> {
        for statement in self.schema.migration_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        tracing::debug!(table = %self.schema.table(), "State table migrated");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Decode by the column's declared type.
///
/// Types without a lossless mapping fail the fetch rather than read as NULL.
fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<ColumnValue> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(ColumnValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| ColumnValue::Integer(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| ColumnValue::Integer(i64::from(v))),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(ColumnValue::Integer),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| ColumnValue::Float(f64::from(v))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(ColumnValue::Float),
        // Kept as text so no precision is lost
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "JSON" | "JSONB" => row
            .try_get::<Option<JsonValue>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|v| ColumnValue::Text(v.to_string())),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map(|v| ColumnValue::Text(String::from_utf8_lossy(&v).into_owned())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
            row.try_get::<Option<String>, _>(index)?.map(ColumnValue::Text)
        }
        other => return Err(unsupported_column(other, index)),
    };
    Ok(value.unwrap_or(ColumnValue::Null))
}

fn unsupported_column(type_name: &str, index: usize) -> DbQueryError {
    let message = format!(
        "unsupported column type {type_name} at index {index}, cast it in the select list"
    );
    sqlx::Error::Decode(message.into()).into()
}

fn decode_row(row: &PgRow) -> Result<ResultRow> {
    let mut result = ResultRow::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        result.push(column.name(), value);
    }
    Ok(result)
}

#[async_trait]
impl QueryStorage for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
impl QueryStateRepo for PostgresBackend {
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
        let mut query = sqlx::query::<sqlx::Postgres>(&sql).bind(cutoff);
        if let Some(qualifier) = qualifier {
            query = query.bind(qualifier);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_column_is_an_execution_error() {
        let err = unsupported_column("INTERVAL", 3);
        match err {
            DbQueryError::Execution(sqlx::Error::Decode(source)) => {
                let message = source.to_string();
                assert!(message.contains("INTERVAL"));
                assert!(message.contains("index 3"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
