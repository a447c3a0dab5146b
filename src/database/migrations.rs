//! # State Table Schema
//!
//! DDL for the stored-state table and the statements that read and write it,
//! rendered per [`Dialect`].
//!
//! The unique key `(session_id, qualifier, toplevel, slot)` is what makes a
//! save a single atomic upsert:
//!
//! ```sql
//! INSERT INTO dbquery_result (...) VALUES (...)
//! ON CONFLICT (session_id, qualifier, toplevel, slot) DO UPDATE SET ...
//! ```

use crate::error::Result;
use crate::query_builder::conditions::validate_identifier;
use crate::query_builder::Dialect;

/// Columns written on every save, in bind order
const STATE_COLUMNS: [&str; 13] = [
    "session_id",
    "qualifier",
    "toplevel",
    "slot",
    "name",
    "dbquery_condition",
    "joins",
    "keyword",
    "sorting",
    "filter",
    "paging",
    "first_character",
    "date_time",
];

/// Columns replaced when a save hits an existing key
const UPDATED_COLUMNS: [&str; 9] = [
    "name",
    "dbquery_condition",
    "joins",
    "keyword",
    "sorting",
    "filter",
    "paging",
    "first_character",
    "date_time",
];

/// SQL for one stored-state table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTableSchema {
    dialect: Dialect,
    table: String,
}

impl StateTableSchema {
    pub fn new(dialect: Dialect, table: &str) -> Result<Self> {
        Ok(Self {
            dialect,
            table: validate_identifier(table)?,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn index_prefix(&self) -> String {
        self.table.replace('.', "_")
    }

    /// Idempotent statements creating the table, its unique key and the expiry index.
    pub fn migration_statements(&self) -> Vec<String> {
        let (id_column, toplevel_type, paging_type, timestamp_type) = match self.dialect {
            Dialect::Postgres => ("id BIGSERIAL PRIMARY KEY", "BOOLEAN", "BIGINT", "TIMESTAMPTZ"),
            Dialect::Sqlite => (
                "id INTEGER PRIMARY KEY AUTOINCREMENT",
                "BOOLEAN",
                "INTEGER",
                "TEXT",
            ),
        };
        let prefix = self.index_prefix();

        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 {id_column}, \
                 session_id VARCHAR(255) NOT NULL, \
                 qualifier TEXT NOT NULL DEFAULT '', \
                 toplevel {toplevel_type} NOT NULL, \
                 slot VARCHAR(255) NOT NULL DEFAULT '', \
                 name VARCHAR(255) NOT NULL, \
                 dbquery_condition TEXT NOT NULL DEFAULT '', \
                 joins TEXT NOT NULL DEFAULT '', \
                 keyword TEXT NOT NULL DEFAULT '', \
                 sorting TEXT NOT NULL DEFAULT '', \
                 filter TEXT NOT NULL DEFAULT '', \
                 paging {paging_type} NOT NULL DEFAULT 0, \
                 first_character VARCHAR(16) NOT NULL DEFAULT '', \
                 date_time {timestamp_type} NOT NULL, \
                 CONSTRAINT {prefix}_scope_key UNIQUE (session_id, qualifier, toplevel, slot))",
                table = self.table,
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {prefix}_date_time_idx ON {} (date_time)",
                self.table
            ),
        ]
    }

    /// `date_time <op> <param>`; SQLite stores text, so compare as julian days
    fn date_time_compare(&self, op: &str, param: usize) -> String {
        let placeholder = self.dialect.placeholder(param);
        match self.dialect {
            Dialect::Postgres => format!("date_time {op} {placeholder}"),
            Dialect::Sqlite => format!("julianday(date_time) {op} julianday({placeholder})"),
        }
    }

    /// Binds follow [`STATE_COLUMNS`].
    pub fn upsert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=STATE_COLUMNS.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        let updates: Vec<String> = UPDATED_COLUMNS
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({}) \
             ON CONFLICT (session_id, qualifier, toplevel, slot) DO UPDATE SET {}",
            self.table,
            STATE_COLUMNS.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        )
    }

    /// Binds: session_id, qualifier, toplevel, slot, name, not_before.
    pub fn find_sql(&self) -> String {
        let p = |i| self.dialect.placeholder(i);
        format!(
            "SELECT {} FROM {} WHERE session_id = {} AND qualifier = {} AND toplevel = {} \
             AND slot = {} AND name = {} AND {}",
            STATE_COLUMNS.join(", "),
            self.table,
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
            self.date_time_compare(">=", 6)
        )
    }

    /// Binds: cutoff, then qualifier when `scoped`.
    pub fn purge_sql(&self, scoped: bool) -> String {
        let mut sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            self.date_time_compare("<", 1)
        );
        if scoped {
            sql.push_str(&format!(" AND qualifier = {}", self.dialect.placeholder(2)));
        }
        sql
    }
}
