#![allow(dead_code)]

pub mod strategies;

use dbquery_core::database::{DbQueryBackend, SqliteBackend};
use dbquery_core::{DbQuery, DbQueryConfig, RequestParams, ScopeQualifier};
use std::sync::Arc;

pub const TEST_TABLE: &str = "dbquery_test";
pub const SESSION_ID: &str = "dsjr93jdi93id39ei2d93kdd9d2";

/// Rows of the test table, inserted in this order so ids run 1..=21
pub const NAMES: [&str; 21] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    "æske", "øre",
];

/// In-memory SQLite database seeded with the test table and an empty
/// keyword association table.
pub struct TestDb {
    pub backend: Arc<SqliteBackend>,
}

impl TestDb {
    pub async fn new() -> Self {
        Self::with_rows(NAMES.len()).await
    }

    pub async fn with_rows(count: usize) -> Self {
        let backend = SqliteBackend::in_memory(&DbQueryConfig::default())
            .await
            .expect("in-memory database");
        let pool = backend.pool();

        sqlx::query(
            "CREATE TABLE dbquery_test (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(255) NOT NULL)",
        )
        .execute(pool)
        .await
        .expect("create test table");

        sqlx::query(
            "CREATE TABLE keyword_x_object (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             intranet_id INTEGER NOT NULL DEFAULT 0, \
             belong_to INTEGER NOT NULL, \
             keyword_id INTEGER NOT NULL)",
        )
        .execute(pool)
        .await
        .expect("create keyword table");

        for name in NAMES.iter().take(count) {
            sqlx::query("INSERT INTO dbquery_test (name) VALUES (?1)")
                .bind(*name)
                .execute(pool)
                .await
                .expect("insert test row");
        }

        Self {
            backend: Arc::new(backend),
        }
    }

    pub async fn tag(&self, belong_to: i64, keyword_id: i64) {
        const INSERT: &str =
            "INSERT INTO keyword_x_object (intranet_id, belong_to, keyword_id) VALUES (1, ?1, ?2)";
        sqlx::query(INSERT)
            .bind(belong_to)
            .bind(keyword_id)
            .execute(self.backend.pool())
            .await
            .expect("insert keyword association");
    }

    pub fn backend(&self) -> Arc<dyn DbQueryBackend> {
        Arc::clone(&self.backend) as Arc<dyn DbQueryBackend>
    }

    pub fn query(&self) -> DbQuery {
        self.query_with(RequestParams::new())
    }

    pub fn query_with(&self, params: RequestParams) -> DbQuery {
        DbQuery::new(self.backend(), TEST_TABLE, params, DbQueryConfig::default())
            .expect("query over test table")
    }

    pub async fn stored_state_rows(&self) -> u64 {
        use dbquery_core::QueryStorage;
        self.backend
            .fetch_count("SELECT COUNT(*) FROM dbquery_result")
            .await
            .expect("count stored state")
    }
}

pub fn intranet(id: i64) -> ScopeQualifier {
    ScopeQualifier::new()
        .with("intranet_id", id)
        .expect("valid qualifier column")
}

pub fn restore_requested() -> RequestParams {
    RequestParams::new().with("use_stored", "true")
}
