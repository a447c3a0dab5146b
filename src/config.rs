use crate::error::{DbQueryError, Result};
use crate::query_builder::conditions::validate_identifier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest session id a store scope accepts.
pub const MIN_SESSION_ID_LEN: usize = 10;

/// Engine configuration.
///
/// Resolution order is built-in defaults, then an optional file, then
/// `DBQUERY_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DbQueryConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Page size used when a query does not set its own.
    pub rows_per_page: u32,
    pub store_table: String,
    pub store_ttl_hours: u32,
    pub statement_timeout_ms: Option<u64>,
    pub min_session_id_len: usize,
    pub keyword_table: String,
    pub keyword_foreign_key: String,
    pub keyword_key_column: String,
}

impl Default for DbQueryConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/dbquery_development".to_string(),
            max_connections: 5,
            rows_per_page: 20,
            store_table: "dbquery_result".to_string(),
            store_ttl_hours: 24,
            statement_timeout_ms: None,
            min_session_id_len: MIN_SESSION_ID_LEN,
            keyword_table: "keyword_x_object".to_string(),
            keyword_foreign_key: "belong_to".to_string(),
            keyword_key_column: "keyword_id".to_string(),
        }
    }
}

impl DbQueryConfig {
    /// Read overrides from `DATABASE_URL` and `DBQUERY_*` on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(rows) = std::env::var("DBQUERY_ROWS_PER_PAGE") {
            config.rows_per_page = rows.parse().map_err(|e| {
                DbQueryError::Configuration(format!("Invalid rows_per_page: {e}"))
            })?;
        }

        if let Ok(ttl) = std::env::var("DBQUERY_STORE_TTL_HOURS") {
            config.store_ttl_hours = ttl.parse().map_err(|e| {
                DbQueryError::Configuration(format!("Invalid store_ttl_hours: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("DBQUERY_STATEMENT_TIMEOUT_MS") {
            config.statement_timeout_ms = Some(timeout.parse().map_err(|e| {
                DbQueryError::Configuration(format!("Invalid statement_timeout_ms: {e}"))
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Layered load: defaults, the given file (TOML/YAML/JSON by extension), environment.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = config::Config::try_from(&Self::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("DBQUERY")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            rows_per_page = config.rows_per_page,
            store_table = %config.store_table,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(DbQueryError::configuration("rows_per_page must be greater than 0"));
        }
        if self.store_ttl_hours == 0 {
            return Err(DbQueryError::configuration("store_ttl_hours must be greater than 0"));
        }
        if self.max_connections == 0 {
            return Err(DbQueryError::configuration("max_connections must be greater than 0"));
        }
        if self.min_session_id_len < MIN_SESSION_ID_LEN {
            return Err(DbQueryError::configuration(format!(
                "min_session_id_len must be at least {MIN_SESSION_ID_LEN}"
            )));
        }

        for (setting, identifier) in [
            ("store_table", &self.store_table),
            ("keyword_table", &self.keyword_table),
            ("keyword_foreign_key", &self.keyword_foreign_key),
            ("keyword_key_column", &self.keyword_key_column),
        ] {
            validate_identifier(identifier).map_err(|_| {
                DbQueryError::configuration(format!(
                    "{setting} must be a plain SQL identifier, got {identifier:?}"
                ))
            })?;
        }
        Ok(())
    }

    pub fn store_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.store_ttl_hours))
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }
}
