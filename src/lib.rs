#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DBQuery Core
//!
//! Composition of filtered, sorted, paginated list queries over a relational
//! table, with the search state persisted between requests per user session.
//!
//! ## Overview
//!
//! A [`DbQuery`] serves one request. Callers configure it with joins,
//! conditions, sorting, keyword (tag) filters, paging and letter navigation,
//! then [`DbQuery::run`] counts and fetches the current page. When a store
//! scope is active the search state is saved after each paged run and can be
//! restored on a later request, either as the single *toplevel* list of a
//! session or as one of any number of named *sublevel* lists.
//!
//! ## Module Organization
//!
//! - [`query_builder`] - conditions, joins, keywords, letters, pagination and SQL assembly
//! - [`store`] - stored search state, its keys and the persistence trait
//! - [`database`] - the storage collaborator and its PostgreSQL/SQLite backends
//! - [`executor`] - the request-scoped query object
//! - [`params`] - externally supplied request parameters
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbquery_core::database::{DbQueryBackend, SqliteBackend};
//! use dbquery_core::query_builder::{Condition, Operator, OrderBy};
//! use dbquery_core::{
//!     DbQuery, DbQueryConfig, QueryMode, RequestParams, ScopeQualifier, StoreScope,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> dbquery_core::Result<()> {
//! let config = DbQueryConfig::default();
//! let backend: Arc<dyn DbQueryBackend> = Arc::new(SqliteBackend::in_memory(&config).await?);
//! let params = RequestParams::new().with("paging", "20");
//!
//! let mut query = DbQuery::new(backend, "contact", params, config)?;
//! query.create_store("a1b2c3d4e5f6", ScopeQualifier::new().with("intranet_id", 1)?).await?;
//! query.store_result("use_stored", "contacts", StoreScope::Toplevel)?;
//! query.use_paging("paging", 20);
//! query.add_condition(Condition::simple("contact.id", Operator::Gt, 10)?);
//! query.add_sort(OrderBy::asc("contact.name")?);
//!
//! let page = query.run(&["contact.id", "contact.name"], QueryMode::Paged).await?;
//! for row in &page.rows {
//!     println!("{:?} {:?}", row.get_i64("id"), row.get_str("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod logging;
pub mod params;
pub mod query_builder;
pub mod store;

pub use config::DbQueryConfig;
pub use database::{ColumnValue, DbQueryBackend, QueryStorage, ResultRow};
pub use error::{DbQueryError, Result};
pub use executor::{DbQuery, QueryMode, QueryResult};
pub use params::RequestParams;
pub use query_builder::{
    CharacterState, Condition, ConditionBuilder, JoinRegistry, JoinSpec, JoinType, KeywordFilter,
    KeywordSet, Operator, OrderBy, Paginator, QueryBuilder,
};
pub use store::{
    QueryStateRepo, QueryStateStore, ScopeQualifier, StoreKey, StoreScope, StoredQueryState,
};
