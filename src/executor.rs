//! # Query Executor
//!
//! [`DbQuery`] is the request-scoped list query: it accumulates joins,
//! conditions, sorting, keywords, paging and letter settings, optionally
//! restores and persists that state through a [`QueryStateStore`], and runs
//! the resulting COUNT and fetch statements against the backend.
//!
//! ## Paged run order
//!
//! 1. restore stored state when requested
//! 2. resolve the current letter
//! 3. render joins, conditions and keyword fragments
//! 4. count without the letter to decide whether the letter filter is kept
//! 5. count for pagination
//! 6. apply LIMIT/OFFSET when more rows match than fit on a page
//! 7. fetch
//! 8. persist state when a store name is configured
//!
//! A [`QueryMode::Full`] run skips steps 1, 2, 4, 5, 6 and 8.

use crate::config::DbQueryConfig;
use crate::database::{with_statement_timeout, ColumnValue, DbQueryBackend, ResultRow};
use crate::error::{DbQueryError, Result};
use crate::logging::log_statement;
use crate::params::RequestParams;
use crate::query_builder::alphabet::{
    collect_letters, letter_condition, letter_query, resolve_letter, LETTER_ALIAS,
};
use crate::query_builder::conditions::validate_identifier;
use crate::query_builder::{
    CharacterState, Condition, ConditionBuilder, DisplayRange, JoinRegistry, JoinSpec,
    KeywordAssociation, KeywordFilter, KeywordSet, LetterResolution, Navigation, OrderBy,
    Paginator, QuerySource,
};
use crate::store::{QueryStateStore, ScopeQualifier, StoreScope, StoredQueryState};
use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Whether a run pages, filters by letter and touches stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Paged,
    /// Every matching row; no restore, paging, letter filter or persistence
    Full,
}

/// Rows of one run plus the paging and letter state they were produced with.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub rows: Vec<ResultRow>,
    pub paging: Paginator,
    pub character: CharacterState,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn navigation(&self) -> Option<Navigation> {
        self.paging.navigation(self.paging.current_offset())
    }
}

#[derive(Debug, Clone)]
struct StoreSettings {
    trigger_name: String,
    name: String,
    scope: StoreScope,
}

/// Request-scoped list query over one table.
pub struct DbQuery {
    backend: Arc<dyn DbQueryBackend>,
    config: DbQueryConfig,
    params: RequestParams,
    table: String,
    id_column: String,
    required_condition: Option<Condition>,
    joins: JoinRegistry,
    search: ConditionBuilder,
    keyword_filter: KeywordFilter,
    filter: BTreeMap<String, String>,
    paginator: Paginator,
    paging_enabled: bool,
    manual_offset: Option<u64>,
    character: CharacterState,
    store: Option<QueryStateStore<dyn DbQueryBackend>>,
    store_settings: Option<StoreSettings>,
    use_stored: bool,
}

impl std::fmt::Debug for DbQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbQuery")
            .field("table", &self.table)
            .field("joins", &self.joins)
            .field("search", &self.search)
            .field("paginator", &self.paginator)
            .field("character", &self.character)
            .field("store", &self.store)
            .finish()
    }
}

impl DbQuery {
    /// Query over `table`, whose rows are identified by `<table>.id`.
    ///
    /// Fails with a configuration error when `config` does not validate.
    pub fn new(
        backend: Arc<dyn DbQueryBackend>,
        table: &str,
        params: RequestParams,
        config: DbQueryConfig,
    ) -> Result<Self> {
        config.validate()?;
        let table = validate_identifier(table)?;
        let page_size = u64::from(config.rows_per_page);

        Ok(Self {
            backend,
            keyword_filter: KeywordFilter::new(KeywordAssociation::from_config(&config)),
            config,
            params,
            id_column: format!("{table}.id"),
            table,
            required_condition: None,
            joins: JoinRegistry::new(),
            search: ConditionBuilder::new(),
            filter: BTreeMap::new(),
            paginator: Paginator::new("", page_size),
            paging_enabled: false,
            manual_offset: None,
            character: CharacterState::new(),
            store: None,
            store_settings: None,
            use_stored: false,
        })
    }

    /// Condition applied to every statement this query issues.
    pub fn with_required_condition(mut self, condition: Condition) -> Self {
        self.required_condition = Some(condition);
        self
    }

    // Search state

    pub fn add_join(&mut self, join: JoinSpec) {
        self.joins.add_join(join);
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.search.add_condition(condition);
    }

    pub fn add_sort(&mut self, order: OrderBy) {
        self.search.add_sort(order);
    }

    pub fn has_sorting(&self) -> bool {
        self.search.has_sorting()
    }

    pub fn set_keywords(&mut self, keywords: impl Into<KeywordSet>) {
        self.search.set_keywords(keywords);
    }

    pub fn keywords(&self) -> &KeywordSet {
        self.search.keywords()
    }

    /// Keyword id at `index`, 0 when absent.
    pub fn keyword(&self, index: usize) -> i64 {
        self.search.keywords().get(index)
    }

    /// Clear conditions, sorting and keywords.
    pub fn reset(&mut self) {
        self.search.reset();
    }

    pub fn set_filter(&mut self, key: &str, value: &str) {
        self.filter.insert(key.to_string(), value.to_string());
    }

    pub fn check_filter(&self, key: &str) -> bool {
        self.filter.contains_key(key)
    }

    /// Filter value for `key`, empty when unset.
    pub fn filter(&self, key: &str) -> &str {
        self.filter.get(key).map(String::as_str).unwrap_or("")
    }

    // Paging

    /// Turn pagination on, reading the current offset from `trigger_name`.
    /// An empty trigger is ignored; `rows_per_page` of 0 keeps the current size.
    pub fn use_paging(&mut self, trigger_name: &str, rows_per_page: u64) {
        if trigger_name.is_empty() {
            return;
        }
        self.paginator.set_trigger_name(trigger_name);
        self.paginator.set_page_size(rows_per_page);
        self.paging_enabled = true;
    }

    /// Offset that wins over both the trigger parameter and stored state.
    pub fn set_paging_offset(&mut self, offset: u64) {
        self.manual_offset = Some(offset);
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: u64) {
        self.paginator.set_page_size(rows_per_page);
    }

    // Letter navigation

    pub fn define_character(&mut self, trigger_name: &str, source_field: &str) -> Result<()> {
        self.character.define(trigger_name, source_field)
    }

    pub fn use_character(&mut self) {
        self.character.enable();
    }

    // Stored state

    /// Begin a store scope for `session_id`; expired rows are swept as a side effect.
    pub async fn create_store(
        &mut self,
        session_id: &str,
        qualifier: ScopeQualifier,
    ) -> Result<()> {
        let store = QueryStateStore::begin(
            Arc::clone(&self.backend),
            session_id,
            qualifier,
            self.config.store_ttl(),
            self.config.min_session_id_len,
        )
        .await?
        .with_statement_timeout(self.config.statement_timeout());

        self.store = Some(store);
        Ok(())
    }

    /// Persist this query's state under `name` after each paged run.
    ///
    /// `level` is a [`StoreScope`] or its string form. Restoring is switched
    /// on when the `trigger_name` parameter is `"true"`.
    pub fn store_result(
        &mut self,
        trigger_name: &str,
        name: &str,
        level: impl AsRef<str>,
    ) -> Result<()> {
        let scope: StoreScope = level.as_ref().parse()?;
        if name.is_empty() {
            return Ok(());
        }

        self.store_settings = Some(StoreSettings {
            trigger_name: trigger_name.to_string(),
            name: name.to_string(),
            scope,
        });

        if QueryStateStore::<dyn DbQueryBackend>::activate(self.params.get(trigger_name)) {
            self.use_stored = true;
        }
        Ok(())
    }

    pub fn use_stored(&mut self, use_stored: bool) {
        self.use_stored = use_stored;
    }

    // Accessors

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn paging_var_name(&self) -> &str {
        self.paginator.trigger_name()
    }

    pub fn store_var_name(&self) -> Option<&str> {
        self.store_settings.as_ref().map(|s| s.trigger_name.as_str())
    }

    /// Letter resolved by the last run
    pub fn character(&self) -> Option<&str> {
        self.character.resolved_letter()
    }

    pub fn uses_character(&self) -> bool {
        self.character.is_enabled()
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn navigation(&self) -> Option<Navigation> {
        self.paginator.navigation(self.paginator.current_offset())
    }

    pub fn display_range(&self) -> DisplayRange {
        self.paginator.display_range(self.paginator.current_offset())
    }

    fn source(&self) -> QuerySource<'_> {
        QuerySource {
            table: &self.table,
            id_column: &self.id_column,
            required_condition: self.required_condition.as_ref(),
            joins: &self.joins,
            search: &self.search,
            keyword_filter: &self.keyword_filter,
        }
    }

    async fn bounded<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_statement_timeout(operation, self.config.statement_timeout(), future).await
    }

    async fn count(&self, purpose: &str, sql: &str) -> Result<u64> {
        log_statement(&self.table, purpose, sql);
        self.bounded(purpose, self.backend.fetch_count(sql)).await
    }

    /// Letters for navigation over the current search, empty when letter
    /// navigation is undefined, was dropped for this request, or would offer
    /// fewer than two letters.
    pub async fn characters(&self) -> Result<Vec<String>> {
        let Some(field) = self.character.source_field() else {
            return Ok(Vec::new());
        };
        if !self.character.offers_navigation() {
            return Ok(Vec::new());
        }

        let sql = letter_query(&self.source(), self.backend.dialect(), field);
        log_statement(&self.table, "letters", &sql);
        let rows = self.bounded("letters", self.backend.fetch_rows(&sql)).await?;

        Ok(collect_letters(rows.iter().map(|row| {
            match row.get(LETTER_ALIAS) {
                None | Some(ColumnValue::Null) => None,
                Some(value) => Some(value.to_string()),
            }
        })))
    }

    fn active_store(&self) -> Result<(&QueryStateStore<dyn DbQueryBackend>, &StoreSettings)> {
        let settings = self.store_settings.as_ref().ok_or_else(|| {
            DbQueryError::configuration("Stored state requested without store_result")
        })?;
        let store = self.store.as_ref().ok_or_else(|| {
            DbQueryError::configuration("Call create_store before storing or restoring a result")
        })?;
        Ok((store, settings))
    }

    /// Overlay stored state; returns the stored offset and letter.
    async fn restore(&mut self) -> Result<(Option<u64>, Option<String>)> {
        let state = {
            let (store, settings) = self.active_store()?;
            store.load(settings.scope, &settings.name).await?
        };
        let Some(state) = state else {
            return Ok((None, None));
        };

        self.search
            .replace(state.conditions, state.sorting, state.keywords);
        self.joins.replace(state.joins);
        self.filter = state.filter;
        if state.letter.is_some() {
            self.character.enable();
        }

        tracing::info!(
            table = %self.table,
            paging_offset = state.paging_offset,
            letter = ?state.letter,
            "Restored stored query state"
        );
        Ok((Some(state.paging_offset), state.letter))
    }

    fn snapshot(&self) -> StoredQueryState {
        StoredQueryState {
            conditions: self.search.conditions().to_vec(),
            joins: self.joins.joins().to_vec(),
            keywords: self.search.keywords().clone(),
            sorting: self.search.sorting().to_vec(),
            filter: self.filter.clone(),
            paging_offset: self.paginator.current_offset(),
            letter: self.character.resolved_letter().map(str::to_string),
            created_at: Utc::now(),
        }
    }

    async fn resolve_current_letter(
        &mut self,
        stored_letter: Option<&str>,
    ) -> Result<Option<String>> {
        let trigger_value = self
            .params
            .get_non_empty(self.character.trigger_name())
            .map(str::to_string);

        let letter = match resolve_letter(trigger_value.as_deref(), stored_letter) {
            LetterResolution::FromTrigger(letter) | LetterResolution::FromStore(letter) => {
                Some(letter)
            }
            LetterResolution::FirstAvailable => self.characters().await?.into_iter().next(),
        };
        self.character.set_resolved_letter(letter.clone());
        Ok(letter)
    }

    /// Run the query and return the selected `fields` of the current page.
    ///
    /// An empty `fields` slice selects `*`.
    pub async fn run(&mut self, fields: &[&str], mode: QueryMode) -> Result<QueryResult> {
        let paged = mode == QueryMode::Paged;

        let (stored_offset, stored_letter) = if paged && self.use_stored {
            self.restore().await?
        } else {
            (None, None)
        };

        if paged {
            let trigger_offset = self.params.get_offset(self.paginator.trigger_name());
            let offset = self
                .manual_offset
                .or(trigger_offset)
                .or(stored_offset)
                .unwrap_or(0);
            self.paginator.set_current_offset(offset);
        }

        let mut letter_sql = None;
        if paged && self.character.is_enabled() {
            let field = self
                .character
                .source_field()
                .map(str::to_string)
                .ok_or_else(|| {
                    DbQueryError::configuration("use_character requires define_character")
                })?;

            if let Some(letter) = self.resolve_current_letter(stored_letter.as_deref()).await? {
                letter_sql = Some(letter_condition(self.backend.dialect(), &field, &letter));
            }
        }

        let mut query = self.source().builder();

        if let Some(letter_sql) = letter_sql {
            let sql = query.build_count_sql(&self.id_column);
            let total = self.count("count_without_letter", &sql).await?;

            if total > self.paginator.page_size() {
                query = query.where_sql(&letter_sql);
            } else {
                tracing::debug!(
                    table = %self.table,
                    rows = total,
                    page_size = self.paginator.page_size(),
                    "Letter filter dropped, all rows fit on one page"
                );
                self.character.drop_for_request();
            }
        }

        if paged && self.paging_enabled {
            let sql = query.build_count_sql(&self.id_column);
            let total = self.count("count_for_paging", &sql).await?;
            self.paginator.compute_total(total);
            query = query.paginate(self.paginator.limit());
        }

        let sql = query.select(fields).build_sql();
        log_statement(&self.table, "fetch", &sql);
        let rows = self.bounded("fetch_rows", self.backend.fetch_rows(&sql)).await?;

        if paged && self.store_settings.is_some() {
            let state = self.snapshot();
            let (store, settings) = self.active_store()?;
            store.save(settings.scope, &settings.name, &state).await?;
        }

        tracing::debug!(table = %self.table, rows = rows.len(), mode = ?mode, "Query finished");

        Ok(QueryResult {
            rows,
            paging: self.paginator.clone(),
            character: self.character.clone(),
        })
    }
}
