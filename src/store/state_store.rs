use super::key::{ScopeQualifier, StoreKey, StoreScope};
use super::repo::QueryStateRepo;
use super::state::StoredQueryState;
use crate::database::with_statement_timeout;
use crate::error::{DbQueryError, Result};
use crate::logging::log_store_operation;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Trigger value that asks for stored state to be restored
pub const RESTORE_TRIGGER_VALUE: &str = "true";

/// Save/load access to stored search state for one session and qualifier.
///
/// Created with [`QueryStateStore::begin`], which also sweeps expired rows.
pub struct QueryStateStore<R: ?Sized + QueryStateRepo = dyn QueryStateRepo> {
    repo: Arc<R>,
    session_id: String,
    qualifier: ScopeQualifier,
    ttl: chrono::Duration,
    statement_timeout: Option<Duration>,
}

impl<R: ?Sized + QueryStateRepo> std::fmt::Debug for QueryStateStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStateStore")
            .field("session_id", &self.session_id)
            .field("qualifier", &self.qualifier)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<R: ?Sized + QueryStateRepo> QueryStateStore<R> {
    /// Begin a store scope for `session_id`.
    ///
    /// Session ids shorter than `min_session_id_len` are rejected. Rows older
    /// than `ttl` are purged; a failing purge is logged and does not fail the call.
    pub async fn begin(
        repo: Arc<R>,
        session_id: &str,
        qualifier: ScopeQualifier,
        ttl: chrono::Duration,
        min_session_id_len: usize,
    ) -> Result<Self> {
        if session_id.chars().count() < min_session_id_len {
            return Err(DbQueryError::validation(format!(
                "Session id must be at least {min_session_id_len} characters"
            )));
        }

        let store = Self {
            repo,
            session_id: session_id.to_string(),
            qualifier,
            ttl,
            statement_timeout: None,
        };
        store.purge_expired().await;
        Ok(store)
    }

    /// Bound every storage call made through this store.
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    async fn purge_expired(&self) {
        let cutoff = Utc::now() - self.ttl;
        let qualifier = self.qualifier.canonical();
        let scoped = (!qualifier.is_empty()).then_some(qualifier.as_str());

        let purge = with_statement_timeout(
            "purge_expired_state",
            self.statement_timeout,
            self.repo.purge_older_than(scoped, cutoff),
        )
        .await;

        match purge {
            Ok(purged) => tracing::debug!(
                session_id = %self.session_id,
                qualifier = %qualifier,
                purged = purged,
                "Expired query state purged"
            ),
            Err(e) => tracing::warn!(
                session_id = %self.session_id,
                qualifier = %qualifier,
                error = %e,
                "Failed to purge expired query state"
            ),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn qualifier(&self) -> &ScopeQualifier {
        &self.qualifier
    }

    pub fn key(&self, scope: StoreScope, name: &str) -> StoreKey {
        StoreKey::new(&self.session_id, &self.qualifier, scope, name)
    }

    /// Persist `state` under `name`, replacing whatever occupies the same key.
    pub async fn save(
        &self,
        scope: StoreScope,
        name: &str,
        state: &StoredQueryState,
    ) -> Result<()> {
        let key = self.key(scope, name);
        let row = state.to_row(&key, Utc::now())?;

        with_statement_timeout("save_state", self.statement_timeout, self.repo.upsert_state(&row))
            .await?;

        log_store_operation("save", &self.session_id, name, scope.is_toplevel(), None);
        Ok(())
    }

    /// Stored state for `name`, or `None` when absent or expired.
    pub async fn load(&self, scope: StoreScope, name: &str) -> Result<Option<StoredQueryState>> {
        let key = self.key(scope, name);
        let not_before = Utc::now() - self.ttl;

        let row = with_statement_timeout(
            "load_state",
            self.statement_timeout,
            self.repo.find_state(&key, not_before),
        )
        .await?;

        match row {
            Some(row) => {
                let state = StoredQueryState::try_from(row)?;
                log_store_operation("load", &self.session_id, name, scope.is_toplevel(), None);
                Ok(Some(state))
            }
            None => {
                tracing::debug!(
                    session_id = %self.session_id,
                    store_name = %name,
                    scope = %scope,
                    "No stored query state"
                );
                Ok(None)
            }
        }
    }

    /// True when the restore trigger carries the activation value.
    pub fn activate(trigger_value: Option<&str>) -> bool {
        trigger_value == Some(RESTORE_TRIGGER_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredQueryRow;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRepo {
        rows: Mutex<Vec<StoredQueryRow>>,
        fail_purge: bool,
    }

    #[async_trait]
    impl QueryStateRepo for MemoryRepo {
        async fn upsert_state(&self, row: &StoredQueryRow) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| {
                (&r.session_id, &r.qualifier, r.toplevel, &r.slot)
                    != (&row.session_id, &row.qualifier, row.toplevel, &row.slot)
            });
            rows.push(row.clone());
            Ok(())
        }

        async fn find_state(
            &self,
            key: &StoreKey,
            not_before: DateTime<Utc>,
        ) -> Result<Option<StoredQueryRow>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|r| {
                    r.session_id == key.session_id()
                        && r.qualifier == key.qualifier()
                        && r.toplevel == key.toplevel()
                        && r.slot == key.slot()
                        && r.name == key.name()
                        && r.date_time >= not_before
                })
                .cloned())
        }

        async fn purge_older_than(
            &self,
            qualifier: Option<&str>,
            cutoff: DateTime<Utc>,
        ) -> Result<u64> {
            if self.fail_purge {
                return Err(DbQueryError::Execution(sqlx::Error::PoolClosed));
            }
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| {
                !(r.date_time < cutoff && qualifier.map_or(true, |q| r.qualifier == q))
            });
            Ok((before - rows.len()) as u64)
        }
    }

    async fn store_for(repo: &Arc<MemoryRepo>, session_id: &str) -> QueryStateStore<MemoryRepo> {
        QueryStateStore::begin(
            Arc::clone(repo),
            session_id,
            ScopeQualifier::new().with("intranet_id", 1).unwrap(),
            chrono::Duration::hours(24),
            10,
        )
        .await
        .unwrap()
    }

    fn state_with_offset(offset: u64) -> StoredQueryState {
        let mut state = StoredQueryState::empty();
        state.paging_offset = offset;
        state
    }

    #[tokio::test]
    async fn test_session_id_length_boundary() {
        let repo = Arc::new(MemoryRepo::default());
        let qualifier = ScopeQualifier::new();
        let ttl = chrono::Duration::hours(24);

        let short =
            QueryStateStore::begin(Arc::clone(&repo), "123456789", qualifier.clone(), ttl, 10)
                .await;
        assert!(matches!(short, Err(DbQueryError::Validation(_))));

        let empty =
            QueryStateStore::begin(Arc::clone(&repo), "", qualifier.clone(), ttl, 10).await;
        assert!(matches!(empty, Err(DbQueryError::Validation(_))));

        assert!(QueryStateStore::begin(repo, "1234567890", qualifier, ttl, 10)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_toplevel_save_overrides_other_names() {
        let repo = Arc::new(MemoryRepo::default());
        let store = store_for(&repo, "session-0001").await;

        store.save(StoreScope::Toplevel, "a", &state_with_offset(2)).await.unwrap();
        store.save(StoreScope::Toplevel, "b", &state_with_offset(4)).await.unwrap();

        assert!(store.load(StoreScope::Toplevel, "a").await.unwrap().is_none());
        let b = store.load(StoreScope::Toplevel, "b").await.unwrap().unwrap();
        assert_eq!(b.paging_offset, 4);
        assert_eq!(repo.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sublevels_coexist() {
        let repo = Arc::new(MemoryRepo::default());
        let store = store_for(&repo, "session-0001").await;

        store.save(StoreScope::Sublevel, "a", &state_with_offset(2)).await.unwrap();
        store.save(StoreScope::Sublevel, "b", &state_with_offset(4)).await.unwrap();
        store.save(StoreScope::Sublevel, "a", &state_with_offset(6)).await.unwrap();

        let a = store.load(StoreScope::Sublevel, "a").await.unwrap().unwrap();
        let b = store.load(StoreScope::Sublevel, "b").await.unwrap().unwrap();
        assert_eq!(a.paging_offset, 6);
        assert_eq!(b.paging_offset, 4);
    }

    #[tokio::test]
    async fn test_sessions_do_not_interfere() {
        let repo = Arc::new(MemoryRepo::default());
        let first = store_for(&repo, "session-0001").await;
        let second = store_for(&repo, "session-0002").await;

        first.save(StoreScope::Toplevel, "list", &state_with_offset(2)).await.unwrap();
        second.save(StoreScope::Toplevel, "list", &state_with_offset(8)).await.unwrap();

        let loaded = first.load(StoreScope::Toplevel, "list").await.unwrap().unwrap();
        assert_eq!(loaded.paging_offset, 2);
        let loaded = second.load(StoreScope::Toplevel, "list").await.unwrap().unwrap();
        assert_eq!(loaded.paging_offset, 8);
    }

    #[tokio::test]
    async fn test_expired_rows_are_not_loaded_and_get_purged() {
        let repo = Arc::new(MemoryRepo::default());
        let store = store_for(&repo, "session-0001").await;
        store.save(StoreScope::Toplevel, "list", &state_with_offset(2)).await.unwrap();

        repo.rows.lock().unwrap()[0].date_time = Utc::now() - chrono::Duration::hours(25);
        assert!(store.load(StoreScope::Toplevel, "list").await.unwrap().is_none());

        let _again = store_for(&repo, "session-0002").await;
        assert!(repo.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_purge_does_not_fail_begin() {
        let repo = Arc::new(MemoryRepo {
            fail_purge: true,
            ..MemoryRepo::default()
        });
        let store = store_for(&repo, "session-0001").await;
        assert_eq!(store.session_id(), "session-0001");
    }

    #[test]
    fn test_activation_value() {
        assert!(QueryStateStore::<MemoryRepo>::activate(Some("true")));
        assert!(!QueryStateStore::<MemoryRepo>::activate(Some("1")));
        assert!(!QueryStateStore::<MemoryRepo>::activate(None));
    }
}
