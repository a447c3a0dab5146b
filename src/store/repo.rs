//! Persistence seam for stored search state.

use super::key::StoreKey;
use super::state::StoredQueryRow;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Keyed table of stored search state.
#[async_trait]
pub trait QueryStateRepo: Send + Sync {
    /// Insert or replace the row with the same unique key, in one statement.
    async fn upsert_state(&self, row: &StoredQueryRow) -> Result<()>;

    /// Row stored under `key` with the same name, saved no earlier than `not_before`.
    async fn find_state(
        &self,
        key: &StoreKey,
        not_before: DateTime<Utc>,
    ) -> Result<Option<StoredQueryRow>>;

    /// Delete rows saved before `cutoff`, limited to `qualifier` when given.
    async fn purge_older_than(&self, qualifier: Option<&str>, cutoff: DateTime<Utc>) -> Result<u64>;
}
