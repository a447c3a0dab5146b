use super::key::StoreKey;
use crate::error::{DbQueryError, Result};
use crate::query_builder::{Condition, JoinSpec, KeywordSet, OrderBy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Search state of one list view, as saved between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQueryState {
    pub conditions: Vec<Condition>,
    pub joins: Vec<JoinSpec>,
    pub keywords: KeywordSet,
    pub sorting: Vec<OrderBy>,
    /// Caller-owned values carried along with the search, never interpreted
    pub filter: BTreeMap<String, String>,
    pub paging_offset: u64,
    pub letter: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredQueryState {
    pub fn empty() -> Self {
        Self {
            conditions: Vec::new(),
            joins: Vec::new(),
            keywords: KeywordSet::new(),
            sorting: Vec::new(),
            filter: BTreeMap::new(),
            paging_offset: 0,
            letter: None,
            created_at: Utc::now(),
        }
    }

    /// Serialize into a row for `key`, stamped with `saved_at`.
    pub fn to_row(&self, key: &StoreKey, saved_at: DateTime<Utc>) -> Result<StoredQueryRow> {
        Ok(StoredQueryRow {
            session_id: key.session_id().to_string(),
            qualifier: key.qualifier().to_string(),
            toplevel: key.toplevel(),
            slot: key.slot().to_string(),
            name: key.name().to_string(),
            dbquery_condition: serde_json::to_string(&self.conditions)?,
            joins: serde_json::to_string(&self.joins)?,
            keyword: serde_json::to_string(&self.keywords)?,
            sorting: serde_json::to_string(&self.sorting)?,
            filter: serde_json::to_string(&self.filter)?,
            paging: i64::try_from(self.paging_offset).map_err(|_| {
                DbQueryError::validation(format!(
                    "Paging offset {} out of range",
                    self.paging_offset
                ))
            })?,
            first_character: self.letter.clone().unwrap_or_default(),
            date_time: saved_at,
        })
    }
}

/// One row of the state table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredQueryRow {
    pub session_id: String,
    pub qualifier: String,
    pub toplevel: bool,
    pub slot: String,
    pub name: String,
    pub dbquery_condition: String,
    pub joins: String,
    pub keyword: String,
    pub sorting: String,
    pub filter: String,
    pub paging: i64,
    pub first_character: String,
    pub date_time: DateTime<Utc>,
}

/// Blank columns read back as empty collections.
fn decode_json<T>(raw: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(raw)?)
}

impl TryFrom<StoredQueryRow> for StoredQueryState {
    type Error = DbQueryError;

    fn try_from(row: StoredQueryRow) -> Result<Self> {
        Ok(Self {
            conditions: decode_json(&row.dbquery_condition)?,
            joins: decode_json(&row.joins)?,
            keywords: decode_json(&row.keyword)?,
            sorting: decode_json(&row.sorting)?,
            filter: decode_json(&row.filter)?,
            paging_offset: u64::try_from(row.paging).unwrap_or(0),
            letter: Some(row.first_character).filter(|letter| !letter.is_empty()),
            created_at: row.date_time,
        })
    }
}
