//! # Stored Query State
//!
//! Persistence of search state (conditions, joins, keywords, sorting, filter
//! values, paging offset and letter) between requests, keyed by session id,
//! an optional [`ScopeQualifier`] and a named [`StoreScope`].
//!
//! Key construction is pure ([`StoreKey`]); the table itself sits behind the
//! [`QueryStateRepo`] trait so backends and tests can provide their own.

pub mod key;
pub mod repo;
pub mod state;
pub mod state_store;

pub use key::{ScopeQualifier, StoreKey, StoreScope};
pub use repo::QueryStateRepo;
pub use state::{StoredQueryRow, StoredQueryState};
pub use state_store::{QueryStateStore, RESTORE_TRIGGER_VALUE};
