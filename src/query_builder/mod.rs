//! # Query Builder System
//!
//! Composition of list queries from ordered, individually rendered fragments.
//!
//! ## Key Components
//!
//! - [`conditions`] - predicates, sort terms and the per-request search state
//! - [`joins`] - JOIN clauses with join-scoped WHERE conditions
//! - [`keywords`] - ALL-of keyword filtering through an association table
//! - [`alphabet`] - letter navigation over the first character of a field
//! - [`pagination`] - page windows, navigation and LIMIT/OFFSET
//! - [`dialect`] - the few expressions that differ between backends
//! - [`builder`] - SQL assembly for fetch, count and letter statements
//!
//! ## Example Usage
//!
//! ```rust
//! use dbquery_core::query_builder::{Condition, ConditionBuilder, Operator, OrderBy};
//!
//! let mut search = ConditionBuilder::new();
//! search.add_condition(Condition::simple("contact.id", Operator::Gt, 10)?);
//! search.add_sort(OrderBy::asc("contact.name")?);
//!
//! assert_eq!(search.render_where(), "(contact.id > 10)");
//! assert_eq!(search.render_order_by(), "contact.name ASC");
//! # Ok::<(), dbquery_core::DbQueryError>(())
//! ```

pub mod alphabet;
pub mod builder;
pub mod conditions;
pub mod dialect;
pub mod joins;
pub mod keywords;
pub mod pagination;

pub use alphabet::{CharacterState, LetterResolution};
pub use builder::{QueryBuilder, QuerySource};
pub use conditions::{Condition, ConditionBuilder, Operator, OrderBy, SortDirection};
pub use dialect::Dialect;
pub use joins::{JoinRegistry, JoinSpec, JoinType, RenderedJoins};
pub use keywords::{KeywordAssociation, KeywordFilter, KeywordFragments, KeywordSet};
pub use pagination::{
    DisplayRange, Navigation, PageWindow, PageWindows, Pagination, Paginator, PreviousPage,
    DEFAULT_ROWS_PER_PAGE, MAX_OFFSET,
};
