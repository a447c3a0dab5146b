mod common;

use common::strategies::*;
use dbquery_core::database::{DbQueryBackend, SqliteBackend};
use dbquery_core::query_builder::alphabet::collect_letters;
use dbquery_core::query_builder::conditions::validate_identifier;
use dbquery_core::query_builder::{KeywordSet, Paginator, PreviousPage};
use dbquery_core::{DbQueryConfig, DbQueryError, QueryStateStore, ScopeQualifier};
use proptest::prelude::*;
use std::sync::Arc;

/// Begin a store scope on a fresh in-memory database.
fn open_store(session_id: &str) -> dbquery_core::Result<QueryStateStore<dyn DbQueryBackend>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let config = DbQueryConfig::default();
        let backend: Arc<dyn DbQueryBackend> =
            Arc::new(SqliteBackend::in_memory(&config).await.unwrap());
        QueryStateStore::begin(
            backend,
            session_id,
            ScopeQualifier::new(),
            config.store_ttl(),
            config.min_session_id_len,
        )
        .await
    })
}

fn paginator(page_size: u64, total: u64) -> Paginator {
    let mut paginator = Paginator::new("paging", page_size);
    paginator.compute_total(total);
    paginator
}

proptest! {
    /// Property: windows cover the rows in page-size steps, ⌈N/p⌉ of them
    #[test]
    fn windows_cover_all_rows((page_size, total) in paged_totals_strategy()) {
        let offsets: Vec<u64> = paginator(page_size, total).windows().map(|w| w.offset).collect();

        prop_assert_eq!(offsets.len() as u64, total.div_ceil(page_size));
        for (index, offset) in offsets.iter().enumerate() {
            prop_assert_eq!(*offset, index as u64 * page_size);
        }
        prop_assert!(*offsets.last().unwrap() < total);
    }

    /// Property: the window iterator reports its exact length up front
    #[test]
    fn windows_know_their_length((page_size, total) in paged_totals_strategy()) {
        let windows = paginator(page_size, total).windows();
        let expected = windows.len();
        prop_assert_eq!(windows.count(), expected);
    }

    /// Property: nothing to page when every row fits on one page
    #[test]
    fn single_page_has_no_windows((page_size, total) in single_page_totals_strategy()) {
        let paginator = paginator(page_size, total);

        prop_assert_eq!(paginator.windows().count(), 0);
        prop_assert!(paginator.navigation(0).is_none());
        prop_assert!(paginator.limit().is_none());
    }

    /// Property: the first page has no previous page and the last has no next
    #[test]
    fn navigation_bounds((page_size, total) in paged_totals_strategy()) {
        let paginator = paginator(page_size, total);

        let first = paginator.navigation(0).unwrap();
        prop_assert_eq!(first.previous, PreviousPage::FirstPage);
        prop_assert_eq!(first.next, Some(page_size));

        let last_full = paginator.navigation(total - page_size).unwrap();
        prop_assert_eq!(last_full.next, None);

        let last_window = paginator.windows().last().unwrap();
        let last = paginator.navigation(last_window.offset).unwrap();
        prop_assert_eq!(last.next, None);
    }

    /// Property: every page shows a non-empty range inside the total
    #[test]
    fn display_range_stays_inside_total((page_size, total) in paged_totals_strategy()) {
        let paginator = paginator(page_size, total);

        for window in paginator.windows() {
            let range = paginator.display_range(window.offset);
            prop_assert!(range.from <= range.to);
            prop_assert!(range.to <= range.total);
            prop_assert_eq!(range.total, total);
        }
    }

    /// Property: letters are lowercase, unique, sorted and never a single letter
    #[test]
    fn letters_are_sorted_unique_lowercase(values in name_values_strategy()) {
        let letters = collect_letters(
            values.iter().map(|v| v.as_ref().and_then(|s| s.chars().next()).map(String::from)),
        );

        prop_assert_ne!(letters.len(), 1);
        prop_assert!(letters.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(letters.iter().all(|l| *l == l.to_lowercase()));
    }

    /// Property: keyword sets keep first-seen order and drop duplicates
    #[test]
    fn keyword_sets_deduplicate(ids in keyword_ids_strategy()) {
        let set = KeywordSet::from(ids.clone());

        let mut expected: Vec<i64> = Vec::new();
        for id in ids {
            if !expected.contains(&id) {
                expected.push(id);
            }
        }
        prop_assert_eq!(set.ids(), expected.as_slice());
        prop_assert_eq!(set.get(set.len()), 0);
    }

    /// Property: plain and table-qualified identifiers are accepted unchanged
    #[test]
    fn identifiers_validate(identifier in identifier_strategy()) {
        prop_assert_eq!(validate_identifier(&identifier).unwrap(), identifier);
    }

    /// Property: anything with SQL punctuation is rejected
    #[test]
    fn injected_identifiers_are_rejected(
        identifier in identifier_strategy(),
        suffix in "[ ;'()=-]{1,4}"
    ) {
        let injected = format!("{identifier}{suffix}");
        prop_assert!(validate_identifier(&injected).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: session ids shorter than the minimum never open a store
    #[test]
    fn short_session_ids_are_rejected(session_id in "[a-z0-9]{0,9}") {
        let result = open_store(&session_id);

        prop_assert!(matches!(result, Err(DbQueryError::Validation(_))));
    }

    /// Property: session ids at or above the minimum open a store
    #[test]
    fn long_session_ids_are_accepted(session_id in session_id_strategy(10)) {
        let result = open_store(&session_id);

        prop_assert!(result.is_ok());
        let store = result.unwrap();
        prop_assert_eq!(store.session_id(), session_id.as_str());
    }
}
