use proptest::prelude::*;

/// Strategy for generating valid page sizes
pub fn page_size_strategy() -> impl Strategy<Value = u64> {
    1u64..=100
}

/// Strategy for generating (page size, total rows) pairs where paging is needed
pub fn paged_totals_strategy() -> impl Strategy<Value = (u64, u64)> {
    page_size_strategy()
        .prop_flat_map(|page_size| (Just(page_size), (page_size + 1)..=page_size * 50))
}

/// Strategy for generating (page size, total rows) pairs that fit on one page
pub fn single_page_totals_strategy() -> impl Strategy<Value = (u64, u64)> {
    page_size_strategy().prop_flat_map(|page_size| (Just(page_size), 0..=page_size))
}

/// Strategy for generating plain SQL identifiers, optionally table-qualified
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,30}",
        "[a-z_][a-z0-9_]{0,15}\\.[a-z_][a-z0-9_]{0,15}",
    ]
}

/// Strategy for generating column values whose leading letters are mixed case
pub fn name_values_strategy() -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(prop::option::of("[a-zA-Z][a-z]{0,8}"), 0..40)
}

/// Strategy for generating keyword id lists with duplicates
pub fn keyword_ids_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..=20, 0..12)
}

/// Strategy for generating session ids of a given minimum length
pub fn session_id_strategy(min_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('a', 'z'), min_len..min_len + 30)
        .prop_map(|chars| chars.into_iter().collect())
}
