use serde::{Deserialize, Serialize};

/// Page size used when none is configured.
pub const DEFAULT_ROWS_PER_PAGE: u64 = 20;

/// Largest offset a database will accept in OFFSET and the stored state.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// LIMIT/OFFSET parameters for SQL queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    /// Create pagination with only limit
    pub fn limit_only(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// Create pagination with both limit and offset
    pub fn limit_offset(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }
}

/// One page link: zero-based page index and its row offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub index: u64,
    pub offset: u64,
}

/// Lazy sequence of page windows; clone it to iterate again.
#[derive(Debug, Clone)]
pub struct PageWindows {
    page_size: u64,
    total: u64,
    next_index: u64,
}

impl Iterator for PageWindows {
    type Item = PageWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next_index.checked_mul(self.page_size)?;
        if offset >= self.total {
            return None;
        }
        let window = PageWindow {
            index: self.next_index,
            offset,
        };
        self.next_index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining_rows = self
            .total
            .saturating_sub(self.next_index.saturating_mul(self.page_size));
        let remaining =
            usize::try_from(remaining_rows.div_ceil(self.page_size)).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PageWindows {}

/// The "previous" link of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreviousPage {
    /// Already on the first page
    FirstPage,
    Offset(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub previous: PreviousPage,
    pub next: Option<u64>,
}

/// "Showing `from`-`to` of `total`"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayRange {
    pub from: u64,
    pub to: u64,
    pub total: u64,
}

/// Paging state of one query: page size, current offset and the number of
/// rows matching the search.
///
/// Pagination is only in effect when more rows match than fit on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    trigger_name: String,
    page_size: u64,
    current_offset: u64,
    total_matching_rows: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new("", DEFAULT_ROWS_PER_PAGE)
    }
}

impl Paginator {
    /// A zero page size falls back to [`DEFAULT_ROWS_PER_PAGE`].
    pub fn new(trigger_name: &str, page_size: u64) -> Self {
        Self {
            trigger_name: trigger_name.to_string(),
            page_size: if page_size > 0 { page_size } else { DEFAULT_ROWS_PER_PAGE },
            current_offset: 0,
            total_matching_rows: 0,
        }
    }

    pub fn trigger_name(&self) -> &str {
        &self.trigger_name
    }

    pub fn set_trigger_name(&mut self, trigger_name: &str) {
        self.trigger_name = trigger_name.to_string();
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Ignored unless `page_size` is positive.
    pub fn set_page_size(&mut self, page_size: u64) {
        if page_size > 0 {
            self.page_size = page_size;
        }
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Clamped to [`MAX_OFFSET`].
    pub fn set_current_offset(&mut self, offset: u64) {
        self.current_offset = offset.min(MAX_OFFSET);
    }

    pub fn total_matching_rows(&self) -> u64 {
        self.total_matching_rows
    }

    pub fn compute_total(&mut self, row_count: u64) {
        self.total_matching_rows = row_count;
    }

    /// True when more rows match than fit on one page
    pub fn is_needed(&self) -> bool {
        self.total_matching_rows > self.page_size
    }

    pub fn windows(&self) -> PageWindows {
        PageWindows {
            page_size: self.page_size,
            total: if self.is_needed() { self.total_matching_rows } else { 0 },
            next_index: 0,
        }
    }

    pub fn navigation(&self, current_offset: u64) -> Option<Navigation> {
        if !self.is_needed() {
            return None;
        }

        let previous = if current_offset > 0 {
            PreviousPage::Offset(current_offset.saturating_sub(self.page_size))
        } else {
            PreviousPage::FirstPage
        };

        let next = (current_offset < self.total_matching_rows - self.page_size)
            .then(|| current_offset + self.page_size);

        Some(Navigation { previous, next })
    }

    pub fn display_range(&self, current_offset: u64) -> DisplayRange {
        DisplayRange {
            from: current_offset.saturating_add(1),
            to: current_offset
                .saturating_add(self.page_size)
                .min(self.total_matching_rows),
            total: self.total_matching_rows,
        }
    }

    /// LIMIT/OFFSET for the current page, when pagination is in effect
    pub fn limit(&self) -> Option<Pagination> {
        self.is_needed()
            .then(|| Pagination::limit_offset(self.page_size, self.current_offset))
    }
}
