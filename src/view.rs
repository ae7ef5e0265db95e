use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Fixed(usize),
    All,
}

pub const PAGE_SIZES: [PageSize; 5] = [
    PageSize::Fixed(10),
    PageSize::Fixed(25),
    PageSize::Fixed(50),
    PageSize::Fixed(100),
    PageSize::All,
];

pub const DEFAULT_PAGE_SIZE: PageSize = PageSize::Fixed(10);

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Fixed(size) => write!(f, "{size}"),
            PageSize::All => write!(f, "All"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "All Categories"),
            CategoryFilter::Only(c) if c.is_empty() => write!(f, "∅"),
            CategoryFilter::Only(c) => write!(f, "{c}"),
        }
    }
}

/// `needle` must already be lower case.
pub fn matches_search(row: &Row, needle: &str) -> bool {
    needle.is_empty()
        || row
            .fields()
            .iter()
            .any(|value| value.to_lowercase().contains(needle))
}

pub fn matches_category(row: &Row, filter: &CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(category) => row.category.to_lowercase() == category.to_lowercase(),
    }
}

/// Indices of all rows passing both filters, in source order.
pub fn filter_rows(rows: &[Row], search: &str, category: &CategoryFilter) -> Vec<usize> {
    let needle = search.to_lowercase();
    rows.par_iter()
        .enumerate()
        .filter(|(_, row)| matches_category(row, category) && matches_search(row, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

pub fn page_count(nrows: usize, page_size: PageSize) -> usize {
    match page_size {
        PageSize::Fixed(size) => nrows.div_ceil(size.max(1)),
        PageSize::All => 1,
    }
}

pub fn page_range(nrows: usize, page_size: PageSize, page: usize) -> Range<usize> {
    match page_size {
        PageSize::Fixed(size) => {
            let size = size.max(1);
            let begin = std::cmp::min(page.saturating_mul(size), nrows);
            let end = std::cmp::min(begin.saturating_add(size), nrows);
            begin..end
        }
        PageSize::All => 0..nrows,
    }
}

pub fn summary(nrows: usize, page_size: PageSize, page: usize) -> String {
    let range = page_range(nrows, page_size, page);
    if range.is_empty() {
        format!("Showing 0 to 0 of {nrows} entries")
    } else {
        format!(
            "Showing {} to {} of {nrows} entries",
            range.start + 1,
            range.end
        )
    }
}

/// `All` followed by the distinct categories in order of first appearance.
/// Spellings differing only in case collapse onto the first one seen.
pub fn categories(rows: &[Row]) -> Vec<CategoryFilter> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = vec![CategoryFilter::All];
    for row in rows {
        let key = row.category.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(CategoryFilter::Only(row.category.clone()));
        }
    }
    out
}

/// View state over a shared, read only row set. Every setter recomputes the
/// filtered projection and returns to the first page.
pub struct TableView {
    data: Arc<Vec<Row>>,
    rows: Arc<Vec<usize>>, // Mapping of view index to data index
    categories: Vec<CategoryFilter>,
    search: String,
    category: CategoryFilter,
    page_size: PageSize,
    page: usize,
    curser_row: usize,
}

impl TableView {
    pub fn new(data: Arc<Vec<Row>>, page_size: PageSize) -> Self {
        let categories = categories(&data);
        let mut view = TableView {
            data,
            rows: Arc::new(Vec::new()),
            categories,
            search: String::new(),
            category: CategoryFilter::All,
            page_size,
            page: 0,
            curser_row: 0,
        };
        view.refilter();
        view
    }

    /// Swaps in a freshly loaded row set, keeping the view parameters.
    pub fn replace_data(&mut self, data: Arc<Vec<Row>>) {
        self.categories = categories(&data);
        if !self.categories.contains(&self.category) {
            self.category = CategoryFilter::All;
        }
        self.data = data;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.rows = Arc::new(filter_rows(&self.data, &self.search, &self.category));
        self.page = 0;
        self.curser_row = 0;
        trace!(
            "Filter search={:?} category={} -> {}/{} rows",
            self.search,
            self.category,
            self.rows.len(),
            self.data.len()
        );
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.refilter();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
        self.refilter();
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 0;
        self.curser_row = 0;
    }

    pub fn cycle_category(&mut self, step: isize) {
        let current = self
            .categories
            .iter()
            .position(|c| *c == self.category)
            .unwrap_or(0);
        let next = cycle(current, self.categories.len(), step);
        if let Some(category) = self.categories.get(next).cloned() {
            self.set_category(category);
        }
    }

    pub fn cycle_page_size(&mut self, step: isize) {
        let current = PAGE_SIZES.iter().position(|p| *p == self.page_size);
        let next = match current {
            Some(idx) => PAGE_SIZES[cycle(idx, PAGE_SIZES.len(), step)],
            // Sizes given on the command line are not part of the menu
            None => DEFAULT_PAGE_SIZE,
        };
        self.set_page_size(next);
    }

    pub fn page_count(&self) -> usize {
        page_count(self.rows.len(), self.page_size)
    }

    fn last_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn can_next_page(&self) -> bool {
        self.page < self.last_page()
    }

    pub fn can_previous_page(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&mut self) -> bool {
        if !self.can_next_page() {
            return false;
        }
        self.page += 1;
        self.curser_row = 0;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.can_previous_page() {
            return false;
        }
        self.page -= 1;
        self.curser_row = 0;
        true
    }

    pub fn first_page(&mut self) {
        self.page = 0;
        self.curser_row = 0;
    }

    pub fn last_page_jump(&mut self) {
        self.page = self.last_page();
        self.curser_row = 0;
    }

    pub fn move_curser(&mut self, step: isize) {
        let len = self.page_rows().len();
        if len == 0 {
            self.curser_row = 0;
        } else {
            self.curser_row = self.curser_row.saturating_add_signed(step).min(len - 1);
        }
    }

    pub fn page_rows(&self) -> Vec<&Row> {
        let range = page_range(self.rows.len(), self.page_size, self.page);
        self.rows[range].iter().map(|&idx| &self.data[idx]).collect()
    }

    pub fn summary(&self) -> String {
        summary(self.rows.len(), self.page_size, self.page)
    }

    pub fn filtered_len(&self) -> usize {
        self.rows.len()
    }

    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn curser_row(&self) -> usize {
        self.curser_row
    }
}

fn cycle(current: usize, len: usize, step: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + step).rem_euclid(len as isize) as usize
}
