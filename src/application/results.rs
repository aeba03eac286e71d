//! Read-only projection over a received result set.

use crate::domain::{ComparisonRow, RowType};
use std::collections::HashSet;

const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    RatioAscending,
    RatioDescending,
    RowType,
}

/// Row counts per type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSummary {
    pub total: usize,
    counts: Vec<(RowType, usize)>,
}

impl RowSummary {
    fn of(rows: &[ComparisonRow]) -> Self {
        let counts = RowType::ALL
            .iter()
            .map(|t| (*t, rows.iter().filter(|r| r.row_type == *t).count()))
            .collect();
        Self {
            total: rows.len(),
            counts,
        }
    }

    pub fn count(&self, row_type: RowType) -> usize {
        self.counts
            .iter()
            .find(|(t, _)| *t == row_type)
            .map_or(0, |(_, n)| *n)
    }

    /// Non-zero counts in type order.
    pub fn non_zero(&self) -> impl Iterator<Item = (RowType, usize)> + '_ {
        self.counts.iter().copied().filter(|(_, n)| *n > 0)
    }

    pub fn changed(&self) -> usize {
        self.total - self.count(RowType::Equal)
    }
}

/// Owns the rows of one completed comparison.
///
/// The received order is canonical; filters, sorting and paging only change
/// what [`ResultView::visible`] returns.
#[derive(Debug, Clone)]
pub struct ResultView {
    rows: Vec<ComparisonRow>,
    type_filter: Option<HashSet<RowType>>,
    query: String,
    sort: Option<SortKey>,
    page_size: usize,
    page: usize,
}

impl ResultView {
    pub fn new(rows: Vec<ComparisonRow>) -> Self {
        Self {
            rows,
            type_filter: None,
            query: String::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }

    /// All rows in service order.
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> RowSummary {
        RowSummary::of(&self.rows)
    }

    pub fn filter_types(&mut self, types: impl IntoIterator<Item = RowType>) {
        self.type_filter = Some(types.into_iter().collect());
        self.page = 0;
    }

    pub fn clear_type_filter(&mut self) {
        self.type_filter = None;
        self.page = 0;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into().trim().to_string();
        self.page = 0;
    }

    pub fn sort_by(&mut self, key: SortKey) {
        self.sort = Some(key);
    }

    /// Back to the order the service returned.
    pub fn reset_sort(&mut self) {
        self.sort = None;
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count().saturating_sub(1));
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.visible().len().div_ceil(self.page_size).max(1)
    }

    fn keeps(&self, row: &ComparisonRow) -> bool {
        self.type_filter
            .as_ref()
            .is_none_or(|types| types.contains(&row.row_type))
            && row.matches_query(&self.query)
    }

    /// Filtered and sorted rows across all pages.
    pub fn visible(&self) -> Vec<&ComparisonRow> {
        let mut rows: Vec<_> = self.rows.iter().filter(|r| self.keeps(r)).collect();
        match self.sort {
            Some(SortKey::RatioAscending) => {
                rows.sort_by(|a, b| a.similarity_ratio.total_cmp(&b.similarity_ratio))
            }
            Some(SortKey::RatioDescending) => {
                rows.sort_by(|a, b| b.similarity_ratio.total_cmp(&a.similarity_ratio))
            }
            Some(SortKey::RowType) => rows.sort_by_key(|r| r.row_type.rank()),
            None => {}
        }
        rows
    }

    /// Rows of the current page.
    pub fn current_page(&self) -> Vec<&ComparisonRow> {
        self.visible()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Owned copy of the projection, for export.
    pub fn projected(&self) -> Vec<ComparisonRow> {
        self.visible().into_iter().cloned().collect()
    }
}
