// 🔎 View Engine - search, filter, sort and paginate a table snapshot
// Views are pure: the same snapshot and query always give the same rows.

use crate::record::{Record, Table};
use crate::schema::Column;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 24;

/// Filter value meaning "no constraint"
pub const SHOW_ALL: &str = "All";

// ============================================================================
// QUERY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Case-insensitive substring; blank matches everything
    pub search_text: String,

    /// Columns searched. None searches every column.
    pub search_columns: Option<Vec<Column>>,

    /// Exact-match constraints; SHOW_ALL or "" means no constraint
    pub filters: BTreeMap<Column, String>,

    pub sort_key: Option<Column>,

    pub page_index: usize,

    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            search_columns: None,
            filters: BTreeMap::new(),
            sort_key: None,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn search_in(mut self, columns: Vec<Column>) -> Self {
        self.search_columns = Some(columns);
        self
    }

    pub fn filter(mut self, column: Column, value: impl Into<String>) -> Self {
        self.filters.insert(column, value.into());
        self
    }

    pub fn sort_by(mut self, column: Column) -> Self {
        self.sort_key = Some(column);
        self
    }

    pub fn page(mut self, index: usize) -> Self {
        self.page_index = index;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    fn matches_search(&self, record: &Record) -> bool {
        let needle = self.search_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let columns: &[Column] = match &self.search_columns {
            Some(columns) => columns.as_slice(),
            None => &Column::ALL,
        };
        columns
            .iter()
            .any(|c| record.get(*c).to_lowercase().contains(&needle))
    }

    fn matches_filters(&self, record: &Record) -> bool {
        self.filters.iter().all(|(column, value)| {
            value.is_empty() || value == SHOW_ALL || record.get(*column) == value
        })
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// One page of matching rows. `id` changes with every build so selections
/// taken against an older page can be recognized as stale.
#[derive(Debug, Clone)]
pub struct View {
    pub id: Uuid,
    pub rows: Vec<Record>,
    pub total_count: usize,
    pub page_index: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

impl View {
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages
    }

    pub fn serials(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.serial_no.as_str()).collect()
    }

    /// "Page 2 / 3 (Total: 5)"
    pub fn page_label(&self) -> String {
        format!(
            "Page {} / {} (Total: {})",
            self.page_index + 1,
            self.total_pages.max(1),
            self.total_count
        )
    }
}

/// Rows that pass search and filters, sorted. No pagination.
pub fn matching_rows<'a>(table: &'a Table, query: &ViewQuery) -> Vec<&'a Record> {
    let mut rows: Vec<&Record> = table
        .iter()
        .filter(|r| query.matches_search(r))
        .filter(|r| query.matches_filters(r))
        .collect();

    if let Some(key) = query.sort_key {
        // Stable: equal keys keep table order
        rows.sort_by(|a, b| compare_by(a, b, key));
    }

    rows
}

pub fn build_view(table: &Table, query: &ViewQuery) -> View {
    let matched = matching_rows(table, query);
    let page_size = query.page_size.max(1);
    let total_count = matched.len();
    let total_pages = total_count.div_ceil(page_size);

    let page_index = query.page_index.min(total_pages.saturating_sub(1));
    let rows = matched
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .cloned()
        .collect();

    View {
        id: Uuid::new_v4(),
        rows,
        total_count,
        page_index,
        total_pages,
        page_size,
    }
}

// ============================================================================
// SORTING
// ============================================================================

/// Ascending order. Numeric columns compare as numbers; values that are
/// blank or don't parse go last.
pub fn compare_by(a: &Record, b: &Record, column: Column) -> Ordering {
    let (x, y) = (a.get(column), b.get(column));

    if column.is_numeric() {
        let parse = |v: &str| v.trim().parse::<f64>().ok().filter(|f| !f.is_nan());
        return match (parse(x), parse(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
    }

    match (x.is_empty(), y.is_empty()) {
        (false, false) => x.cmp(y),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

// ============================================================================
// SELECTION
// ============================================================================

/// Per-row checked flags for one view (or one duplicate listing).
/// Keeps the listing order so checked ids come out in display order.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    scope: Uuid,
    entries: Vec<(String, bool)>,
}

impl SelectionSet {
    pub fn new<I, T>(scope: Uuid, serials: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            scope,
            entries: serials.into_iter().map(|s| (s.into(), false)).collect(),
        }
    }

    pub fn for_view(view: &View) -> Self {
        Self::new(view.id, view.rows.iter().map(|r| r.serial_no.clone()))
    }

    /// True if this selection was taken against `view`
    pub fn is_for(&self, view: &View) -> bool {
        self.scope == view.id
    }

    pub fn scope(&self) -> Uuid {
        self.scope
    }

    /// Flip one row. Returns the new state, or None if the row isn't listed.
    pub fn toggle(&mut self, serial: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|(s, _)| s == serial)?;
        entry.1 = !entry.1;
        Some(entry.1)
    }

    /// Check everything, or uncheck everything if all rows were already checked
    pub fn toggle_all(&mut self) {
        let all_checked = !self.entries.is_empty() && self.entries.iter().all(|(_, c)| *c);
        for entry in &mut self.entries {
            entry.1 = !all_checked;
        }
    }

    pub fn is_checked(&self, serial: &str) -> bool {
        self.entries.iter().any(|(s, c)| s == serial && *c)
    }

    pub fn checked_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, c)| *c)
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn checked_count(&self) -> usize {
        self.entries.iter().filter(|(_, c)| *c).count()
    }

    /// Drop a row from the listing entirely
    pub fn remove(&mut self, serial: &str) {
        self.entries.retain(|(s, _)| s != serial);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
