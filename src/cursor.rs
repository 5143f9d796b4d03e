//! Windowed record cursor over the ordered remote table.
//!
//! The cursor keeps one contiguous cached slice of the table (the page
//! window) and resolves absolute or filtered row numbers to records,
//! touching the store only when the request falls outside the window.
//! Window replacement is all-or-nothing: a failed load keeps the previous
//! window intact.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::key::{self, MAX_ORDINAL, MIN_ORDINAL};
use crate::predicate::Predicate;
use crate::record::Record;
use crate::selection::SelectionSet;
use crate::store::RelationalStore;
use crate::types::{IncidKey, Result, TessellaError};

/// Cached contiguous slice of the ordered table.
///
/// Row numbers are 1-based. `rows` are contiguous in key order starting at
/// the row whose position is `min_row`; the window covers
/// `[min_row, min_row + rows.len())`.
#[derive(Clone, Debug)]
pub struct PageWindow {
    min_row: u64,
    rows: Vec<Record>,
    // Filtered windows number rows in selection space; absolute lookups
    // must not trust those row numbers.
    filtered: bool,
}

impl PageWindow {
    fn new(min_row: u64, rows: Vec<Record>) -> Self {
        Self {
            min_row,
            rows,
            filtered: false,
        }
    }

    fn new_filtered(min_row: u64, rows: Vec<Record>) -> Self {
        Self {
            min_row,
            rows,
            filtered: true,
        }
    }

    /// First row number covered by the window.
    pub fn min_row(&self) -> u64 {
        self.min_row
    }

    /// One past the last row number covered by the window.
    pub fn max_row(&self) -> u64 {
        self.min_row + self.rows.len() as u64
    }

    /// Whether `row` falls inside the window.
    pub fn contains(&self, row: u64) -> bool {
        (self.min_row..self.max_row()).contains(&row)
    }

    /// Number of cached rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Key of the first cached row.
    pub fn min_key(&self) -> Option<&IncidKey> {
        self.rows.first().map(Record::incid)
    }

    fn record_at(&self, row: u64) -> Option<&Record> {
        let offset = row.checked_sub(self.min_row)?;
        self.rows.get(offset as usize)
    }

    fn record_by_key(&self, key: &IncidKey) -> Option<&Record> {
        self.rows.iter().find(|r| r.incid() == key)
    }

    fn last(&self) -> Option<&Record> {
        self.rows.last()
    }
}

/// Paged navigator over the ordered table, filtered or unfiltered.
pub struct WindowedCursor {
    store: Arc<dyn RelationalStore>,
    page_size: usize,
    window: Option<PageWindow>,
}

impl WindowedCursor {
    /// Creates a cursor with a fixed page size. The page size is
    /// configuration; the cursor never grows it.
    pub fn new(store: Arc<dyn RelationalStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            window: None,
        }
    }

    /// The currently cached window, if any.
    pub fn window(&self) -> Option<&PageWindow> {
        self.window.as_ref()
    }

    /// Drops the cached window. Called on filter change or forced refill.
    pub fn invalidate(&mut self) {
        self.window = None;
    }

    /// Unfiltered navigation to an absolute row number (1-based).
    ///
    /// A request inside the cached window is served with zero store calls.
    /// A request past the end of the table lands on the table's last row.
    pub fn goto_absolute(&mut self, row: u64) -> Result<Record> {
        let row = row.max(1);
        if let Some(window) = &self.window {
            if !window.filtered {
                if let Some(record) = window.record_at(row) {
                    debug!(row, "cursor.window.hit");
                    return Ok(record.clone());
                }
            }
        }

        let total = self
            .store
            .count_where(&Predicate::All)
            .map_err(load_failed)?;
        if total == 0 {
            return Err(TessellaError::NoRecordFound);
        }

        if row <= self.page_size as u64 {
            // Near the start: the window is simply the first page.
            let rows = self
                .store
                .select_range(&Predicate::All, self.page_size)
                .map_err(load_failed)?;
            return self.install(PageWindow::new(1, rows), row.min(total));
        }

        let past_end = row >= total;
        let target = if past_end { total } else { row };
        let start_row = if past_end {
            // Near the end: window over the last page, report its last row.
            total.saturating_sub(self.page_size as u64 - 1).max(1)
        } else {
            target
        };

        let start_key = self.probe_key_at(start_row)?;
        let rows = self
            .store
            .select_range(&Predicate::KeyAtLeast(start_key), self.page_size)
            .map_err(load_failed)?;
        self.install(PageWindow::new(start_row, rows), target)
    }

    /// Filtered navigation: `row` (1-based) indexes into the selection, not
    /// the table. Clamped to `[1, selection.len()]`.
    ///
    /// `NoRecordFound` means the selection is stale (the record was deleted
    /// upstream); the caller rebuilds the selection and resets to the first
    /// row rather than retrying.
    pub fn goto_filtered(&mut self, selection: &SelectionSet, row: u64) -> Result<Record> {
        if selection.is_empty() {
            return Err(TessellaError::NoRecordFound);
        }
        let len = selection.len() as u64;
        let row = row.clamp(1, len);
        let index = (row - 1) as usize;
        let target = selection
            .get(index)
            .cloned()
            .ok_or(TessellaError::NoRecordFound)?;

        if let Some(window) = &self.window {
            if let Some(record) = window.record_by_key(&target) {
                debug!(row, key = %target, "cursor.window.hit");
                return Ok(record.clone());
            }
        }

        // Window move: backward loads a page ending at the target, forward
        // (and the initial load) a page starting at it.
        let backward = match self.window.as_ref().and_then(PageWindow::min_key) {
            Some(min) => key::to_ordinal(&target)? < key::to_ordinal(min)?,
            None => false,
        };
        let (start, stop) = if backward {
            (index.saturating_sub(self.page_size - 1), index)
        } else {
            (index, (index + self.page_size - 1).min(selection.len() - 1))
        };
        let keys = &selection.keys()[start..=stop];
        let rows = self.store.select_in(keys).map_err(load_failed)?;
        if rows.is_empty() {
            warn!(row, key = %target, "cursor.selection.stale");
            return Err(TessellaError::NoRecordFound);
        }

        let window = PageWindow::new_filtered(start as u64 + 1, rows);
        let found = window.record_by_key(&target).cloned();
        debug!(
            min_row = window.min_row(),
            rows = window.len(),
            "cursor.window.reload"
        );
        self.window = Some(window);
        found.ok_or_else(|| {
            warn!(key = %target, "cursor.selection.stale");
            TessellaError::NoRecordFound
        })
    }

    /// Resolves the key occupying `start_row` by binary search over the
    /// codec's ordinal space, asking the store how many keys order at or
    /// below each candidate. Handles sparse key spaces where ordinal
    /// arithmetic alone would drift.
    fn probe_key_at(&self, start_row: u64) -> Result<IncidKey> {
        let mut lo = MIN_ORDINAL;
        let mut hi = MAX_ORDINAL;
        let mut probes = 0u32;
        // Invariant: count(key <= from_ordinal(hi)) >= start_row.
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let candidate = key::from_ordinal(mid)?;
            let count = self
                .store
                .count_where(&Predicate::KeyAtMost(candidate))
                .map_err(load_failed)?;
            probes += 1;
            if count >= start_row {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        debug!(start_row, probes, "cursor.probe.converged");
        key::from_ordinal(lo)
    }

    fn install(&mut self, window: PageWindow, row: u64) -> Result<Record> {
        let record = window
            .record_at(row)
            .or_else(|| window.last())
            .cloned()
            .ok_or(TessellaError::NoRecordFound)?;
        debug!(
            min_row = window.min_row(),
            max_row = window.max_row(),
            "cursor.window.reload"
        );
        self.window = Some(window);
        Ok(record)
    }
}

fn load_failed(err: TessellaError) -> TessellaError {
    match err {
        // Codec failures abort the seek as-is; the window is untouched.
        TessellaError::MalformedKey(_) => err,
        other => {
            warn!(error = %other, "cursor.load.failed");
            TessellaError::LoadFailed(other.to_string())
        }
    }
}
