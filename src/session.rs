//! The browsing session: single logical owner of cursor, filter, guard
//! snapshot, and the latest reconciliation report.
//!
//! One navigation or reconciliation is in flight at a time. A navigation
//! superseded by a newer request has its result discarded on completion
//! (last-request-wins); nothing is queued, and no background thread ever
//! owns session state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SessionOptions;
use crate::cursor::WindowedCursor;
use crate::gate::{SessionMode, StructuralGate};
use crate::guard;
use crate::predicate::Predicate;
use crate::reconcile::{ReconcileCfg, ReconcileEngine, ReconciliationReport};
use crate::record::{Record, Snapshot};
use crate::selection::SelectionSet;
use crate::spatial::{Decision, SpatialLayer, SpatialSelection, UiBoundary};
use crate::store::{RelationalStore, RetryingStore};
use crate::types::{Result, TessellaError};

/// Result of a guarded navigation request.
#[derive(Clone, Debug, PartialEq)]
pub enum NavOutcome {
    /// The cursor moved; this record is now active.
    Moved(Record),
    /// The operator cancelled to keep unsaved edits; nothing changed.
    Cancelled,
    /// The request was superseded via [`SupersedeHandle::supersede`] while
    /// its load was in flight; its result was discarded.
    Superseded,
}

/// Cloneable handle marking in-flight navigations stale.
///
/// The UI boundary keeps a clone on its event thread. Bumping it while a
/// [`Session::goto_row`] load is blocking makes that request's result be
/// discarded on completion instead of installed (last-request-wins); the
/// caller then issues the newer request.
#[derive(Clone, Debug, Default)]
pub struct SupersedeHandle(Arc<AtomicU64>);

impl SupersedeHandle {
    /// Marks any navigation currently in flight as superseded.
    pub fn supersede(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn generation(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Browsing session over the ordered table and the spatial viewer.
pub struct Session {
    spatial: Arc<dyn SpatialLayer>,
    ui: Arc<dyn UiBoundary>,
    cursor: WindowedCursor,
    engine: ReconcileEngine,
    filter: Option<SelectionSet>,
    current: Option<Record>,
    snapshot: Option<Snapshot>,
    last_report: Option<ReconciliationReport>,
    mode: SessionMode,
    min_zoom: f64,
    supersede: SupersedeHandle,
}

impl Session {
    /// Opens a session over the injected collaborators.
    pub fn open(options: SessionOptions) -> Self {
        let store: Arc<dyn RelationalStore> = if options.retry_reads {
            Arc::new(RetryingStore::new(options.store.clone()))
        } else {
            options.store.clone()
        };
        let engine = ReconcileEngine::new(
            store.clone(),
            options.spatial.clone(),
            options.ui.clone(),
            ReconcileCfg {
                confirm_threshold: options.confirm_threshold,
            },
        );
        Self {
            spatial: options.spatial,
            ui: options.ui,
            cursor: WindowedCursor::new(store, options.page_size),
            engine,
            filter: None,
            current: None,
            snapshot: None,
            last_report: None,
            mode: options.mode,
            min_zoom: options.min_zoom,
            supersede: SupersedeHandle::default(),
        }
    }

    /// Handle for superseding in-flight navigations from another thread.
    pub fn supersede_handle(&self) -> SupersedeHandle {
        self.supersede.clone()
    }

    /// The active record, if any.
    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Mutable access to the active record for editing.
    pub fn current_mut(&mut self) -> Option<&mut Record> {
        self.current.as_mut()
    }

    /// The active filter; `None` means the whole table is addressable.
    pub fn filter(&self) -> Option<&SelectionSet> {
        self.filter.as_ref()
    }

    /// The latest reconciliation report, if a pass has run.
    pub fn last_report(&self) -> Option<&ReconciliationReport> {
        self.last_report.as_ref()
    }

    /// The session mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Switches the session mode.
    pub fn set_mode(&mut self, mode: SessionMode) {
        info!(?mode, "session.mode");
        self.mode = mode;
    }

    /// Whether the active record has unsaved edits.
    pub fn is_dirty(&self) -> bool {
        match (&self.current, &self.snapshot) {
            (Some(record), Some(snap)) => guard::is_dirty(record, snap),
            _ => false,
        }
    }

    /// Re-snapshots the active record after the caller has persisted its
    /// edits, consuming the previous snapshot.
    pub fn commit_edits(&mut self) {
        if let Some(record) = &self.current {
            self.snapshot = Some(guard::snapshot(record));
        }
    }

    /// Navigates to `row`: an absolute table row without a filter, or a
    /// selection row when a filter is active. Unsaved edits are guarded
    /// first; `NoRecordFound` under a filter means the selection is stale
    /// and must be rebuilt via [`Session::apply_filter`].
    pub fn goto_row(&mut self, row: u64) -> Result<NavOutcome> {
        if let (Some(record), Some(snap)) = (&mut self.current, &self.snapshot) {
            match guard::guard_navigation(record, snap, self.ui.as_ref()) {
                Decision::Cancel => {
                    debug!(row, "session.nav.cancelled");
                    return Ok(NavOutcome::Cancelled);
                }
                Decision::Proceed | Decision::Abandon => {}
            }
        }

        let ticket = self.supersede.generation();

        let record = match &self.filter {
            Some(selection) => self.cursor.goto_filtered(selection, row)?,
            None => self.cursor.goto_absolute(row)?,
        };

        // Last-request-wins: a bump of the supersede handle while the load
        // was in flight discards the result instead of installing stale
        // state. The cursor keeps the rows it loaded; they are a cache.
        if ticket != self.supersede.generation() {
            debug!(row, ticket, "session.nav.superseded");
            return Ok(NavOutcome::Superseded);
        }

        self.snapshot = Some(guard::snapshot(&record));
        self.current = Some(record.clone());
        debug!(row, incid = %record.incid(), "session.nav.moved");
        Ok(NavOutcome::Moved(record))
    }

    /// Installs a new filter and moves to its first row. The previous
    /// window is dropped; the selection itself is immutable.
    pub fn apply_filter(&mut self, selection: SelectionSet) -> Result<NavOutcome> {
        info!(keys = selection.len(), "session.filter.apply");
        self.cursor.invalidate();
        self.filter = Some(selection);
        if self.filter.as_ref().is_some_and(SelectionSet::is_empty) {
            // Active-but-empty filter: terminal until a new one is built.
            self.current = None;
            self.snapshot = None;
            return Err(TessellaError::NoRecordFound);
        }
        self.goto_row(1)
    }

    /// Clears the filter; the whole table is addressable again.
    pub fn clear_filter(&mut self) {
        info!("session.filter.clear");
        self.cursor.invalidate();
        self.filter = None;
    }

    /// Runs a reconciliation pass over the active filter (or the active
    /// record when no filter is set) and retains the report for gating.
    pub fn reconcile(&mut self, size_hint: Option<u64>) -> Result<ReconciliationReport> {
        let report = match (&self.filter, &self.current) {
            (Some(selection), _) => self.engine.reconcile_selection(selection, size_hint)?,
            (None, Some(record)) => self.engine.reconcile_record(record.incid())?,
            (None, None) => return Err(TessellaError::NoRecordFound),
        };
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Gate over the latest report; `None` until a pass has run.
    pub fn gate(&self) -> Option<StructuralGate<'_>> {
        self.last_report
            .as_ref()
            .map(|report| StructuralGate::new(report, self.mode))
    }

    /// Zooms the viewer to the active record's features.
    pub fn zoom_to_current(&self) -> Result<()> {
        let record = self.current.as_ref().ok_or(TessellaError::NoRecordFound)?;
        let selection = self
            .spatial
            .select_by_predicate(&Predicate::KeyIn(vec![record.incid().clone()]))?;
        self.spatial.zoom_to(&selection, self.min_zoom)
    }

    /// Clears the viewer's selection.
    pub fn clear_spatial_selection(&self) -> Result<()> {
        self.spatial.clear_selection()
    }

    /// The viewer selection for the active record, without changing any
    /// session state.
    pub fn current_features(&self) -> Result<SpatialSelection> {
        let record = self.current.as_ref().ok_or(TessellaError::NoRecordFound)?;
        self.spatial
            .select_by_predicate(&Predicate::KeyIn(vec![record.incid().clone()]))
    }
}
