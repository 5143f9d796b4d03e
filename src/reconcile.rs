//! Dual-store selection reconciliation engine.
//!
//! Each pass drives the spatial viewer's selection from the database
//! filter (or from the single active record), counts incids, parent ids,
//! and fragments on both sides, and classifies the drift between them.
//! The resulting report is the sole input of the structural-operation
//! gate; the engine itself never mutates either store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::predicate::Predicate;
use crate::selection::SelectionSet;
use crate::spatial::{SpatialLayer, SpatialSelection, UiBoundary};
use crate::store::RelationalStore;
use crate::types::{IncidKey, Result, TessellaError};

/// Distinct incid / parent-id / fragment tallies for one side of a pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Distinct incids.
    pub incids: u64,
    /// Distinct (incid, parent) pairs.
    pub parent_ids: u64,
    /// Individual fragment rows.
    pub fragments: u64,
}

impl Counts {
    /// Tallies a spatial reply. The features are grouped by incid first;
    /// that grouping is reused to count distinct parents and then rows, so
    /// the three tallies always agree on the same grouping.
    pub fn of_selection(selection: &SpatialSelection) -> Self {
        let mut rows: Vec<_> = selection
            .features
            .iter()
            .map(|f| (&f.incid, f.parent, f.fragment))
            .collect();
        rows.sort();

        let mut counts = Counts::default();
        let mut last_incid: Option<&IncidKey> = None;
        let mut last_parent = None;
        for (incid, parent, _fragment) in rows {
            if last_incid != Some(incid) {
                counts.incids += 1;
                last_incid = Some(incid);
                last_parent = None;
            }
            if last_parent != Some(parent) {
                counts.parent_ids += 1;
                last_parent = Some(parent);
            }
            counts.fragments += 1;
        }
        counts
    }
}

/// Classification of the mismatch between database-expected and
/// GIS-reported counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drift {
    /// Both sides agree.
    None,
    /// The viewer holds a subset of the database selection. Recoverable;
    /// surfaced as a warning.
    GisShort,
    /// The viewer holds features the database does not expect (orphans).
    /// Always surfaced as a hard warning, never auto-resolved; blocks
    /// every structural operation.
    GisExcess,
}

/// Terminal state of a reconciliation pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassOutcome {
    /// Counts matched.
    Consistent,
    /// Counts disagreed; see [`ReconciliationReport::drift`].
    DriftWarning,
    /// Neither side holds anything.
    EmptyResult,
}

/// Phases a pass moves through; tracked for observability.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassPhase {
    /// No pass in flight.
    Idle,
    /// Predicates built from the selection.
    PredicateBuilt,
    /// Request submitted to the spatial layer.
    AwaitingSpatialReply,
    /// Reply grouped and counted.
    Analyzed,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Counts the database expects for the selection.
    pub db_expected: Counts,
    /// Counts the spatial layer actually reported.
    pub gis_actual: Counts,
    /// Drift classification.
    pub drift: Drift,
    /// Terminal pass state.
    pub outcome: PassOutcome,
}

impl ReconciliationReport {
    /// One-line description for the UI warning channel.
    pub fn summary(&self) -> String {
        format!(
            "expected {} incids / {} parents / {} fragments, viewer reports {} / {} / {} ({:?})",
            self.db_expected.incids,
            self.db_expected.parent_ids,
            self.db_expected.fragments,
            self.gis_actual.incids,
            self.gis_actual.parent_ids,
            self.gis_actual.fragments,
            self.drift,
        )
    }
}

/// Engine configuration.
#[derive(Clone, Debug, Default)]
pub struct ReconcileCfg {
    /// When set, selections whose estimated feature count reaches this
    /// value require operator confirmation before submission.
    pub confirm_threshold: Option<u64>,
}

/// Drives reconciliation passes against the injected collaborators.
pub struct ReconcileEngine {
    store: Arc<dyn RelationalStore>,
    spatial: Arc<dyn SpatialLayer>,
    ui: Arc<dyn UiBoundary>,
    cfg: ReconcileCfg,
    phase: PassPhase,
}

impl ReconcileEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        store: Arc<dyn RelationalStore>,
        spatial: Arc<dyn SpatialLayer>,
        ui: Arc<dyn UiBoundary>,
        cfg: ReconcileCfg,
    ) -> Self {
        Self {
            store,
            spatial,
            ui,
            cfg,
            phase: PassPhase::Idle,
        }
    }

    /// Phase of the pass currently (or last) in flight.
    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    /// Reconciles the viewer against the whole selection.
    ///
    /// `size_hint` is the caller's estimate of the feature count, used only
    /// for the large-selection confirmation prompt; when absent the key
    /// count stands in.
    pub fn reconcile_selection(
        &mut self,
        selection: &SelectionSet,
        size_hint: Option<u64>,
    ) -> Result<ReconciliationReport> {
        if selection.is_empty() {
            self.phase = PassPhase::Analyzed;
            return Ok(self.analyze(Counts::default(), Counts::default()));
        }
        let estimated = size_hint.unwrap_or(selection.len() as u64);
        self.run_pass(selection.keys(), estimated)
    }

    /// Reconciles the viewer against the single active record.
    pub fn reconcile_record(&mut self, incid: &IncidKey) -> Result<ReconciliationReport> {
        self.run_pass(std::slice::from_ref(incid), 1)
    }

    fn run_pass(&mut self, keys: &[IncidKey], estimated: u64) -> Result<ReconciliationReport> {
        // Exactly one spatial submission per pass. The viewer replaces its
        // selection wholesale on each request, so splitting the keys across
        // several requests would leave it holding only the last piece while
        // the report certifies the whole selection.
        let predicate = Predicate::KeyIn(keys.to_vec());
        let limit = self.spatial.max_predicate_length();
        let use_join = predicate.serialized_len() > limit;
        self.phase = PassPhase::PredicateBuilt;
        debug!(keys = keys.len(), use_join, "reconcile.predicate");

        if let Some(threshold) = self.cfg.confirm_threshold {
            if estimated >= threshold && !self.ui.confirm_large_selection(estimated) {
                self.phase = PassPhase::Idle;
                return Err(TessellaError::Cancelled);
            }
        }

        self.phase = PassPhase::AwaitingSpatialReply;
        let (gis, db) = if use_join {
            // Too long for a literal predicate: write the keys to the
            // scratch table and select by join instead. The substitution
            // only changes which request is sent.
            self.store
                .write_scratch(keys)
                .map_err(|e| TessellaError::ScratchWriteFailed(e.to_string()))?;
            let reply = self.spatial.select_by_join()?;
            let expected = self.store.count_features(&Predicate::ScratchJoin)?;
            (Counts::of_selection(&reply), expected)
        } else {
            let reply = self.spatial.select_by_predicate(&predicate)?;
            let expected = self.store.count_features(&predicate)?;
            (Counts::of_selection(&reply), expected)
        };

        self.phase = PassPhase::Analyzed;
        Ok(self.analyze(db, gis))
    }

    fn analyze(&self, db: Counts, gis: Counts) -> ReconciliationReport {
        let drift = if gis.incids > db.incids
            || gis.parent_ids > db.parent_ids
            || gis.fragments > db.fragments
        {
            Drift::GisExcess
        } else if gis != db {
            Drift::GisShort
        } else {
            Drift::None
        };

        let outcome = if db == Counts::default() && gis == Counts::default() {
            PassOutcome::EmptyResult
        } else if drift == Drift::None {
            PassOutcome::Consistent
        } else {
            PassOutcome::DriftWarning
        };

        let report = ReconciliationReport {
            db_expected: db,
            gis_actual: gis,
            drift,
            outcome,
        };

        match drift {
            Drift::None => debug!(outcome = ?report.outcome, "reconcile.consistent"),
            Drift::GisShort => {
                warn!(summary = %report.summary(), "reconcile.drift.short");
                self.ui.report_warning(&report.summary());
            }
            Drift::GisExcess => {
                // Orphan features in the viewer. Never corrected silently.
                warn!(summary = %report.summary(), "reconcile.drift.excess");
                self.ui.report_warning(&report.summary());
            }
        }
        report
    }
}
