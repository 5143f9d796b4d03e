//! Structural-operation gate.
//!
//! Split and merge eligibility is computed purely from the latest
//! reconciliation report and the session mode. The central safety
//! contract: no structural operation is ever eligible under
//! [`Drift::GisExcess`], because mutating with an orphan feature selected
//! would misattribute a foreign feature's geometry.

use crate::reconcile::{Drift, ReconciliationReport};

/// How the session is being used. Replaces the original nullable tri-state
/// mode flags; gating is exhaustive per variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Ordinary one-record-at-a-time editing.
    #[default]
    Normal,
    /// Bulk attribute update across a selection; structural operations are
    /// suspended for the duration.
    BulkUpdate,
    /// Read-only review of the spatial layer.
    SpatialReview,
}

impl SessionMode {
    fn allows_structural(self) -> bool {
        match self {
            SessionMode::Normal => true,
            SessionMode::BulkUpdate => false,
            SessionMode::SpatialReview => false,
        }
    }
}

/// Eligibility predicates over one reconciliation report.
#[derive(Copy, Clone, Debug)]
pub struct StructuralGate<'a> {
    report: &'a ReconciliationReport,
    mode: SessionMode,
}

impl<'a> StructuralGate<'a> {
    /// Builds the gate for the latest report under the given mode.
    pub fn new(report: &'a ReconciliationReport, mode: SessionMode) -> Self {
        Self { report, mode }
    }

    fn drift_ok(&self) -> bool {
        matches!(self.report.drift, Drift::None | Drift::GisShort)
    }

    fn open(&self) -> bool {
        self.mode.allows_structural() && self.drift_ok()
    }

    /// One incid, multiple parents or fragments among its features, and a
    /// genuine subset of its database fragments selected.
    pub fn can_logical_split(&self) -> bool {
        let gis = self.report.gis_actual;
        let db = self.report.db_expected;
        self.open()
            && gis.incids == 1
            && (gis.parent_ids > 1 || gis.fragments > 1)
            && gis.fragments < db.fragments
    }

    /// One incid, one parent, several selected features sharing that
    /// parent (duplicate or overlapping geometry for one fragment).
    pub fn can_physical_split(&self) -> bool {
        let gis = self.report.gis_actual;
        self.open() && gis.incids == 1 && gis.parent_ids == 1 && gis.fragments > 1
    }

    /// Multiple incids selected for merging into one.
    pub fn can_logical_merge(&self) -> bool {
        self.open() && self.report.gis_actual.incids > 1
    }

    /// Multiple fragments under a single parent of a single incid.
    pub fn can_physical_merge(&self) -> bool {
        let gis = self.report.gis_actual;
        self.open() && gis.incids == 1 && gis.parent_ids == 1 && gis.fragments > 1
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionMode, StructuralGate};
    use crate::reconcile::{Counts, Drift, PassOutcome, ReconciliationReport};

    fn report(db: (u64, u64, u64), gis: (u64, u64, u64), drift: Drift) -> ReconciliationReport {
        ReconciliationReport {
            db_expected: Counts {
                incids: db.0,
                parent_ids: db.1,
                fragments: db.2,
            },
            gis_actual: Counts {
                incids: gis.0,
                parent_ids: gis.1,
                fragments: gis.2,
            },
            drift,
            outcome: PassOutcome::DriftWarning,
        }
    }

    #[test]
    fn logical_split_needs_a_genuine_subset() {
        let subset = report((1, 2, 5), (1, 2, 3), Drift::GisShort);
        assert!(StructuralGate::new(&subset, SessionMode::Normal).can_logical_split());

        let whole = report((1, 2, 5), (1, 2, 5), Drift::None);
        assert!(
            !StructuralGate::new(&whole, SessionMode::Normal).can_logical_split(),
            "selecting every fragment is not a split"
        );
    }

    #[test]
    fn physical_split_and_merge_share_the_duplicate_shape() {
        let dup = report((1, 1, 3), (1, 1, 3), Drift::None);
        let gate = StructuralGate::new(&dup, SessionMode::Normal);
        assert!(gate.can_physical_split());
        assert!(gate.can_physical_merge());
    }

    #[test]
    fn logical_merge_needs_multiple_incids() {
        let multi = report((3, 3, 3), (3, 3, 3), Drift::None);
        assert!(StructuralGate::new(&multi, SessionMode::Normal).can_logical_merge());

        let single = report((1, 1, 1), (1, 1, 1), Drift::None);
        assert!(!StructuralGate::new(&single, SessionMode::Normal).can_logical_merge());
    }

    #[test]
    fn gis_excess_closes_every_gate() {
        // Shapes that would otherwise qualify for each operation.
        let candidates = [
            report((1, 2, 5), (1, 2, 3), Drift::GisExcess),
            report((1, 1, 3), (1, 1, 3), Drift::GisExcess),
            report((3, 3, 3), (3, 3, 3), Drift::GisExcess),
            report((1, 1, 2), (1, 1, 6), Drift::GisExcess),
        ];
        for rep in &candidates {
            let gate = StructuralGate::new(rep, SessionMode::Normal);
            assert!(!gate.can_logical_split());
            assert!(!gate.can_physical_split());
            assert!(!gate.can_logical_merge());
            assert!(!gate.can_physical_merge());
        }
    }

    #[test]
    fn non_normal_modes_suspend_structural_operations() {
        let rep = report((3, 3, 3), (3, 3, 3), Drift::None);
        for mode in [SessionMode::BulkUpdate, SessionMode::SpatialReview] {
            let gate = StructuralGate::new(&rep, mode);
            assert!(!gate.can_logical_merge(), "{mode:?} suspends merges");
            assert!(!gate.can_physical_split(), "{mode:?} suspends splits");
        }
    }
}
