//! Edit-session guard: clone/compare/restore of the active record.

use tracing::debug;

use crate::record::{Record, Snapshot};
use crate::spatial::{Decision, UiBoundary};

/// Captures every field of the active record by value.
pub fn snapshot(record: &Record) -> Snapshot {
    Snapshot::of(record)
}

/// Field-by-field comparison, null-aware: a field moving between absent
/// and present counts as dirty before any value comparison runs.
pub fn is_dirty(record: &Record, snapshot: &Snapshot) -> bool {
    if record.incid() != snapshot.incid() {
        return true;
    }
    let before = snapshot.fields();
    let mut seen = 0usize;
    for (name, value) in record.fields() {
        match before.get(name) {
            None => return true,
            Some(old) => {
                seen += 1;
                if old != value {
                    return true;
                }
            }
        }
    }
    // A field present in the snapshot but cleared since is also a change.
    seen != before.len()
}

/// Copies every snapshot field back onto the record, discarding edits.
pub fn restore(record: &mut Record, snapshot: &Snapshot) {
    record.replace_fields(snapshot.fields().clone());
}

/// Decides whether navigation may leave the active record.
///
/// Clean records always proceed. Dirty records ask the UI boundary once:
/// `Abandon` restores the snapshot before navigation continues, `Cancel`
/// leaves the record and cursor untouched.
pub fn guard_navigation(
    record: &mut Record,
    snapshot: &Snapshot,
    ui: &dyn UiBoundary,
) -> Decision {
    if !is_dirty(record, snapshot) {
        return Decision::Proceed;
    }
    let decision = ui.confirm_discard_edits();
    debug!(incid = %record.incid(), ?decision, "guard.dirty.decision");
    if decision == Decision::Abandon {
        restore(record, snapshot);
    }
    decision
}
