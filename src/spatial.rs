//! Spatial layer and UI boundary collaborator contracts.

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;
use crate::types::{FragmentId, IncidKey, ParentId, Result};

/// One feature reported by the spatial layer. Depending on query
/// granularity the parent and fragment columns may be unpopulated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialFeature {
    /// Key of the incid the feature belongs to.
    pub incid: IncidKey,
    /// Shared-origin grouping, when reported.
    pub parent: Option<ParentId>,
    /// Individual piece, when reported.
    pub fragment: Option<FragmentId>,
}

/// The feature set currently highlighted in the external viewer.
///
/// Rebuilt whole on every reconciliation pass, never patched in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialSelection {
    /// Reported features, in the layer's own order.
    pub features: Vec<SpatialFeature>,
}

impl SpatialSelection {
    /// A selection over the given features.
    pub fn new(features: Vec<SpatialFeature>) -> Self {
        Self { features }
    }

    /// Whether the layer reported nothing.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Drives and queries the external spatial viewer's highlighted set.
pub trait SpatialLayer: Send + Sync + 'static {
    /// Replaces the viewer's selection with the features matching the
    /// predicate, returning what is now selected.
    fn select_by_predicate(&self, predicate: &Predicate) -> Result<SpatialSelection>;

    /// Replaces the viewer's selection by joining against the scratch side
    /// table last written through the relational store.
    fn select_by_join(&self) -> Result<SpatialSelection>;

    /// Clears the viewer's selection.
    fn clear_selection(&self) -> Result<()>;

    /// Zooms the viewer to the given selection, never closer than
    /// `min_zoom`.
    fn zoom_to(&self, selection: &SpatialSelection, min_zoom: f64) -> Result<()>;

    /// Longest serialized predicate the viewer's backend accepts.
    fn max_predicate_length(&self) -> usize;
}

/// Tri-state answer to a discard-edits prompt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Keep the edits and continue.
    Proceed,
    /// Throw the edits away, then continue.
    Abandon,
    /// Abort the requested operation entirely.
    Cancel,
}

/// The UI layer as seen from the core: confirmation prompts and warnings.
/// The core calls it once per question and acts on the typed result; no UI
/// flow logic lives below this trait.
pub trait UiBoundary: Send + Sync + 'static {
    /// Asks whether a large/expensive selection should be sent to the
    /// spatial layer.
    fn confirm_large_selection(&self, estimated_count: u64) -> bool;

    /// Asks what to do with unsaved edits before navigating away.
    fn confirm_discard_edits(&self) -> Decision;

    /// Surfaces a non-fatal warning to the operator.
    fn report_warning(&self, message: &str);
}
