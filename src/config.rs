//! Session configuration.

use std::sync::Arc;

use crate::gate::SessionMode;
use crate::spatial::{SpatialLayer, UiBoundary};
use crate::store::RelationalStore;

/// Options supplied when opening a [`crate::session::Session`].
///
/// Collaborators are injected here and shared by handle; the session never
/// reaches into process-global state.
#[derive(Clone)]
pub struct SessionOptions {
    /// The relational store adapter.
    pub store: Arc<dyn RelationalStore>,
    /// The spatial layer adapter.
    pub spatial: Arc<dyn SpatialLayer>,
    /// The UI boundary for prompts and warnings.
    pub ui: Arc<dyn UiBoundary>,
    /// Rows cached per cursor window. Fixed for the session's lifetime.
    pub page_size: usize,
    /// When set, selections estimated at or above this many features
    /// require operator confirmation before a reconciliation pass submits.
    pub confirm_threshold: Option<u64>,
    /// Whether idempotent store reads are retried once on failure.
    pub retry_reads: bool,
    /// Closest zoom the viewer may reach when zooming to a selection.
    pub min_zoom: f64,
    /// Initial session mode.
    pub mode: SessionMode,
}

impl SessionOptions {
    /// Creates options with default tuning over the given collaborators.
    pub fn new(
        store: Arc<dyn RelationalStore>,
        spatial: Arc<dyn SpatialLayer>,
        ui: Arc<dyn UiBoundary>,
    ) -> Self {
        Self {
            store,
            spatial,
            ui,
            page_size: 50,
            confirm_threshold: None,
            retry_reads: true,
            min_zoom: 1.0,
            mode: SessionMode::Normal,
        }
    }

    /// Sets the cursor window size.
    pub fn page_size(mut self, rows: usize) -> Self {
        self.page_size = rows;
        self
    }

    /// Requires confirmation for selections estimated at or above
    /// `features`.
    pub fn confirm_threshold(mut self, features: u64) -> Self {
        self.confirm_threshold = Some(features);
        self
    }

    /// Enables or disables the single read retry.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = enabled;
        self
    }

    /// Sets the minimum zoom for [`crate::session::Session::zoom_to_current`].
    pub fn min_zoom(mut self, zoom: f64) -> Self {
        self.min_zoom = zoom;
        self
    }

    /// Sets the initial session mode.
    pub fn mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }
}
