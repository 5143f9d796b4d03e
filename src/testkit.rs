//! In-memory fakes for the store, spatial layer, and UI boundary.
//!
//! Test support: the fakes count adapter calls so tests can assert the
//! cursor's zero-I/O window guarantees, and they can be armed to fail the
//! next N calls for error-path coverage. Keys passed to the builders must
//! be codec-valid; the fakes panic on malformed test data.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::key;
use crate::predicate::Predicate;
use crate::record::Record;
use crate::reconcile::Counts;
use crate::spatial::{
    Decision, SpatialFeature, SpatialLayer, SpatialSelection, UiBoundary,
};
use crate::store::RelationalStore;
use crate::types::{FragmentId, IncidKey, ParentId, Result, TessellaError};

type FragmentRow = (IncidKey, ParentId, FragmentId);

fn ordinal(key: &IncidKey) -> u64 {
    key::to_ordinal(key).expect("testkit keys must be codec-valid")
}

fn matches(predicate: &Predicate, key: &IncidKey, scratch: &[IncidKey]) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::KeyAtMost(bound) => ordinal(key) <= ordinal(bound),
        Predicate::KeyAtLeast(bound) => ordinal(key) >= ordinal(bound),
        Predicate::KeyIn(keys) => keys.contains(key),
        Predicate::ScratchJoin => scratch.contains(key),
    }
}

fn tally(rows: impl Iterator<Item = FragmentRow>) -> Counts {
    let mut sorted: Vec<FragmentRow> = rows.collect();
    sorted.sort();
    let mut counts = Counts::default();
    let mut last_incid: Option<IncidKey> = None;
    let mut last_parent: Option<ParentId> = None;
    for (incid, parent, _) in sorted {
        if last_incid.as_ref() != Some(&incid) {
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

/// In-memory relational store over an ordered incid table plus a fragment
/// child relation and a scratch side table.
pub struct MemoryStore {
    incids: Mutex<BTreeMap<u64, Record>>,
    fragments: Mutex<Vec<FragmentRow>>,
    scratch: Arc<Mutex<Vec<IncidKey>>>,
    read_calls: AtomicU64,
    write_calls: AtomicU64,
    fail_reads: AtomicU64,
    fail_writes: AtomicU64,
    on_read: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            incids: Mutex::new(BTreeMap::new()),
            fragments: Mutex::new(Vec::new()),
            scratch: Arc::new(Mutex::new(Vec::new())),
            read_calls: AtomicU64::new(0),
            write_calls: AtomicU64::new(0),
            fail_reads: AtomicU64::new(0),
            fail_writes: AtomicU64::new(0),
            on_read: Mutex::new(None),
        }
    }

    /// Adds a fragment row, creating the owning incid record on first use.
    pub fn insert_fragment(&self, incid: &str, parent: u64, fragment: u32) {
        let key = IncidKey::from(incid);
        self.incids
            .lock()
            .entry(ordinal(&key))
            .or_insert_with(|| Record::new(key.clone()));
        self.fragments
            .lock()
            .push((key, ParentId(parent), FragmentId(fragment)));
    }

    /// Deletes an incid and its fragments, simulating an upstream edit
    /// that makes an existing selection stale.
    pub fn delete_incid(&self, incid: &str) {
        let key = IncidKey::from(incid);
        self.incids.lock().remove(&ordinal(&key));
        self.fragments.lock().retain(|(k, _, _)| *k != key);
    }

    /// Arms the store to fail the next `n` read calls.
    pub fn fail_next_reads(&self, n: u64) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// Arms the store to fail the next `n` scratch writes.
    pub fn fail_next_writes(&self, n: u64) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Installs a hook invoked on every read, for interleaving events
    /// while a load is in flight.
    pub fn on_read(&self, hook: impl Fn() + Send + 'static) {
        *self.on_read.lock() = Some(Box::new(hook));
    }

    /// Total read calls (counts, selects, feature counts) observed.
    pub fn read_calls(&self) -> u64 {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Total scratch writes observed.
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Current scratch table contents.
    pub fn scratch_keys(&self) -> Vec<IncidKey> {
        self.scratch.lock().clone()
    }

    pub(crate) fn scratch_handle(&self) -> Arc<Mutex<Vec<IncidKey>>> {
        self.scratch.clone()
    }

    fn read_gate(&self) -> Result<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_read.lock().as_ref() {
            hook();
        }
        let armed = self.fail_reads.load(Ordering::SeqCst);
        if armed > 0 {
            self.fail_reads.store(armed - 1, Ordering::SeqCst);
            return Err(TessellaError::Adapter("injected read failure".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationalStore for MemoryStore {
    fn count_where(&self, predicate: &Predicate) -> Result<u64> {
        self.read_gate()?;
        let scratch = self.scratch.lock().clone();
        let n = self
            .incids
            .lock()
            .values()
            .filter(|r| matches(predicate, r.incid(), &scratch))
            .count();
        Ok(n as u64)
    }

    fn select_range(&self, predicate: &Predicate, limit: usize) -> Result<Vec<Record>> {
        self.read_gate()?;
        let scratch = self.scratch.lock().clone();
        Ok(self
            .incids
            .lock()
            .values()
            .filter(|r| matches(predicate, r.incid(), &scratch))
            .take(limit)
            .cloned()
            .collect())
    }

    fn select_in(&self, keys: &[IncidKey]) -> Result<Vec<Record>> {
        self.read_gate()?;
        Ok(self
            .incids
            .lock()
            .values()
            .filter(|r| keys.contains(r.incid()))
            .cloned()
            .collect())
    }

    fn write_scratch(&self, keys: &[IncidKey]) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let armed = self.fail_writes.load(Ordering::SeqCst);
        if armed > 0 {
            self.fail_writes.store(armed - 1, Ordering::SeqCst);
            return Err(TessellaError::Adapter("injected write failure".into()));
        }
        *self.scratch.lock() = keys.to_vec();
        Ok(())
    }

    fn count_features(&self, predicate: &Predicate) -> Result<Counts> {
        self.read_gate()?;
        let scratch = self.scratch.lock().clone();
        let rows = self
            .fragments
            .lock()
            .iter()
            .filter(|(k, _, _)| matches(predicate, k, &scratch))
            .cloned()
            .collect::<Vec<_>>();
        Ok(tally(rows.into_iter()))
    }
}

/// In-memory spatial layer holding its own feature table, which may
/// deliberately diverge from the store to exercise drift classification.
pub struct MemorySpatial {
    features: Mutex<Vec<FragmentRow>>,
    selected: Mutex<Vec<IncidKey>>,
    scratch: Arc<Mutex<Vec<IncidKey>>>,
    max_predicate_len: AtomicU64,
    clear_calls: AtomicU64,
    zoom_calls: AtomicU64,
}

impl MemorySpatial {
    /// Creates a spatial layer joined to the store's scratch table.
    pub fn linked_to(store: &MemoryStore) -> Self {
        Self {
            features: Mutex::new(Vec::new()),
            selected: Mutex::new(Vec::new()),
            scratch: store.scratch_handle(),
            max_predicate_len: AtomicU64::new(4096),
            clear_calls: AtomicU64::new(0),
            zoom_calls: AtomicU64::new(0),
        }
    }

    /// Adds a feature to the viewer's table.
    pub fn add_feature(&self, incid: &str, parent: u64, fragment: u32) {
        self.features
            .lock()
            .push((IncidKey::from(incid), ParentId(parent), FragmentId(fragment)));
    }

    /// Removes all features for an incid.
    pub fn remove_incid(&self, incid: &str) {
        let key = IncidKey::from(incid);
        self.features.lock().retain(|(k, _, _)| *k != key);
    }

    /// Lowers or raises the advertised predicate-length limit.
    pub fn set_max_predicate_length(&self, len: usize) {
        self.max_predicate_len.store(len as u64, Ordering::SeqCst);
    }

    /// Times the viewer's selection was cleared.
    pub fn clear_calls(&self) -> u64 {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Times the viewer was asked to zoom.
    pub fn zoom_calls(&self) -> u64 {
        self.zoom_calls.load(Ordering::SeqCst)
    }

    /// Distinct incids the viewer currently highlights, in codec order.
    pub fn selected_keys(&self) -> Vec<IncidKey> {
        self.selected.lock().clone()
    }

    // Each select replaces the highlighted set wholesale, like the real
    // viewer does.
    fn reply(&self, keep: impl Fn(&IncidKey) -> bool) -> SpatialSelection {
        let features: Vec<SpatialFeature> = self
            .features
            .lock()
            .iter()
            .filter(|(k, _, _)| keep(k))
            .map(|(incid, parent, fragment)| SpatialFeature {
                incid: incid.clone(),
                parent: Some(*parent),
                fragment: Some(*fragment),
            })
            .collect();
        let mut keys: Vec<IncidKey> = features.iter().map(|f| f.incid.clone()).collect();
        keys.sort_by_key(ordinal);
        keys.dedup();
        *self.selected.lock() = keys;
        SpatialSelection::new(features)
    }
}

impl SpatialLayer for MemorySpatial {
    fn select_by_predicate(&self, predicate: &Predicate) -> Result<SpatialSelection> {
        let scratch = self.scratch.lock().clone();
        Ok(self.reply(|key| matches(predicate, key, &scratch)))
    }

    fn select_by_join(&self) -> Result<SpatialSelection> {
        let scratch = self.scratch.lock().clone();
        Ok(self.reply(|key| scratch.contains(key)))
    }

    fn clear_selection(&self) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.selected.lock().clear();
        Ok(())
    }

    fn zoom_to(&self, _selection: &SpatialSelection, _min_zoom: f64) -> Result<()> {
        self.zoom_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_predicate_length(&self) -> usize {
        self.max_predicate_len.load(Ordering::SeqCst) as usize
    }
}

/// Scripted UI boundary: canned answers plus captured warnings.
pub struct ScriptedUi {
    discard: Mutex<Decision>,
    confirm: Mutex<bool>,
    warnings: Mutex<Vec<String>>,
    discard_prompts: AtomicU64,
    confirm_prompts: AtomicU64,
}

impl ScriptedUi {
    /// A UI that proceeds through every prompt.
    pub fn new() -> Self {
        Self {
            discard: Mutex::new(Decision::Proceed),
            confirm: Mutex::new(true),
            warnings: Mutex::new(Vec::new()),
            discard_prompts: AtomicU64::new(0),
            confirm_prompts: AtomicU64::new(0),
        }
    }

    /// Sets the canned answer for discard-edits prompts.
    pub fn discard_answer(self, decision: Decision) -> Self {
        *self.discard.lock() = decision;
        self
    }

    /// Sets the canned answer for large-selection prompts.
    pub fn confirm_answer(self, confirm: bool) -> Self {
        *self.confirm.lock() = confirm;
        self
    }

    /// Warnings surfaced so far.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Times a discard prompt was shown.
    pub fn discard_prompts(&self) -> u64 {
        self.discard_prompts.load(Ordering::SeqCst)
    }

    /// Times a large-selection prompt was shown.
    pub fn confirm_prompts(&self) -> u64 {
        self.confirm_prompts.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedUi {
    fn default() -> Self {
        Self::new()
    }
}

impl UiBoundary for ScriptedUi {
    fn confirm_large_selection(&self, _estimated_count: u64) -> bool {
        self.confirm_prompts.fetch_add(1, Ordering::SeqCst);
        *self.confirm.lock()
    }

    fn confirm_discard_edits(&self) -> Decision {
        self.discard_prompts.fetch_add(1, Ordering::SeqCst);
        *self.discard.lock()
    }

    fn report_warning(&self, message: &str) {
        self.warnings.lock().push(message.to_owned());
    }
}
