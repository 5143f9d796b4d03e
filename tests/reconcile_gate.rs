#![allow(missing_docs)]

//! Reconciliation passes end to end: drift classification, the join
//! fallback for oversized predicates, operator confirmation, and the
//! structural-operation gate over the resulting reports.

use std::sync::Arc;

use tessella::testkit::{MemorySpatial, MemoryStore, ScriptedUi};
use tessella::{
    Drift, IncidKey, PassOutcome, SelectionSet, SessionOptions, TessellaError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct Fixture {
    store: Arc<MemoryStore>,
    spatial: Arc<MemorySpatial>,
    ui: Arc<ScriptedUi>,
}

impl Fixture {
    fn new(ui: ScriptedUi) -> Self {
        let store = Arc::new(MemoryStore::new());
        let spatial = Arc::new(MemorySpatial::linked_to(&store));
        Self {
            store,
            spatial,
            ui: Arc::new(ui),
        }
    }

    fn session(&self) -> tessella::Session {
        tessella::Session::open(SessionOptions::new(
            self.store.clone(),
            self.spatial.clone(),
            self.ui.clone(),
        ))
    }

    fn options(&self) -> SessionOptions {
        SessionOptions::new(self.store.clone(), self.spatial.clone(), self.ui.clone())
    }

    /// Mirrors `n` fragments of one incid into both stores.
    fn mirror(&self, incid: &str, parent: u64, fragments: u32) {
        for f in 1..=fragments {
            self.store.insert_fragment(incid, parent, f);
            self.spatial.add_feature(incid, parent, f);
        }
    }
}

#[test]
fn consistent_selection_reports_no_drift() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    fx.mirror("A1", 10, 2);
    fx.mirror("A2", 20, 3);

    let mut session = fx.session();
    let selection = SelectionSet::from_keys(vec![IncidKey::from("A1"), IncidKey::from("A2")]);
    session.apply_filter(selection).unwrap();

    let report = session.reconcile(None).unwrap();
    assert_eq!(report.drift, Drift::None);
    assert_eq!(report.outcome, PassOutcome::Consistent);
    assert_eq!(report.db_expected.incids, 2);
    assert_eq!(report.db_expected.fragments, 5);
    assert_eq!(report.gis_actual, report.db_expected);
    assert!(fx.ui.warnings().is_empty(), "no drift, no warning");
}

#[test]
fn orphan_feature_is_excess_drift_and_closes_the_gate() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    // The database expects 5 fragments for X; the viewer shows 6.
    fx.mirror("X1", 7, 5);
    fx.spatial.add_feature("X1", 7, 99);

    let mut session = fx.session();
    session.goto_row(1).unwrap();
    let report = session.reconcile(None).unwrap();

    assert_eq!(report.drift, Drift::GisExcess);
    assert_eq!(report.outcome, PassOutcome::DriftWarning);
    assert_eq!(report.db_expected.fragments, 5);
    assert_eq!(report.gis_actual.fragments, 6);
    assert!(
        !fx.ui.warnings().is_empty(),
        "orphan features always surface a hard warning"
    );

    let gate = session.gate().expect("pass ran");
    assert!(!gate.can_logical_split());
    assert!(!gate.can_physical_split());
    assert!(!gate.can_logical_merge());
    assert!(!gate.can_physical_merge());
}

#[test]
fn viewer_subset_is_short_drift_and_still_splittable() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    for f in 1..=4 {
        fx.store.insert_fragment("A1", 1, f);
    }
    // Only two of the four fragments are highlighted in the viewer.
    fx.spatial.add_feature("A1", 1, 1);
    fx.spatial.add_feature("A1", 1, 2);

    let mut session = fx.session();
    session.goto_row(1).unwrap();
    let report = session.reconcile(None).unwrap();

    assert_eq!(report.drift, Drift::GisShort);
    assert!(!fx.ui.warnings().is_empty(), "short drift is surfaced");

    let gate = session.gate().unwrap();
    assert!(gate.can_logical_split(), "a genuine subset may split");
}

#[test]
fn reconciliation_is_idempotent_without_state_changes() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    fx.mirror("A1", 1, 2);
    fx.spatial.add_feature("A1", 1, 77);

    let mut session = fx.session();
    session.goto_row(1).unwrap();
    let first = session.reconcile(None).unwrap();
    let second = session.reconcile(None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn literal_pass_submits_the_selection_to_the_viewer_whole() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    let keys: Vec<IncidKey> = (1..=600)
        .map(|i| {
            fx.mirror(&format!("A{i}"), i, 1);
            IncidKey(format!("A{i}"))
        })
        .collect();
    // Generous limit keeps the pass on the literal-predicate path.
    fx.spatial.set_max_predicate_length(100_000);

    let mut session = fx.session();
    session.apply_filter(SelectionSet::from_keys(keys)).unwrap();
    let report = session.reconcile(None).unwrap();

    assert_eq!(report.drift, Drift::None);
    assert_eq!(report.db_expected.incids, 600);
    // The report certifies the viewer's actual state: after the pass the
    // viewer highlights every key of the selection, not a trailing piece.
    assert_eq!(
        fx.spatial.selected_keys().len(),
        600,
        "viewer holds the whole selection"
    );
    assert!(
        fx.store.scratch_keys().is_empty(),
        "literal path bypasses the scratch table"
    );
}

#[test]
fn oversized_predicates_fall_back_to_the_scratch_join() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    let keys: Vec<IncidKey> = (1..=40)
        .map(|i| {
            fx.mirror(&format!("A{i}"), i, 1);
            IncidKey(format!("A{i}"))
        })
        .collect();
    // Far below what forty quoted keys render to.
    fx.spatial.set_max_predicate_length(32);

    let mut session = fx.session();
    session.apply_filter(SelectionSet::from_keys(keys)).unwrap();
    let report = session.reconcile(None).unwrap();

    assert_eq!(report.drift, Drift::None);
    assert_eq!(report.db_expected.incids, 40);
    assert_eq!(
        fx.store.scratch_keys().len(),
        40,
        "keys routed through the scratch table"
    );
    assert_eq!(
        fx.spatial.selected_keys().len(),
        40,
        "join path also leaves the viewer holding the whole selection"
    );
}

#[test]
fn features_dropped_from_the_viewer_surface_as_short_drift() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    fx.mirror("A1", 1, 2);

    let mut session = fx.session();
    session.goto_row(1).unwrap();
    assert_eq!(session.reconcile(None).unwrap().drift, Drift::None);

    // The viewer loses the record's features between passes.
    fx.spatial.remove_incid("A1");
    let report = session.reconcile(None).unwrap();
    assert_eq!(report.drift, Drift::GisShort);
    assert_eq!(report.gis_actual.fragments, 0);
    assert_eq!(report.outcome, PassOutcome::DriftWarning);
}

#[test]
fn scratch_write_failure_aborts_the_pass() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    let keys: Vec<IncidKey> = (1..=10)
        .map(|i| {
            fx.mirror(&format!("A{i}"), i, 1);
            IncidKey(format!("A{i}"))
        })
        .collect();
    fx.spatial.set_max_predicate_length(8);
    fx.store.fail_next_writes(1);

    let mut session = fx.session();
    session.apply_filter(SelectionSet::from_keys(keys)).unwrap();
    let err = session.reconcile(None).unwrap_err();
    assert!(matches!(err, TessellaError::ScratchWriteFailed(_)));
    assert!(session.last_report().is_none(), "no partial state retained");
}

#[test]
fn large_selections_ask_before_submitting() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new().confirm_answer(false));
    for i in 1..=6 {
        fx.mirror(&format!("A{i}"), i, 1);
    }
    let keys: Vec<IncidKey> = (1..=6).map(|i| IncidKey(format!("A{i}"))).collect();

    let mut session = tessella::Session::open(fx.options().confirm_threshold(5));
    session.apply_filter(SelectionSet::from_keys(keys)).unwrap();

    let err = session.reconcile(Some(500)).unwrap_err();
    assert!(matches!(err, TessellaError::Cancelled));
    assert_eq!(fx.ui.confirm_prompts(), 1);

    // Below the threshold no prompt is shown.
    let small = SelectionSet::from_keys(vec![IncidKey::from("A1")]);
    session.apply_filter(small).unwrap();
    session.reconcile(None).unwrap();
    assert_eq!(fx.ui.confirm_prompts(), 1, "small pass never prompted");
}

#[test]
fn empty_selection_reconciles_to_an_empty_result() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    fx.mirror("A1", 1, 1);

    let mut session = fx.session();
    let _ = session.apply_filter(SelectionSet::from_keys(Vec::new()));
    let report = session.reconcile(None).unwrap();
    assert_eq!(report.outcome, PassOutcome::EmptyResult);
    assert_eq!(report.drift, Drift::None);
}

#[test]
fn report_serializes_for_the_ui_layer() {
    init_tracing();
    let fx = Fixture::new(ScriptedUi::new());
    fx.mirror("A1", 1, 2);

    let mut session = fx.session();
    session.goto_row(1).unwrap();
    let report = session.reconcile(None).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["drift"], "None");
    assert_eq!(json["db_expected"]["fragments"], 2);
    assert_eq!(json["outcome"], "Consistent");
}
