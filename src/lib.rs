//! Windowed record cursor and dual-store selection reconciliation.
//!
//! Tessella lets an operator browse a huge, remotely stored, key-ordered
//! table one record at a time while an external spatial viewer's
//! highlighted feature set is kept reconciled with the database-computed
//! selection. The crate is a library consumed by a higher UI layer; the
//! relational store, spatial viewer, and UI itself are injected behind
//! the [`store::RelationalStore`], [`spatial::SpatialLayer`], and
//! [`spatial::UiBoundary`] traits.
//!
//! Entry point: build [`config::SessionOptions`] over the adapters and
//! open a [`session::Session`].

#![forbid(unsafe_code)]

pub mod config;
pub mod cursor;
pub mod gate;
pub mod guard;
pub mod key;
pub mod predicate;
pub mod reconcile;
pub mod record;
pub mod selection;
pub mod session;
pub mod spatial;
pub mod store;
pub mod testkit;
pub mod types;

pub use config::SessionOptions;
pub use cursor::{PageWindow, WindowedCursor};
pub use gate::{SessionMode, StructuralGate};
pub use predicate::Predicate;
pub use reconcile::{Counts, Drift, PassOutcome, ReconciliationReport};
pub use record::{Record, Snapshot};
pub use selection::{SelectionBuild, SelectionSet};
pub use session::{NavOutcome, Session, SupersedeHandle};
pub use spatial::{Decision, SpatialFeature, SpatialLayer, SpatialSelection, UiBoundary};
pub use store::{RelationalStore, RetryingStore};
pub use types::{FragmentId, IncidKey, ParentId, Result, TessellaError, Value};
