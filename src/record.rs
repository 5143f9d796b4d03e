//! The active logical record and its snapshot.

use std::collections::BTreeMap;

use crate::types::{IncidKey, Value};

/// One logical record of the ordered table: an incid plus its attribute
/// set. A field absent from the map is distinct from a field holding
/// [`Value::Null`], mirroring the column-presence semantics of the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    incid: IncidKey,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record with no attributes.
    pub fn new(incid: IncidKey) -> Self {
        Self {
            incid,
            fields: BTreeMap::new(),
        }
    }

    /// The record's key.
    pub fn incid(&self) -> &IncidKey {
        &self.incid
    }

    /// Reads a field; `None` means the field is absent entirely.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Writes a field, returning the previous value if one was present.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field entirely (not the same as setting it to null).
    pub fn clear(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn replace_fields(&mut self, fields: BTreeMap<String, Value>) {
        self.fields = fields;
    }

    pub(crate) fn clone_fields(&self) -> BTreeMap<String, Value> {
        self.fields.clone()
    }
}

/// By-value capture of a record, taken when it becomes active and consumed
/// on save or restore.
#[derive(Clone, Debug)]
pub struct Snapshot {
    incid: IncidKey,
    fields: BTreeMap<String, Value>,
}

impl Snapshot {
    pub(crate) fn of(record: &Record) -> Self {
        Self {
            incid: record.incid().clone(),
            fields: record.clone_fields(),
        }
    }

    /// Key of the record the snapshot was taken from.
    pub fn incid(&self) -> &IncidKey {
        &self.incid
    }

    pub(crate) fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}
