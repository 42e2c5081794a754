//! A `DataFrame` row: a mapping from field name to [`Value`].
//!
//! Records may carry fields beyond a frame's declared column list (spec
//! §3: "records may contain extra fields but serialization only exposes
//! declared columns"), so `Record` itself is just an ordered bag of
//! `(name, value)` pairs; the frame's column-name vector is what is
//! authoritative for iteration/serialization order.

use std::rc::Rc;

use crate::value::Value;

/// An ordered, small record. Field lookup is linear, which is the right
/// trade-off for the narrow (tens of columns, not thousands) rows this
/// crate is built for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(Rc<str>, Value)>,
}

impl Record {
    pub fn new() -> Record {
        Record { fields: Vec::new() }
    }

    pub fn from_pairs(fields: Vec<(Rc<str>, Value)>) -> Record {
        Record { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    /// Returns the declared field value, or `Value::Absent` when missing
    /// (spec §3: "missing fields in a record serialize as an absent
    /// value").
    pub fn get_or_absent(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Absent)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| &**n == name)
    }

    /// Functional update: returns a new record with `name` set to `value`,
    /// replacing an existing field of that name in place or appending it.
    pub fn with(&self, name: impl Into<Rc<str>>, value: Value) -> Record {
        let name = name.into();
        let mut fields = self.fields.clone();
        if let Some(slot) = fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            fields.push((name, value));
        }
        Record { fields }
    }

    pub fn without(&self, name: &str) -> Record {
        Record {
            fields: self.fields.iter().filter(|(n, _)| &**n != name).cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (&**n, v))
    }

    pub fn field_names(&self) -> Vec<Rc<str>> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
