//! The dynamic value used for every index, every `Series` element, and every
//! `DataFrame` record field.
//!
//! Rust has no single built-in type that is simultaneously an arbitrary
//! comparable/equatable index (spec §3) and an arbitrary record field, so
//! both roles are modeled by one small tagged union, in the spirit of the
//! "dynamic parameter polymorphism" design note (spec §9): rather than
//! generalize `Series`/`DataFrame` over an open-ended value type parameter,
//! normalize everything that flows through a pipeline into this enum at
//! construction.

use std::cmp::Ordering;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::dataframe::DataFrame;
use crate::record::Record;
use crate::series::Series;

/// A value flowing through a pipeline: an index, a `Series` element, or a
/// `DataFrame` record field.
#[derive(Clone, Debug)]
pub enum Value {
    /// The sentinel for a missing/undefined slot (spec GLOSSARY: "Absent").
    /// Distinct from `Null`, which is a present-but-null value.
    Absent,
    /// An explicit null, as distinct from `Absent` (spec §3, §9).
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// A nested record, used when a `DataFrame` row flows through a plain
    /// `Series`-shaped pipeline (a `DataFrame` is a `Series` of `Record`s).
    Record(Rc<Record>),
    /// A nested series, produced by windowing (spec §4.H): each emitted
    /// window is itself a `Series`.
    Series(Rc<Series>),
    /// A nested frame, produced by windowing over a `DataFrame`.
    Frame(Rc<DataFrame>),
}

impl Value {
    pub fn int(v: i64) -> Value {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Value {
        Value::Float(v)
    }

    pub fn str(v: impl Into<Rc<str>>) -> Value {
        Value::Str(v.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Discriminant rank used to give cross-variant comparisons a total,
    /// deterministic (if arbitrary) order rather than panicking. Same-variant
    /// pairs always compare on their payload first.
    fn rank(&self) -> u8 {
        match self {
            Value::Absent => 0,
            Value::Null => 1,
            Value::Bool(_) => 2,
            Value::Int(_) => 3,
            Value::Float(_) => 4,
            Value::Str(_) => 5,
            Value::Date(_) => 6,
            Value::DateTime(_) => 7,
            Value::Record(_) => 8,
            Value::Series(_) => 9,
            Value::Frame(_) => 10,
        }
    }

    /// Total order used by the sort engine (§4.F), joins (§4.G), and any
    /// other key comparison. Numeric variants compare across `Int`/`Float`
    /// by value; everything else falls back to discriminant rank, then (for
    /// `Record`, `Series`, `Frame`, which have no natural order) pointer
    /// identity so the order is at least stable within a process.
    pub fn compare(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Absent, Absent) | (Null, Null) => Ordering::Equal,
            (Record(a), Record(b)) => (Rc::as_ptr(a) as usize).cmp(&(Rc::as_ptr(b) as usize)),
            (Series(a), Series(b)) => (Rc::as_ptr(a) as usize).cmp(&(Rc::as_ptr(b) as usize)),
            (Frame(a), Frame(b)) => (Rc::as_ptr(a) as usize).cmp(&(Rc::as_ptr(b) as usize)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Absent, Absent) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Str(a), Str(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Record(a), Record(b)) => Rc::ptr_eq(a, b) || a == b,
            (Series(a), Series(b)) => Rc::ptr_eq(a, b),
            (Frame(a), Frame(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(v: Option<T>) -> Value {
        match v {
            Some(v) => Value::from(v),
            None => Value::Absent,
        }
    }
}
