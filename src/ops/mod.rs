//! Operator iterables (spec §4.C): one-to-one and one-to-many pipeline
//! transformers. Each wraps exactly one (or, for zips, several) source
//! `PairSource`s and is itself a `PairSource` — restartability is
//! inherited automatically because every `iter()` implementation simply
//! asks its source(s) for a fresh iterator on every call.
//!
//! Mirrors the teacher's one-file-per-operator layout
//! (`differential-dataflow/src/operators/{join,count,consolidate}.rs`).

mod concat;
mod insert;
mod reverse;
mod select_many;
mod select_pair;
mod select_value;
mod skip;
mod skip_while;
mod take;
mod take_while;
mod where_;
mod zip;

pub use concat::ConcatSource;
pub use insert::InsertSource;
pub use reverse::ReverseSource;
pub use select_many::{ManyResult, SelectManySource, SelectManyPairsSource};
pub use select_pair::SelectPairSource;
pub use select_value::SelectValueSource;
pub use skip::SkipSource;
pub use skip_while::SkipWhileSource;
pub use take::TakeSource;
pub use take_while::TakeWhileSource;
pub use where_::WhereSource;
pub use zip::{PairZipOp, ValueZipSource};

use std::rc::Rc;

use crate::value::Value;

/// `fn(value, index) -> bool`, used by `Where`/`SkipWhile`/`TakeWhile`.
pub type ValuePred = Rc<dyn Fn(&Value, &Value) -> bool>;
/// `fn(value, index) -> value`, used by `SelectValue`.
pub type ValueMap = Rc<dyn Fn(&Value, &Value) -> Value>;
/// `fn(value, index) -> (index, value)`, used by `SelectPair`.
pub type PairMap = Rc<dyn Fn(&Value, &Value) -> (Value, Value)>;
