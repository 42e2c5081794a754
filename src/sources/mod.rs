//! Source iterables (spec §4.B): re-startable producers with no upstream
//! pipeline of their own. Every pipeline bottoms out in one of these.

mod array;
mod empty;
mod generator;
mod multi;
mod pair_zip;

pub use array::ArraySource;
pub use empty::EmptySource;
pub use generator::GeneratorSource;
pub use multi::MultiSource;
pub use pair_zip::PairZipSource;

use crate::value::Value;

/// `Count`: the infinite sequence `0, 1, 2, …` used as the default
/// auto-index (spec §4.B). Not a `PairSource` itself — it only ever
/// appears zipped against a value stream — so it is exposed as a plain
/// iterator constructor.
pub fn count() -> impl Iterator<Item = Value> {
    (0i64..).map(Value::Int)
}

/// `Extract(iter, slot)`: projects a pair stream down to just its indexes.
pub fn extract_index(pairs: impl Iterator<Item = crate::pair::Pair>) -> impl Iterator<Item = Value> {
    pairs.map(|p| p.index)
}

/// `Extract(iter, slot)`: projects a pair stream down to just its values.
pub fn extract_value(pairs: impl Iterator<Item = crate::pair::Pair>) -> impl Iterator<Item = Value> {
    pairs.map(|p| p.value)
}
