use std::cell::RefCell;

use crate::pair::Pair;
use crate::source::PairSource;

/// Wraps a user-supplied, single-shot `Iterator<Item = Pair>` as a
/// `PairSource` (spec §3, §9: "user-supplied generator function
/// iterables"). `restartable()` reports `false`; any operator that
/// requires multiple passes (`count`, `last`, sorting, joins, pivots,
/// `contains`, set operations) must check this before consuming twice and
/// fail with `Error::InvalidArgument` instead of silently re-draining an
/// exhausted generator.
pub struct GeneratorSource {
    inner: RefCell<Option<Box<dyn Iterator<Item = Pair>>>>,
}

impl GeneratorSource {
    pub fn new(iter: impl Iterator<Item = Pair> + 'static) -> GeneratorSource {
        GeneratorSource { inner: RefCell::new(Some(Box::new(iter))) }
    }
}

impl PairSource for GeneratorSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        self.inner
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Box::new(std::iter::empty()))
    }

    fn restartable(&self) -> bool {
        false
    }
}
