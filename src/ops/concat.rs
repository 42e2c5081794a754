use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `concat`: the ordered, lazy union of two sources, left-then-right (spec
/// §5 "Concatenation preserves left-then-right order"; §B of
/// `SPEC_FULL.md`). Underlies `union` (`concat(other).distinct(...)`) and
/// the outer-join constructions in §4.G.
pub struct ConcatSource {
    left: SourceRef,
    right: SourceRef,
}

impl ConcatSource {
    pub fn new(left: SourceRef, right: SourceRef) -> ConcatSource {
        ConcatSource { left, right }
    }
}

impl PairSource for ConcatSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        Box::new(self.left.iter().chain(self.right.iter()))
    }

    fn restartable(&self) -> bool {
        self.left.restartable() && self.right.restartable()
    }
}
