use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `Skip(n)`: discards the first `n` pairs, then passes through (spec
/// §4.C).
pub struct SkipSource {
    source: SourceRef,
    n: usize,
}

impl SkipSource {
    pub fn new(source: SourceRef, n: usize) -> SkipSource {
        SkipSource { source, n }
    }
}

impl PairSource for SkipSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        Box::new(self.source.iter().skip(self.n))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
