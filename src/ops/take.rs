use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `Take(n)`: passes through only the first `n` pairs (spec §4.C).
pub struct TakeSource {
    source: SourceRef,
    n: usize,
}

impl TakeSource {
    pub fn new(source: SourceRef, n: usize) -> TakeSource {
        TakeSource { source, n }
    }
}

impl PairSource for TakeSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        Box::new(self.source.iter().take(self.n))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
