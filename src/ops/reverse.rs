use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `reverse()`: emits the source's pairs in reverse position order (spec
/// §8 "Reverse involution"). Forces one buffering pass per `iter()` call,
/// like `tail`.
pub struct ReverseSource {
    source: SourceRef,
}

impl ReverseSource {
    pub fn new(source: SourceRef) -> ReverseSource {
        ReverseSource { source }
    }
}

impl PairSource for ReverseSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let mut buf: Vec<Pair> = self.source.iter().collect();
        buf.reverse();
        Box::new(buf.into_iter())
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
