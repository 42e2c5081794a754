use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `insertPair`/`appendPair`: prepends or appends one pair to a source
/// (spec §4.D).
pub struct InsertSource {
    source: SourceRef,
    pair: Pair,
    at_front: bool,
}

impl InsertSource {
    pub fn prepend(source: SourceRef, pair: Pair) -> InsertSource {
        InsertSource { source, pair, at_front: true }
    }

    pub fn append(source: SourceRef, pair: Pair) -> InsertSource {
        InsertSource { source, pair, at_front: false }
    }
}

impl PairSource for InsertSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        if self.at_front {
            let pair = self.pair.clone();
            Box::new(std::iter::once(pair).chain(self.source.iter()))
        } else {
            let pair = self.pair.clone();
            Box::new(self.source.iter().chain(std::iter::once(pair)))
        }
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
