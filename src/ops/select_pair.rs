use crate::ops::PairMap;
use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `SelectPair(fn)`: replaces the entire pair with `fn(value, index)`,
/// which returns `(newIndex, newValue)` (spec §4.C).
pub struct SelectPairSource {
    source: SourceRef,
    map: PairMap,
}

impl SelectPairSource {
    pub fn new(source: SourceRef, map: PairMap) -> SelectPairSource {
        SelectPairSource { source, map }
    }
}

impl PairSource for SelectPairSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let map = self.map.clone();
        Box::new(self.source.iter().map(move |p| {
            let (index, value) = map(&p.value, &p.index);
            Pair::new(index, value)
        }))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
