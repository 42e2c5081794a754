use crate::ops::ValueMap;
use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `SelectValue(fn)`: replaces `value` with `fn(value, index)`; the index
/// is unchanged (spec §4.C).
pub struct SelectValueSource {
    source: SourceRef,
    map: ValueMap,
}

impl SelectValueSource {
    pub fn new(source: SourceRef, map: ValueMap) -> SelectValueSource {
        SelectValueSource { source, map }
    }
}

impl PairSource for SelectValueSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let map = self.map.clone();
        Box::new(self.source.iter().map(move |p| {
            let value = map(&p.value, &p.index);
            Pair::new(p.index, value)
        }))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
