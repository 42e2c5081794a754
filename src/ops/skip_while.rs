use crate::ops::ValuePred;
use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `SkipWhile(pred)`: discards while `pred(value, index)` holds; after the
/// first `false` passes through unconditionally without re-evaluating
/// (spec §4.C).
pub struct SkipWhileSource {
    source: SourceRef,
    pred: ValuePred,
}

impl SkipWhileSource {
    pub fn new(source: SourceRef, pred: ValuePred) -> SkipWhileSource {
        SkipWhileSource { source, pred }
    }
}

impl PairSource for SkipWhileSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let pred = self.pred.clone();
        Box::new(self.source.iter().skip_while(move |p| pred(&p.value, &p.index)))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
