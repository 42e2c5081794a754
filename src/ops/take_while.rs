use crate::ops::ValuePred;
use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `TakeWhile(pred)`: terminates at the first pair for which `pred` is
/// `false`, consuming (but not emitting) that failing pair (spec §4.C).
pub struct TakeWhileSource {
    source: SourceRef,
    pred: ValuePred,
}

impl TakeWhileSource {
    pub fn new(source: SourceRef, pred: ValuePred) -> TakeWhileSource {
        TakeWhileSource { source, pred }
    }
}

impl PairSource for TakeWhileSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let pred = self.pred.clone();
        Box::new(self.source.iter().take_while(move |p| pred(&p.value, &p.index)))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
