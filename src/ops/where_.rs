use crate::ops::ValuePred;
use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};

/// `Where(pred)`: a pass-through filter (spec §4.C).
pub struct WhereSource {
    source: SourceRef,
    pred: ValuePred,
}

impl WhereSource {
    pub fn new(source: SourceRef, pred: ValuePred) -> WhereSource {
        WhereSource { source, pred }
    }
}

impl PairSource for WhereSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let pred = self.pred.clone();
        Box::new(self.source.iter().filter(move |p| pred(&p.value, &p.index)))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
