use crate::pair::Pair;
use crate::source::PairSource;
use crate::value::Value;

/// `Pair(indexIter, valuesIter)`: zips two parallel value streams into
/// pairs, terminating when either side exhausts (spec §4.B).
pub struct PairZipSource<IF, VF> {
    index_iter: IF,
    value_iter: VF,
}

impl<IF, VF, II, VI> PairZipSource<IF, VF>
where
    IF: Fn() -> II,
    VF: Fn() -> VI,
    II: Iterator<Item = Value> + 'static,
    VI: Iterator<Item = Value> + 'static,
{
    pub fn new(index_iter: IF, value_iter: VF) -> Self {
        PairZipSource { index_iter, value_iter }
    }
}

impl<IF, VF, II, VI> PairSource for PairZipSource<IF, VF>
where
    IF: Fn() -> II,
    VF: Fn() -> VI,
    II: Iterator<Item = Value> + 'static,
    VI: Iterator<Item = Value> + 'static,
{
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let indexes = (self.index_iter)();
        let values = (self.value_iter)();
        Box::new(indexes.zip(values).map(|(index, value)| Pair::new(index, value)))
    }
}
