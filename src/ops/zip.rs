use std::rc::Rc;

use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};
use crate::value::Value;

/// `ValueZip`: an n-ary zip that advances all inner cursors in lockstep and
/// combines their values with `combine`; the emitted index is always the
/// *first* input's index (spec §4.C — "documented and testable").
/// Terminates as soon as any input exhausts.
pub struct ValueZipSource {
    sources: Vec<SourceRef>,
    combine: Rc<dyn Fn(&[Value]) -> Value>,
}

impl ValueZipSource {
    pub fn new(sources: Vec<SourceRef>, combine: Rc<dyn Fn(&[Value]) -> Value>) -> ValueZipSource {
        ValueZipSource { sources, combine }
    }
}

impl PairSource for ValueZipSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let mut iters: Vec<_> = self.sources.iter().map(|s| s.iter()).collect();
        let combine = self.combine.clone();
        Box::new(std::iter::from_fn(move || {
            let mut pairs = Vec::with_capacity(iters.len());
            for it in iters.iter_mut() {
                pairs.push(it.next()?);
            }
            let index = pairs[0].index.clone();
            let values: Vec<Value> = pairs.into_iter().map(|p| p.value).collect();
            Some(Pair::new(index, combine(&values)))
        }))
    }

    fn restartable(&self) -> bool {
        self.sources.iter().all(|s| s.restartable())
    }
}

/// `PairZip`: an n-ary lockstep zip that keeps every input's value
/// alongside the first input's index, without combining them (spec
/// §4.C). The per-position values are exposed as `Value::Record` keyed
/// `"0"`, `"1"`, … so the result stays a single `Value`.
pub struct PairZipOp {
    sources: Vec<SourceRef>,
}

impl PairZipOp {
    pub fn new(sources: Vec<SourceRef>) -> PairZipOp {
        PairZipOp { sources }
    }
}

impl PairSource for PairZipOp {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        use crate::record::Record;
        let mut iters: Vec<_> = self.sources.iter().map(|s| s.iter()).collect();
        Box::new(std::iter::from_fn(move || {
            let mut pairs = Vec::with_capacity(iters.len());
            for it in iters.iter_mut() {
                pairs.push(it.next()?);
            }
            let index = pairs[0].index.clone();
            let fields = pairs
                .into_iter()
                .enumerate()
                .map(|(i, p)| (Rc::from(i.to_string().as_str()), p.value))
                .collect();
            Some(Pair::new(index, Value::Record(Rc::new(Record::from_pairs(fields)))))
        }))
    }

    fn restartable(&self) -> bool {
        self.sources.iter().all(|s| s.restartable())
    }
}
