use std::rc::Rc;

use crate::pair::Pair;
use crate::record::Record;
use crate::source::PairSource;
use crate::value::Value;

/// `Multi(iters[])`: zips an arbitrary number of column buffers into
/// record-valued pairs (spec §4.B); used to build a `DataFrame`'s rows out
/// of column arrays (the `columns` constructor shape, spec §6).
pub struct MultiSource {
    columns: Vec<(Rc<str>, Rc<Vec<Value>>)>,
    index: Option<Rc<Vec<Value>>>,
    len: usize,
}

impl MultiSource {
    pub fn new(columns: Vec<(Rc<str>, Rc<Vec<Value>>)>, index: Option<Rc<Vec<Value>>>) -> MultiSource {
        let len = columns.iter().map(|(_, c)| c.len()).min().unwrap_or(0);
        let len = match &index {
            Some(idx) => len.min(idx.len()),
            None => len,
        };
        MultiSource { columns, index, len }
    }
}

impl PairSource for MultiSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let columns = self.columns.clone();
        let index = self.index.clone();
        let len = self.len;
        Box::new((0..len).map(move |i| {
            let fields = columns.iter().map(|(name, col)| (name.clone(), col[i].clone())).collect();
            let idx = match &index {
                Some(idx) => idx[i].clone(),
                None => Value::Int(i as i64),
            };
            Pair::new(idx, Value::Record(Rc::new(Record::from_pairs(fields))))
        }))
    }
}
