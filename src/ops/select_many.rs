use std::rc::Rc;

use crate::dataframe::DataFrame;
use crate::pair::Pair;
use crate::series::Series;
use crate::source::{PairSource, SourceRef};
use crate::value::Value;

/// What a `SelectMany`/`SelectManyPairs` producer function may return
/// (spec §4.C: "a finite collection of values (array, Series, or
/// DataFrame)").
pub enum ManyResult {
    Values(Vec<Value>),
    Series(Series),
    Frame(DataFrame),
}

impl ManyResult {
    /// Flattens to a plain `Vec<Value>`: a `Series` is flattened to its
    /// values, a `DataFrame` to its records (spec §4.C).
    fn into_values(self) -> Vec<Value> {
        match self {
            ManyResult::Values(v) => v,
            ManyResult::Series(s) => s.to_values(),
            ManyResult::Frame(f) => f.to_records().into_iter().map(|r| Value::Record(Rc::new(r))).collect(),
        }
    }
}

impl From<Vec<Value>> for ManyResult {
    fn from(v: Vec<Value>) -> ManyResult {
        ManyResult::Values(v)
    }
}

impl From<Series> for ManyResult {
    fn from(s: Series) -> ManyResult {
        ManyResult::Series(s)
    }
}

impl From<DataFrame> for ManyResult {
    fn from(f: DataFrame) -> ManyResult {
        ManyResult::Frame(f)
    }
}

type ManyFn = Rc<dyn Fn(&Value, &Value) -> ManyResult>;

/// `SelectMany(fn)`: `fn(value, index)` returns a finite collection;
/// each produced element carries the *parent* index (spec §4.C).
pub struct SelectManySource {
    source: SourceRef,
    map: ManyFn,
}

impl SelectManySource {
    pub fn new(source: SourceRef, map: ManyFn) -> SelectManySource {
        SelectManySource { source, map }
    }
}

impl PairSource for SelectManySource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let map = self.map.clone();
        Box::new(self.source.iter().flat_map(move |p| {
            let values = map(&p.value, &p.index).into_values();
            let index = p.index;
            values.into_iter().map(move |v| Pair::new(index.clone(), v)).collect::<Vec<_>>()
        }))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}

type ManyPairsFn = Rc<dyn Fn(&Value, &Value) -> Vec<Pair>>;

/// `SelectManyPairs(fn)`: like `SelectMany` but the producer returns
/// `(index, value)` pairs directly rather than inheriting the parent index
/// (spec §4.C).
pub struct SelectManyPairsSource {
    source: SourceRef,
    map: ManyPairsFn,
}

impl SelectManyPairsSource {
    pub fn new(source: SourceRef, map: ManyPairsFn) -> SelectManyPairsSource {
        SelectManyPairsSource { source, map }
    }
}

impl PairSource for SelectManyPairsSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let map = self.map.clone();
        Box::new(self.source.iter().flat_map(move |p| map(&p.value, &p.index)))
    }

    fn restartable(&self) -> bool {
        self.source.restartable()
    }
}
