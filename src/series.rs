//! `Series`: a lazy, one-dimensional indexed pipeline (spec §3, §4.D).
//!
//! A `Series` is exactly one [`SourceRef`] plus the bookkeeping a handful of
//! operators need beyond plain composition: a shared "fault" cell that lets
//! operators which can fail mid-iteration (`reindex`, the `parse*` family)
//! surface an `Error` at the next terminal call instead of threading
//! `Result` through every single `Iterator::next()`, and an optional
//! [`SortState`] so `thenBy`/`thenByDescending` can extend a prior
//! `orderBy` instead of starting a fresh, unrelated sort.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dataframe::DataFrame;
use crate::detect;
use crate::error::{Error, Result};
use crate::format;
use crate::join::{self, CombineFn, EqFn, JoinKind, JoinSource};
use crate::ops::{
    ConcatSource, InsertSource, ManyResult, PairZipOp, ReverseSource, SelectManyPairsSource, SelectManySource, SelectPairSource, SelectValueSource,
    SkipSource, SkipWhileSource, TakeSource, TakeWhileSource, ValueMap, ValuePred, ValueZipSource, WhereSource,
};
use crate::pair::Pair;
use crate::record::Record;
use crate::sort::{Direction, KeyFn, SortState};
use crate::source::{FnSource, PairSource, SourceRef};
use crate::sources::{ArraySource, EmptySource, GeneratorSource};
use crate::value::Value;
use crate::window::{FixedWindowSource, RollingWindowSource, VariableWindowSource, WindowEq};

/// `fn(prev, cur) -> Vec<Pair>` filler used by `fillGaps`.
pub type FillFn = Rc<dyn Fn(&Pair, &Pair) -> Vec<Pair>>;

#[derive(Clone)]
pub struct Series {
    pub(crate) source: SourceRef,
    fault: Rc<RefCell<Option<Error>>>,
    sort_state: Option<Rc<SortState>>,
}

impl Series {
    fn wrap(source: SourceRef, fault: Rc<RefCell<Option<Error>>>) -> Series {
        Series { source, fault, sort_state: None }
    }

    /// Derives a plain (non-sorted) child sharing this series' fault cell.
    fn derive(&self, source: SourceRef) -> Series {
        Series::wrap(source, self.fault.clone())
    }

    /// Builds a `Series` directly over an arbitrary source, with a fresh
    /// fault cell. Used by operators (windowing, joins) that construct a
    /// nested `Series`/`DataFrame` with no single obvious "parent" lineage.
    pub(crate) fn from_source(source: SourceRef) -> Series {
        Series::wrap(source, Rc::new(RefCell::new(None)))
    }

    /// Shares this series' underlying source, for `DataFrame`'s
    /// column-level operators, which rebuild a new row pipeline around it.
    pub(crate) fn clone_source_ref(&self) -> SourceRef {
        self.source.clone()
    }

    fn clear_fault(&self) {
        *self.fault.borrow_mut() = None;
    }

    fn check_fault(&self) -> Result<()> {
        match self.fault.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ---- Construction (spec §4.D, §6) ----------------------------------

    pub fn empty() -> Series {
        Series::from_source(Rc::new(EmptySource))
    }

    pub fn from_values(values: Vec<Value>) -> Series {
        let pairs = values.into_iter().enumerate().map(|(i, v)| Pair::new(Value::Int(i as i64), v)).collect();
        Series::from_pairs(pairs)
    }

    /// Zips `values` against an explicit index array; the shorter of the
    /// two determines the length (spec §4.B "Pair" zip semantics).
    pub fn from_values_with_index(values: Vec<Value>, index: Vec<Value>) -> Series {
        let pairs = index.into_iter().zip(values).map(Pair::from).collect();
        Series::from_pairs(pairs)
    }

    /// Like [`Series::from_values_with_index`], but the index stream comes
    /// from another `Series`' values (spec §6 "index: array or Series";
    /// spec §4.B "Pair(indexIter, valuesIter)").
    pub fn from_values_with_index_series(values: Vec<Value>, index: &Series) -> Series {
        let index_source = index.source.clone();
        let values = Rc::new(values);
        let index_iter = move || crate::sources::extract_value(index_source.iter());
        let value_iter = {
            let values = values.clone();
            move || {
                let values = values.clone();
                (0..values.len()).map(move |i| values[i].clone())
            }
        };
        Series::from_source(Rc::new(crate::sources::PairZipSource::new(index_iter, value_iter)))
    }

    pub fn from_pairs(pairs: Vec<Pair>) -> Series {
        Series::from_source(Rc::new(ArraySource::new(pairs)))
    }

    /// Wraps a user-supplied, single-shot generator (spec §3, §9). The
    /// resulting series is non-restartable: a second consumption of any
    /// operator built on it fails rather than silently replaying nothing.
    pub fn from_generator(iter: impl Iterator<Item = Pair> + 'static) -> Series {
        Series::from_source(Rc::new(GeneratorSource::new(iter)))
    }

    /// `Count` zipped against a user value iterator — the auto-indexed
    /// generator shape (spec §4.B).
    pub fn from_value_generator(values: impl Iterator<Item = Value> + 'static) -> Series {
        let values = Rc::new(RefCell::new(Some(values)));
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            match values.borrow_mut().take() {
                Some(vs) => Box::new(crate::sources::count().zip(vs).map(Pair::from)),
                None => Box::new(std::iter::empty()),
            }
        };
        Series::from_source(Rc::new(FnSource::single_shot(f)))
    }

    // ---- Index operations (spec §4.D) ----------------------------------

    /// A fresh `Series` of this series' index values, itself positionally
    /// re-indexed `0..n`.
    pub fn get_index(&self) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let indexes = crate::sources::extract_index(source.iter());
            Box::new(crate::sources::count().zip(indexes).map(Pair::from))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Re-pairs this series' values with `new_index`'s values as the new
    /// index stream; the shorter of the two wins.
    pub fn with_index(&self, new_index: &Series) -> Series {
        let source = self.source.clone();
        let idx_source = new_index.source.clone();
        let restartable = source.restartable() && idx_source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let values = source.iter().map(|p| p.value);
            let idxs = idx_source.iter().map(|p| p.value);
            Box::new(idxs.zip(values).map(Pair::from))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    pub fn reset_index(&self) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            Box::new(source.iter().enumerate().map(|(i, p)| Pair::new(Value::Int(i as i64), p.value)))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Left-join on `new_index`: positions missing from this series become
    /// `Absent`; a duplicate index value anywhere in this series' own index
    /// fails at evaluation time (`Error::DuplicateIndex`).
    pub fn reindex(&self, new_index: &Series) -> Series {
        let source = self.source.clone();
        let idx_source = new_index.source.clone();
        let fault = self.fault.clone();
        let restartable = source.restartable() && idx_source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let src_pairs: Vec<Pair> = source.iter().collect();
            for i in 0..src_pairs.len() {
                for j in (i + 1)..src_pairs.len() {
                    if src_pairs[i].index == src_pairs[j].index {
                        *fault.borrow_mut() = Some(Error::DuplicateIndex(format!("{:?}", src_pairs[i].index)));
                        return Box::new(std::iter::empty());
                    }
                }
            }
            let out: Vec<Pair> = idx_source
                .iter()
                .map(|p| {
                    let found = src_pairs.iter().find(|s| s.index == p.value).map(|s| s.value.clone()).unwrap_or(Value::Absent);
                    Pair::new(p.value, found)
                })
                .collect();
            Box::new(out.into_iter())
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    // ---- Positional slicing (spec §4.D) ---------------------------------

    pub fn skip(&self, n: usize) -> Series {
        self.derive(Rc::new(SkipSource::new(self.source.clone(), n)))
    }

    pub fn take(&self, n: usize) -> Series {
        self.derive(Rc::new(TakeSource::new(self.source.clone(), n)))
    }

    pub fn head(&self, n: usize) -> Series {
        self.take(n)
    }

    /// The last `n` pairs. Requires one buffering pass per `iter()` call to
    /// learn the length first (spec §4.D: "forces a first pass to count").
    pub fn tail(&self, n: usize) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let buf: Vec<Pair> = source.iter().collect();
            let start = buf.len().saturating_sub(n);
            Box::new(buf.into_iter().skip(start))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    pub fn skip_while(&self, pred: ValuePred) -> Series {
        self.derive(Rc::new(SkipWhileSource::new(self.source.clone(), pred)))
    }

    pub fn skip_until(&self, pred: ValuePred) -> Series {
        self.skip_while(Rc::new(move |v: &Value, i: &Value| !pred(v, i)))
    }

    pub fn take_while(&self, pred: ValuePred) -> Series {
        self.derive(Rc::new(TakeWhileSource::new(self.source.clone(), pred)))
    }

    pub fn take_until(&self, pred: ValuePred) -> Series {
        self.take_while(Rc::new(move |v: &Value, i: &Value| !pred(v, i)))
    }

    /// Index-range slice `[start, end)`. With no `cmp`, uses `Value::compare`
    /// to test "at or after `start`" and "before `end`"; a custom `cmp(a,
    /// b) -> bool` (read "a precedes b") replaces both tests.
    pub fn slice(&self, start: Value, end: Value, cmp: Option<Rc<dyn Fn(&Value, &Value) -> bool>>) -> Series {
        let lt: Rc<dyn Fn(&Value, &Value) -> bool> = cmp.unwrap_or_else(|| Rc::new(|a: &Value, b: &Value| a.compare(b) == std::cmp::Ordering::Less));
        let source = self.source.clone();
        let restartable = source.restartable();
        let (lt1, lt2) = (lt.clone(), lt.clone());
        let (start1, end1) = (start.clone(), end.clone());
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let (lt1, lt2) = (lt1.clone(), lt2.clone());
            let (start, end) = (start1.clone(), end1.clone());
            Box::new(source.iter().skip_while(move |p| lt1(&p.index, &start)).take_while(move |p| lt2(&p.index, &end)))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    // ---- Projection (spec §4.D) -----------------------------------------

    pub fn select(&self, map: ValueMap) -> Series {
        self.derive(Rc::new(SelectValueSource::new(self.source.clone(), map)))
    }

    pub fn select_pairs(&self, map: crate::ops::PairMap) -> Series {
        self.derive(Rc::new(SelectPairSource::new(self.source.clone(), map)))
    }

    pub fn select_many(&self, producer: Rc<dyn Fn(&Value, &Value) -> ManyResult>) -> Series {
        self.derive(Rc::new(SelectManySource::new(self.source.clone(), producer)))
    }

    pub fn select_many_pairs(&self, producer: Rc<dyn Fn(&Value, &Value) -> Vec<Pair>>) -> Series {
        self.derive(Rc::new(SelectManyPairsSource::new(self.source.clone(), producer)))
    }

    pub fn where_(&self, pred: ValuePred) -> Series {
        self.derive(Rc::new(WhereSource::new(self.source.clone(), pred)))
    }

    /// `ValueZip`: advances `self` and `others` in lockstep, combining their
    /// values through `combine`; the result's index is always `self`'s
    /// (spec §4.C). Terminates as soon as any input exhausts.
    pub fn zip(&self, others: &[Series], combine: Rc<dyn Fn(&[Value]) -> Value>) -> Series {
        let mut sources = vec![self.source.clone()];
        sources.extend(others.iter().map(|s| s.source.clone()));
        self.derive(Rc::new(ValueZipSource::new(sources, combine)))
    }

    /// `PairZip`: like [`Series::zip`], but keeps every input's value
    /// instead of combining them, as a `Record` keyed `"0"`, `"1"`, ….
    pub fn zip_pairs(&self, others: &[Series]) -> Series {
        let mut sources = vec![self.source.clone()];
        sources.extend(others.iter().map(|s| s.source.clone()));
        self.derive(Rc::new(PairZipOp::new(sources)))
    }

    // ---- Ordering (spec §4.F) -------------------------------------------

    pub fn order_by(&self, key_fn: KeyFn) -> Series {
        self.order_by_dir(key_fn, Direction::Ascending)
    }

    pub fn order_by_descending(&self, key_fn: KeyFn) -> Series {
        self.order_by_dir(key_fn, Direction::Descending)
    }

    fn order_by_dir(&self, key_fn: KeyFn, direction: Direction) -> Series {
        let state = SortState::new(self.source.clone(), key_fn, direction);
        let sorted = state.clone().into_source();
        Series { source: sorted, fault: self.fault.clone(), sort_state: Some(Rc::new(state)) }
    }

    /// Extends the most recent `orderBy`/`thenBy` chain with a further tie-
    /// breaking key. Fails with `Error::InvalidArgument` if this series was
    /// not produced by `orderBy`/`orderByDescending`.
    pub fn then_by(&self, key_fn: KeyFn) -> Result<Series> {
        self.then_by_dir(key_fn, Direction::Ascending)
    }

    pub fn then_by_descending(&self, key_fn: KeyFn) -> Result<Series> {
        self.then_by_dir(key_fn, Direction::Descending)
    }

    fn then_by_dir(&self, key_fn: KeyFn, direction: Direction) -> Result<Series> {
        let state = self
            .sort_state
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("thenBy requires a preceding orderBy/orderByDescending".into()))?;
        let next = state.then(key_fn, direction);
        let sorted = next.clone().into_source();
        Ok(Series { source: sorted, fault: self.fault.clone(), sort_state: Some(Rc::new(next)) })
    }

    // ---- Windowing (spec §4.H) -------------------------------------------

    pub fn window(&self, period: usize) -> Series {
        self.derive(Rc::new(FixedWindowSource::new(self.source.clone(), period)))
    }

    pub fn rolling_window(&self, period: usize) -> Series {
        self.derive(Rc::new(RollingWindowSource::new(self.source.clone(), period)))
    }

    pub fn variable_window(&self, eq: WindowEq) -> Series {
        self.derive(Rc::new(VariableWindowSource::new(self.source.clone(), eq)))
    }

    pub fn group_sequential_by(&self, key_fn: Option<KeyFn>) -> Series {
        let key_fn = key_fn.unwrap_or_else(identity_key);
        let eq: WindowEq = Rc::new(move |a: &Pair, b: &Pair| key_fn(&a.value, &a.index) == key_fn(&b.value, &b.index));
        self.variable_window(eq)
    }

    // ---- Aggregation (spec §4.D) -----------------------------------------

    pub fn count(&self) -> Result<usize> {
        self.clear_fault();
        let n = self.source.iter().count();
        self.check_fault()?;
        Ok(n)
    }

    /// `0` for an empty sequence (spec §4.D — not an error).
    pub fn sum(&self) -> Result<Value> {
        self.clear_fault();
        let mut acc_i: i64 = 0;
        let mut acc_f: f64 = 0.0;
        let mut is_float = false;
        for p in self.source.iter() {
            match p.value {
                Value::Absent => {}
                Value::Int(i) => {
                    if is_float {
                        acc_f += i as f64;
                    } else {
                        acc_i += i;
                    }
                }
                Value::Float(v) => {
                    if !is_float {
                        acc_f = acc_i as f64;
                        is_float = true;
                    }
                    acc_f += v;
                }
                other => return Err(Error::TypeMismatch(format!("{other:?}"))),
            }
        }
        self.check_fault()?;
        Ok(if is_float { Value::Float(acc_f) } else { Value::Int(acc_i) })
    }

    /// `0` for an empty sequence, never `NaN` (spec §4.D Edge cases).
    pub fn average(&self) -> Result<Value> {
        self.clear_fault();
        let values: Vec<f64> = self
            .source
            .iter()
            .filter(|p| !p.value.is_absent())
            .map(|p| p.value.as_f64().ok_or_else(|| Error::TypeMismatch(format!("{:?}", p.value))))
            .collect::<Result<_>>()?;
        self.check_fault()?;
        if values.is_empty() {
            return Ok(Value::Int(0));
        }
        Ok(Value::Float(values.iter().sum::<f64>() / values.len() as f64))
    }

    pub fn min(&self) -> Result<Value> {
        self.reduce_extreme(std::cmp::Ordering::Less)
    }

    pub fn max(&self) -> Result<Value> {
        self.reduce_extreme(std::cmp::Ordering::Greater)
    }

    /// The first value, or `EmptySequence` (spec §7).
    pub fn first(&self) -> Result<Value> {
        self.first_pair().map(|p| p.value)
    }

    /// The first pair, or `EmptySequence` (spec §7).
    pub fn first_pair(&self) -> Result<Pair> {
        self.clear_fault();
        let found = self.source.iter().next();
        self.check_fault()?;
        found.ok_or(Error::EmptySequence)
    }

    /// The last value; forces a full pass (spec §4.D `tail`: "forces a
    /// first pass to count"). `EmptySequence` if empty.
    pub fn last(&self) -> Result<Value> {
        self.last_pair().map(|p| p.value)
    }

    /// The last pair; forces a full pass. `EmptySequence` if empty.
    pub fn last_pair(&self) -> Result<Pair> {
        self.clear_fault();
        let found = self.source.iter().last();
        self.check_fault()?;
        found.ok_or(Error::EmptySequence)
    }

    fn reduce_extreme(&self, want: std::cmp::Ordering) -> Result<Value> {
        self.clear_fault();
        let mut best: Option<Value> = None;
        for p in self.source.iter() {
            if p.value.is_absent() {
                continue;
            }
            best = Some(match best {
                None => p.value,
                Some(cur) => {
                    if p.value.compare(&cur) == want {
                        p.value
                    } else {
                        cur
                    }
                }
            });
        }
        self.check_fault()?;
        best.ok_or(Error::EmptySequence)
    }

    pub fn aggregate(&self, seed: Value, reduce: Rc<dyn Fn(&Value, &Value, &Value) -> Value>) -> Result<Value> {
        self.clear_fault();
        let mut acc = seed;
        for p in self.source.iter() {
            acc = reduce(&acc, &p.value, &p.index);
        }
        self.check_fault()?;
        Ok(acc)
    }

    /// Like [`Series::aggregate`], but the first element is the seed and
    /// reduction starts from the second; fails on an empty sequence.
    pub fn aggregate_from_first(&self, reduce: Rc<dyn Fn(&Value, &Value, &Value) -> Value>) -> Result<Value> {
        self.clear_fault();
        let mut iter = self.source.iter();
        let first = iter.next().ok_or(Error::EmptySequence)?;
        let mut acc = first.value;
        for p in iter {
            acc = reduce(&acc, &p.value, &p.index);
        }
        self.check_fault()?;
        Ok(acc)
    }

    // ---- Materialization (spec §4.D) -------------------------------------

    /// Non-absent `(index, value)` pairs, in order.
    pub fn to_pairs(&self) -> Result<Vec<(Value, Value)>> {
        self.clear_fault();
        let out: Vec<(Value, Value)> = self.source.iter().filter(|p| !p.value.is_absent()).map(Pair::into_tuple).collect();
        self.check_fault()?;
        Ok(out)
    }

    /// Non-absent values, in order (spec §4.D: "drops absent slots").
    pub fn to_values(&self) -> Vec<Value> {
        crate::sources::extract_value(self.source.iter().filter(|p| !p.value.is_absent())).collect()
    }

    /// Every value in order, `Absent` slots included (used by
    /// `detectTypes`/`detectValues`, which report on absence too).
    pub(crate) fn raw_values(&self) -> Vec<Value> {
        crate::sources::extract_value(self.source.iter()).collect()
    }

    /// Every value coerced to a `Record`: `Value::Record` passes through,
    /// anything else is wrapped as a single `"value"` field.
    pub fn to_records(&self) -> Vec<Record> {
        self.source
            .iter()
            .filter(|p| !p.value.is_absent())
            .map(|p| match p.value {
                Value::Record(r) => (*r).clone(),
                other => Record::from_pairs(vec![(Rc::from("value"), other)]),
            })
            .collect()
    }

    /// Each record as an ordered value vector, using the first record's
    /// field order.
    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        let records = self.to_records();
        let Some(first) = records.first() else {
            return Vec::new();
        };
        let columns = first.field_names();
        records.iter().map(|r| columns.iter().map(|c| r.get_or_absent(c)).collect()).collect()
    }

    /// Forces a single pass and replaces the pipeline with an array-backed
    /// iterable; idempotent (baking an already-baked series just recopies
    /// its buffer).
    pub fn bake(&self) -> Series {
        let raw: Vec<Pair> = self.source.iter().collect();
        Series::wrap(Rc::new(ArraySource::new(raw)), self.fault.clone())
    }

    pub fn to_json(&self) -> Result<String> {
        let values: Vec<serde_json::Value> = self.to_pairs()?.into_iter().map(|(_, v)| format::value_to_json(&v)).collect();
        serde_json::to_string(&values).map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    // ---- Distinctness / grouping (spec §4.D) -----------------------------

    pub fn distinct(&self, key_fn: Option<KeyFn>) -> Series {
        let key_fn = key_fn.unwrap_or_else(identity_key);
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let mut seen: Vec<Value> = Vec::new();
            let mut out = Vec::new();
            for p in source.iter() {
                let k = key_fn(&p.value, &p.index);
                if !seen.iter().any(|s| s == &k) {
                    seen.push(k);
                    out.push(p);
                }
            }
            Box::new(out.into_iter())
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Collapses only *adjacent* duplicates, unlike `distinct` (spec §4.D).
    pub fn sequential_distinct(&self, key_fn: Option<KeyFn>) -> Series {
        let key_fn = key_fn.unwrap_or_else(identity_key);
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let mut prev_key: Option<Value> = None;
            let mut out = Vec::new();
            for p in source.iter() {
                let k = key_fn(&p.value, &p.index);
                if prev_key.as_ref() != Some(&k) {
                    prev_key = Some(k);
                    out.push(p);
                }
            }
            Box::new(out.into_iter())
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Groups by `keyFn`, preserving first-occurrence order of the keys;
    /// each group's value is a sub-`Series` of the original matching pairs.
    pub fn group_by(&self, key_fn: KeyFn) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let all: Vec<Pair> = source.iter().collect();
            let mut order: Vec<Value> = Vec::new();
            for p in &all {
                let k = key_fn(&p.value, &p.index);
                if !order.iter().any(|o| o == &k) {
                    order.push(k);
                }
            }
            let all = Rc::new(all);
            let key_fn = key_fn.clone();
            let out: Vec<Pair> = order
                .into_iter()
                .map(|k| {
                    let all = all.clone();
                    let key_fn = key_fn.clone();
                    let group_key = k.clone();
                    let sub_source: SourceRef = Rc::new(FnSource::new(move || {
                        let all = all.clone();
                        let key_fn = key_fn.clone();
                        let group_key = group_key.clone();
                        let matching: Vec<Pair> = all.iter().filter(|p| key_fn(&p.value, &p.index) == group_key).cloned().collect();
                        Box::new(matching.into_iter())
                    }));
                    Pair::new(k, Value::Series(Rc::new(Series::from_source(sub_source))))
                })
                .collect();
            Box::new(out.into_iter())
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    // ---- Set operations (spec §4.D) --------------------------------------

    pub fn concat(&self, other: &Series) -> Series {
        self.derive(Rc::new(ConcatSource::new(self.source.clone(), other.source.clone())))
    }

    pub fn union(&self, other: &Series, key_fn: Option<KeyFn>) -> Series {
        self.concat(other).distinct(key_fn)
    }

    pub fn intersection(&self, other: &Series, eq: Option<EqFn>) -> Series {
        let eq = eq.unwrap_or_else(join::structural_eq);
        self.derive(Rc::new(crate::join::IntersectionSource::new(self.source.clone(), other.source.clone(), eq)))
    }

    pub fn except(&self, other: &Series, eq: Option<EqFn>) -> Series {
        let eq = eq.unwrap_or_else(join::structural_eq);
        self.derive(Rc::new(crate::join::ExceptSource::new(self.source.clone(), other.source.clone(), eq)))
    }

    // ---- Joins (spec §4.G) ------------------------------------------------

    pub fn join(&self, other: &Series, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn) -> DataFrame {
        self.join_kind(other, outer_key, inner_key, combine, JoinKind::Inner)
    }

    pub fn join_outer(&self, other: &Series, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn) -> DataFrame {
        self.join_kind(other, outer_key, inner_key, combine, JoinKind::OuterFull)
    }

    pub fn join_outer_left(&self, other: &Series, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn) -> DataFrame {
        self.join_kind(other, outer_key, inner_key, combine, JoinKind::OuterLeft)
    }

    pub fn join_outer_right(&self, other: &Series, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn) -> DataFrame {
        self.join_kind(other, outer_key, inner_key, combine, JoinKind::OuterRight)
    }

    fn join_kind(&self, other: &Series, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn, kind: JoinKind) -> DataFrame {
        let source: SourceRef = Rc::new(JoinSource::new(self.source.clone(), other.source.clone(), outer_key, inner_key, combine, kind));
        DataFrame::from_source(source)
    }

    // ---- Gap filling (spec §4.D) -------------------------------------------

    /// For each consecutive `(a, b)`, emits `a`; if `is_gap(a, b)`, also
    /// emits `fill(a, b)` before moving on. The final original pair is
    /// always appended.
    pub fn fill_gaps(&self, is_gap: WindowEq, fill: FillFn) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let all: Vec<Pair> = source.iter().collect();
            let mut out = Vec::new();
            for w in all.windows(2) {
                let (a, b) = (&w[0], &w[1]);
                out.push(a.clone());
                if is_gap(a, b) {
                    out.extend(fill(a, b));
                }
            }
            if let Some(last) = all.last() {
                out.push(last.clone());
            }
            Box::new(out.into_iter())
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    // ---- Insertion (spec §4.D) ---------------------------------------------

    pub fn insert_pair(&self, pair: Pair) -> Series {
        self.derive(Rc::new(InsertSource::prepend(self.source.clone(), pair)))
    }

    pub fn append_pair(&self, pair: Pair) -> Series {
        self.derive(Rc::new(InsertSource::append(self.source.clone(), pair)))
    }

    // ---- Query (spec §4.D) -------------------------------------------------

    pub fn at(&self, index: &Value) -> Value {
        self.source.iter().find(|p| &p.index == index).map(|p| p.value).unwrap_or(Value::Absent)
    }

    pub fn contains(&self, value: &Value, eq: Option<EqFn>) -> bool {
        let eq = eq.unwrap_or_else(join::structural_eq);
        self.source.iter().any(|p| eq(&p.value, value))
    }

    /// `false` for an empty sequence, matching the vacuous-truth exception
    /// the spec calls out explicitly (spec §4.D Edge cases).
    pub fn all(&self, pred: ValuePred) -> bool {
        let mut saw_any = false;
        for p in self.source.iter() {
            saw_any = true;
            if !pred(&p.value, &p.index) {
                return false;
            }
        }
        saw_any
    }

    pub fn any(&self) -> bool {
        self.source.iter().next().is_some()
    }

    pub fn any_where(&self, pred: ValuePred) -> bool {
        self.source.iter().any(|p| pred(&p.value, &p.index))
    }

    pub fn none(&self) -> bool {
        !self.any()
    }

    pub fn none_where(&self, pred: ValuePred) -> bool {
        !self.any_where(pred)
    }

    // ---- Type coercions (spec §4.D) ----------------------------------------

    pub fn parse_ints(&self) -> Series {
        self.parse_numeric(|s| s.parse::<i64>().ok().map(Value::Int))
    }

    pub fn parse_floats(&self) -> Series {
        self.parse_numeric(|s| s.parse::<f64>().ok().map(Value::Float))
    }

    fn parse_numeric(&self, parse: fn(&str) -> Option<Value>) -> Series {
        let source = self.source.clone();
        let fault = self.fault.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let fault = fault.clone();
            Box::new(source.iter().map(move |p| {
                let value = match &p.value {
                    Value::Absent => Value::Absent,
                    Value::Str(s) if s.is_empty() => Value::Absent,
                    Value::Str(s) => parse(s).unwrap_or_else(|| {
                        *fault.borrow_mut() = Some(Error::TypeMismatch(format!("cannot parse '{s}'")));
                        Value::Absent
                    }),
                    other => {
                        *fault.borrow_mut() = Some(Error::TypeMismatch(format!("{other:?}")));
                        Value::Absent
                    }
                };
                Pair::new(p.index, value)
            }))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Parses string values as dates. With no explicit format, uses a fixed
    /// ISO-8601 (`%Y-%m-%d`) format rather than a locale-sensitive default
    /// (spec §9 Open Questions).
    pub fn parse_dates(&self, fmt: Option<String>) -> Series {
        let fmt = fmt.unwrap_or_else(|| "%Y-%m-%d".to_string());
        let source = self.source.clone();
        let fault = self.fault.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let fault = fault.clone();
            let fmt = fmt.clone();
            Box::new(source.iter().map(move |p| {
                let value = match &p.value {
                    Value::Absent => Value::Absent,
                    Value::Str(s) if s.is_empty() => Value::Absent,
                    Value::Str(s) => match format::parse_date(s, &fmt) {
                        Ok(d) => Value::Date(d),
                        Err(e) => {
                            *fault.borrow_mut() = Some(e);
                            Value::Absent
                        }
                    },
                    other => {
                        *fault.borrow_mut() = Some(Error::TypeMismatch(format!("{other:?}")));
                        Value::Absent
                    }
                };
                Pair::new(p.index, value)
            }))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// Formats every value as a string; dates/datetimes use `fmt` (default
    /// `%Y-%m-%d`, never a locale default — spec §9).
    pub fn to_strings(&self, fmt: Option<String>) -> Series {
        let fmt = fmt.unwrap_or_else(|| "%Y-%m-%d".to_string());
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let fmt = fmt.clone();
            Box::new(source.iter().map(move |p| {
                let value = match &p.value {
                    Value::Absent => Value::Absent,
                    Value::Date(d) => Value::str(format::format_date(d, &fmt)),
                    Value::DateTime(dt) => Value::str(dt.format(&fmt).to_string()),
                    other => Value::str(format::value_to_plain_string(other)),
                };
                Pair::new(p.index, value)
            }))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }

    // ---- Introspection (spec §4.D, SPEC_FULL.md §B) ------------------------

    pub fn detect_types(&self) -> DataFrame {
        detect::detect_types(self)
    }

    pub fn detect_values(&self) -> DataFrame {
        detect::detect_values(self)
    }

    // ---- Supplemented features (SPEC_FULL.md §B) ---------------------------

    pub fn reverse(&self) -> Series {
        self.derive(Rc::new(ReverseSource::new(self.source.clone())))
    }

    /// `(cur - prev) / prev` between consecutive values; `Absent` for the
    /// first element and anywhere the previous value is missing, not a
    /// number, or zero.
    pub fn percent_change(&self) -> Series {
        let source = self.source.clone();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let mut prev: Option<f64> = None;
            Box::new(source.iter().map(move |p| {
                let cur = p.value.as_f64();
                let out = match (prev, cur) {
                    (Some(pv), Some(cv)) if pv != 0.0 => Value::Float((cv - pv) / pv),
                    _ => Value::Absent,
                };
                prev = cur;
                Pair::new(p.index, out)
            }))
        };
        self.derive(Rc::new(FnSource::dependent(f, restartable)))
    }
}

fn identity_key() -> KeyFn {
    Rc::new(|v: &Value, _i: &Value| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Series {
        Series::from_values(values.iter().map(|v| Value::Int(*v)).collect())
    }

    #[test]
    fn skip_take_head_tail() {
        let s = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(s.skip(2).to_values(), vec![Value::Int(3), Value::Int(4), Value::Int(5)]);
        assert_eq!(s.take(2).to_values(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(s.head(2).to_values(), s.take(2).to_values());
        assert_eq!(s.tail(2).to_values(), vec![Value::Int(4), Value::Int(5)]);
    }

    #[test]
    fn select_projects_values_and_preserves_index() {
        let s = ints(&[1, 2, 3]);
        let doubled = s.select(Rc::new(|v: &Value, _| Value::Int(v.as_f64().unwrap() as i64 * 2)));
        assert_eq!(doubled.to_pairs().unwrap(), vec![(Value::Int(0), Value::Int(2)), (Value::Int(1), Value::Int(4)), (Value::Int(2), Value::Int(6))]);
    }

    #[test]
    fn where_filters_by_predicate() {
        let s = ints(&[1, 2, 3, 4]);
        let evens = s.where_(Rc::new(|v: &Value, _| v.as_f64().unwrap() as i64 % 2 == 0));
        assert_eq!(evens.to_values(), vec![Value::Int(2), Value::Int(4)]);
    }

    #[test]
    fn distinct_keeps_first_occurrence_per_key() {
        let s = ints(&[1, 2, 1, 3, 2]);
        assert_eq!(s.distinct(None).to_values(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn reindex_looks_up_by_new_index_and_flags_duplicates() {
        let s = Series::from_values_with_index(vec![Value::Int(10), Value::Int(20)], vec![Value::str("a"), Value::str("b")]);
        let new_index = Series::from_values(vec![Value::str("b"), Value::str("a"), Value::str("c")]);
        let reindexed = s.reindex(&new_index);
        assert_eq!(reindexed.to_values(), vec![Value::Int(20), Value::Int(10)]);

        let dup = Series::from_values_with_index(vec![Value::Int(1), Value::Int(2)], vec![Value::str("a"), Value::str("a")]);
        let err = dup.reindex(&new_index).to_pairs().unwrap_err();
        assert!(matches!(err, Error::DuplicateIndex(_)));
    }

    #[test]
    fn slice_selects_the_half_open_index_range() {
        let s = Series::from_values_with_index(
            vec![Value::Int(10), Value::Int(20), Value::Int(30), Value::Int(40)],
            vec![Value::Int(0), Value::Int(1), Value::Int(2), Value::Int(3)],
        );
        let sliced = s.slice(Value::Int(1), Value::Int(3), None);
        assert_eq!(sliced.to_values(), vec![Value::Int(20), Value::Int(30)]);
    }

    #[test]
    fn parse_ints_treats_empty_string_as_absent() {
        let s = Series::from_values(vec![Value::str("5"), Value::str("")]);
        assert_eq!(s.parse_ints().to_values(), vec![Value::Int(5)]);
    }

    #[test]
    fn sum_average_min_max() {
        let s = ints(&[1, 2, 3, 4]);
        assert_eq!(s.sum().unwrap(), Value::Int(10));
        assert_eq!(s.average().unwrap(), Value::Float(2.5));
        assert_eq!(s.min().unwrap(), Value::Int(1));
        assert_eq!(s.max().unwrap(), Value::Int(4));
    }

    #[test]
    fn empty_sequence_errors_on_min_max_first_last() {
        let empty = Series::empty();
        assert!(matches!(empty.min().unwrap_err(), Error::EmptySequence));
        assert!(matches!(empty.max().unwrap_err(), Error::EmptySequence));
        assert!(matches!(empty.first().unwrap_err(), Error::EmptySequence));
        assert!(matches!(empty.last().unwrap_err(), Error::EmptySequence));
    }

    #[test]
    fn empty_sum_is_zero_and_average_is_zero_not_nan() {
        let empty = Series::empty();
        assert_eq!(empty.sum().unwrap(), Value::Int(0));
        assert_eq!(empty.average().unwrap(), Value::Int(0));
    }

    #[test]
    fn percent_change_resets_on_gaps() {
        let s = Series::from_values(vec![Value::Int(10), Value::Absent, Value::Int(5)]);
        let pairs = s.percent_change().to_pairs().unwrap();
        // index 0: no prior value -> Absent (dropped). index 1: prior is
        // Absent -> Absent (dropped). index 2: prior resets to Absent too,
        // since the gap at index 1 clears the running "previous" value.
        assert!(pairs.is_empty());
    }

    #[test]
    fn then_by_requires_a_prior_order_by() {
        let s = ints(&[1, 2]);
        let err = s.then_by(identity_key()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn order_by_then_by_is_lexicographic_and_stable() {
        let s = Series::from_values(vec![Value::str("b1"), Value::str("a2"), Value::str("a1"), Value::str("b2")]);
        let key_group: KeyFn = Rc::new(|v: &Value, _| Value::str(v.as_str().unwrap()[..1].to_string()));
        let key_rest: KeyFn = Rc::new(|v: &Value, _| Value::str(v.as_str().unwrap()[1..].to_string()));
        let sorted = s.order_by(key_group).then_by(key_rest).unwrap();
        assert_eq!(sorted.to_values(), vec![Value::str("a1"), Value::str("a2"), Value::str("b1"), Value::str("b2")]);
    }

    #[test]
    fn zip_combines_values_and_adopts_the_first_source_index() {
        let a = ints(&[1, 2, 3]);
        let b = ints(&[10, 20, 30]);
        let zipped = a.zip(&[b], Rc::new(|vs: &[Value]| Value::Int(vs[0].as_f64().unwrap() as i64 + vs[1].as_f64().unwrap() as i64)));
        assert_eq!(zipped.to_values(), vec![Value::Int(11), Value::Int(22), Value::Int(33)]);
        assert_eq!(zipped.get_index().to_values(), a.get_index().to_values());
    }

    #[test]
    fn zip_pairs_keeps_every_input_as_a_positionally_keyed_record() {
        let a = ints(&[1, 2]);
        let b = ints(&[10, 20]);
        let zipped = a.zip_pairs(&[b]);
        let values = zipped.to_values();
        let Value::Record(first) = &values[0] else { panic!("expected a record") };
        assert_eq!(first.get_or_absent("0"), Value::Int(1));
        assert_eq!(first.get_or_absent("1"), Value::Int(10));
    }
}
