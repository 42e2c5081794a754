//! `DataFrame`: a `Series` whose values are always `Value::Record`, plus an
//! ordered column-name list (spec §3, §4.E). The row-level combinators
//! (`skip`/`take`/`where`/ordering/`distinct`/`concat`/…) are the same
//! operators `Series` already has — rather than duplicate that whole
//! surface, `DataFrame` exposes the common ones as thin wrappers over its
//! inner `Series` (reachable directly via [`DataFrame::rows`]) and keeps its
//! own API to what genuinely needs column awareness.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::format;
use crate::join::{CombineFn, EqFn};
use crate::ops::ValuePred;
use crate::pair::Pair;
use crate::record::Record;
use crate::series::Series;
use crate::sort::KeyFn;
use crate::source::{FnSource, PairSource, SourceRef};
use crate::sources::MultiSource;
use crate::value::Value;

#[derive(Clone)]
pub struct DataFrame {
    rows: Series,
    columns: RefCell<Option<Rc<Vec<Rc<str>>>>>,
}

/// The three shapes `DataFrame::set_series` accepts for its `data`
/// argument (spec §4.E).
pub enum SetSeriesData {
    /// Matched to rows positionally.
    Values(Vec<Value>),
    /// Matched to rows by index, re-indexed to the frame's own index.
    Series(Series),
    /// Evaluated per row as `(row, index) -> value`.
    Fn(Rc<dyn Fn(&Record, &Value) -> Value>),
}

impl From<Vec<Value>> for SetSeriesData {
    fn from(values: Vec<Value>) -> SetSeriesData {
        SetSeriesData::Values(values)
    }
}

impl From<Series> for SetSeriesData {
    fn from(series: Series) -> SetSeriesData {
        SetSeriesData::Series(series)
    }
}

impl From<&Series> for SetSeriesData {
    fn from(series: &Series) -> SetSeriesData {
        SetSeriesData::Series(series.clone())
    }
}

impl From<Rc<dyn Fn(&Record, &Value) -> Value>> for SetSeriesData {
    fn from(producer: Rc<dyn Fn(&Record, &Value) -> Value>) -> SetSeriesData {
        SetSeriesData::Fn(producer)
    }
}

impl DataFrame {
    fn with_columns(rows: Series, columns: Vec<Rc<str>>) -> DataFrame {
        DataFrame { rows, columns: RefCell::new(Some(Rc::new(columns))) }
    }

    /// Builds a frame over an arbitrary source with columns inferred lazily
    /// from the first row (used by `join`/`pivot`/`merge`, which don't know
    /// their output shape without peeking).
    pub(crate) fn from_source(source: SourceRef) -> DataFrame {
        DataFrame { rows: Series::from_source(source), columns: RefCell::new(None) }
    }

    fn from_records_with_columns(records: Vec<Record>, columns: Vec<Rc<str>>) -> DataFrame {
        let pairs = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| Pair::new(Value::Int(i as i64), Value::Record(Rc::new(r))))
            .collect();
        DataFrame::with_columns(Series::from_pairs(pairs), columns)
    }

    fn ensure_columns(&self) -> Vec<Rc<str>> {
        if let Some(c) = self.columns.borrow().as_ref() {
            return (**c).clone();
        }
        let first = self.rows.clone_source_ref().iter().find(|p| !p.value.is_absent());
        let cols: Vec<Rc<str>> = match first {
            Some(p) => match &p.value {
                Value::Record(r) => r.field_names(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        *self.columns.borrow_mut() = Some(Rc::new(cols.clone()));
        cols
    }

    fn with_rows(&self, rows: Series) -> DataFrame {
        DataFrame::with_columns(rows, self.ensure_columns())
    }

    pub fn rows(&self) -> &Series {
        &self.rows
    }

    // ---- Construction (spec §4.E, §6) -----------------------------------

    pub fn empty() -> DataFrame {
        DataFrame::with_columns(Series::empty(), Vec::new())
    }

    pub fn from_column_names_and_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> DataFrame {
        let cols: Vec<Rc<str>> = columns.iter().map(|c| Rc::from(c.as_str())).collect();
        let records: Vec<Record> = rows.into_iter().map(|row| Record::from_pairs(cols.iter().cloned().zip(row).collect())).collect();
        DataFrame::from_records_with_columns(records, cols)
    }

    /// Builds a frame from records. With `consider_all_rows`, the column
    /// list is the union of every record's field names in first-occurrence
    /// order; otherwise just the first record's fields (spec §6).
    pub fn from_records(records: Vec<Record>, consider_all_rows: bool) -> DataFrame {
        let mut cols: Vec<Rc<str>> = Vec::new();
        if consider_all_rows {
            for r in &records {
                for name in r.field_names() {
                    if !cols.contains(&name) {
                        cols.push(name);
                    }
                }
            }
        } else if let Some(first) = records.first() {
            cols = first.field_names();
        }
        DataFrame::from_records_with_columns(records, cols)
    }

    pub fn from_columns(columns: Vec<(String, Vec<Value>)>, index: Option<Vec<Value>>) -> DataFrame {
        let cols: Vec<Rc<str>> = columns.iter().map(|(n, _)| Rc::from(n.as_str())).collect();
        let source_cols: Vec<(Rc<str>, Rc<Vec<Value>>)> = columns.into_iter().map(|(n, v)| (Rc::from(n.as_str()), Rc::new(v))).collect();
        let idx = index.map(Rc::new);
        let source: SourceRef = Rc::new(MultiSource::new(source_cols, idx));
        DataFrame::with_columns(Series::from_source(source), cols)
    }

    pub fn from_iterable(iter: impl Iterator<Item = Pair> + 'static, columns: Vec<String>) -> DataFrame {
        let cols: Vec<Rc<str>> = columns.iter().map(|c| Rc::from(c.as_str())).collect();
        DataFrame::with_columns(Series::from_generator(iter), cols)
    }

    // ---- Column access (spec §4.E) ---------------------------------------

    /// `getColumns()`: the declared columns in order, each paired with its
    /// `Series` (spec §4.E: `[{name, series}]`).
    pub fn get_columns(&self) -> Vec<(Rc<str>, Series)> {
        self.ensure_columns()
            .into_iter()
            .map(|name| {
                let series = self.get_series(&name).expect("column name came from ensure_columns");
                (name, series)
            })
            .collect()
    }

    /// The declared column names in order, without building a `Series` per
    /// column (the cheap half of [`DataFrame::get_columns`]).
    pub fn column_names(&self) -> Vec<Rc<str>> {
        self.ensure_columns()
    }

    pub fn has_series(&self, name: &str) -> bool {
        self.ensure_columns().iter().any(|c| &**c == name)
    }

    pub fn get_series(&self, name: &str) -> Option<Series> {
        if !self.has_series(name) {
            return None;
        }
        let source = self.rows.clone_source_ref();
        let name: Rc<str> = Rc::from(name);
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let name = name.clone();
            Box::new(source.iter().map(move |p| {
                let v = match &p.value {
                    Value::Record(r) => r.get_or_absent(&name),
                    _ => Value::Absent,
                };
                Pair::new(p.index, v)
            }))
        };
        Some(Series::from_source(Rc::new(FnSource::new(f))))
    }

    pub fn expect_series(&self, name: &str) -> Result<Series> {
        self.get_series(name).ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    // ---- Column mutation (spec §4.E) -------------------------------------

    /// `setSeries(col, data)`'s `data` argument (spec §4.E): an array of
    /// values matched positionally, a `Series` matched by index (re-indexed
    /// to the frame's own index), or a `fn(row, index) -> value` evaluated
    /// per row.
    pub fn set_series(&self, name: &str, data: impl Into<SetSeriesData>) -> DataFrame {
        let value_series = match data.into() {
            SetSeriesData::Values(values) => Series::from_values(values),
            SetSeriesData::Series(s) => s.reindex(&self.rows.get_index()),
            SetSeriesData::Fn(f) => self.select(f),
        };
        self.merge_column_positionally(name, &value_series)
    }

    /// Zips `self.rows` with `values` positionally (both already in the
    /// frame's row order at this point) and writes each value under `name`.
    fn merge_column_positionally(&self, name: &str, values: &Series) -> DataFrame {
        let rows_source = self.rows.clone_source_ref();
        let val_source = values.clone_source_ref();
        let name: Rc<str> = Rc::from(name);
        let restartable = rows_source.restartable() && val_source.restartable();
        let col_name = name.clone();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let name = col_name.clone();
            Box::new(rows_source.iter().zip(val_source.iter()).map(move |(rp, vp)| {
                let rec = match &rp.value {
                    Value::Record(r) => (**r).clone(),
                    _ => Record::new(),
                };
                let rec = rec.with(name.clone(), vp.value);
                Pair::new(rp.index, Value::Record(Rc::new(rec)))
            }))
        };
        let mut cols = self.ensure_columns();
        if !cols.iter().any(|c| **c == *name) {
            cols.push(name);
        }
        DataFrame::with_columns(Series::from_source(Rc::new(FnSource::dependent(f, restartable))), cols)
    }

    pub fn transform_series(&self, name: &str, map: crate::ops::ValueMap) -> Result<DataFrame> {
        let series = self.expect_series(name)?.select(map);
        Ok(self.set_series(name, series))
    }

    pub fn generate_series(&self, name: &str, producer: Rc<dyn Fn(&Record, &Value) -> Value>) -> DataFrame {
        self.set_series(name, producer)
    }

    pub fn drop_series(&self, name: &str) -> DataFrame {
        let cols: Vec<Rc<str>> = self.ensure_columns().into_iter().filter(|c| &**c != name).collect();
        let name = name.to_string();
        let source = self.rows.clone_source_ref();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let name = name.clone();
            Box::new(source.iter().map(move |p| {
                let rec = match &p.value {
                    Value::Record(r) => r.without(&name),
                    _ => Record::new(),
                };
                Pair::new(p.index, Value::Record(Rc::new(rec)))
            }))
        };
        DataFrame::with_columns(Series::from_source(Rc::new(FnSource::new(f))), cols)
    }

    pub fn keep_series(&self, names: &[&str]) -> DataFrame {
        let cols: Vec<Rc<str>> = names.iter().map(|n| Rc::from(*n)).collect();
        let owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let source = self.rows.clone_source_ref();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let owned = owned.clone();
            Box::new(source.iter().map(move |p| {
                let rec = match &p.value {
                    Value::Record(r) => Record::from_pairs(owned.iter().map(|n| (Rc::from(n.as_str()), r.get_or_absent(n))).collect()),
                    _ => Record::new(),
                };
                Pair::new(p.index, Value::Record(Rc::new(rec)))
            }))
        };
        DataFrame::with_columns(Series::from_source(Rc::new(FnSource::new(f))), cols)
    }

    pub fn rename_series(&self, old: &str, new: &str) -> DataFrame {
        let cols: Vec<Rc<str>> = self.ensure_columns().into_iter().map(|c| if &*c == old { Rc::from(new) } else { c }).collect();
        let (old, new) = (old.to_string(), new.to_string());
        let source = self.rows.clone_source_ref();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let (old, new) = (old.clone(), new.clone());
            Box::new(source.iter().map(move |p| {
                let rec = match &p.value {
                    Value::Record(r) => {
                        let v = r.get_or_absent(&old);
                        r.without(&old).with(new.clone(), v)
                    }
                    _ => Record::new(),
                };
                Pair::new(p.index, Value::Record(Rc::new(rec)))
            }))
        };
        DataFrame::with_columns(Series::from_source(Rc::new(FnSource::new(f))), cols)
    }

    pub fn remap_columns(&self, mapping: &[(&str, &str)]) -> DataFrame {
        let mut df = self.clone();
        for (old, new) in mapping {
            df = df.rename_series(old, new);
        }
        df
    }

    /// Reorders the declared column list only; row data is untouched.
    pub fn bring_to_front(&self, names: &[&str]) -> DataFrame {
        let mut cols = self.ensure_columns();
        let mut front = Vec::new();
        for n in names {
            if let Some(pos) = cols.iter().position(|c| &**c == *n) {
                front.push(cols.remove(pos));
            }
        }
        front.extend(cols);
        DataFrame::with_columns(self.rows.clone(), front)
    }

    pub fn bring_to_back(&self, names: &[&str]) -> DataFrame {
        let mut cols = self.ensure_columns();
        let mut back = Vec::new();
        for n in names {
            if let Some(pos) = cols.iter().position(|c| &**c == *n) {
                back.push(cols.remove(pos));
            }
        }
        cols.extend(back);
        DataFrame::with_columns(self.rows.clone(), cols)
    }

    // ---- Row projection (mirrors Series, spec §4.D/§4.E) ------------------

    pub fn skip(&self, n: usize) -> DataFrame {
        self.with_rows(self.rows.skip(n))
    }

    pub fn take(&self, n: usize) -> DataFrame {
        self.with_rows(self.rows.take(n))
    }

    pub fn head(&self, n: usize) -> DataFrame {
        self.take(n)
    }

    pub fn tail(&self, n: usize) -> DataFrame {
        self.with_rows(self.rows.tail(n))
    }

    pub fn where_rows(&self, pred: Rc<dyn Fn(&Record, &Value) -> bool>) -> DataFrame {
        let value_pred: ValuePred = Rc::new(move |v: &Value, i: &Value| match v {
            Value::Record(r) => pred(r, i),
            _ => false,
        });
        self.with_rows(self.rows.where_(value_pred))
    }

    /// `select(fn)`: maps every row's record (plus its index) to a single
    /// value, same semantics as `Series::select` but over records.
    pub fn select(&self, map: Rc<dyn Fn(&Record, &Value) -> Value>) -> Series {
        let value_map: crate::ops::ValueMap = Rc::new(move |v: &Value, i: &Value| match v {
            Value::Record(r) => map(r, i),
            _ => Value::Absent,
        });
        self.rows.select(value_map)
    }

    /// `selectPairs(fn)`: maps every row to a new `(index, value)` pair.
    pub fn select_pairs(&self, map: Rc<dyn Fn(&Record, &Value) -> (Value, Value)>) -> Series {
        let pair_map: crate::ops::PairMap = Rc::new(move |v: &Value, i: &Value| match v {
            Value::Record(r) => map(r, i),
            _ => (i.clone(), Value::Absent),
        });
        self.rows.select_pairs(pair_map)
    }

    /// `selectMany(fn)`: maps every row to zero or more values, flattened
    /// into one series.
    pub fn select_many(&self, producer: Rc<dyn Fn(&Record, &Value) -> crate::ops::ManyResult>) -> Series {
        let value_producer: Rc<dyn Fn(&Value, &Value) -> crate::ops::ManyResult> = Rc::new(move |v: &Value, i: &Value| match v {
            Value::Record(r) => producer(r, i),
            _ => crate::ops::ManyResult::from(Vec::new()),
        });
        self.rows.select_many(value_producer)
    }

    /// `selectManyPairs(fn)`: maps every row to zero or more output pairs.
    pub fn select_many_pairs(&self, producer: Rc<dyn Fn(&Record, &Value) -> Vec<Pair>>) -> Series {
        let pair_producer: Rc<dyn Fn(&Value, &Value) -> Vec<Pair>> = Rc::new(move |v: &Value, i: &Value| match v {
            Value::Record(r) => producer(r, i),
            _ => Vec::new(),
        });
        self.rows.select_many_pairs(pair_producer)
    }

    pub fn order_by_column(&self, column: &str, descending: bool) -> DataFrame {
        let column = column.to_string();
        let key_fn: KeyFn = Rc::new(move |v: &Value, _i: &Value| match v {
            Value::Record(r) => r.get_or_absent(&column),
            _ => Value::Absent,
        });
        let sorted = if descending { self.rows.order_by_descending(key_fn) } else { self.rows.order_by(key_fn) };
        self.with_rows(sorted)
    }

    pub fn distinct(&self, key_fn: Option<KeyFn>) -> DataFrame {
        self.with_rows(self.rows.distinct(key_fn))
    }

    pub fn concat(&self, other: &DataFrame) -> DataFrame {
        let mut cols = self.ensure_columns();
        for c in other.ensure_columns() {
            if !cols.contains(&c) {
                cols.push(c);
            }
        }
        DataFrame::with_columns(self.rows.concat(&other.rows), cols)
    }

    pub fn union(&self, other: &DataFrame, key_fn: Option<KeyFn>) -> DataFrame {
        self.concat(other).distinct(key_fn)
    }

    pub fn intersection(&self, other: &DataFrame, eq: Option<EqFn>) -> DataFrame {
        self.with_rows(self.rows.intersection(&other.rows, eq))
    }

    // ---- Windowing and grouping (spec §4.H) --------------------------------

    /// Wraps each nested sub-`Series` in `series` (as produced by windowing
    /// or grouping over `self.rows`) as a `DataFrame` sharing this frame's
    /// column list — turning a series-of-series into the series-of-frames
    /// spec §4.H documents for two-dimensional data.
    fn wrap_nested_as_frames(&self, series: Series) -> Series {
        let cols = self.ensure_columns();
        let value_map: crate::ops::ValueMap = Rc::new(move |v: &Value, _i: &Value| match v {
            Value::Series(s) => Value::Frame(Rc::new(DataFrame::with_columns((**s).clone(), cols.clone()))),
            other => other.clone(),
        });
        series.select(value_map)
    }

    pub fn window(&self, period: usize) -> Series {
        self.wrap_nested_as_frames(self.rows.window(period))
    }

    pub fn rolling_window(&self, period: usize) -> Series {
        self.wrap_nested_as_frames(self.rows.rolling_window(period))
    }

    pub fn variable_window(&self, eq: crate::window::WindowEq) -> Series {
        self.wrap_nested_as_frames(self.rows.variable_window(eq))
    }

    pub fn group_by(&self, key_fn: KeyFn) -> Series {
        self.wrap_nested_as_frames(self.rows.group_by(key_fn))
    }

    pub fn group_sequential_by(&self, key_fn: Option<KeyFn>) -> Series {
        self.wrap_nested_as_frames(self.rows.group_sequential_by(key_fn))
    }

    pub fn except(&self, other: &DataFrame, eq: Option<EqFn>) -> DataFrame {
        self.with_rows(self.rows.except(&other.rows, eq))
    }

    pub fn count(&self) -> Result<usize> {
        self.rows.count()
    }

    // ---- Column derivation (spec §4.E, SPEC_FULL.md §B) --------------------

    /// `deflate(fn)`: frame → series. Maps every row (its record plus its
    /// index) through `fn` into a single value, collapsing the frame to a
    /// flat `Series` of the same length.
    pub fn deflate(&self, map: Rc<dyn Fn(&Record, &Value) -> Value>) -> Series {
        let rows_source = self.rows.clone_source_ref();
        let restartable = rows_source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let map = map.clone();
            Box::new(rows_source.iter().map(move |p| {
                let out = match &p.value {
                    Value::Record(r) => map(r, &p.index),
                    _ => Value::Absent,
                };
                Pair::new(p.index, out)
            }))
        };
        Series::from_source(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// `inflate(series[, fn])`: series → frame. Maps every value (plus its
    /// index) through `fn` into a record; without `fn`, the value is
    /// assumed to already be a record. The inverse of [`DataFrame::deflate`].
    pub fn inflate(series: &Series, map: Option<Rc<dyn Fn(&Value, &Value) -> Record>>) -> DataFrame {
        let source = series.clone_source_ref();
        let restartable = source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let map = map.clone();
            Box::new(source.iter().map(move |p| {
                let rec = match &map {
                    Some(m) => m(&p.value, &p.index),
                    None => match &p.value {
                        Value::Record(r) => (**r).clone(),
                        _ => Record::new(),
                    },
                };
                Pair::new(p.index, Value::Record(Rc::new(rec)))
            }))
        };
        DataFrame::from_source(Rc::new(FnSource::dependent(f, restartable)))
    }

    /// `inflateColumn(col[, fn])`: expands `col`'s cell in every row through
    /// `fn` into a record, merging its fields onto the row in place of
    /// `col`. Without `fn`, the cell is assumed to already be a record.
    /// The column list is re-inferred from the expanded rows.
    pub fn inflate_column(&self, column: &str, map: Option<Rc<dyn Fn(&Value, &Value) -> Record>>) -> Result<DataFrame> {
        self.expect_series(column)?;
        let column: Rc<str> = Rc::from(column);
        let rows_source = self.rows.clone_source_ref();
        let restartable = rows_source.restartable();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let map = map.clone();
            let column = column.clone();
            Box::new(rows_source.iter().map(move |p| {
                let row = match &p.value {
                    Value::Record(r) => (**r).clone(),
                    _ => Record::new(),
                };
                let cell = row.get_or_absent(&column);
                let expanded = match &map {
                    Some(m) => m(&cell, &p.index),
                    None => match &cell {
                        Value::Record(r) => (**r).clone(),
                        _ => Record::new(),
                    },
                };
                let mut merged = row.without(&column);
                for (k, v) in expanded.iter() {
                    merged = merged.with(k, v.clone());
                }
                Pair::new(p.index, Value::Record(Rc::new(merged)))
            }))
        };
        Ok(DataFrame::from_source(Rc::new(FnSource::dependent(f, restartable))))
    }

    /// Spreads `keyCol`'s distinct values into new columns: row `i` gets
    /// `valueCol`'s value under the column named by `row[keyCol]`, and
    /// `Absent` under every other new column. Row count and index are
    /// unchanged (spec §8 scenario 5).
    pub fn pivot(&self, key_col: &str, value_col: &str) -> Result<DataFrame> {
        self.expect_series(key_col)?;
        self.expect_series(value_col)?;
        let other_cols: Vec<Rc<str>> = self.ensure_columns().into_iter().filter(|c| &**c != key_col && &**c != value_col).collect();
        let pairs: Vec<Pair> = self.rows.clone_source_ref().iter().collect();

        let mut key_values: Vec<Value> = Vec::new();
        for p in &pairs {
            if let Value::Record(r) = &p.value {
                let k = r.get_or_absent(key_col);
                if !key_values.iter().any(|kv| kv == &k) {
                    key_values.push(k);
                }
            }
        }

        let out_pairs: Vec<Pair> = pairs
            .into_iter()
            .map(|p| {
                let row = match &p.value {
                    Value::Record(r) => Some(r.clone()),
                    _ => None,
                };
                let mut rec = Record::new();
                for c in &other_cols {
                    rec = rec.with(c.clone(), row.as_ref().map(|r| r.get_or_absent(c)).unwrap_or(Value::Absent));
                }
                let row_key = row.as_ref().map(|r| r.get_or_absent(key_col)).unwrap_or(Value::Absent);
                let row_value = row.as_ref().map(|r| r.get_or_absent(value_col)).unwrap_or(Value::Absent);
                for kv in &key_values {
                    let label = format::value_to_plain_string(kv);
                    let cell = if &row_key == kv { row_value.clone() } else { Value::Absent };
                    rec = rec.with(label, cell);
                }
                Pair::new(p.index, Value::Record(Rc::new(rec)))
            })
            .collect();

        let mut new_cols = other_cols;
        for kv in &key_values {
            new_cols.push(Rc::from(format::value_to_plain_string(kv).as_str()));
        }
        let source: SourceRef = Rc::new(crate::sources::ArraySource::new(out_pairs));
        Ok(DataFrame::with_columns(Series::from_source(source), new_cols))
    }

    /// With `on`, an inner equi-join keyed on that column. Without, an inner
    /// join keyed on each frame's own row index (spec §4.E: "without col,
    /// merges on the frame indexes"). Either way self's fields win
    /// field-name conflicts, and the output index is reset to `0..n`
    /// (spec §4.G join semantics).
    pub fn merge(&self, other: &DataFrame, on: Option<&str>) -> Result<DataFrame> {
        let combine: CombineFn = Rc::new(|a: &Value, b: &Value| {
            let ra = match a {
                Value::Record(r) => (**r).clone(),
                _ => Record::new(),
            };
            let rb = match b {
                Value::Record(r) => (**r).clone(),
                _ => Record::new(),
            };
            let mut merged = rb;
            for (k, v) in ra.iter() {
                merged = merged.with(k, v.clone());
            }
            Value::Record(Rc::new(merged))
        });

        let (outer_key, inner_key): (KeyFn, KeyFn) = match on {
            Some(col) => {
                self.expect_series(col)?;
                other.expect_series(col)?;
                let col = col.to_string();
                let col2 = col.clone();
                (
                    Rc::new(move |v: &Value, _i: &Value| match v {
                        Value::Record(r) => r.get_or_absent(&col),
                        _ => Value::Absent,
                    }),
                    Rc::new(move |v: &Value, _i: &Value| match v {
                        Value::Record(r) => r.get_or_absent(&col2),
                        _ => Value::Absent,
                    }),
                )
            }
            None => (Rc::new(|_v: &Value, i: &Value| i.clone()), Rc::new(|_v: &Value, i: &Value| i.clone())),
        };

        let mut cols = self.ensure_columns();
        for c in other.ensure_columns() {
            if !cols.contains(&c) {
                cols.push(c);
            }
        }
        let joined = self.rows.join(&other.rows, outer_key, inner_key, combine);
        Ok(DataFrame::with_columns(joined.rows().clone(), cols))
    }

    // ---- Index management (spec §4.E) --------------------------------------

    pub fn set_index(&self, column: &str) -> Result<DataFrame> {
        self.expect_series(column)?;
        let column = column.to_string();
        let source = self.rows.clone_source_ref();
        let f = move || -> Box<dyn Iterator<Item = Pair>> {
            let column = column.clone();
            Box::new(source.iter().map(move |p| {
                let idx = match &p.value {
                    Value::Record(r) => r.get_or_absent(&column),
                    _ => Value::Absent,
                };
                Pair::new(idx, p.value)
            }))
        };
        Ok(DataFrame::with_columns(Series::from_source(Rc::new(FnSource::new(f))), self.ensure_columns()))
    }

    pub fn reset_index(&self) -> DataFrame {
        self.with_rows(self.rows.reset_index())
    }

    // ---- Serialization (spec §4.E, SPEC_FULL.md §B) ------------------------

    pub fn to_records(&self) -> Vec<Record> {
        self.rows.to_records()
    }

    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        let cols = self.ensure_columns();
        self.to_records().iter().map(|r| cols.iter().map(|c| r.get_or_absent(c)).collect()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let cols = self.ensure_columns();
        let arr: Vec<serde_json::Value> = self
            .to_records()
            .iter()
            .map(|r| {
                let map = cols.iter().map(|c| (c.to_string(), format::value_to_json(&r.get_or_absent(c)))).collect();
                serde_json::Value::Object(map)
            })
            .collect();
        serde_json::to_string(&arr).map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    pub fn to_csv(&self) -> String {
        let cols_rc = self.ensure_columns();
        let cols: Vec<String> = cols_rc.iter().map(|c| c.to_string()).collect();
        let mut out = format::csv_header(&cols);
        out.push('\n');
        for r in self.to_records() {
            out.push_str(&format::record_to_csv_row(&r, &cols));
            out.push('\n');
        }
        out
    }

    // ---- Introspection (SPEC_FULL.md §B) ------------------------------------

    pub fn detect_types(&self) -> DataFrame {
        crate::detect::detect_types(&self.rows)
    }

    pub fn detect_values(&self) -> DataFrame {
        crate::detect::detect_values(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::from_column_names_and_rows(
            vec!["name".to_string(), "age".to_string()],
            vec![vec![Value::str("Ann"), Value::Int(30)], vec![Value::str("Bo"), Value::Int(25)]],
        )
    }

    #[test]
    fn construction_infers_columns_from_first_record_by_default() {
        let records = vec![
            Record::new().with("a", Value::Int(1)).with("b", Value::Int(2)),
            Record::new().with("a", Value::Int(3)).with("c", Value::Int(4)),
        ];
        let df = DataFrame::from_records(records.clone(), false);
        assert_eq!(*df.column_names(), vec![Rc::from("a"), Rc::from("b")]);

        let df_all = DataFrame::from_records(records, true);
        assert_eq!(*df_all.column_names(), vec![Rc::from("a"), Rc::from("b"), Rc::from("c")]);
    }

    #[test]
    fn column_access_round_trips_through_records() {
        let df = frame();
        assert_eq!(df.get_series("name").unwrap().to_values(), vec![Value::str("Ann"), Value::str("Bo")]);
        assert!(df.get_series("missing").is_none());
        assert!(matches!(df.expect_series("missing").unwrap_err(), Error::UnknownColumn(_)));
    }

    #[test]
    fn merge_on_column_is_an_inner_join_with_self_fields_winning_conflicts() {
        let left = DataFrame::from_column_names_and_rows(vec!["id".to_string(), "name".to_string()], vec![vec![Value::Int(1), Value::str("Ann")]]);
        let right = DataFrame::from_column_names_and_rows(vec!["id".to_string(), "name".to_string()], vec![vec![Value::Int(1), Value::str("Other")]]);
        let merged = left.merge(&right, Some("id")).unwrap();
        let names = merged.expect_series("name").unwrap().to_values();
        assert_eq!(names, vec![Value::str("Ann")]);
    }

    #[test]
    fn merge_without_column_joins_on_row_index() {
        let left = DataFrame::from_column_names_and_rows(vec!["a".to_string()], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        let right = DataFrame::from_column_names_and_rows(vec!["b".to_string()], vec![vec![Value::str("x")], vec![Value::str("y")]]);
        let merged = left.merge(&right, None).unwrap();
        assert_eq!(*merged.column_names(), vec![Rc::from("a"), Rc::from("b")]);
        assert_eq!(merged.expect_series("a").unwrap().to_values(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(merged.expect_series("b").unwrap().to_values(), vec![Value::str("x"), Value::str("y")]);
    }

    #[test]
    fn to_csv_has_a_header_row_and_quotes_per_rfc_4180() {
        let df = DataFrame::from_column_names_and_rows(vec!["label".to_string()], vec![vec![Value::str("has,comma")]]);
        assert_eq!(df.to_csv(), "label\n\"has,comma\"\n");
    }

    #[test]
    fn set_index_and_reset_index_round_trip() {
        let df = frame();
        let indexed = df.set_index("name").unwrap();
        assert_eq!(indexed.rows().get_index().to_values(), vec![Value::str("Ann"), Value::str("Bo")]);
        let reset = indexed.reset_index();
        assert_eq!(reset.rows().get_index().to_values(), vec![Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn deflate_collapses_a_frame_to_a_series() {
        let df = frame();
        let ages: Rc<dyn Fn(&Record, &Value) -> Value> = Rc::new(|r, _i| r.get_or_absent("age"));
        let series = df.deflate(ages);
        assert_eq!(series.to_values(), vec![Value::Int(30), Value::Int(25)]);
    }

    #[test]
    fn inflate_without_fn_assumes_values_are_already_records() {
        let rows = Series::from_values(vec![
            Value::Record(Rc::new(Record::new().with("a", Value::Int(1)))),
            Value::Record(Rc::new(Record::new().with("a", Value::Int(2)))),
        ]);
        let df = DataFrame::inflate(&rows, None);
        assert_eq!(df.expect_series("a").unwrap().to_values(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn inflate_column_merges_the_mapped_record_onto_the_row() {
        let df = DataFrame::from_column_names_and_rows(vec!["point".to_string()], vec![vec![Value::str("1,2")], vec![Value::str("3,4")]]);
        let split: Rc<dyn Fn(&Value, &Value) -> Record> = Rc::new(|v, _i| match v {
            Value::Str(s) => {
                let mut parts = s.split(',');
                let x: i64 = parts.next().unwrap().parse().unwrap();
                let y: i64 = parts.next().unwrap().parse().unwrap();
                Record::new().with("x", Value::Int(x)).with("y", Value::Int(y))
            }
            _ => Record::new(),
        });
        let expanded = df.inflate_column("point", Some(split)).unwrap();
        assert_eq!(expanded.expect_series("x").unwrap().to_values(), vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(expanded.expect_series("y").unwrap().to_values(), vec![Value::Int(2), Value::Int(4)]);
        assert!(expanded.get_series("point").is_none());
    }

    #[test]
    fn select_select_pairs_select_many_mirror_series_semantics_over_records() {
        let df = frame();

        let ages = df.select(Rc::new(|r: &Record, _i: &Value| r.get_or_absent("age")));
        assert_eq!(ages.to_values(), vec![Value::Int(30), Value::Int(25)]);

        let by_name = df.select_pairs(Rc::new(|r: &Record, _i: &Value| (r.get_or_absent("name"), r.get_or_absent("age"))));
        assert_eq!(by_name.to_values(), vec![Value::Int(30), Value::Int(25)]);
        assert_eq!(by_name.get_index().to_values(), vec![Value::str("Ann"), Value::str("Bo")]);

        let doubled = df.select_many(Rc::new(|r: &Record, _i: &Value| {
            let age = r.get_or_absent("age");
            crate::ops::ManyResult::from(vec![age.clone(), age])
        }));
        assert_eq!(doubled.to_values(), vec![Value::Int(30), Value::Int(30), Value::Int(25), Value::Int(25)]);
    }

    #[test]
    fn set_series_accepts_array_series_and_fn() {
        let df = frame();

        let via_array = df.set_series("tag", vec![Value::str("x"), Value::str("y")]);
        assert_eq!(via_array.expect_series("tag").unwrap().to_values(), vec![Value::str("x"), Value::str("y")]);

        let double_age: Rc<dyn Fn(&Record, &Value) -> Value> = Rc::new(|r, _i| match r.get_or_absent("age") {
            Value::Int(n) => Value::Int(n * 2),
            other => other,
        });
        let via_fn = df.set_series("doubled", double_age);
        assert_eq!(via_fn.expect_series("doubled").unwrap().to_values(), vec![Value::Int(60), Value::Int(50)]);
    }

    #[test]
    fn set_series_with_a_series_matches_by_index_not_position() {
        let df = frame();
        // Row 0 ("Ann") carries frame index `0`; this series holds `2` at
        // index `0` and `1` at index `5` (not one of the frame's indexes).
        // A positional zip would wrongly give row 0 the value `1`.
        let mismatched_index = Series::from_values_with_index(vec![Value::Int(1), Value::Int(2)], vec![Value::Int(5), Value::Int(0)]);
        let with_col = df.set_series("rank", &mismatched_index);
        let ranks = with_col.expect_series("rank").unwrap().to_pairs().unwrap();
        assert_eq!(ranks, vec![(Value::Int(0), Value::Int(2))]);
    }

    #[test]
    fn window_and_group_by_wrap_nested_series_as_frames() {
        let df = frame();

        let windows = df.window(1).to_values();
        assert_eq!(windows.len(), 2);
        match &windows[0] {
            Value::Frame(f) => assert_eq!(f.expect_series("name").unwrap().to_values(), vec![Value::str("Ann")]),
            _ => panic!("expected a Value::Frame"),
        }

        let groups = df.group_by(Rc::new(|v: &Value, _i: &Value| match v {
            Value::Record(r) => r.get_or_absent("name"),
            _ => Value::Absent,
        }));
        let group_values = groups.to_values();
        assert_eq!(group_values.len(), 2);
        assert!(matches!(group_values[0], Value::Frame(_)));
    }
}
