//! Sort engine (spec §4.F): a multi-key stable `orderBy`/`thenBy` chain,
//! deferred until the pipeline is actually driven, then cached.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};
use crate::sources::ArraySource;
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Ascending,
    Descending,
}

pub type KeyFn = Rc<dyn Fn(&Value, &Value) -> Value>;

#[derive(Clone)]
pub struct SortKey {
    pub key_fn: KeyFn,
    pub direction: Direction,
}

/// The accumulated `(keyFn, direction)` batch behind a `orderBy`/`thenBy`
/// chain (spec §4.F), plus the original (unsorted) source it is rooted on
/// so that `thenBy` can extend the batch and recompute from scratch
/// ("the previous pipeline is untouched").
#[derive(Clone)]
pub struct SortState {
    pub base: SourceRef,
    pub keys: Vec<SortKey>,
}

impl SortState {
    pub fn new(base: SourceRef, key_fn: KeyFn, direction: Direction) -> SortState {
        SortState { base, keys: vec![SortKey { key_fn, direction }] }
    }

    pub fn then(&self, key_fn: KeyFn, direction: Direction) -> SortState {
        let mut keys = self.keys.clone();
        keys.push(SortKey { key_fn, direction });
        SortState { base: self.base.clone(), keys }
    }

    pub fn comparator(&self) -> impl Fn(&Pair, &Pair) -> Ordering + '_ {
        move |a, b| {
            for key in &self.keys {
                let ka = (key.key_fn)(&a.value, &a.index);
                let kb = (key.key_fn)(&b.value, &b.index);
                let ord = ka.compare(&kb);
                let ord = match key.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
    }

    pub fn into_source(self) -> SourceRef {
        Rc::new(SortSource { state: self, cache: RefCell::new(None) })
    }
}

/// The composite comparator over the accumulated key batch: `sort_by` on
/// the fully materialized pair vector is a stable sort (spec §4.F), and the
/// result is cached on first consumption so later cursors replay it without
/// re-sorting (spec §5 "materializing operators ... capture their result
/// in a closure").
pub struct SortSource {
    state: SortState,
    cache: RefCell<Option<Rc<Vec<Pair>>>>,
}

impl PairSource for SortSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        if self.cache.borrow().is_none() {
            tracing::debug!(keys = self.state.keys.len(), "materializing sort");
            let mut buf: Vec<Pair> = self.state.base.iter().collect();
            let cmp = self.state.comparator();
            buf.sort_by(|a, b| cmp(a, b));
            *self.cache.borrow_mut() = Some(Rc::new(buf));
        }
        let data = self.cache.borrow().clone().unwrap();
        ArraySource::from_rc(data).iter()
    }

    fn restartable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ArraySource as BaseArraySource;

    fn pairs(values: &[i64]) -> Vec<Pair> {
        values.iter().enumerate().map(|(i, v)| Pair::new(Value::Int(i as i64), Value::Int(*v))).collect()
    }

    fn identity_key() -> KeyFn {
        Rc::new(|v: &Value, _| v.clone())
    }

    #[test]
    fn stable_sort_keeps_source_order_for_equal_keys() {
        let base: SourceRef = Rc::new(BaseArraySource::new(pairs(&[1, 0, 1, 0, 1])));
        let state = SortState::new(base, identity_key(), Direction::Ascending);
        let sorted: Vec<Pair> = state.into_source().iter().collect();
        let indexes: Vec<i64> = sorted
            .into_iter()
            .map(|p| match p.index {
                Value::Int(i) => i,
                _ => unreachable!(),
            })
            .collect();
        // two groups of equal keys (0s then 1s), each preserving arrival order
        assert_eq!(indexes, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn then_by_extends_the_batch_without_mutating_the_original() {
        let base: SourceRef = Rc::new(BaseArraySource::new(pairs(&[2, 1, 2, 1])));
        let first = SortState::new(base, identity_key(), Direction::Ascending);
        let extended = first.then(identity_key(), Direction::Descending);
        assert_eq!(first.keys.len(), 1);
        assert_eq!(extended.keys.len(), 2);
    }

    #[test]
    fn sort_result_is_cached_across_repeated_iteration() {
        let base: SourceRef = Rc::new(BaseArraySource::new(pairs(&[3, 1, 2])));
        let source = SortState::new(base, identity_key(), Direction::Ascending).into_source();
        let first: Vec<Value> = source.iter().map(|p| p.value).collect();
        let second: Vec<Value> = source.iter().map(|p| p.value).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }
}
