//! Join and set operators (spec §4.G): equi-join via nested-loop
//! comparison (the spec requires only equivalence to nested-loop, not a
//! particular algorithm), plus the `intersection`/`except` set operators
//! that share the same O(n·m) nested-comparison shape. `union` itself is
//! `concat(other).distinct(keyFn)` and lives on `Series`/`DataFrame`
//! directly (spec §4.D).

use crate::pair::Pair;
use crate::source::{PairSource, SourceRef};
use crate::value::Value;
use std::rc::Rc;

pub type KeyFn = Rc<dyn Fn(&Value, &Value) -> Value>;
pub type CombineFn = Rc<dyn Fn(&Value, &Value) -> Value>;
pub type EqFn = Rc<dyn Fn(&Value, &Value) -> bool>;

pub fn structural_eq() -> EqFn {
    Rc::new(|a: &Value, b: &Value| a == b)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JoinKind {
    Inner,
    OuterFull,
    OuterLeft,
    OuterRight,
}

/// `join`/`joinOuter`/`joinOuterLeft`/`joinOuterRight`: for each outer
/// pair, emit `combine(outer, inner)` for every matching inner pair (spec
/// §4.D, §4.G). The outer variants additionally emit `combine(outer,
/// Absent)` for unmatched outer rows and/or `combine(Absent, inner)` for
/// unmatched inner rows, in the order `(left except matches) ∪ join ∪
/// (right except matches)` (spec §4.D), using the explicit `Absent`
/// sentinel rather than `null` on the missing side (spec §9 Open
/// Questions). The output index is always reset to `0..n`.
pub struct JoinSource {
    outer: SourceRef,
    inner: SourceRef,
    outer_key: KeyFn,
    inner_key: KeyFn,
    combine: CombineFn,
    kind: JoinKind,
}

impl JoinSource {
    pub fn new(outer: SourceRef, inner: SourceRef, outer_key: KeyFn, inner_key: KeyFn, combine: CombineFn, kind: JoinKind) -> JoinSource {
        JoinSource { outer, inner, outer_key, inner_key, combine, kind }
    }
}

impl PairSource for JoinSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        tracing::debug!(kind = ?self.kind, "materializing join");
        let inner_rows: Vec<Pair> = self.inner.iter().collect();
        let outer_rows: Vec<Pair> = self.outer.iter().collect();

        let mut unmatched_left = Vec::new();
        let mut matches = Vec::new();
        let mut inner_matched = vec![false; inner_rows.len()];

        for o in &outer_rows {
            let ok = (self.outer_key)(&o.value, &o.index);
            let mut matched = false;
            for (j, i) in inner_rows.iter().enumerate() {
                let ik = (self.inner_key)(&i.value, &i.index);
                if ok == ik {
                    matched = true;
                    inner_matched[j] = true;
                    matches.push((self.combine)(&o.value, &i.value));
                }
            }
            if !matched && matches!(self.kind, JoinKind::OuterFull | JoinKind::OuterLeft) {
                unmatched_left.push((self.combine)(&o.value, &Value::Absent));
            }
        }

        let mut unmatched_right = Vec::new();
        if matches!(self.kind, JoinKind::OuterFull | JoinKind::OuterRight) {
            for (j, i) in inner_rows.iter().enumerate() {
                if !inner_matched[j] {
                    unmatched_right.push((self.combine)(&Value::Absent, &i.value));
                }
            }
        }

        let mut out = unmatched_left;
        out.extend(matches);
        out.extend(unmatched_right);

        Box::new(out.into_iter().enumerate().map(|(idx, v)| Pair::new(Value::Int(idx as i64), v)))
    }

    fn restartable(&self) -> bool {
        self.outer.restartable() && self.inner.restartable()
    }
}

/// `intersection(other, eq?)`: elements of `self` for which some element
/// of `other` satisfies `eq`; `self`'s pairs (index included) pass through
/// unchanged (spec §4.D).
pub struct IntersectionSource {
    left: SourceRef,
    right: SourceRef,
    eq: EqFn,
}

impl IntersectionSource {
    pub fn new(left: SourceRef, right: SourceRef, eq: EqFn) -> IntersectionSource {
        IntersectionSource { left, right, eq }
    }
}

impl PairSource for IntersectionSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let right_vals: Vec<Pair> = self.right.iter().collect();
        let eq = self.eq.clone();
        Box::new(
            self.left
                .iter()
                .filter(move |l| right_vals.iter().any(|r| eq(&l.value, &r.value))),
        )
    }

    fn restartable(&self) -> bool {
        self.left.restartable() && self.right.restartable()
    }
}

/// `except(other, eq?)`: elements of `self` for which no element of
/// `other` satisfies `eq` (spec §4.D).
pub struct ExceptSource {
    left: SourceRef,
    right: SourceRef,
    eq: EqFn,
}

impl ExceptSource {
    pub fn new(left: SourceRef, right: SourceRef, eq: EqFn) -> ExceptSource {
        ExceptSource { left, right, eq }
    }
}

impl PairSource for ExceptSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let right_vals: Vec<Pair> = self.right.iter().collect();
        let eq = self.eq.clone();
        Box::new(
            self.left
                .iter()
                .filter(move |l| !right_vals.iter().any(|r| eq(&l.value, &r.value))),
        )
    }

    fn restartable(&self) -> bool {
        self.left.restartable() && self.right.restartable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ArraySource;

    fn row(id: i64, tag: &str) -> Pair {
        Pair::new(Value::Int(id), Value::str(tag))
    }

    fn by_tag() -> KeyFn {
        Rc::new(|v: &Value, _| v.clone())
    }

    fn combine_tags() -> CombineFn {
        Rc::new(|o: &Value, i: &Value| {
            Value::str(format!("{}-{}", crate::format::value_to_plain_string(o), crate::format::value_to_plain_string(i)))
        })
    }

    #[test]
    fn inner_join_emits_combine_for_every_matching_pair() {
        let outer: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a"), row(1, "b")]));
        let inner: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a"), row(1, "a")]));
        let joined = JoinSource::new(outer, inner, by_tag(), by_tag(), combine_tags(), JoinKind::Inner);
        let out: Vec<Value> = joined.iter().map(|p| p.value).collect();
        assert_eq!(out, vec![Value::str("a-a"), Value::str("a-a")]);
    }

    #[test]
    fn outer_left_keeps_unmatched_outer_rows_with_absent_inner() {
        let outer: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a"), row(1, "z")]));
        let inner: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a")]));
        let joined = JoinSource::new(outer, inner, by_tag(), by_tag(), combine_tags(), JoinKind::OuterLeft);
        let out: Vec<Value> = joined.iter().map(|p| p.value).collect();
        assert_eq!(out, vec![Value::str("z-"), Value::str("a-a")]);
    }

    #[test]
    fn join_output_index_is_reset_to_0_n() {
        let outer: SourceRef = Rc::new(ArraySource::new(vec![row(5, "a"), row(9, "b")]));
        let inner: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a"), row(1, "b")]));
        let joined = JoinSource::new(outer, inner, by_tag(), by_tag(), combine_tags(), JoinKind::Inner);
        let indexes: Vec<Value> = joined.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn intersection_and_except_partition_the_left_side() {
        let left: SourceRef = Rc::new(ArraySource::new(vec![row(0, "a"), row(1, "b"), row(2, "c")]));
        let right: SourceRef = Rc::new(ArraySource::new(vec![row(9, "b"), row(9, "c")]));
        let inter = IntersectionSource::new(left.clone(), right.clone(), structural_eq());
        let except = ExceptSource::new(left, right, structural_eq());
        assert_eq!(inter.iter().map(|p| p.value).collect::<Vec<_>>(), vec![Value::str("b"), Value::str("c")]);
        assert_eq!(except.iter().map(|p| p.value).collect::<Vec<_>>(), vec![Value::str("a")]);
    }
}
