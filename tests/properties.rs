//! Property tests for the quantified invariants in spec §8.

use std::rc::Rc;

use proptest::prelude::*;
use tabflow::{DataFrame, Record, Series, Value};

fn ints(values: &[i64]) -> Series {
    Series::from_values(values.iter().map(|v| Value::Int(*v)).collect())
}

proptest! {
    /// Restart law: two independent consumptions of a restartable pipeline
    /// produce identical pair sequences.
    #[test]
    fn restart_law(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let s = ints(&values).select(Rc::new(|v: &Value, _| Value::Int(v.as_f64().unwrap() as i64 * 2)));
        let once = s.to_pairs().unwrap();
        let twice = s.to_pairs().unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Projection preserves length for `select`.
    #[test]
    fn select_preserves_length(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let s = ints(&values);
        let projected = s.select(Rc::new(|v: &Value, _| v.clone()));
        prop_assert_eq!(projected.to_values().len(), values.len());
    }

    /// Index preservation for 1-to-1 projections: the emitted index equals
    /// the input index at the same position.
    #[test]
    fn select_preserves_index(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let s = ints(&values);
        let projected = s.select(Rc::new(|v: &Value, _| v.clone()));
        let original_index: Vec<Value> = s.get_index().to_values();
        let projected_index: Vec<Value> = projected.get_index().to_values();
        prop_assert_eq!(original_index, projected_index);
    }

    /// Reverse involution: `reverse(reverse(s)) == s` pair-wise.
    #[test]
    fn reverse_involution(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let s = ints(&values);
        let round_tripped = s.reverse().reverse();
        prop_assert_eq!(s.to_pairs().unwrap(), round_tripped.to_pairs().unwrap());
    }

    /// Concat associativity: `(a.concat(b)).concat(c) == a.concat(b.concat(c))`.
    #[test]
    fn concat_associativity(
        a in prop::collection::vec(any::<i64>(), 0..15),
        b in prop::collection::vec(any::<i64>(), 0..15),
        c in prop::collection::vec(any::<i64>(), 0..15),
    ) {
        let (sa, sb, sc) = (ints(&a), ints(&b), ints(&c));
        let left = sa.concat(&sb).concat(&sc);
        let right = sa.concat(&sb.concat(&sc));
        prop_assert_eq!(left.to_pairs().unwrap(), right.to_pairs().unwrap());
    }

    /// Sort stability: equal keys retain source order.
    #[test]
    fn sort_stability(values in prop::collection::vec(0i64..4, 1..50)) {
        let original: Vec<(usize, i64)> = values.iter().copied().enumerate().collect();
        let s = ints(&values);
        let sorted = s.order_by(Rc::new(|v: &Value, _| v.clone()));
        let sorted_values: Vec<i64> = sorted.to_values().into_iter().map(|v| v.as_f64().unwrap() as i64).collect();

        let mut expected = original;
        expected.sort_by_key(|(_, v)| *v);
        let expected_values: Vec<i64> = expected.into_iter().map(|(_, v)| v).collect();
        prop_assert_eq!(sorted_values, expected_values);
    }

    /// `where_` never produces more pairs than its input (it filters, it
    /// never adds).
    #[test]
    fn where_preserves_or_shrinks_length(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let s = ints(&values);
        let filtered = s.where_(Rc::new(|v: &Value, _| v.as_f64().map(|f| f as i64 % 2 == 0).unwrap_or(false)));
        prop_assert!(filtered.to_values().len() <= values.len());
    }

    /// Pivot round-trip: for a frame where `(keyCol, valueCol)` is a
    /// function on the index, pivot followed by melting the spread columns
    /// back down yields the original `(keyCol, valueCol)` pairs per row.
    #[test]
    fn pivot_round_trip(rows in prop::collection::vec((0i64..6, any::<i64>()), 0..30)) {
        let records: Vec<Record> = rows
            .iter()
            .map(|(k, v)| Record::new().with("k", Value::Int(*k)).with("v", Value::Int(*v)))
            .collect();
        let frame = DataFrame::from_records(records, true);
        let pivoted = frame.pivot("k", "v").unwrap();

        for (record, (k, v)) in pivoted.to_records().iter().zip(rows.iter()) {
            let mut melted = None;
            for (name, value) in record.iter() {
                if *value != Value::Absent {
                    prop_assert!(melted.is_none(), "more than one non-absent spread column in a pivoted row");
                    melted = Some((name.to_string(), value.clone()));
                }
            }
            let (label, value) = melted.expect("pivoted row has no non-absent spread column");
            prop_assert_eq!(label, k.to_string());
            prop_assert_eq!(value, Value::Int(*v));
        }
    }

    /// Join identity: `a.join(b, k, k, merge)` on equal keys contains
    /// exactly the multiset of pairs produced by nested comparison.
    #[test]
    fn join_identity(
        a in prop::collection::vec(0i64..5, 0..15),
        b in prop::collection::vec(0i64..5, 0..15),
    ) {
        let sa = ints(&a);
        let sb = ints(&b);
        let key: tabflow::KeyFn = Rc::new(|v: &Value, _| v.clone());
        let merge: tabflow::CombineFn = Rc::new(|l: &Value, r: &Value| {
            Value::Record(Rc::new(Record::new().with("l", l.clone()).with("r", r.clone())))
        });
        let joined = sa.join(&sb, key.clone(), key, merge);

        let mut expected: Vec<(i64, i64)> = Vec::new();
        for &l in &a {
            for &r in &b {
                if l == r {
                    expected.push((l, r));
                }
            }
        }

        let actual: Vec<(i64, i64)> = joined
            .to_records()
            .iter()
            .map(|rec| {
                let l = rec.get_or_absent("l").as_f64().unwrap() as i64;
                let r = rec.get_or_absent("r").as_f64().unwrap() as i64;
                (l, r)
            })
            .collect();

        prop_assert_eq!(actual, expected);
    }
}
