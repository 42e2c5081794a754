//! Windowing (spec §4.H): fixed, rolling, and variable-length windows over
//! a `Series`, each emitted window itself lazily built as `source.skip(k).take(m)`.

use std::rc::Rc;

use crate::ops::{SkipSource, TakeSource};
use crate::pair::Pair;
use crate::series::Series;
use crate::source::{PairSource, SourceRef};
use crate::value::Value;

fn sub_window(base: SourceRef, offset: usize, len: usize) -> Series {
    let skipped: SourceRef = Rc::new(SkipSource::new(base, offset));
    let windowed: SourceRef = Rc::new(TakeSource::new(skipped, len));
    Series::from_source(windowed)
}

/// `window(period)`: non-overlapping windows of exactly `period` elements,
/// plus a final short window if any remain (spec §4.D).
pub struct FixedWindowSource {
    base: SourceRef,
    period: usize,
}

impl FixedWindowSource {
    pub fn new(base: SourceRef, period: usize) -> FixedWindowSource {
        assert!(period > 0, "window period must be positive");
        FixedWindowSource { base, period }
    }
}

impl PairSource for FixedWindowSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let base = self.base.clone();
        let period = self.period;
        let mut k: i64 = 0;
        Box::new(std::iter::from_fn(move || {
            let offset = k as usize * period;
            if base.iter().nth(offset).is_none() {
                return None;
            }
            let win = sub_window(base.clone(), offset, period);
            let idx = Value::Int(k);
            k += 1;
            Some(Pair::new(idx, Value::Series(Rc::new(win))))
        }))
    }

    fn restartable(&self) -> bool {
        self.base.restartable()
    }
}

/// `rollingWindow(period)`: every contiguous `period`-sized window, stepping
/// by one; emits nothing if the input has fewer than `period` elements
/// (spec §4.D).
pub struct RollingWindowSource {
    base: SourceRef,
    period: usize,
}

impl RollingWindowSource {
    pub fn new(base: SourceRef, period: usize) -> RollingWindowSource {
        assert!(period > 0, "rolling window period must be positive");
        RollingWindowSource { base, period }
    }
}

impl PairSource for RollingWindowSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let base = self.base.clone();
        let period = self.period;
        let mut k: i64 = 0;
        Box::new(std::iter::from_fn(move || {
            let offset = k as usize;
            let available = base.iter().skip(offset).take(period).count();
            if available < period {
                return None;
            }
            let win = sub_window(base.clone(), offset, period);
            let idx = Value::Int(k);
            k += 1;
            Some(Pair::new(idx, Value::Series(Rc::new(win))))
        }))
    }

    fn restartable(&self) -> bool {
        self.base.restartable()
    }
}

/// `(prev, cur) -> bool` equality test driving `variableWindow`.
pub type WindowEq = Rc<dyn Fn(&Pair, &Pair) -> bool>;

/// `variableWindow(eq)`: accumulates while `eq(prev, cur)` holds, with a
/// boundary on the first `false` (spec §4.D). `groupSequentialBy` is this
/// windowing with `eq` derived from key equality.
pub struct VariableWindowSource {
    base: SourceRef,
    eq: WindowEq,
}

impl VariableWindowSource {
    pub fn new(base: SourceRef, eq: WindowEq) -> VariableWindowSource {
        VariableWindowSource { base, eq }
    }
}

impl PairSource for VariableWindowSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let base = self.base.clone();
        let eq = self.eq.clone();
        let mut scan = base.iter().peekable();
        let mut offset: usize = 0;
        let mut k: i64 = 0;
        Box::new(std::iter::from_fn(move || {
            let first = scan.next()?;
            let mut len = 1usize;
            let mut prev = first;
            while let Some(peeked) = scan.peek() {
                if eq(&prev, peeked) {
                    prev = scan.next().unwrap();
                    len += 1;
                } else {
                    break;
                }
            }
            let win = sub_window(base.clone(), offset, len);
            let idx = Value::Int(k);
            offset += len;
            k += 1;
            Some(Pair::new(idx, Value::Series(Rc::new(win))))
        }))
    }

    fn restartable(&self) -> bool {
        self.base.restartable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ArraySource;

    fn ints(values: &[i64]) -> SourceRef {
        Rc::new(ArraySource::new(values.iter().enumerate().map(|(i, v)| Pair::new(Value::Int(i as i64), Value::Int(*v))).collect()))
    }

    fn window_values(p: &Pair) -> Vec<Value> {
        match &p.value {
            Value::Series(s) => s.to_values(),
            _ => panic!("expected a windowed Series"),
        }
    }

    #[test]
    fn fixed_window_emits_a_short_final_window() {
        let source = FixedWindowSource::new(ints(&[1, 2, 3, 4, 5]), 2);
        let windows: Vec<Vec<Value>> = source.iter().map(|p| window_values(&p)).collect();
        assert_eq!(windows, vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3), Value::Int(4)], vec![Value::Int(5)]]);
    }

    #[test]
    fn rolling_window_steps_by_one_and_drops_short_tail() {
        let source = RollingWindowSource::new(ints(&[1, 2, 3, 4]), 3);
        let windows: Vec<Vec<Value>> = source.iter().map(|p| window_values(&p)).collect();
        assert_eq!(
            windows,
            vec![
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                vec![Value::Int(2), Value::Int(3), Value::Int(4)],
            ]
        );
    }

    #[test]
    fn rolling_window_emits_nothing_when_input_is_shorter_than_period() {
        let source = RollingWindowSource::new(ints(&[1, 2]), 3);
        assert_eq!(source.iter().count(), 0);
    }

    #[test]
    fn variable_window_breaks_on_first_inequality() {
        let eq: WindowEq = Rc::new(|a: &Pair, b: &Pair| a.value == b.value);
        let source = VariableWindowSource::new(ints(&[1, 1, 2, 2, 2, 3]), eq);
        let windows: Vec<Vec<Value>> = source.iter().map(|p| window_values(&p)).collect();
        assert_eq!(
            windows,
            vec![vec![Value::Int(1), Value::Int(1)], vec![Value::Int(2), Value::Int(2), Value::Int(2)], vec![Value::Int(3)]]
        );
    }
}
