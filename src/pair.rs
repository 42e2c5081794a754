//! The universal element of every pipeline: an `(index, value)` pair
//! (spec §3, GLOSSARY).

use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub index: Value,
    pub value: Value,
}

impl Pair {
    pub fn new(index: Value, value: Value) -> Pair {
        Pair { index, value }
    }

    pub fn into_tuple(self) -> (Value, Value) {
        (self.index, self.value)
    }

    pub fn as_tuple(&self) -> (&Value, &Value) {
        (&self.index, &self.value)
    }
}

impl From<(Value, Value)> for Pair {
    fn from((index, value): (Value, Value)) -> Pair {
        Pair::new(index, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_conversions_round_trip() {
        let p = Pair::new(Value::Int(1), Value::str("x"));
        let (idx, val) = p.clone().into_tuple();
        assert_eq!(idx, Value::Int(1));
        assert_eq!(val, Value::str("x"));
        assert_eq!(Pair::from((idx, val)), p);
    }
}
