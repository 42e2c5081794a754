use std::rc::Rc;

use crate::pair::Pair;
use crate::source::PairSource;

/// `Array-of-T`: a cursor stepping through an indexable, already-materialized
/// buffer (spec §4.B). Also the representation `bake()` and every
/// materializing operator (sort, distinct, join, pivot) cache their result
/// in.
pub struct ArraySource {
    data: Rc<Vec<Pair>>,
}

impl ArraySource {
    pub fn new(data: Vec<Pair>) -> ArraySource {
        ArraySource { data: Rc::new(data) }
    }

    pub fn from_rc(data: Rc<Vec<Pair>>) -> ArraySource {
        ArraySource { data }
    }
}

impl PairSource for ArraySource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        let data = self.data.clone();
        Box::new((0..data.len()).map(move |i| data[i].clone()))
    }
}
