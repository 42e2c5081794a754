use crate::pair::Pair;
use crate::source::PairSource;

/// A source whose cursor's first `advance()` returns `false` (spec §4.B).
pub struct EmptySource;

impl PairSource for EmptySource {
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        Box::new(std::iter::empty())
    }
}
