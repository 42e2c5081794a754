//! The re-startable iterable contract every operator is built on (spec
//! §4.A, §4.B).
//!
//! This mirrors the teacher's own `Cursor` trait
//! (`trace::cursor::Cursor`, which exposes navigation over a `Storage` that
//! outlives any one cursor) generalized from "navigate a batch" to
//! "navigate a pipeline": a [`PairSource`] is the re-startable *iterable*
//! (spec GLOSSARY), and `iter()` is how a fresh single-pass cursor (spec
//! §4.A: `advance`/`current`) is obtained. Rather than hand-roll the
//! `advance`/`current` protocol, cursors here are ordinary
//! `Iterator<Item = Pair>` values — idiomatic Rust already gives us that
//! protocol (`next()` plays the role of `advance()` + `current()` in one
//! call) — and restart is the outer concern `PairSource` adds on top: every
//! `iter()` call produces an independent, fresh iterator over the same
//! logical sequence.
use crate::pair::Pair;

/// A re-startable producer of pair cursors.
///
/// Implementors must ensure that `iter()` can be called any number of
/// times and that, for a restartable source, each call replays the same
/// sequence (spec §3 "Restart contract"). Operators built from other
/// `PairSource`s inherit restartability automatically: they simply defer
/// to their inputs' `iter()` on every call.
pub trait PairSource {
    /// Produces a fresh cursor positioned before the first pair.
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>>;

    /// Whether a second call to `iter()` is guaranteed to replay the same
    /// sequence. `false` only for pipelines rooted in a user-supplied
    /// single-shot generator (spec §3, §9); operations that require
    /// multiple passes must check this and fail with
    /// `Error::InvalidArgument` rather than silently reusing a spent
    /// generator.
    fn restartable(&self) -> bool {
        true
    }
}

/// A boxed, shared handle to a [`PairSource`]. `Series` and `DataFrame`
/// both wrap exactly one of these (spec §3 "Series"/"DataFrame").
pub type SourceRef = std::rc::Rc<dyn PairSource>;

/// Blanket wrapper so any `Fn() -> Box<dyn Iterator<Item = Pair>>` closure
/// can be used as a restartable `PairSource` without a bespoke struct; used
/// by operators that are cheap one-liners over their input's iterator.
pub struct FnSource<F> {
    pub(crate) f: F,
    pub(crate) restartable: bool,
}

impl<F> FnSource<F>
where
    F: Fn() -> Box<dyn Iterator<Item = Pair>>,
{
    pub fn new(f: F) -> FnSource<F> {
        FnSource { f, restartable: true }
    }

    pub fn single_shot(f: F) -> FnSource<F> {
        FnSource { f, restartable: false }
    }

    /// For wrappers that derive their restartability from an inner source
    /// captured by `f`.
    pub fn dependent(f: F, restartable: bool) -> FnSource<F> {
        FnSource { f, restartable }
    }
}

impl<F> PairSource for FnSource<F>
where
    F: Fn() -> Box<dyn Iterator<Item = Pair>>,
{
    fn iter(&self) -> Box<dyn Iterator<Item = Pair>> {
        (self.f)()
    }

    fn restartable(&self) -> bool {
        self.restartable
    }
}
