//! Crate-wide error type.
//!
//! Construction errors (bad constructor shapes) and evaluation errors
//! (everything else) share one enum; see spec §7 for the normative list of
//! kinds. Variant payloads carry enough context to be useful without the
//! *kind* itself becoming a free-form string.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The stable set of error kinds surfaced at the crate boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Wrong shape/type passed to a constructor or operator.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `expectSeries` / `pivot` / `setIndex` referenced a column that does
    /// not exist on the frame.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// `reindex` encountered a repeated index value in its source.
    #[error("duplicate index: {0}")]
    DuplicateIndex(String),

    /// `first`/`last`/`firstPair`/`lastPair` on an empty sequence, or
    /// `min`/`max` on an empty sequence.
    #[error("empty sequence")]
    EmptySequence,

    /// A parse-family operator (`parseInts`, `parseFloats`, `parseDates`)
    /// was handed a non-string value.
    #[error("type mismatch: expected string, found {0}")]
    TypeMismatch(String),

    /// `selectMany`/`selectManyPairs` producer returned something that is
    /// not a finite collection, or a pair of the wrong shape.
    #[error("producer shape error: {0}")]
    ProducerShape(String),
}
