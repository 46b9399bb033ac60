//! The container type for structured ("folded") values.

use ndarray::{Array1, Array2, ArrayD};

use crate::error::PatternError;

/// A folded value: what a pattern folds a flat vector into.
///
/// Leaves are dynamic-dimensional row-major arrays; dict patterns fold into
/// named entries kept in insertion order. The same container holds numeric
/// values (`Folded<f64>`, `Folded<Dual<f64>>`, ...) and boolean masks
/// (`Folded<bool>`) for [`flat_indices`](crate::Pattern::flat_indices).
#[derive(Clone, Debug, PartialEq)]
pub enum Folded<A> {
    /// An array-shaped value (scalars are zero-dimensional arrays).
    Array(ArrayD<A>),
    /// Named sub-values in insertion order.
    Dict(Vec<(String, Folded<A>)>),
}

impl<A> Folded<A> {
    /// Borrow the array if this is an array-shaped value.
    pub fn as_array(&self) -> Result<&ArrayD<A>, PatternError> {
        match self {
            Folded::Array(a) => Ok(a),
            Folded::Dict(_) => Err(PatternError::KindMismatch { expected: "array" }),
        }
    }

    /// Borrow the entries if this is a dict value.
    pub fn as_dict(&self) -> Result<&[(String, Folded<A>)], PatternError> {
        match self {
            Folded::Dict(entries) => Ok(entries),
            Folded::Array(_) => Err(PatternError::KindMismatch { expected: "dict" }),
        }
    }

    /// Look up a named entry of a dict value.
    pub fn get(&self, name: &str) -> Option<&Folded<A>> {
        match self {
            Folded::Dict(entries) => entries.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Folded::Array(_) => None,
        }
    }

    /// Whether this value is array-shaped.
    pub fn is_array(&self) -> bool {
        matches!(self, Folded::Array(_))
    }
}

impl<A> From<ArrayD<A>> for Folded<A> {
    fn from(a: ArrayD<A>) -> Self {
        Folded::Array(a)
    }
}

impl<A> From<Array1<A>> for Folded<A> {
    fn from(a: Array1<A>) -> Self {
        Folded::Array(a.into_dyn())
    }
}

impl<A> From<Array2<A>> for Folded<A> {
    fn from(a: Array2<A>) -> Self {
        Folded::Array(a.into_dyn())
    }
}

/// Build a dict folded value from `(name, value)` pairs, preserving order.
pub fn dict<A>(entries: Vec<(&str, Folded<A>)>) -> Folded<A> {
    Folded::Dict(
        entries
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect(),
    )
}
