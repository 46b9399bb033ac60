//! The closed pattern type and its shared contract.

use ndarray::{ArrayD, IxDyn};
use num_traits::Float;
use rand::Rng;

use crate::array::NumericArrayPattern;
use crate::containers::{PatternArray, PatternDict};
use crate::error::PatternError;
use crate::folded::Folded;
use crate::psdmatrix::PsdSymmetricMatrixPattern;
use crate::simplex::SimplexPattern;

/// A bijection between a structured value and its flat vector forms, with
/// validation.
///
/// Every variant supports two flat forms: the direct one (`free = false`,
/// essentially a reshape subject to the variant's domain constraints) and
/// the free one (`free = true`), an unconstraining transform under which
/// every finite flat vector folds to a valid value.
///
/// Patterns are immutable after construction and hold no state across
/// calls; the same pattern can serve any scalar type implementing
/// [`num_traits::Float`], including forward-mode AD scalars.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pattern {
    /// Numeric array with optional elementwise bounds.
    NumericArray(NumericArrayPattern),
    /// Probability simplex.
    Simplex(SimplexPattern),
    /// Symmetric positive semi-definite matrix.
    PsdSymmetricMatrix(PsdSymmetricMatrixPattern),
    /// Ordered named sub-patterns.
    Dict(PatternDict),
    /// Fixed outer array of a repeated base pattern.
    Array(PatternArray),
}

impl Pattern {
    /// Unbounded numeric array pattern.
    pub fn numeric_array(shape: &[usize]) -> Self {
        Pattern::NumericArray(NumericArrayPattern::new(shape))
    }

    /// Simplex pattern of dimension `k`.
    pub fn simplex(dim: usize) -> Result<Self, PatternError> {
        SimplexPattern::new(dim).map(Pattern::Simplex)
    }

    /// PSD matrix pattern of size `n`.
    pub fn psd_matrix(size: usize) -> Self {
        Pattern::PsdSymmetricMatrix(PsdSymmetricMatrixPattern::new(size))
    }

    /// Flat vector length in the given mode.
    pub fn flat_length(&self, free: bool) -> usize {
        match self {
            Pattern::NumericArray(p) => p.flat_length(),
            Pattern::Simplex(p) => p.flat_length(free),
            Pattern::PsdSymmetricMatrix(p) => p.flat_length(free),
            Pattern::Dict(p) => p.flat_length(free),
            Pattern::Array(p) => p.flat_length(free),
        }
    }

    /// Folded array shape, or `None` for dict-valued patterns.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Pattern::NumericArray(p) => Some(p.shape().to_vec()),
            Pattern::Simplex(p) => Some(vec![p.dim()]),
            Pattern::PsdSymmetricMatrix(p) => Some(vec![p.size(), p.size()]),
            Pattern::Dict(_) => None,
            Pattern::Array(p) => Some(p.shape()),
        }
    }

    /// Map a folded value to its flat vector form.
    ///
    /// The folded value is validated first; a domain violation is an error.
    pub fn flatten<T: Float>(
        &self,
        folded: &Folded<T>,
        free: bool,
    ) -> Result<Vec<T>, PatternError> {
        match self {
            Pattern::NumericArray(p) => p.flatten(folded.as_array()?, free),
            Pattern::Simplex(p) => p.flatten(folded.as_array()?, free),
            Pattern::PsdSymmetricMatrix(p) => p.flatten(folded.as_array()?, free),
            Pattern::Dict(p) => p.flatten(folded, free),
            Pattern::Array(p) => p.flatten(folded.as_array()?, free),
        }
    }

    /// Map a flat vector back to its folded form, validating the result.
    ///
    /// The length check is unconditional; the domain check rejects folded
    /// values that violate the pattern's constraints. Free folds are valid
    /// by construction and skip the domain check.
    pub fn fold<T: Float>(&self, flat: &[T], free: bool) -> Result<Folded<T>, PatternError> {
        self.fold_impl(flat, free, true)
    }

    /// Like [`fold`](Self::fold) but skips the domain check, returning the
    /// folded value even if it violates the pattern's constraints.
    ///
    /// The length check still applies: a length mismatch is never suppressed.
    pub fn fold_unchecked<T: Float>(
        &self,
        flat: &[T],
        free: bool,
    ) -> Result<Folded<T>, PatternError> {
        self.fold_impl(flat, free, false)
    }

    pub(crate) fn fold_impl<T: Float>(
        &self,
        flat: &[T],
        free: bool,
        validate: bool,
    ) -> Result<Folded<T>, PatternError> {
        match self {
            Pattern::NumericArray(p) => p.fold(flat, free, validate),
            Pattern::Simplex(p) => p.fold(flat, free, validate),
            Pattern::PsdSymmetricMatrix(p) => p.fold(flat, free, validate),
            Pattern::Dict(p) => p.fold(flat, free, validate),
            Pattern::Array(p) => p.fold(flat, free, validate),
        }
    }

    /// Non-throwing validity check: whether `folded` is a valid instance,
    /// with a diagnostic message (empty when valid).
    pub fn validate_folded<T: Float>(&self, folded: &Folded<T>) -> (bool, String) {
        match self {
            Pattern::Dict(p) => p.validate(folded),
            _ => {
                let arr = match folded.as_array() {
                    Ok(a) => a,
                    Err(_) => return (false, "expected an array folded value".to_string()),
                };
                match self {
                    Pattern::NumericArray(p) => p.validate(arr),
                    Pattern::Simplex(p) => p.validate(arr),
                    Pattern::PsdSymmetricMatrix(p) => p.validate(arr),
                    Pattern::Array(p) => p.validate(arr),
                    Pattern::Dict(_) => unreachable!(),
                }
            }
        }
    }

    /// A folded-shaped boolean container with every position set to `default`.
    pub fn empty_bool(&self, default: bool) -> Folded<bool> {
        match self {
            Pattern::Dict(p) => p.empty_bool(default),
            Pattern::Array(p) => p.empty_bool(default),
            _ => {
                let shape = self.shape().expect("leaf patterns have a shape");
                Folded::Array(ArrayD::from_elem(IxDyn(&shape), default))
            }
        }
    }

    /// Flat indices (in the given mode) selected by a folded-shaped boolean
    /// mask.
    ///
    /// For patterns whose free transform couples entries (simplex, PSD), any
    /// marked position selects the pattern's whole free segment; composite
    /// patterns recurse into sub-patterns and offset by each segment's
    /// position in the concatenated layout.
    pub fn flat_indices(
        &self,
        mask: &Folded<bool>,
        free: bool,
    ) -> Result<Vec<usize>, PatternError> {
        let mut out = Vec::new();
        self.flat_indices_impl(mask, free, 0, &mut out)?;
        Ok(out)
    }

    pub(crate) fn flat_indices_impl(
        &self,
        mask: &Folded<bool>,
        free: bool,
        offset: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), PatternError> {
        match self {
            Pattern::NumericArray(p) => p.flat_indices(mask.as_array()?, offset, out),
            Pattern::Simplex(p) => p.flat_indices(mask.as_array()?, free, offset, out),
            Pattern::PsdSymmetricMatrix(p) => p.flat_indices(mask.as_array()?, free, offset, out),
            Pattern::Dict(p) => p.flat_indices(mask, free, offset, out),
            Pattern::Array(p) => p.flat_indices(mask.as_array()?, free, offset, out),
        }
    }

    /// A random valid folded value: a uniform draw in free space, folded.
    ///
    /// Validity follows from the totality of the free transform.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Folded<f64> {
        let flat: Vec<f64> = (0..self.flat_length(true)).map(|_| rng.gen()).collect();
        self.fold_unchecked(&flat, true)
            .expect("free fold of a correct-length vector cannot fail")
    }
}

impl From<NumericArrayPattern> for Pattern {
    fn from(p: NumericArrayPattern) -> Self {
        Pattern::NumericArray(p)
    }
}

impl From<SimplexPattern> for Pattern {
    fn from(p: SimplexPattern) -> Self {
        Pattern::Simplex(p)
    }
}

impl From<PsdSymmetricMatrixPattern> for Pattern {
    fn from(p: PsdSymmetricMatrixPattern) -> Self {
        Pattern::PsdSymmetricMatrix(p)
    }
}

impl From<PatternDict> for Pattern {
    fn from(p: PatternDict) -> Self {
        Pattern::Dict(p)
    }
}

impl From<PatternArray> for Pattern {
    fn from(p: PatternArray) -> Self {
        Pattern::Array(p)
    }
}
