//! Pattern for probability simplexes.

use ndarray::{ArrayD, IxDyn};
use num_traits::Float;

use crate::error::PatternError;
use crate::folded::Folded;

/// Tolerance on `sum(x) == 1` when validating a folded simplex.
const SUM_TOL: f64 = 1e-8;

/// A pattern for a probability simplex of dimension `k`: a length-`k` vector
/// of nonnegative entries summing to one.
///
/// The non-free flat form is the `k` entries. The free form has `k - 1`
/// entries: the fold pins a zero in front and applies a log-sum-exp
/// normalized softmax, so every finite free vector folds to a valid simplex;
/// the flatten is `ln(x[i]) - ln(x[0])` for `i` in `1..k`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexPattern {
    dim: usize,
}

impl SimplexPattern {
    /// Simplex pattern of the given dimension (at least 2).
    pub fn new(dim: usize) -> Result<Self, PatternError> {
        if dim < 2 {
            return Err(PatternError::Constraint(format!(
                "simplex dimension must be at least 2, got {}",
                dim
            )));
        }
        Ok(SimplexPattern { dim })
    }

    /// Simplex dimension `k`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Flat length: `k` entries, or `k - 1` in free form.
    pub fn flat_length(&self, free: bool) -> usize {
        if free {
            self.dim - 1
        } else {
            self.dim
        }
    }

    pub(crate) fn validate<T: Float>(&self, folded: &ArrayD<T>) -> (bool, String) {
        if folded.shape() != [self.dim] {
            return (
                false,
                format!(
                    "wrong shape for simplex: expected [{}], got {:?}",
                    self.dim,
                    folded.shape()
                ),
            );
        }
        if folded.iter().any(|&x| x < T::zero()) {
            return (false, "some simplex entries are negative".to_string());
        }
        let sum = folded.iter().fold(T::zero(), |acc, &x| acc + x);
        if (sum - T::one()).abs() > T::from(SUM_TOL).unwrap() {
            return (false, "the simplex entries do not sum to one".to_string());
        }
        (true, String::new())
    }

    pub(crate) fn flatten<T: Float>(
        &self,
        folded: &ArrayD<T>,
        free: bool,
    ) -> Result<Vec<T>, PatternError> {
        let (ok, msg) = self.validate(folded);
        if !ok {
            return Err(PatternError::Constraint(msg));
        }
        if free {
            let first = folded[[0]];
            Ok((1..self.dim)
                .map(|i| folded[[i]].ln() - first.ln())
                .collect())
        } else {
            Ok(folded.iter().copied().collect())
        }
    }

    pub(crate) fn fold<T: Float>(
        &self,
        flat: &[T],
        free: bool,
        validate: bool,
    ) -> Result<Folded<T>, PatternError> {
        let expected = self.flat_length(free);
        if flat.len() != expected {
            return Err(PatternError::WrongLength {
                expected,
                got: flat.len(),
            });
        }
        if free {
            // Softmax over [0, flat...], stabilized by the running maximum.
            let mut max = T::zero();
            for &v in flat {
                if v > max {
                    max = v;
                }
            }
            let mut denom = (T::zero() - max).exp();
            for &v in flat {
                denom = denom + (v - max).exp();
            }
            let lse = max + denom.ln();
            let mut entries = Vec::with_capacity(self.dim);
            entries.push((T::zero() - lse).exp());
            entries.extend(flat.iter().map(|&v| (v - lse).exp()));
            let folded = ArrayD::from_shape_vec(IxDyn(&[self.dim]), entries)
                .expect("length checked against dimension");
            Ok(Folded::Array(folded))
        } else {
            let folded = ArrayD::from_shape_vec(IxDyn(&[self.dim]), flat.to_vec())
                .expect("length checked against dimension");
            if validate {
                let (ok, msg) = self.validate(&folded);
                if !ok {
                    return Err(PatternError::Constraint(msg));
                }
            }
            Ok(Folded::Array(folded))
        }
    }

    pub(crate) fn flat_indices(
        &self,
        mask: &ArrayD<bool>,
        free: bool,
        offset: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), PatternError> {
        if mask.shape() != [self.dim] {
            return Err(PatternError::Constraint(format!(
                "wrong shape for simplex mask: expected [{}], got {:?}",
                self.dim,
                mask.shape()
            )));
        }
        if free {
            // The softmax couples every folded entry to every free entry, so
            // any marked position selects the whole free segment.
            if mask.iter().any(|&m| m) {
                out.extend(offset..offset + self.dim - 1);
            }
        } else {
            out.extend(
                mask.iter()
                    .enumerate()
                    .filter(|(_, &m)| m)
                    .map(|(i, _)| offset + i),
            );
        }
        Ok(())
    }
}
