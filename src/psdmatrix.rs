//! Pattern for symmetric positive semi-definite matrices.

use ndarray::{Array2, ArrayD, IxDyn};
use num_traits::Float;

use crate::error::PatternError;
use crate::folded::Folded;

/// Tolerance on `|a_ij - a_ji|` when validating symmetry.
const SYM_TOL: f64 = 1e-8;

/// A pattern for an `n x n` symmetric positive semi-definite matrix.
///
/// The non-free flat form is the `n²` entries in row-major order. The free
/// form has `n(n+1)/2` entries: the lower Cholesky factor with the diagonal
/// log-transformed, packed column-major (column by column, rows on and below
/// the diagonal). The free fold re-exponentiates the diagonal and forms
/// `L·Lᵀ`, a bijection from ℝ^{n(n+1)/2} onto the open cone of positive
/// definite matrices — every finite free vector folds to a valid matrix.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PsdSymmetricMatrixPattern {
    size: usize,
    diag_lb: f64,
}

impl PsdSymmetricMatrixPattern {
    /// PSD pattern for an `n x n` matrix with diagonal lower bound zero.
    pub fn new(size: usize) -> Self {
        PsdSymmetricMatrixPattern { size, diag_lb: 0.0 }
    }

    /// PSD pattern with a nonnegative lower bound on the diagonal entries.
    pub fn with_diag_lb(size: usize, diag_lb: f64) -> Result<Self, PatternError> {
        if diag_lb < 0.0 {
            return Err(PatternError::Constraint(format!(
                "diagonal lower bound must be nonnegative, got {}",
                diag_lb
            )));
        }
        Ok(PsdSymmetricMatrixPattern { size, diag_lb })
    }

    /// Matrix size `n`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Lower bound applied to the diagonal during validation.
    pub fn diag_lb(&self) -> f64 {
        self.diag_lb
    }

    /// Flat length: `n²`, or `n(n+1)/2` in free form.
    pub fn flat_length(&self, free: bool) -> usize {
        let n = self.size;
        if free {
            n * (n + 1) / 2
        } else {
            n * n
        }
    }

    pub(crate) fn validate<T: Float>(&self, folded: &ArrayD<T>) -> (bool, String) {
        let n = self.size;
        if folded.shape() != [n, n] {
            return (
                false,
                format!(
                    "wrong shape for matrix: expected [{}, {}], got {:?}",
                    n,
                    n,
                    folded.shape()
                ),
            );
        }
        let tol = T::from(SYM_TOL).unwrap();
        for i in 0..n {
            for j in 0..i {
                if (folded[[i, j]] - folded[[j, i]]).abs() > tol {
                    return (false, "matrix is not symmetric".to_string());
                }
            }
        }
        let diag_lb = T::from(self.diag_lb).unwrap();
        for i in 0..n {
            if folded[[i, i]] < diag_lb {
                return (
                    false,
                    format!("diagonal entries are below the lower bound {}", self.diag_lb),
                );
            }
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
        if !free {
            return Ok(folded.iter().copied().collect());
        }
        let n = self.size;
        let l = cholesky_lower(folded, n).ok_or_else(|| {
            PatternError::Constraint(
                "matrix is not positive definite up to tolerance; \
                 cannot compute the free parameterization"
                    .to_string(),
            )
        })?;
        let mut out = Vec::with_capacity(self.flat_length(true));
        for c in 0..n {
            out.push(l[[c, c]].ln());
            for r in c + 1..n {
                out.push(l[[r, c]]);
            }
        }
        Ok(out)
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
        let n = self.size;
        if free {
            // Unpack L column by column, exponentiating the diagonal, then
            // form L·Lᵀ.
            let mut l = Array2::<T>::from_elem((n, n), T::zero());
            let mut k = 0;
            for c in 0..n {
                l[[c, c]] = flat[k].exp();
                k += 1;
                for r in c + 1..n {
                    l[[r, c]] = flat[k];
                    k += 1;
                }
            }
            let mut m = Array2::<T>::from_elem((n, n), T::zero());
            for i in 0..n {
                for j in 0..=i {
                    let mut sum = T::zero();
                    for c in 0..=j {
                        sum = sum + l[[i, c]] * l[[j, c]];
                    }
                    m[[i, j]] = sum;
                    m[[j, i]] = sum;
                }
            }
            Ok(Folded::Array(m.into_dyn()))
        } else {
            let folded = ArrayD::from_shape_vec(IxDyn(&[n, n]), flat.to_vec())
                .expect("length checked against n squared");
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
        let n = self.size;
        if mask.shape() != [n, n] {
            return Err(PatternError::Constraint(format!(
                "wrong shape for matrix mask: expected [{}, {}], got {:?}",
                n,
                n,
                mask.shape()
            )));
        }
        if free {
            // Every free entry can move every matrix entry through the
            // Cholesky product, so any marked position selects the whole
            // free segment.
            if mask.iter().any(|&m| m) {
                out.extend(offset..offset + self.flat_length(true));
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

/// Lower Cholesky factor of a symmetric matrix held in an `ArrayD`.
///
/// Returns `None` on a non-positive pivot (matrix not positive definite).
fn cholesky_lower<T: Float>(a: &ArrayD<T>, n: usize) -> Option<Array2<T>> {
    let mut l = Array2::<T>::from_elem((n, n), T::zero());
    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d = d - l[[j, k]] * l[[j, k]];
        }
        if d <= T::zero() {
            return None;
        }
        l[[j, j]] = d.sqrt();
        for i in j + 1..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s = s - l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / l[[j, j]];
        }
    }
    Some(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn cholesky_recovers_known_factor() {
        // A = L·Lᵀ with L = [[2, 0], [1, 3]]
        let a = arr2(&[[4.0, 2.0], [2.0, 10.0]]).into_dyn();
        let l = cholesky_lower(&a, 2).unwrap();
        assert!((l[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((l[[1, 0]] - 1.0).abs() < 1e-12);
        assert!((l[[1, 1]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = arr2(&[[1.0, 2.0], [2.0, 1.0]]).into_dyn();
        assert!(cholesky_lower(&a, 2).is_none());
    }

    #[test]
    fn free_packing_is_column_major() {
        let pat = PsdSymmetricMatrixPattern::new(3);
        // L = [[1,0,0],[2,1,0],[3,4,1]] -> A = L·Lᵀ; diagonal of L is 1 so the
        // log-diagonal entries are 0 and the packing order is visible.
        let a = arr2(&[[1.0, 2.0, 3.0], [2.0, 5.0, 10.0], [3.0, 10.0, 26.0]]).into_dyn();
        let v = pat.flatten(&a, true).unwrap();
        // Column-major: (0,0) (1,0) (2,0) (1,1) (2,1) (2,2)
        let expected = [0.0, 2.0, 3.0, 0.0, 4.0, 0.0];
        for (got, want) in v.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-10, "got {v:?}");
        }
    }
}
