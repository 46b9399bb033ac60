//! Dense linear algebra helpers: Cholesky factor/solve and a dense Hessian
//! reference reconstruction.

use num_traits::Float;

use crate::oracle::GradientOracle;

/// Result of a Cholesky factorization `A = L·Lᵀ`.
///
/// Stores the lower factor; solving against a factorization avoids
/// re-factorizing for multiple right-hand sides.
pub struct CholeskyFactors<F> {
    /// Lower-triangular factor, `l[row][col]` with `col <= row`.
    l: Vec<Vec<F>>,
    n: usize,
}

/// Factorize a symmetric positive definite `n x n` matrix.
///
/// Only the lower triangle of `a` is read. Returns `None` on a non-positive
/// pivot (matrix not positive definite).
// Explicit indexing is clearer for the factorization: column order drives the pivots
#[allow(clippy::needless_range_loop)]
pub fn cholesky_factor<F: Float>(a: &[Vec<F>]) -> Option<CholeskyFactors<F>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let mut l = vec![vec![F::zero(); n]; n];
    for j in 0..n {
        let mut d = a[j][j];
        for k in 0..j {
            d = d - l[j][k] * l[j][k];
        }
        if d <= F::zero() {
            return None; // Not positive definite
        }
        l[j][j] = d.sqrt();
        for i in (j + 1)..n {
            let mut s = a[i][j];
            for k in 0..j {
                s = s - l[i][k] * l[j][k];
            }
            l[i][j] = s / l[j][j];
        }
    }

    Some(CholeskyFactors { l, n })
}

/// Solve `A · x = b` using a pre-computed Cholesky factorization.
// Explicit indexing is clearer for forward/back substitution
#[allow(clippy::needless_range_loop)]
pub fn cholesky_solve<F: Float>(factors: &CholeskyFactors<F>, b: &[F]) -> Vec<F> {
    let n = factors.n;
    debug_assert_eq!(b.len(), n);

    // Forward substitution (L · y = b)
    let mut y = vec![F::zero(); n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum = sum - factors.l[i][j] * y[j];
        }
        y[i] = sum / factors.l[i][i];
    }

    // Back substitution (Lᵀ · x = y)
    let mut x = vec![F::zero(); n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum = sum - factors.l[j][i] * x[j];
        }
        x[i] = sum / factors.l[i][i];
    }

    x
}

/// Solve `A · x = b` for a symmetric positive definite `A`.
///
/// Returns `None` if the matrix is not positive definite.
pub fn cholesky_solve_spd<F: Float>(a: &[Vec<F>], b: &[F]) -> Option<Vec<F>> {
    let factors = cholesky_factor(a)?;
    Some(cholesky_solve(&factors, b))
}

/// Dense Hessian via one Hessian-vector product per coordinate.
///
/// The reference reconstruction: `n` probes against `block_size` for the
/// block-sparse estimator. Useful for small problems and as ground truth in
/// tests.
pub fn dense_hessian<F, O>(oracle: &O, x: &[F]) -> Vec<Vec<F>>
where
    F: Float,
    O: GradientOracle<F>,
{
    let n = oracle.dim();
    assert_eq!(x.len(), n, "wrong point length");
    let mut hess = vec![vec![F::zero(); n]; n];
    for j in 0..n {
        let mut v = vec![F::zero(); n];
        v[j] = F::one();
        let hv = oracle.hvp(x, &v);
        for (i, row) in hess.iter_mut().enumerate() {
            row[j] = hv[i];
        }
    }
    hess
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cholesky_solve_identity() {
        let a = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let b = vec![3.0, 7.0];
        let x = cholesky_solve_spd(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn cholesky_solve_2x2() {
        // [4 2] [x0]   [10]
        // [2 3] [x1] = [ 8]
        // Solution: x0 = 7/4, x1 = 3/2
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let b = vec![10.0, 8.0];
        let x = cholesky_solve_spd(&a, &b).unwrap();
        assert!((x[0] - 1.75).abs() < 1e-12);
        assert!((x[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(cholesky_factor(&a).is_none());
    }

    #[test]
    fn factor_once_solve_many() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let factors = cholesky_factor(&a).unwrap();
        for b in [[10.0, 8.0], [1.0, 0.0], [0.0, 1.0]] {
            let x = cholesky_solve(&factors, &b);
            let x_ref = cholesky_solve_spd(&a, &b).unwrap();
            for i in 0..2 {
                assert!((x[i] - x_ref[i]).abs() < 1e-12);
            }
        }
    }
}
