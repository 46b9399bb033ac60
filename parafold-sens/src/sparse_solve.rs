//! Sparse factorization and solves for estimated Hessians, via faer.
//!
//! Converts a [`CooMatrix`] into faer's compressed column format and solves
//! linear systems against a sparse LU factorization — the route for Newton
//! steps or sensitivity systems when the block Hessian is large and sparse.

use faer::linalg::solvers::SpSolver;
use faer::sparse::SparseColMat;
use faer::Col;

use crate::coo::CooMatrix;

/// Convert to faer's compressed sparse column format.
///
/// Returns `None` if construction fails (e.g. dimension overflow).
pub fn to_sparse_col_mat(mat: &CooMatrix<f64>) -> Option<SparseColMat<usize, f64>> {
    let triplets: Vec<(usize, usize, f64)> = mat.triplets().collect();
    SparseColMat::try_new_from_triplets(mat.nrows(), mat.ncols(), &triplets).ok()
}

/// Factorize a square sparse matrix with faer's sparse LU.
///
/// Returns `None` if the matrix is singular or construction fails.
/// Uses `catch_unwind` because faer's sparse LU panics on singular matrices
/// rather than returning an error.
pub fn factorize(mat: &CooMatrix<f64>) -> Option<faer::sparse::linalg::solvers::Lu<usize, f64>> {
    let sp = to_sparse_col_mat(mat)?;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sp.sp_lu().ok()))
        .ok()
        .flatten()
}

/// Solve `A · x = b` against a pre-computed sparse factorization.
pub fn solve_factored(
    lu: &faer::sparse::linalg::solvers::Lu<usize, f64>,
    b: &[f64],
) -> Vec<f64> {
    let rhs = Col::<f64>::from_fn(b.len(), |i| b[i]);
    let sol = lu.solve(&rhs);
    (0..b.len()).map(|i| sol[i]).collect()
}

/// Solve `A · x = b` for a sparse square `A`.
///
/// Returns `None` if the matrix is singular.
pub fn sparse_solve(mat: &CooMatrix<f64>, b: &[f64]) -> Option<Vec<f64>> {
    assert_eq!(b.len(), mat.nrows(), "wrong right-hand side length");
    let lu = factorize(mat)?;
    Some(solve_factored(&lu, b))
}
