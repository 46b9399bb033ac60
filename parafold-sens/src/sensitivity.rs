//! Linear approximation of an optimum's dependence on a hyperparameter.

use std::fmt;

use parafold::{Folded, Pattern, PatternError};

use crate::float::Float;
use crate::linalg::{cholesky_factor, cholesky_solve, CholeskyFactors};

/// Errors raised while building or using a sensitivity approximation.
#[derive(Clone, Debug, PartialEq)]
pub enum SensitivityError {
    /// A pattern flatten/fold failed.
    Pattern(PatternError),
    /// A supplied matrix or vector has the wrong dimensions.
    Dimension {
        /// What was being checked.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Length supplied.
        got: usize,
    },
    /// The objective Hessian is not positive definite, so the linear system
    /// cannot be factorized.
    NotPositiveDefinite,
    /// The gradient at the putative optimum is not (approximately) zero.
    GradientNotZero {
        /// Norm of the supplied gradient.
        norm: f64,
        /// Tolerance it exceeded.
        tol: f64,
    },
}

impl fmt::Display for SensitivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitivityError::Pattern(e) => write!(f, "{}", e),
            SensitivityError::Dimension {
                what,
                expected,
                got,
            } => write!(f, "wrong {} dimension: expected {}, got {}", what, expected, got),
            SensitivityError::NotPositiveDefinite => {
                write!(f, "objective Hessian is not positive definite")
            }
            SensitivityError::GradientNotZero { norm, tol } => write!(
                f,
                "the gradient is not zero at the putatively optimal values: ||grad|| = {} > {}",
                norm, tol
            ),
        }
    }
}

impl std::error::Error for SensitivityError {}

impl From<PatternError> for SensitivityError {
    fn from(e: PatternError) -> Self {
        SensitivityError::Pattern(e)
    }
}

/// Linearly approximate how an optimum moves with a hyperparameter.
///
/// For `θ̂(λ) = argmin_θ f(θ, λ)`, the implicit function theorem gives the
/// first-order dependence `dθ̂/dλ = -H⁻¹·C` at a base point, where `H` is the
/// Hessian of `f` in the flat optimization parameter and `C` the cross
/// second derivative in the flat hyperparameter. Both parameters are
/// structured, constrained values; the approximation lives in flattened
/// space under user-chosen patterns and free flags, and predictions fold
/// back to structured values.
///
/// The Hessian and cross-Hessian are supplied by the caller (e.g. from
/// [`dense_hessian`](crate::linalg::dense_hessian) or a
/// [`SparseBlockHessian`](crate::SparseBlockHessian) estimate); the Hessian
/// is factorized once at construction.
#[derive(Debug)]
pub struct HyperparameterSensitivity<F: Float> {
    opt_pattern: Pattern,
    opt_free: bool,
    hyper_pattern: Pattern,
    hyper_free: bool,
    opt0: Vec<F>,
    hyper0: Vec<F>,
    hess0: Vec<Vec<F>>,
    /// `dθ̂/dλ`, `n_opt` rows by `n_hyper` columns.
    sens: Vec<Vec<F>>,
}

impl<F: Float> HyperparameterSensitivity<F> {
    /// Build the approximation around a base optimum.
    ///
    /// `hess0` is the objective Hessian in the flat optimization parameter
    /// at the base point (`n x n`); `cross_hess` is the cross second
    /// derivative (`n x m`, hyperparameter columns).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        opt_pattern: Pattern,
        opt_free: bool,
        opt0_folded: &Folded<F>,
        hyper_pattern: Pattern,
        hyper_free: bool,
        hyper0_folded: &Folded<F>,
        hess0: Vec<Vec<F>>,
        cross_hess: Vec<Vec<F>>,
    ) -> Result<Self, SensitivityError> {
        let opt0 = opt_pattern.flatten(opt0_folded, opt_free)?;
        let hyper0 = hyper_pattern.flatten(hyper0_folded, hyper_free)?;
        let n = opt0.len();
        let m = hyper0.len();

        if hess0.len() != n || hess0.iter().any(|row| row.len() != n) {
            return Err(SensitivityError::Dimension {
                what: "Hessian",
                expected: n,
                got: hess0.len(),
            });
        }
        if cross_hess.len() != n || cross_hess.iter().any(|row| row.len() != m) {
            return Err(SensitivityError::Dimension {
                what: "cross-Hessian",
                expected: n,
                got: cross_hess.len(),
            });
        }

        let factors =
            cholesky_factor(&hess0).ok_or(SensitivityError::NotPositiveDefinite)?;
        let sens = solve_neg_columns(&factors, &cross_hess, n, m);

        Ok(HyperparameterSensitivity {
            opt_pattern,
            opt_free,
            hyper_pattern,
            hyper_free,
            opt0,
            hyper0,
            hess0,
            sens,
        })
    }

    /// Check that a gradient (in the flat optimization parameter) is zero to
    /// within `tol`, confirming the base point is a critical point.
    pub fn verify_optimum(&self, grad0: &[F], tol: F) -> Result<(), SensitivityError> {
        if grad0.len() != self.opt0.len() {
            return Err(SensitivityError::Dimension {
                what: "gradient",
                expected: self.opt0.len(),
                got: grad0.len(),
            });
        }
        let norm_sq = grad0.iter().fold(F::zero(), |acc, &g| acc + g * g);
        let norm = norm_sq.sqrt();
        if norm > tol {
            return Err(SensitivityError::GradientNotZero {
                norm: norm.to_f64().unwrap_or(f64::NAN),
                tol: tol.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(())
    }

    /// The sensitivity matrix `dθ̂/dλ = -H⁻¹·C` in flat space.
    pub fn sensitivity_matrix(&self) -> &[Vec<F>] {
        &self.sens
    }

    /// The Hessian supplied at construction.
    pub fn hessian_at_opt(&self) -> &[Vec<F>] {
        &self.hess0
    }

    /// The base optimum in flat space.
    pub fn opt_base_flat(&self) -> &[F] {
        &self.opt0
    }

    /// Predict the flat optimum at a new folded hyperparameter value.
    pub fn predict_opt_flat(&self, hyper_folded: &Folded<F>) -> Result<Vec<F>, SensitivityError> {
        let hyper1 = self
            .hyper_pattern
            .flatten(hyper_folded, self.hyper_free)?;
        let delta: Vec<F> = hyper1
            .iter()
            .zip(self.hyper0.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        Ok(self
            .opt0
            .iter()
            .enumerate()
            .map(|(i, &o)| {
                let step = self.sens[i]
                    .iter()
                    .zip(delta.iter())
                    .fold(F::zero(), |acc, (&s, &d)| acc + s * d);
                o + step
            })
            .collect())
    }

    /// Predict the folded optimum at a new folded hyperparameter value.
    pub fn predict_opt(&self, hyper_folded: &Folded<F>) -> Result<Folded<F>, SensitivityError> {
        let flat = self.predict_opt_flat(hyper_folded)?;
        Ok(self.opt_pattern.fold(&flat, self.opt_free)?)
    }
}

/// Column-wise `-H⁻¹·C` against a fixed factorization.
fn solve_neg_columns<F: Float>(
    factors: &CholeskyFactors<F>,
    cross: &[Vec<F>],
    n: usize,
    m: usize,
) -> Vec<Vec<F>> {
    let mut sens = vec![vec![F::zero(); m]; n];
    for j in 0..m {
        let col: Vec<F> = (0..n).map(|i| cross[i][j]).collect();
        let sol = cholesky_solve(factors, &col);
        for i in 0..n {
            sens[i][j] = -sol[i];
        }
    }
    sens
}
