//! Sensitivity tooling for flattened parameters.
//!
//! Builds on [`parafold`]'s flat parameterizations:
//!
//! - [`GradientOracle`] is the seam to an external differentiation
//!   capability (gradients and Hessian-vector products); [`DualGradient`]
//!   adapts any [`Dual`]-generic gradient function into one.
//! - [`SparseBlockHessian`] reconstructs a block-sparse Hessian from one
//!   Hessian-vector product per block *slot* — far fewer probes than the
//!   problem dimension when blocks are narrow.
//! - [`HyperparameterSensitivity`] linearly approximates how an optimum
//!   moves with a hyperparameter, folding predictions back to structured
//!   values.
//!
//! Feature `sparse-solve` adds faer-backed sparse LU solves against the
//! estimated Hessian; feature `parallel` evaluates the per-slot probes with
//! rayon.

pub mod block;
pub mod coo;
pub mod dual;
pub mod float;
pub mod linalg;
pub mod oracle;
pub mod sensitivity;

#[cfg(feature = "sparse-solve")]
pub mod sparse_solve;

pub use block::{HessianError, SparseBlockHessian};
pub use coo::CooMatrix;
pub use dual::Dual;
pub use float::Float;
pub use linalg::{cholesky_factor, cholesky_solve, cholesky_solve_spd, dense_hessian};
pub use oracle::{DualGradient, GradientOracle};
pub use sensitivity::{HyperparameterSensitivity, SensitivityError};

/// Type alias for forward-mode dual numbers over `f64`.
pub type Dual64 = Dual<f64>;
/// Type alias for forward-mode dual numbers over `f32`.
pub type Dual32 = Dual<f32>;
