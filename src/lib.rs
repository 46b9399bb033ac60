//! Fold structured, constrained parameters into flat vectors and back.
//!
//! Optimizers and automatic differentiation want a flat `&[T]`; models want
//! bounded arrays, simplexes, covariance matrices, and nested collections of
//! them. A [`Pattern`] is the bijection between the two, with validation:
//!
//! - `free = false`: the direct flat form (a reshape, subject to the
//!   pattern's domain constraints);
//! - `free = true`: an unconstraining transform under which *every* finite
//!   flat vector folds back to a valid value — log/logit bounds for arrays,
//!   pinned softmax for simplexes, log-diagonal Cholesky factors for PSD
//!   matrices.
//!
//! All folds are written against [`num_traits::Float`], so a forward-mode AD
//! scalar can flow through them unchanged.
//!
//! ```
//! use parafold::{Pattern, PatternDict};
//!
//! let mut pattern = PatternDict::new();
//! pattern.insert("weights", Pattern::simplex(3).unwrap()).unwrap();
//! pattern.insert("cov", Pattern::psd_matrix(2)).unwrap();
//! let pattern = Pattern::from(pattern);
//!
//! // Any finite free vector folds to a valid value.
//! let free: Vec<f64> = vec![0.3, -1.2, 0.5, 2.0, -0.7];
//! assert_eq!(pattern.flat_length(true), free.len());
//! let folded = pattern.fold(&free, true).unwrap();
//! let (ok, msg) = pattern.validate_folded(&folded);
//! assert!(ok, "{msg}");
//!
//! // And the round trip recovers it.
//! let back = pattern.flatten(&folded, true).unwrap();
//! for (a, b) in back.iter().zip(free.iter()) {
//!     assert!((a - b).abs() < 1e-10);
//! }
//! ```

pub mod array;
pub mod containers;
pub mod error;
pub mod flatfn;
pub mod folded;
pub mod pattern;
pub mod psdmatrix;
pub mod simplex;

pub use array::NumericArrayPattern;
pub use containers::{PatternArray, PatternDict};
pub use error::PatternError;
pub use flatfn::FlattenedFunction;
pub use folded::{dict, Folded};
pub use pattern::Pattern;
pub use psdmatrix::PsdSymmetricMatrixPattern;
pub use simplex::SimplexPattern;
