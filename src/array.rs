//! Patterns for (optionally bounded) numeric arrays.

use ndarray::{ArrayD, IxDyn};
use num_traits::Float;

use crate::error::PatternError;
use crate::folded::Folded;

/// A pattern for arrays of numbers with inclusive elementwise bounds.
///
/// The non-free flat form is the row-major entries. The free transform maps
/// the (possibly bounded) interval onto all of ℝ per element:
///
/// - unbounded: identity
/// - lower bound only: `ln(x - lb)`
/// - upper bound only: `-ln(ub - x)`
/// - both: `ln(x - lb) - ln(ub - x)`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericArrayPattern {
    shape: Vec<usize>,
    lb: Option<f64>,
    ub: Option<f64>,
}

impl NumericArrayPattern {
    /// Unbounded array pattern with the given shape.
    pub fn new(shape: &[usize]) -> Self {
        NumericArrayPattern {
            shape: shape.to_vec(),
            lb: None,
            ub: None,
        }
    }

    /// Array pattern with inclusive elementwise bounds (`None` = unbounded).
    ///
    /// When both bounds are given, `lb` must be strictly less than `ub`.
    pub fn with_bounds(
        shape: &[usize],
        lb: Option<f64>,
        ub: Option<f64>,
    ) -> Result<Self, PatternError> {
        if let (Some(lb), Some(ub)) = (lb, ub) {
            if lb >= ub {
                return Err(PatternError::Constraint(format!(
                    "upper bound {} must strictly exceed lower bound {}",
                    ub, lb
                )));
            }
        }
        Ok(NumericArrayPattern {
            shape: shape.to_vec(),
            lb,
            ub,
        })
    }

    /// Folded array shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Elementwise `(lb, ub)` bounds; `None` means unbounded on that side.
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.lb, self.ub)
    }

    /// Flat length; identical for both modes (the free transform is elementwise).
    pub fn flat_length(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn validate<T: Float>(&self, folded: &ArrayD<T>) -> (bool, String) {
        if folded.shape() != self.shape.as_slice() {
            return (
                false,
                format!(
                    "wrong shape for array: expected {:?}, got {:?}",
                    self.shape,
                    folded.shape()
                ),
            );
        }
        if let Some(lb) = self.lb {
            let lb_t = T::from(lb).unwrap();
            if folded.iter().any(|&x| x < lb_t) {
                return (false, format!("value beneath lower bound {}", lb));
            }
        }
        if let Some(ub) = self.ub {
            let ub_t = T::from(ub).unwrap();
            if folded.iter().any(|&x| x > ub_t) {
                return (false, format!("value above upper bound {}", ub));
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
        if free {
            Ok(folded
                .iter()
                .map(|&x| unconstrain(x, self.lb, self.ub))
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
        let expected = self.flat_length();
        if flat.len() != expected {
            return Err(PatternError::WrongLength {
                expected,
                got: flat.len(),
            });
        }
        let entries: Vec<T> = if free {
            flat.iter().map(|&v| constrain(v, self.lb, self.ub)).collect()
        } else {
            flat.to_vec()
        };
        let folded = ArrayD::from_shape_vec(IxDyn(&self.shape), entries)
            .expect("length checked against shape product");
        if validate && !free {
            let (ok, msg) = self.validate(&folded);
            if !ok {
                return Err(PatternError::Constraint(msg));
            }
        }
        Ok(Folded::Array(folded))
    }

    pub(crate) fn flat_indices(
        &self,
        mask: &ArrayD<bool>,
        offset: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), PatternError> {
        if mask.shape() != self.shape.as_slice() {
            return Err(PatternError::Constraint(format!(
                "wrong shape for array mask: expected {:?}, got {:?}",
                self.shape,
                mask.shape()
            )));
        }
        // The free transform is elementwise, so the index map is the same in
        // both modes.
        out.extend(
            mask.iter()
                .enumerate()
                .filter(|(_, &m)| m)
                .map(|(i, _)| offset + i),
        );
        Ok(())
    }
}

/// Map a constrained value into the free space.
fn unconstrain<T: Float>(x: T, lb: Option<f64>, ub: Option<f64>) -> T {
    match (lb, ub) {
        (None, None) => x,
        (Some(lb), None) => (x - T::from(lb).unwrap()).ln(),
        (None, Some(ub)) => -(T::from(ub).unwrap() - x).ln(),
        (Some(lb), Some(ub)) => {
            let lb = T::from(lb).unwrap();
            let ub = T::from(ub).unwrap();
            (x - lb).ln() - (ub - x).ln()
        }
    }
}

/// Inverse of [`unconstrain`]; total on finite inputs.
fn constrain<T: Float>(v: T, lb: Option<f64>, ub: Option<f64>) -> T {
    match (lb, ub) {
        (None, None) => v,
        (Some(lb), None) => v.exp() + T::from(lb).unwrap(),
        (None, Some(ub)) => T::from(ub).unwrap() - (-v).exp(),
        (Some(lb), Some(ub)) => {
            let lb = T::from(lb).unwrap();
            let ub = T::from(ub).unwrap();
            lb + (ub - lb) * sigmoid(v)
        }
    }
}

/// Logistic function with the usual overflow guard: evaluate via `exp(-|v|)`
/// so the exponential never overflows.
fn sigmoid<T: Float>(v: T) -> T {
    if v >= T::zero() {
        T::one() / (T::one() + (-v).exp())
    } else {
        let e = v.exp();
        e / (T::one() + e)
    }
}
