//! The seam to an external differentiation capability.

use crate::dual::Dual;
use crate::float::Float;

/// Access to a scalar objective's gradient and Hessian-vector products.
///
/// This is the boundary with whatever computes derivatives — a handwritten
/// gradient, an AD engine, or the bundled [`DualGradient`] adapter. The
/// block-Hessian estimator only ever asks for `hvp`, one directional probe
/// per slot.
///
/// Implementations must be pure: the same `x` (and `v`) always produce the
/// same output, with no state carried between calls.
pub trait GradientOracle<F> {
    /// Number of flat input variables.
    fn dim(&self) -> usize;

    /// Evaluate the gradient ∇f(x).
    fn gradient(&self, x: &[F]) -> Vec<F>;

    /// Evaluate the Hessian-vector product H(x)·v — the directional
    /// derivative of the gradient at `x` in direction `v`.
    fn hvp(&self, x: &[F], v: &[F]) -> Vec<F>;
}

/// Adapter turning a dual-generic gradient function into a
/// [`GradientOracle`].
///
/// The wrapped closure evaluates ∇f on [`Dual`] scalars. Seeding the inputs
/// with a tangent direction and reading the output tangents yields the
/// directional derivative of the gradient, i.e. H·v, without ever forming
/// the Hessian. When the closure is itself a reverse-mode gradient, this is
/// forward-over-reverse.
pub struct DualGradient<G> {
    dim: usize,
    grad_fn: G,
}

impl<G> DualGradient<G> {
    /// Wrap a gradient function of `dim` flat variables.
    pub fn new(dim: usize, grad_fn: G) -> Self {
        DualGradient { dim, grad_fn }
    }
}

impl<F, G> GradientOracle<F> for DualGradient<G>
where
    F: Float,
    G: Fn(&[Dual<F>]) -> Vec<Dual<F>>,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn gradient(&self, x: &[F]) -> Vec<F> {
        assert_eq!(x.len(), self.dim, "wrong number of inputs");
        let inputs: Vec<Dual<F>> = x.iter().map(|&xi| Dual::constant(xi)).collect();
        (self.grad_fn)(&inputs).iter().map(|d| d.re).collect()
    }

    fn hvp(&self, x: &[F], v: &[F]) -> Vec<F> {
        assert_eq!(x.len(), self.dim, "wrong number of inputs");
        assert_eq!(v.len(), self.dim, "wrong number of directions");
        let inputs: Vec<Dual<F>> = x
            .iter()
            .zip(v.iter())
            .map(|(&xi, &vi)| Dual::new(xi, vi))
            .collect();
        (self.grad_fn)(&inputs).iter().map(|d| d.eps).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // f(x) = x0²·x1 + x1³
    // ∇f = [2·x0·x1, x0² + 3·x1²]
    // H = [[2·x1, 2·x0], [2·x0, 6·x1]]
    fn grad(x: &[Dual<f64>]) -> Vec<Dual<f64>> {
        let two = Dual::constant(2.0);
        let three = Dual::constant(3.0);
        vec![two * x[0] * x[1], x[0] * x[0] + three * x[1] * x[1]]
    }

    #[test]
    fn gradient_matches_analytic() {
        let oracle = DualGradient::new(2, grad);
        let g = oracle.gradient(&[2.0, 3.0]);
        assert!((g[0] - 12.0).abs() < 1e-12);
        assert!((g[1] - 31.0).abs() < 1e-12);
    }

    #[test]
    fn hvp_matches_analytic_hessian() {
        let oracle = DualGradient::new(2, grad);
        // H at (2, 3) = [[6, 4], [4, 18]]; v = [1, -1]
        let hv = oracle.hvp(&[2.0, 3.0], &[1.0, -1.0]);
        assert!((hv[0] - 2.0).abs() < 1e-12, "hv = {hv:?}");
        assert!((hv[1] + 14.0).abs() < 1e-12, "hv = {hv:?}");
    }
}
