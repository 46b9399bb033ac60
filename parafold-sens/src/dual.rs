//! Forward-mode dual numbers.
//!
//! `Dual<F>` implements [`num_traits::Float`], so numeric code written
//! generically over that bound — including every pattern fold — evaluates a
//! directional derivative alongside its value. This is the scalar behind
//! [`DualGradient`](crate::oracle::DualGradient): seeding a gradient
//! function with tangents yields Hessian-vector products.

use std::fmt::{self, Display};
use std::num::FpCategory;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign};

use num_traits::{Float as NumFloat, FromPrimitive, Num, NumCast, One, ToPrimitive, Zero};

use crate::float::Float;

/// A value paired with its tangent: `re + eps·ε` where `ε² = 0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dual<F: Float> {
    /// Primal (real) value.
    pub re: F,
    /// Tangent (derivative) value.
    pub eps: F,
}

impl<F: Float> Dual<F> {
    /// Create a new dual number.
    #[inline]
    pub fn new(re: F, eps: F) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero tangent).
    #[inline]
    pub fn constant(re: F) -> Self {
        Dual { re, eps: F::zero() }
    }

    /// Create a variable (unit tangent) for differentiation.
    #[inline]
    pub fn variable(re: F) -> Self {
        Dual { re, eps: F::one() }
    }

    /// Apply the chain rule: given `f(self.re)` and `f'(self.re)`, produce
    /// the dual result.
    #[inline]
    fn chain(self, f_val: F, f_deriv: F) -> Self {
        Dual {
            re: f_val,
            eps: self.eps * f_deriv,
        }
    }
}

impl<F: Float> Display for Dual<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

// ──────────────────────────────────────────────
//  Operators
// ──────────────────────────────────────────────

impl<F: Float> Add for Dual<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Dual { re: self.re + rhs.re, eps: self.eps + rhs.eps }
    }
}

impl<F: Float> Sub for Dual<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Dual { re: self.re - rhs.re, eps: self.eps - rhs.eps }
    }
}

impl<F: Float> Mul for Dual<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Dual {
            re: self.re * rhs.re,
            eps: self.re * rhs.eps + self.eps * rhs.re,
        }
    }
}

impl<F: Float> Div for Dual<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = F::one() / rhs.re;
        Dual {
            re: self.re * inv,
            eps: (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        }
    }
}

impl<F: Float> Neg for Dual<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Dual { re: -self.re, eps: -self.eps }
    }
}

impl<F: Float> Rem for Dual<F> {
    type Output = Self;
    #[inline]
    fn rem(self, rhs: Self) -> Self {
        Dual { re: self.re % rhs.re, eps: self.eps }
    }
}

impl<F: Float> AddAssign for Dual<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: Float> SubAssign for Dual<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: Float> MulAssign for Dual<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: Float> DivAssign for Dual<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<F: Float> RemAssign for Dual<F> {
    #[inline]
    fn rem_assign(&mut self, rhs: Self) {
        *self = *self % rhs;
    }
}

// Comparisons act on the primal value; tangents are carried, not compared.

impl<F: Float> PartialEq for Dual<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.re == other.re
    }
}

impl<F: Float> PartialOrd for Dual<F> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.re.partial_cmp(&other.re)
    }
}

// ──────────────────────────────────────────────
//  num-traits
// ──────────────────────────────────────────────

impl<F: Float> Zero for Dual<F> {
    #[inline]
    fn zero() -> Self {
        Dual::constant(F::zero())
    }
    #[inline]
    fn is_zero(&self) -> bool {
        self.re.is_zero()
    }
}

impl<F: Float> One for Dual<F> {
    #[inline]
    fn one() -> Self {
        Dual::constant(F::one())
    }
}

impl<F: Float> Num for Dual<F> {
    type FromStrRadixErr = F::FromStrRadixErr;
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        F::from_str_radix(str, radix).map(Dual::constant)
    }
}

impl<F: Float> FromPrimitive for Dual<F> {
    #[inline]
    fn from_i64(n: i64) -> Option<Self> {
        F::from_i64(n).map(Dual::constant)
    }
    #[inline]
    fn from_u64(n: u64) -> Option<Self> {
        F::from_u64(n).map(Dual::constant)
    }
    #[inline]
    fn from_f64(n: f64) -> Option<Self> {
        F::from_f64(n).map(Dual::constant)
    }
}

impl<F: Float> ToPrimitive for Dual<F> {
    #[inline]
    fn to_i64(&self) -> Option<i64> {
        self.re.to_i64()
    }
    #[inline]
    fn to_u64(&self) -> Option<u64> {
        self.re.to_u64()
    }
    #[inline]
    fn to_f64(&self) -> Option<f64> {
        self.re.to_f64()
    }
}

impl<F: Float> NumCast for Dual<F> {
    #[inline]
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        F::from(n).map(Dual::constant)
    }
}

impl<F: Float> NumFloat for Dual<F> {
    fn nan() -> Self { Dual::constant(F::nan()) }
    fn infinity() -> Self { Dual::constant(F::infinity()) }
    fn neg_infinity() -> Self { Dual::constant(F::neg_infinity()) }
    fn neg_zero() -> Self { Dual::constant(F::neg_zero()) }

    fn min_value() -> Self { Dual::constant(F::min_value()) }
    fn min_positive_value() -> Self { Dual::constant(F::min_positive_value()) }
    fn max_value() -> Self { Dual::constant(F::max_value()) }
    fn epsilon() -> Self { Dual::constant(F::epsilon()) }

    fn is_nan(self) -> bool { self.re.is_nan() }
    fn is_infinite(self) -> bool { self.re.is_infinite() }
    fn is_finite(self) -> bool { self.re.is_finite() }
    fn is_normal(self) -> bool { self.re.is_normal() }
    fn is_sign_positive(self) -> bool { self.re.is_sign_positive() }
    fn is_sign_negative(self) -> bool { self.re.is_sign_negative() }
    fn classify(self) -> FpCategory { self.re.classify() }

    // Piecewise-constant ops have zero tangent; fract keeps it.
    fn floor(self) -> Self { Dual::constant(self.re.floor()) }
    fn ceil(self) -> Self { Dual::constant(self.re.ceil()) }
    fn round(self) -> Self { Dual::constant(self.re.round()) }
    fn trunc(self) -> Self { Dual::constant(self.re.trunc()) }
    fn fract(self) -> Self { Dual { re: self.re.fract(), eps: self.eps } }

    fn abs(self) -> Self { self.chain(self.re.abs(), self.re.signum()) }
    fn signum(self) -> Self { Dual::constant(self.re.signum()) }

    fn mul_add(self, a: Self, b: Self) -> Self {
        Dual {
            re: self.re.mul_add(a.re, b.re),
            eps: self.eps * a.re + self.re * a.eps + b.eps,
        }
    }

    fn recip(self) -> Self {
        let inv = F::one() / self.re;
        self.chain(inv, -inv * inv)
    }

    fn powi(self, n: i32) -> Self {
        let deriv = F::from(n).unwrap() * self.re.powi(n - 1);
        self.chain(self.re.powi(n), deriv)
    }

    fn powf(self, n: Self) -> Self {
        // d(x^y) = y·x^(y-1)·dx + x^y·ln(x)·dy
        let val = self.re.powf(n.re);
        Dual {
            re: val,
            eps: val * (n.re * self.eps / self.re + n.eps * self.re.ln()),
        }
    }

    fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        let two = F::one() + F::one();
        self.chain(s, F::one() / (two * s))
    }

    fn cbrt(self) -> Self {
        let c = self.re.cbrt();
        let three = F::from(3.0).unwrap();
        self.chain(c, F::one() / (three * c * c))
    }

    fn exp(self) -> Self {
        let e = self.re.exp();
        self.chain(e, e)
    }

    fn exp2(self) -> Self {
        let e = self.re.exp2();
        self.chain(e, e * F::LN_2())
    }

    fn exp_m1(self) -> Self { self.chain(self.re.exp_m1(), self.re.exp()) }

    fn ln(self) -> Self { self.chain(self.re.ln(), F::one() / self.re) }
    fn log2(self) -> Self { self.chain(self.re.log2(), F::one() / (self.re * F::LN_2())) }
    fn log10(self) -> Self { self.chain(self.re.log10(), F::one() / (self.re * F::LN_10())) }
    fn ln_1p(self) -> Self { self.chain(self.re.ln_1p(), F::one() / (F::one() + self.re)) }
    fn log(self, base: Self) -> Self { self.ln() / base.ln() }

    fn sin(self) -> Self { self.chain(self.re.sin(), self.re.cos()) }
    fn cos(self) -> Self { self.chain(self.re.cos(), -self.re.sin()) }

    fn tan(self) -> Self {
        let c = self.re.cos();
        self.chain(self.re.tan(), F::one() / (c * c))
    }

    fn sin_cos(self) -> (Self, Self) {
        let (s, c) = self.re.sin_cos();
        (self.chain(s, c), self.chain(c, -s))
    }

    fn asin(self) -> Self {
        self.chain(self.re.asin(), F::one() / (F::one() - self.re * self.re).sqrt())
    }

    fn acos(self) -> Self {
        self.chain(self.re.acos(), -F::one() / (F::one() - self.re * self.re).sqrt())
    }

    fn atan(self) -> Self {
        self.chain(self.re.atan(), F::one() / (F::one() + self.re * self.re))
    }

    fn atan2(self, other: Self) -> Self {
        let denom = self.re * self.re + other.re * other.re;
        Dual {
            re: self.re.atan2(other.re),
            eps: (other.re * self.eps - self.re * other.eps) / denom,
        }
    }

    fn sinh(self) -> Self { self.chain(self.re.sinh(), self.re.cosh()) }
    fn cosh(self) -> Self { self.chain(self.re.cosh(), self.re.sinh()) }

    fn tanh(self) -> Self {
        let c = self.re.cosh();
        self.chain(self.re.tanh(), F::one() / (c * c))
    }

    fn asinh(self) -> Self {
        self.chain(self.re.asinh(), F::one() / (self.re * self.re + F::one()).sqrt())
    }

    fn acosh(self) -> Self {
        self.chain(self.re.acosh(), F::one() / (self.re * self.re - F::one()).sqrt())
    }

    fn atanh(self) -> Self {
        self.chain(self.re.atanh(), F::one() / (F::one() - self.re * self.re))
    }

    fn hypot(self, other: Self) -> Self {
        let h = self.re.hypot(other.re);
        Dual {
            re: h,
            eps: (self.re * self.eps + other.re * other.eps) / h,
        }
    }

    fn max(self, other: Self) -> Self {
        if self.re >= other.re { self } else { other }
    }

    fn min(self, other: Self) -> Self {
        if self.re <= other.re { self } else { other }
    }

    fn abs_sub(self, other: Self) -> Self {
        if self.re > other.re { self - other } else { Self::zero() }
    }

    fn integer_decode(self) -> (u64, i16, i8) { self.re.integer_decode() }

    fn to_degrees(self) -> Self {
        let factor = F::from(180.0).unwrap() / F::PI();
        Dual { re: self.re.to_degrees(), eps: self.eps * factor }
    }

    fn to_radians(self) -> Self {
        let factor = F::PI() / F::from(180.0).unwrap();
        Dual { re: self.re.to_radians(), eps: self.eps * factor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_rule() {
        // d/dx (x · (x + 2)) at x = 3 is 2x + 2 = 8
        let x = Dual::variable(3.0_f64);
        let y = x * (x + Dual::constant(2.0));
        assert!((y.re - 15.0).abs() < 1e-12);
        assert!((y.eps - 8.0).abs() < 1e-12);
    }

    #[test]
    fn chain_rule_through_exp_ln() {
        // d/dx ln(exp(x) + 1) at x = 0.5
        let x = Dual::variable(0.5_f64);
        let y = (x.exp() + Dual::constant(1.0)).ln();
        let expected = 0.5_f64.exp() / (0.5_f64.exp() + 1.0);
        assert!((y.eps - expected).abs() < 1e-12);
    }

    #[test]
    fn sqrt_derivative() {
        let x = Dual::variable(4.0_f64);
        let y = x.sqrt();
        assert!((y.re - 2.0).abs() < 1e-12);
        assert!((y.eps - 0.25).abs() < 1e-12);
    }

    #[test]
    fn comparisons_use_primal() {
        let a = Dual::new(1.0_f64, 100.0);
        let b = Dual::new(2.0_f64, -100.0);
        assert!(a < b);
        assert_eq!(NumFloat::max(a, b).re, 2.0);
    }
}
