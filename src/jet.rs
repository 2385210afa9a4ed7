//! Forward-mode jets with `N` derivative lanes.
//!
//! A [`Jet<F, N>`] carries a primal value and the partial derivatives of that
//! value with respect to `N` seeded inputs. Evaluating a function written
//! against [`Scalar`](crate::Scalar) on jets yields the function value and a
//! row of its Jacobian in one pass. No tape is recorded.

use std::fmt::{self, Display};

use crate::Float;

/// Primal value plus `N` derivative lanes.
///
/// Lane `k` holds `∂v/∂δ_k`, where `δ` is the seeded input vector. Jets are
/// transient: built per residual evaluation and dropped once the Jacobian
/// row has been read out.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Jet<F: Float, const N: usize> {
    /// Primal value.
    pub re: F,
    /// Derivative lanes.
    pub eps: [F; N],
}

impl<F: Float, const N: usize> Default for Jet<F, N> {
    fn default() -> Self {
        Jet::constant(F::zero())
    }
}

impl<F: Float, const N: usize> Display for Jet<F, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.re)?;
        for (k, e) in self.eps.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "]")
    }
}

impl<F: Float, const N: usize> From<F> for Jet<F, N> {
    #[inline]
    fn from(val: F) -> Self {
        Jet::constant(val)
    }
}

impl<F: Float, const N: usize> Jet<F, N> {
    /// Jet with explicit derivative lanes.
    #[inline]
    pub fn new(re: F, eps: [F; N]) -> Self {
        Jet { re, eps }
    }

    /// Jet with all lanes zero.
    #[inline]
    pub fn constant(re: F) -> Self {
        Jet {
            re,
            eps: [F::zero(); N],
        }
    }

    /// Independent variable seeded on `lane`.
    ///
    /// A lane index `>= N` yields a constant, which lets callers seed only a
    /// window of a wider input.
    #[inline]
    pub fn variable(re: F, lane: usize) -> Self {
        let mut eps = [F::zero(); N];
        if let Some(e) = eps.get_mut(lane) {
            *e = F::one();
        }
        Jet { re, eps }
    }

    /// Primal value.
    #[inline]
    pub fn value(&self) -> F {
        self.re
    }

    /// Derivative lanes.
    #[inline]
    pub fn derivatives(&self) -> &[F; N] {
        &self.eps
    }

    /// Whether every lane is zero.
    pub fn is_constant(&self) -> bool {
        self.eps.iter().all(|e| e.is_zero())
    }

    /// Unary chain rule: `f(re)` with derivative `df` at `re`.
    #[inline(always)]
    fn chain(self, value: F, df: F) -> Self {
        Jet {
            re: value,
            eps: self.eps.map(|e| e * df),
        }
    }

    /// Same primal transform with all derivatives dropped.
    #[inline(always)]
    fn flat(value: F) -> Self {
        Jet::constant(value)
    }

    #[inline(always)]
    fn two() -> F {
        F::one() + F::one()
    }

    // -- Powers --

    #[inline]
    pub fn recip(self) -> Self {
        let inv = self.re.recip();
        self.chain(inv, -inv * inv)
    }

    /// Square root. The derivative is infinite at zero.
    #[inline]
    pub fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        self.chain(s, (Self::two() * s).recip())
    }

    #[inline]
    pub fn cbrt(self) -> Self {
        let c = self.re.cbrt();
        let three = Self::two() + F::one();
        self.chain(c, (three * c * c).recip())
    }

    #[inline]
    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::flat(F::one());
        }
        let nf = F::from_i32(n).unwrap_or_else(F::nan);
        self.chain(self.re.powi(n), nf * self.re.powi(n - 1))
    }

    /// Real power. A constant exponent takes the `n·x^(n-1)` path so that
    /// negative bases do not pull `ln(x)` into the derivative.
    #[inline]
    pub fn powf(self, n: Self) -> Self {
        if n.is_constant() {
            return self.chain(self.re.powf(n.re), n.re * self.re.powf(n.re - F::one()));
        }
        let value = self.re.powf(n.re);
        let d_base = n.re * self.re.powf(n.re - F::one());
        let d_exp = value * self.re.ln();
        let mut eps = [F::zero(); N];
        for k in 0..N {
            eps[k] = d_base * self.eps[k] + d_exp * n.eps[k];
        }
        Jet { re: value, eps }
    }

    // -- Exp/Log --

    #[inline]
    pub fn exp(self) -> Self {
        let e = self.re.exp();
        self.chain(e, e)
    }

    #[inline]
    pub fn exp2(self) -> Self {
        let e = self.re.exp2();
        self.chain(e, e * F::LN_2())
    }

    #[inline]
    pub fn exp_m1(self) -> Self {
        self.chain(self.re.exp_m1(), self.re.exp())
    }

    #[inline]
    pub fn ln(self) -> Self {
        self.chain(self.re.ln(), self.re.recip())
    }

    #[inline]
    pub fn log2(self) -> Self {
        self.chain(self.re.log2(), (self.re * F::LN_2()).recip())
    }

    #[inline]
    pub fn log10(self) -> Self {
        self.chain(self.re.log10(), (self.re * F::LN_10()).recip())
    }

    #[inline]
    pub fn ln_1p(self) -> Self {
        self.chain(self.re.ln_1p(), (F::one() + self.re).recip())
    }

    #[inline]
    pub fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }

    // -- Trig --

    #[inline]
    pub fn sin(self) -> Self {
        self.chain(self.re.sin(), self.re.cos())
    }

    #[inline]
    pub fn cos(self) -> Self {
        self.chain(self.re.cos(), -self.re.sin())
    }

    #[inline]
    pub fn tan(self) -> Self {
        let t = self.re.tan();
        self.chain(t, F::one() + t * t)
    }

    #[inline]
    pub fn sin_cos(self) -> (Self, Self) {
        let (s, c) = self.re.sin_cos();
        (self.chain(s, c), self.chain(c, -s))
    }

    #[inline]
    pub fn asin(self) -> Self {
        let d = (F::one() - self.re * self.re).sqrt().recip();
        self.chain(self.re.asin(), d)
    }

    #[inline]
    pub fn acos(self) -> Self {
        let d = -(F::one() - self.re * self.re).sqrt().recip();
        self.chain(self.re.acos(), d)
    }

    #[inline]
    pub fn atan(self) -> Self {
        self.chain(self.re.atan(), (F::one() + self.re * self.re).recip())
    }

    /// `atan2(self, other)`, i.e. the angle of the point `(other, self)`.
    #[inline]
    pub fn atan2(self, other: Self) -> Self {
        let inv = (self.re * self.re + other.re * other.re).recip();
        let mut eps = [F::zero(); N];
        for k in 0..N {
            eps[k] = (other.re * self.eps[k] - self.re * other.eps[k]) * inv;
        }
        Jet {
            re: self.re.atan2(other.re),
            eps,
        }
    }

    // -- Hyperbolic --

    #[inline]
    pub fn sinh(self) -> Self {
        self.chain(self.re.sinh(), self.re.cosh())
    }

    #[inline]
    pub fn cosh(self) -> Self {
        self.chain(self.re.cosh(), self.re.sinh())
    }

    #[inline]
    pub fn tanh(self) -> Self {
        let t = self.re.tanh();
        self.chain(t, F::one() - t * t)
    }

    #[inline]
    pub fn asinh(self) -> Self {
        let d = (self.re * self.re + F::one()).sqrt().recip();
        self.chain(self.re.asinh(), d)
    }

    #[inline]
    pub fn acosh(self) -> Self {
        let d = (self.re * self.re - F::one()).sqrt().recip();
        self.chain(self.re.acosh(), d)
    }

    #[inline]
    pub fn atanh(self) -> Self {
        self.chain(self.re.atanh(), (F::one() - self.re * self.re).recip())
    }

    // -- Piecewise --

    /// Absolute value. Uses the sign of the primal, so the derivative at
    /// `+0.0` is `+1`.
    #[inline]
    pub fn abs(self) -> Self {
        self.chain(self.re.abs(), self.re.signum())
    }

    #[inline]
    pub fn signum(self) -> Self {
        Self::flat(self.re.signum())
    }

    #[inline]
    pub fn floor(self) -> Self {
        Self::flat(self.re.floor())
    }

    #[inline]
    pub fn ceil(self) -> Self {
        Self::flat(self.re.ceil())
    }

    #[inline]
    pub fn round(self) -> Self {
        Self::flat(self.re.round())
    }

    #[inline]
    pub fn trunc(self) -> Self {
        Self::flat(self.re.trunc())
    }

    #[inline]
    pub fn fract(self) -> Self {
        Jet {
            re: self.re.fract(),
            eps: self.eps,
        }
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.re >= other.re {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self.re <= other.re {
            self
        } else {
            other
        }
    }

    // -- Binary --

    /// `self * a + b`.
    #[inline]
    pub fn mul_add(self, a: Self, b: Self) -> Self {
        let mut eps = [F::zero(); N];
        for k in 0..N {
            eps[k] = self.eps[k] * a.re + self.re * a.eps[k] + b.eps[k];
        }
        Jet {
            re: self.re.mul_add(a.re, b.re),
            eps,
        }
    }

    #[inline]
    pub fn hypot(self, other: Self) -> Self {
        let h = self.re.hypot(other.re);
        let inv = h.recip();
        let mut eps = [F::zero(); N];
        for k in 0..N {
            eps[k] = (self.re * self.eps[k] + other.re * other.eps[k]) * inv;
        }
        Jet { re: h, eps }
    }
}
