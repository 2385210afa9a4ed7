//! The [`Scalar`] trait for writing cost and residual code once.
//!
//! A residual written as `fn r<T: Scalar>(x: &[T]) -> T` runs on plain `f64`
//! when the optimizer only needs the cost, and on [`Jet`] when it needs the
//! Jacobian.

use std::fmt::{Debug, Display};

use num_traits::FromPrimitive;

use crate::float::Float;
use crate::jet::Jet;

/// Numeric type a parameter can be cast to.
pub trait Scalar:
    num_traits::Float
    + num_traits::FloatConst
    + FromPrimitive
    + Copy
    + Default
    + Debug
    + Display
    + Send
    + 'static
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar as a constant.
    fn from_f(val: Self::Float) -> Self;

    /// Extract the primal value.
    fn value(&self) -> Self::Float;

    /// Lift an `f64` literal. Shorthand for constants inside generic residuals.
    #[inline]
    fn lit(val: f64) -> Self {
        let v = <Self::Float as FromPrimitive>::from_f64(val);
        Self::from_f(v.unwrap_or_else(<Self::Float as num_traits::Float>::nan))
    }
}

impl Scalar for f32 {
    type Float = f32;

    #[inline]
    fn from_f(val: f32) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f32 {
        *self
    }
}

impl Scalar for f64 {
    type Float = f64;

    #[inline]
    fn from_f(val: f64) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }
}

impl<F: Float, const N: usize> Scalar for Jet<F, N> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Jet::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.re
    }
}
