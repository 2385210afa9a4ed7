use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

use crate::scalar::Scalar;

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Every `Float` is also a [`Scalar`] over itself, so plain evaluations of
/// generic residual code need no extra bounds. Jets do not implement this.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + Scalar<Float = Self>
    + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
