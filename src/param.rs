//! The [`Parameter`] trait: what the optimizer needs to know about `x`.
//!
//! Solvers see every parameter as a flat vector of [`Parameter::dims`]
//! scalars. They never write into `x` directly; updates go through
//! [`Parameter::plus_eq`], which a type may implement as a manifold update
//! (a rotation composed with `exp(δ)`, a unit vector re-normalised, ...).
//!
//! For automatic differentiation, a parameter is cast to the same structure
//! over [`Jet`](crate::Jet) scalars and perturbed with
//! [`Parameter::plus_eq_cast`]. Derivatives are therefore taken with respect
//! to the update `δ` at `δ = 0`, which is what the solver steps in.

use nalgebra::{DVector, SMatrix};

use crate::float::Float;
use crate::scalar::Scalar;

/// Number of scalars in a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dims {
    /// Known at compile time.
    Static(usize),
    /// Only known once a value exists; query [`Parameter::dims`].
    Dynamic,
}

impl Dims {
    pub const fn is_static(&self) -> bool {
        matches!(self, Dims::Static(_))
    }

    /// The compile-time size, if any.
    pub const fn size(&self) -> Option<usize> {
        match self {
            Dims::Static(n) => Some(*n),
            Dims::Dynamic => None,
        }
    }
}

/// A value the optimizer can update.
///
/// `delta` slices passed to [`plus_eq`](Parameter::plus_eq) and
/// [`plus_eq_cast`](Parameter::plus_eq_cast) always have exactly
/// `self.dims()` entries.
///
/// # Implementing for your own type
///
/// ```
/// use numbat::{Dims, Parameter, Scalar};
///
/// #[derive(Clone, Debug)]
/// struct Interval<T> {
///     lo: T,
///     hi: T,
/// }
///
/// impl Parameter for Interval<f64> {
///     type Scalar = f64;
///     const DIMS: Dims = Dims::Static(2);
///     type Cast<T: Scalar<Float = f64>> = Interval<T>;
///
///     fn cast<T: Scalar<Float = f64>>(&self) -> Interval<T> {
///         Interval { lo: T::from_f(self.lo), hi: T::from_f(self.hi) }
///     }
///
///     fn plus_eq(&mut self, delta: &[f64]) {
///         Self::plus_eq_cast(self, delta);
///     }
///
///     fn plus_eq_cast<T: Scalar<Float = f64>>(x: &mut Interval<T>, delta: &[T]) {
///         x.lo = x.lo + delta[0];
///         x.hi = x.hi + delta[1];
///     }
/// }
///
/// let mut iv = Interval { lo: 0.0, hi: 1.0 };
/// iv.plus_eq(&[0.5, 0.5]);
/// assert_eq!((iv.lo, iv.hi), (0.5, 1.5));
/// assert_eq!(iv.dims(), 2);
/// ```
pub trait Parameter: Clone {
    /// Underlying float type.
    type Scalar: Float;

    /// Compile-time size, or [`Dims::Dynamic`].
    const DIMS: Dims;

    /// The same structure over another scalar type.
    type Cast<T: Scalar<Float = Self::Scalar>>: Clone;

    /// Number of scalars. Types with `DIMS = Dims::Dynamic` must override
    /// this; relying on the default for them is a compile error.
    fn dims(&self) -> usize {
        const {
            assert!(
                Self::DIMS.is_static(),
                "dynamically sized parameters must implement Parameter::dims"
            )
        };
        match Self::DIMS {
            Dims::Static(n) => n,
            Dims::Dynamic => 0,
        }
    }

    /// Copy of `self` over scalar `T`, every entry lifted as a constant.
    fn cast<T: Scalar<Float = Self::Scalar>>(&self) -> Self::Cast<T>;

    /// Apply the update `self ⊞ delta`.
    fn plus_eq(&mut self, delta: &[Self::Scalar]);

    /// Apply the update `x ⊞ delta` to a cast value.
    fn plus_eq_cast<T: Scalar<Float = Self::Scalar>>(x: &mut Self::Cast<T>, delta: &[T]);

    /// Human-readable rendering for iteration logs.
    fn describe(&self) -> String {
        format!("<{}>", std::any::type_name::<Self>())
    }
}

fn join<F: Float>(values: impl IntoIterator<Item = F>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

macro_rules! impl_parameter_for_float {
    ($f:ty) => {
        impl Parameter for $f {
            type Scalar = $f;
            const DIMS: Dims = Dims::Static(1);
            type Cast<T: Scalar<Float = $f>> = T;

            #[inline]
            fn cast<T: Scalar<Float = $f>>(&self) -> T {
                T::from_f(*self)
            }

            #[inline]
            fn plus_eq(&mut self, delta: &[$f]) {
                debug_assert_eq!(delta.len(), 1);
                *self += delta[0];
            }

            #[inline]
            fn plus_eq_cast<T: Scalar<Float = $f>>(x: &mut T, delta: &[T]) {
                *x = *x + delta[0];
            }

            fn describe(&self) -> String {
                self.to_string()
            }
        }
    };
}

impl_parameter_for_float!(f32);
impl_parameter_for_float!(f64);

impl<F: Float, const N: usize> Parameter for [F; N] {
    type Scalar = F;
    const DIMS: Dims = Dims::Static(N);
    type Cast<T: Scalar<Float = F>> = [T; N];

    fn cast<T: Scalar<Float = F>>(&self) -> [T; N] {
        self.map(T::from_f)
    }

    fn plus_eq(&mut self, delta: &[F]) {
        Self::plus_eq_cast(self, delta);
    }

    fn plus_eq_cast<T: Scalar<Float = F>>(x: &mut [T; N], delta: &[T]) {
        debug_assert_eq!(delta.len(), N);
        for (v, &d) in x.iter_mut().zip(delta) {
            *v = *v + d;
        }
    }

    fn describe(&self) -> String {
        join(self.iter().copied())
    }
}

/// Fixed-size matrices, updated entry-wise in column-major order.
impl<F: Float, const R: usize, const C: usize> Parameter for SMatrix<F, R, C> {
    type Scalar = F;
    const DIMS: Dims = Dims::Static(R * C);
    type Cast<T: Scalar<Float = F>> = SMatrix<T, R, C>;

    fn cast<T: Scalar<Float = F>>(&self) -> SMatrix<T, R, C> {
        self.map(T::from_f)
    }

    fn plus_eq(&mut self, delta: &[F]) {
        Self::plus_eq_cast(self, delta);
    }

    fn plus_eq_cast<T: Scalar<Float = F>>(x: &mut SMatrix<T, R, C>, delta: &[T]) {
        debug_assert_eq!(delta.len(), R * C);
        for (v, &d) in x.iter_mut().zip(delta) {
            *v = *v + d;
        }
    }

    fn describe(&self) -> String {
        join(self.iter().copied())
    }
}

impl<F: Float> Parameter for DVector<F> {
    type Scalar = F;
    const DIMS: Dims = Dims::Dynamic;
    type Cast<T: Scalar<Float = F>> = DVector<T>;

    fn dims(&self) -> usize {
        self.len()
    }

    fn cast<T: Scalar<Float = F>>(&self) -> DVector<T> {
        self.map(T::from_f)
    }

    fn plus_eq(&mut self, delta: &[F]) {
        Self::plus_eq_cast(self, delta);
    }

    fn plus_eq_cast<T: Scalar<Float = F>>(x: &mut DVector<T>, delta: &[T]) {
        debug_assert_eq!(delta.len(), x.len());
        for (v, &d) in x.iter_mut().zip(delta) {
            *v = *v + d;
        }
    }

    fn describe(&self) -> String {
        join(self.iter().copied())
    }
}

impl<F: Float> Parameter for Vec<F> {
    type Scalar = F;
    const DIMS: Dims = Dims::Dynamic;
    type Cast<T: Scalar<Float = F>> = Vec<T>;

    fn dims(&self) -> usize {
        self.len()
    }

    fn cast<T: Scalar<Float = F>>(&self) -> Vec<T> {
        self.iter().map(|&v| T::from_f(v)).collect()
    }

    fn plus_eq(&mut self, delta: &[F]) {
        Self::plus_eq_cast(self, delta);
    }

    fn plus_eq_cast<T: Scalar<Float = F>>(x: &mut Vec<T>, delta: &[T]) {
        debug_assert_eq!(delta.len(), x.len());
        for (v, &d) in x.iter_mut().zip(delta) {
            *v = *v + d;
        }
    }

    fn describe(&self) -> String {
        join(self.iter().copied())
    }
}
