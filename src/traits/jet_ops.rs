use std::cmp::Ordering;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

use crate::float::Float;
use crate::jet::Jet;

#[inline(always)]
fn lanes<F: Float, const N: usize>(f: impl FnMut(usize) -> F) -> [F; N] {
    std::array::from_fn(f)
}

impl<F: Float, const N: usize> Add for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Jet::new(self.re + rhs.re, lanes(|k| self.eps[k] + rhs.eps[k]))
    }
}

impl<F: Float, const N: usize> Sub for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Jet::new(self.re - rhs.re, lanes(|k| self.eps[k] - rhs.eps[k]))
    }
}

#[allow(clippy::suspicious_arithmetic_impl)]
impl<F: Float, const N: usize> Mul for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Jet::new(
            self.re * rhs.re,
            lanes(|k| self.eps[k] * rhs.re + self.re * rhs.eps[k]),
        )
    }
}

#[allow(clippy::suspicious_arithmetic_impl)]
impl<F: Float, const N: usize> Div for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        // (a/b)' = (a' - (a/b) b') / b
        let q = self.re / rhs.re;
        Jet::new(q, lanes(|k| (self.eps[k] - q * rhs.eps[k]) / rhs.re))
    }
}

impl<F: Float, const N: usize> Neg for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Jet::new(-self.re, self.eps.map(|e| -e))
    }
}

impl<F: Float, const N: usize> Rem for Jet<F, N> {
    type Output = Self;
    #[inline]
    fn rem(self, rhs: Self) -> Self {
        // a % b = a - b * trunc(a / b); the trunc term is locally constant.
        let t = (self.re / rhs.re).trunc();
        Jet::new(self.re % rhs.re, lanes(|k| self.eps[k] - t * rhs.eps[k]))
    }
}

macro_rules! impl_assign {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<F: Float, const N: usize> $trait for Jet<F, N> {
            #[inline]
            fn $method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_assign!(AddAssign, add_assign, +);
impl_assign!(SubAssign, sub_assign, -);
impl_assign!(MulAssign, mul_assign, *);
impl_assign!(DivAssign, div_assign, /);
impl_assign!(RemAssign, rem_assign, %);

// Mixed arithmetic with primitive floats, which are treated as constants.
macro_rules! impl_jet_primitive_ops {
    ($f:ty) => {
        impl<const N: usize> Add<$f> for Jet<$f, N> {
            type Output = Self;
            #[inline]
            fn add(self, rhs: $f) -> Self {
                Jet::new(self.re + rhs, self.eps)
            }
        }

        impl<const N: usize> Add<Jet<$f, N>> for $f {
            type Output = Jet<$f, N>;
            #[inline]
            fn add(self, rhs: Jet<$f, N>) -> Jet<$f, N> {
                rhs + self
            }
        }

        impl<const N: usize> Sub<$f> for Jet<$f, N> {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: $f) -> Self {
                Jet::new(self.re - rhs, self.eps)
            }
        }

        impl<const N: usize> Sub<Jet<$f, N>> for $f {
            type Output = Jet<$f, N>;
            #[inline]
            fn sub(self, rhs: Jet<$f, N>) -> Jet<$f, N> {
                -rhs + self
            }
        }

        impl<const N: usize> Mul<$f> for Jet<$f, N> {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: $f) -> Self {
                Jet::new(self.re * rhs, self.eps.map(|e| e * rhs))
            }
        }

        impl<const N: usize> Mul<Jet<$f, N>> for $f {
            type Output = Jet<$f, N>;
            #[inline]
            fn mul(self, rhs: Jet<$f, N>) -> Jet<$f, N> {
                rhs * self
            }
        }

        impl<const N: usize> Div<$f> for Jet<$f, N> {
            type Output = Self;
            #[inline]
            fn div(self, rhs: $f) -> Self {
                Jet::new(self.re / rhs, self.eps.map(|e| e / rhs))
            }
        }

        impl<const N: usize> Div<Jet<$f, N>> for $f {
            type Output = Jet<$f, N>;
            #[inline]
            fn div(self, rhs: Jet<$f, N>) -> Jet<$f, N> {
                let q = self / rhs.re;
                Jet::new(q, rhs.eps.map(|e| -q * e / rhs.re))
            }
        }

        impl<const N: usize> Rem<$f> for Jet<$f, N> {
            type Output = Self;
            #[inline]
            fn rem(self, rhs: $f) -> Self {
                Jet::new(self.re % rhs, self.eps)
            }
        }

        impl<const N: usize> Rem<Jet<$f, N>> for $f {
            type Output = Jet<$f, N>;
            #[inline]
            fn rem(self, rhs: Jet<$f, N>) -> Jet<$f, N> {
                Jet::constant(self) % rhs
            }
        }

        impl<const N: usize> AddAssign<$f> for Jet<$f, N> {
            #[inline]
            fn add_assign(&mut self, rhs: $f) {
                self.re += rhs;
            }
        }

        impl<const N: usize> SubAssign<$f> for Jet<$f, N> {
            #[inline]
            fn sub_assign(&mut self, rhs: $f) {
                self.re -= rhs;
            }
        }

        impl<const N: usize> MulAssign<$f> for Jet<$f, N> {
            #[inline]
            fn mul_assign(&mut self, rhs: $f) {
                *self = *self * rhs;
            }
        }

        impl<const N: usize> DivAssign<$f> for Jet<$f, N> {
            #[inline]
            fn div_assign(&mut self, rhs: $f) {
                *self = *self / rhs;
            }
        }
    };
}

impl_jet_primitive_ops!(f32);
impl_jet_primitive_ops!(f64);

/// Equality and ordering look at the primal only, so branches in user code
/// behave as they would on plain floats.
impl<F: Float, const N: usize> PartialEq for Jet<F, N> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.re == other.re
    }
}

impl<F: Float, const N: usize> PartialOrd for Jet<F, N> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.re.partial_cmp(&other.re)
    }
}
