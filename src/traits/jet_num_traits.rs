use std::num::FpCategory;

use num_traits::{
    Float as NumFloat, FloatConst, FromPrimitive, Num, NumCast, One, Signed, ToPrimitive, Zero,
};

use crate::float::Float;
use crate::jet::Jet;

impl<F: Float, const N: usize> Zero for Jet<F, N> {
    #[inline(always)]
    fn zero() -> Self {
        Jet::constant(F::zero())
    }
    #[inline(always)]
    fn is_zero(&self) -> bool {
        self.re.is_zero()
    }
}

impl<F: Float, const N: usize> One for Jet<F, N> {
    #[inline(always)]
    fn one() -> Self {
        Jet::constant(F::one())
    }
}

impl<F: Float, const N: usize> Num for Jet<F, N> {
    type FromStrRadixErr = F::FromStrRadixErr;
    fn from_str_radix(s: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        F::from_str_radix(s, radix).map(Jet::constant)
    }
}

impl<F: Float, const N: usize> FromPrimitive for Jet<F, N> {
    #[inline]
    fn from_i64(n: i64) -> Option<Self> {
        F::from_i64(n).map(Jet::constant)
    }
    #[inline]
    fn from_u64(n: u64) -> Option<Self> {
        F::from_u64(n).map(Jet::constant)
    }
    #[inline]
    fn from_f32(n: f32) -> Option<Self> {
        F::from_f32(n).map(Jet::constant)
    }
    #[inline]
    fn from_f64(n: f64) -> Option<Self> {
        F::from_f64(n).map(Jet::constant)
    }
}

impl<F: Float, const N: usize> ToPrimitive for Jet<F, N> {
    #[inline]
    fn to_i64(&self) -> Option<i64> {
        self.re.to_i64()
    }
    #[inline]
    fn to_u64(&self) -> Option<u64> {
        self.re.to_u64()
    }
    #[inline]
    fn to_f32(&self) -> Option<f32> {
        self.re.to_f32()
    }
    #[inline]
    fn to_f64(&self) -> Option<f64> {
        self.re.to_f64()
    }
}

impl<F: Float, const N: usize> NumCast for Jet<F, N> {
    #[inline]
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        <F as NumCast>::from(n).map(Jet::constant)
    }
}

impl<F: Float, const N: usize> Signed for Jet<F, N> {
    #[inline]
    fn abs(&self) -> Self {
        Jet::abs(*self)
    }
    #[inline]
    fn abs_sub(&self, other: &Self) -> Self {
        if self.re > other.re {
            *self - *other
        } else {
            Self::zero()
        }
    }
    #[inline]
    fn signum(&self) -> Self {
        Jet::signum(*self)
    }
    #[inline]
    fn is_positive(&self) -> bool {
        self.re.is_sign_positive()
    }
    #[inline]
    fn is_negative(&self) -> bool {
        self.re.is_sign_negative()
    }
}

macro_rules! constants {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            fn $name() -> Self {
                Jet::constant(F::$name())
            }
        )*
    };
}

impl<F: Float, const N: usize> FloatConst for Jet<F, N> {
    constants!(
        E, FRAC_1_PI, FRAC_1_SQRT_2, FRAC_2_PI, FRAC_2_SQRT_PI, FRAC_PI_2, FRAC_PI_3, FRAC_PI_4,
        FRAC_PI_6, FRAC_PI_8, LN_10, LN_2, LOG10_E, LOG2_E, PI, SQRT_2, TAU, LOG10_2, LOG2_10,
    );
}

/// Forwards `NumFloat` methods to the inherent `Jet` implementations.
macro_rules! forward_unary {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            fn $name(self) -> Self {
                Jet::$name(self)
            }
        )*
    };
}

macro_rules! forward_binary {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            fn $name(self, other: Self) -> Self {
                Jet::$name(self, other)
            }
        )*
    };
}

macro_rules! forward_predicate {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            fn $name(self) -> bool {
                self.re.$name()
            }
        )*
    };
}

impl<F: Float, const N: usize> NumFloat for Jet<F, N> {
    constants!(
        nan,
        infinity,
        neg_infinity,
        neg_zero,
        min_value,
        min_positive_value,
        max_value,
        epsilon,
    );

    forward_predicate!(
        is_nan,
        is_infinite,
        is_finite,
        is_normal,
        is_sign_positive,
        is_sign_negative,
    );

    forward_unary!(
        floor, ceil, round, trunc, fract, abs, signum, recip, sqrt, cbrt, exp, exp2, exp_m1, ln,
        log2, log10, ln_1p, sin, cos, tan, asin, acos, atan, sinh, cosh, tanh, asinh, acosh,
        atanh,
    );

    forward_binary!(powf, log, atan2, hypot, max, min);

    fn classify(self) -> FpCategory {
        self.re.classify()
    }

    fn mul_add(self, a: Self, b: Self) -> Self {
        Jet::mul_add(self, a, b)
    }

    fn powi(self, n: i32) -> Self {
        Jet::powi(self, n)
    }

    fn sin_cos(self) -> (Self, Self) {
        Jet::sin_cos(self)
    }

    fn abs_sub(self, other: Self) -> Self {
        if self.re > other.re {
            self - other
        } else {
            Self::zero()
        }
    }

    fn integer_decode(self) -> (u64, i16, i8) {
        self.re.integer_decode()
    }

    fn to_degrees(self) -> Self {
        let scale = F::one().to_degrees();
        Jet::new(self.re.to_degrees(), self.eps.map(|e| e * scale))
    }

    fn to_radians(self) -> Self {
        let scale = F::one().to_radians();
        Jet::new(self.re.to_radians(), self.eps.map(|e| e * scale))
    }
}
