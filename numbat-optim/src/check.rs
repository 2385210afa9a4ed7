//! Compare user-supplied gradients against finite differences.
//!
//! [`check_gradient`] expects the true gradient of the cost the accumulator
//! returns. Least-squares evaluators that write `Jᵗr` (half the gradient of
//! `‖r‖²`) are checked with [`check_residuals_gradient`] instead.

use nalgebra::DVector;
use numbat::Parameter;

use crate::accumulate::{Accumulator, Derivatives};
use crate::linalg::Real;
use crate::log::f64_of;
use crate::numdiff::{self, Method, NumDiffConfig};

/// Tolerances for [`check_gradient`] and [`check_residuals_gradient`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckParams<F> {
    /// Central-difference step (default: 1e-6).
    pub h: F,
    /// Absolute tolerance (default: 1e-6).
    pub tol_abs: F,
    /// Relative tolerance, scaled by the larger magnitude (default: 1e-4).
    pub tol_rel: F,
}

impl Default for CheckParams<f64> {
    fn default() -> Self {
        CheckParams {
            h: 1e-6,
            tol_abs: 1e-6,
            tol_rel: 1e-4,
        }
    }
}

impl Default for CheckParams<f32> {
    fn default() -> Self {
        CheckParams {
            h: 1e-3,
            tol_abs: 1e-3,
            tol_rel: 1e-2,
        }
    }
}

impl<F: Real> CheckParams<F> {
    fn numdiff(&self) -> NumDiffConfig<F> {
        NumDiffConfig {
            method: Method::Central,
            step: Some(self.h),
        }
    }

    fn agree(&self, analytic: F, numeric: F) -> bool {
        let scale = num_traits::Float::max(
            num_traits::Float::abs(analytic),
            num_traits::Float::abs(numeric),
        );
        num_traits::Float::abs(analytic - numeric) <= self.tol_abs + self.tol_rel * scale
    }

    fn compare(&self, analytic: &DVector<F>, numeric: &DVector<F>) -> bool {
        let mut ok = true;
        for (index, (&a, &n)) in analytic.iter().zip(numeric.iter()).enumerate() {
            if !self.agree(a, n) {
                tracing::warn!(
                    index,
                    analytic = f64_of(a),
                    numeric = f64_of(n),
                    "gradient mismatch"
                );
                ok = false;
            }
        }
        ok
    }
}

/// Check the gradient an accumulator writes at `x` against the central
/// difference `(f(x+h·eᵢ) - f(x-h·eᵢ)) / 2h` of its cost.
///
/// Only the gradient is requested; the Hessian is not validated.
pub fn check_gradient<X, A>(x: &X, acc: &mut A, params: &CheckParams<X::Scalar>) -> bool
where
    X: Parameter,
    X::Scalar: Real,
    A: Accumulator<X>,
{
    let mut analytic = DVector::zeros(x.dims());
    acc.accumulate(x, Some(Derivatives::new(&mut analytic, None)));

    let mut cost = |xp: &X| vec![acc.accumulate(xp, None).cost];
    let (_, jac) = numdiff::jacobian(x, &mut cost, &params.numdiff());
    let numeric = jac.row(0).transpose();

    params.compare(&analytic, &numeric)
}

/// Check a residual function that also fills `Jᵗr`.
///
/// `f` returns the residuals at `x` and, when given a buffer, adds `Jᵗr`
/// into it. The result is compared with `J_numᵗr`, `J_num` taken by
/// central differences of the residuals.
pub fn check_residuals_gradient<X, Func>(
    x: &X,
    mut f: Func,
    params: &CheckParams<X::Scalar>,
) -> bool
where
    X: Parameter,
    X::Scalar: Real,
    Func: FnMut(&X, Option<&mut DVector<X::Scalar>>) -> Vec<X::Scalar>,
{
    let mut analytic = DVector::zeros(x.dims());
    f(x, Some(&mut analytic));

    let mut residuals = |xp: &X| f(xp, None);
    let (r, jac) = numdiff::jacobian(x, &mut residuals, &params.numdiff());
    let numeric = jac.tr_mul(&DVector::from_vec(r));

    params.compare(&analytic, &numeric)
}
