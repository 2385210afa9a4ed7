//! Finite-difference Jacobians through [`Parameter::plus_eq`].
//!
//! Perturbations are applied as updates, so a manifold parameter is
//! differentiated with respect to its local update exactly like the jet path
//! in [`numbat::jacobian`].

use nalgebra::DMatrix;
use num_traits::Zero;
use numbat::Parameter;

use crate::linalg::Real;

/// Difference scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// `(f(x+h) - f(x)) / h`. One extra evaluation per column.
    Forward,
    /// `(f(x+h) - f(x-h)) / 2h` with two fresh copies of `x`.
    #[default]
    Central,
    /// Central differences that step the `+h` copy back by `-2h` instead of
    /// cloning `x` twice. Exact for additive updates, approximate on curved
    /// manifolds.
    FastCentral,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumDiffConfig<F> {
    pub method: Method,
    /// Step size. `None` picks `√ε` for forward and `∛ε` for central
    /// differences.
    pub step: Option<F>,
}

impl Default for NumDiffConfig<f64> {
    fn default() -> Self {
        NumDiffConfig {
            method: Method::Central,
            step: None,
        }
    }
}

impl Default for NumDiffConfig<f32> {
    fn default() -> Self {
        NumDiffConfig {
            method: Method::Central,
            step: None,
        }
    }
}

impl<F: Real> NumDiffConfig<F> {
    pub fn step(&self) -> F {
        self.step.unwrap_or_else(|| {
            let eps = <F as num_traits::Float>::epsilon();
            match self.method {
                Method::Forward => num_traits::Float::sqrt(eps),
                Method::Central | Method::FastCentral => num_traits::Float::cbrt(eps),
            }
        })
    }
}

/// Residuals at `x` and their Jacobian with respect to the update of `x`.
///
/// `f` must return the same number of residuals at every point; rows beyond
/// the count at `x` are ignored.
pub fn jacobian<X, Func>(
    x: &X,
    f: &mut Func,
    config: &NumDiffConfig<X::Scalar>,
) -> (Vec<X::Scalar>, DMatrix<X::Scalar>)
where
    X: Parameter,
    X::Scalar: Real,
    Func: FnMut(&X) -> Vec<X::Scalar>,
{
    let r0 = f(x);
    let n = x.dims();
    let m = r0.len();
    let mut jac = DMatrix::zeros(m, n);

    let h = config.step();
    let two_h = h + h;
    let mut delta = vec![X::Scalar::zero(); n];

    for j in 0..n {
        delta[j] = h;
        let mut xp = x.clone();
        xp.plus_eq(&delta);
        let rp = f(&xp);

        let (rm, denom) = match config.method {
            Method::Forward => (None, h),
            Method::Central => {
                delta[j] = -h;
                let mut xm = x.clone();
                xm.plus_eq(&delta);
                (Some(f(&xm)), two_h)
            }
            Method::FastCentral => {
                delta[j] = -two_h;
                xp.plus_eq(&delta);
                (Some(f(&xp)), two_h)
            }
        };
        delta[j] = X::Scalar::zero();

        let base = rm.as_deref().unwrap_or(&r0);
        debug_assert_eq!(rp.len(), m, "residual count changed under perturbation");
        for (i, (p, b)) in rp.iter().zip(base).take(m).enumerate() {
            jac[(i, j)] = (*p - *b) / denom;
        }
    }

    (r0, jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn model(x: &Vector2<f64>) -> Vec<f64> {
        vec![x[0] * x[0] * x[1], x[1].sin()]
    }

    #[test]
    fn every_method_matches_the_analytic_jacobian() {
        let x = Vector2::new(1.5, 0.3);
        for method in [Method::Forward, Method::Central, Method::FastCentral] {
            let config = NumDiffConfig { method, step: None };
            let (r, jac) = jacobian(&x, &mut model, &config);
            assert_eq!(r, model(&x));
            let tol = if method == Method::Forward { 1e-6 } else { 1e-9 };
            assert_relative_eq!(jac[(0, 0)], 2.0 * 1.5 * 0.3, epsilon = tol);
            assert_relative_eq!(jac[(0, 1)], 1.5 * 1.5, epsilon = tol);
            assert_relative_eq!(jac[(1, 0)], 0.0, epsilon = tol);
            assert_relative_eq!(jac[(1, 1)], 0.3f64.cos(), epsilon = tol);
        }
    }

    #[test]
    fn default_steps_follow_the_scheme() {
        let central = NumDiffConfig::<f64>::default();
        assert_relative_eq!(central.step(), f64::EPSILON.cbrt());
        let forward = NumDiffConfig::<f64> {
            method: Method::Forward,
            step: None,
        };
        assert_relative_eq!(forward.step(), f64::EPSILON.sqrt());
        let fixed = NumDiffConfig {
            step: Some(1e-3),
            ..forward
        };
        assert_eq!(fixed.step(), 1e-3);
    }

    #[test]
    fn central_costs_two_evaluations_per_column() {
        let mut calls = 0;
        let mut f = |x: &Vec<f64>| {
            calls += 1;
            x.clone()
        };
        let (_, jac) = jacobian(&vec![1.0, 2.0, 3.0], &mut f, &NumDiffConfig::default());
        assert_eq!(calls, 1 + 2 * 3);
        assert_relative_eq!(jac, DMatrix::identity(3, 3), epsilon = 1e-9);
    }
}
