use nalgebra::{DMatrix, DVector};
use numbat::Parameter;

use crate::accumulate::Accumulator;
use crate::linalg::Real;
use crate::log::f64_of;
use crate::optimizer::{Optimizer, OptimizerConfig};
use crate::result::Output;
use crate::solvers::{Solver, System, SystemOptions};

/// Damping schedule for Levenberg-Marquardt.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DampingParams<F> {
    /// Initial `λ` (default: 1e-4).
    pub damping_init: F,
    /// Factor applied to `λ` after an accepted step (default: 1/3).
    pub good_factor: F,
    /// Factor applied to `λ` after a rejected step or failed solve
    /// (default: 2).
    pub bad_factor: F,
    /// Lower bound on `λ` (default: 1e-9).
    pub damping_min: F,
    /// Upper bound on `λ` (default: 1e9).
    pub damping_max: F,
}

impl Default for DampingParams<f64> {
    fn default() -> Self {
        DampingParams {
            damping_init: 1e-4,
            good_factor: 1.0 / 3.0,
            bad_factor: 2.0,
            damping_min: 1e-9,
            damping_max: 1e9,
        }
    }
}

impl Default for DampingParams<f32> {
    fn default() -> Self {
        DampingParams {
            damping_init: 1e-4,
            good_factor: 1.0 / 3.0,
            bad_factor: 2.0,
            damping_min: 1e-9,
            damping_max: 1e9,
        }
    }
}

/// Configuration for [`levenberg_marquardt`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevenbergMarquardtConfig<F> {
    pub system: SystemOptions<F>,
    pub damping: DampingParams<F>,
    pub optimizer: OptimizerConfig<F>,
}

impl Default for LevenbergMarquardtConfig<f64> {
    fn default() -> Self {
        LevenbergMarquardtConfig {
            system: SystemOptions::default(),
            damping: DampingParams::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl Default for LevenbergMarquardtConfig<f32> {
    fn default() -> Self {
        LevenbergMarquardtConfig {
            system: SystemOptions::default(),
            damping: DampingParams::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Levenberg-Marquardt: solves `(H + λI)·δ = -g`.
///
/// `λ` shrinks after accepted steps and grows after rejected ones, moving
/// between Gauss-Newton and short gradient steps. A failed factorization
/// grows `λ` and retries until `λ` reaches its upper bound.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt<F> {
    system: System<F>,
    params: DampingParams<F>,
    lambda: F,
    damped: DMatrix<F>,
}

impl<F: Real> LevenbergMarquardt<F> {
    pub fn new(options: SystemOptions<F>, params: DampingParams<F>) -> Self {
        let lambda = params.damping_init;
        LevenbergMarquardt {
            system: System::new(options, <Self as Solver<F>>::FIRST_ORDER),
            params,
            lambda,
            damped: DMatrix::zeros(0, 0),
        }
    }

    /// Current damping.
    pub fn damping(&self) -> F {
        self.lambda
    }

    fn set_damping(&mut self, lambda: F) {
        self.lambda = if lambda < self.params.damping_min {
            self.params.damping_min
        } else if lambda > self.params.damping_max {
            self.params.damping_max
        } else {
            lambda
        };
    }
}

impl<F: Real> Solver<F> for LevenbergMarquardt<F> {
    const FIRST_ORDER: bool = false;

    fn system(&self) -> &System<F> {
        &self.system
    }

    fn system_mut(&mut self) -> &mut System<F> {
        &mut self.system
    }

    fn reset(&mut self) {
        self.system.clear();
        self.damped = DMatrix::zeros(0, 0);
        self.lambda = self.params.damping_init;
    }

    fn solve(&mut self) -> Option<DVector<F>> {
        let h = self.system.hessian()?;
        self.damped.clone_from(h);
        for i in 0..self.damped.nrows() {
            self.damped[(i, i)] = self.damped[(i, i)] + self.lambda;
        }
        self.system.solve_with(&self.damped)
    }

    fn good_step(&mut self) {
        self.set_damping(self.lambda * self.params.good_factor);
    }

    fn bad_step(&mut self) {
        self.set_damping(self.lambda * self.params.bad_factor);
    }

    fn failed_step(&mut self) -> bool {
        if self.lambda >= self.params.damping_max {
            return false;
        }
        self.bad_step();
        true
    }

    fn hessian(&self) -> Option<DMatrix<F>> {
        if self.damped.nrows() == self.system.dims() && self.system.dims() > 0 {
            Some(self.damped.clone())
        } else {
            self.system.hessian().cloned()
        }
    }

    fn state(&self) -> String {
        format!("λ:{:.2e}", f64_of(self.lambda))
    }
}

/// Minimize with Levenberg-Marquardt, updating `x` in place.
///
/// ```
/// use numbat_optim::{levenberg_marquardt, Derivatives, LevenbergMarquardtConfig, Manual};
///
/// // x² = 2
/// let mut acc = Manual::new(|x: &f64, d: Option<Derivatives<'_, f64>>| {
///     let r = x * x - 2.0;
///     if let Some(d) = d {
///         let j = 2.0 * x;
///         d.gradient[0] += j * r;
///         if let Some(h) = d.hessian {
///             h[(0, 0)] += j * j;
///         }
///     }
///     vec![r]
/// });
/// let mut x = 1.0f64;
/// let out = levenberg_marquardt(&mut x, &mut acc, &LevenbergMarquardtConfig::default());
/// assert!(out.converged());
/// assert!((x - 2f64.sqrt()).abs() < 1e-6);
/// ```
pub fn levenberg_marquardt<X, A>(
    x: &mut X,
    acc: &mut A,
    config: &LevenbergMarquardtConfig<X::Scalar>,
) -> Output<X::Scalar>
where
    X: Parameter,
    X::Scalar: Real,
    A: Accumulator<X>,
{
    let solver = LevenbergMarquardt::new(config.system.clone(), config.damping.clone());
    Optimizer::new(solver, config.optimizer.clone()).optimize(x, acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> LevenbergMarquardt<f64> {
        LevenbergMarquardt::new(SystemOptions::default(), DampingParams::default())
    }

    #[test]
    fn damping_follows_the_schedule() {
        let mut lm = solver();
        assert_eq!(lm.damping(), 1e-4);
        lm.bad_step();
        assert_eq!(lm.damping(), 2e-4);
        lm.good_step();
        assert!((lm.damping() - 2e-4 / 3.0).abs() < 1e-18);
        for _ in 0..100 {
            lm.good_step();
        }
        assert_eq!(lm.damping(), 1e-9);
        lm.reset();
        assert_eq!(lm.damping(), 1e-4);
    }

    #[test]
    fn failed_step_gives_up_at_the_ceiling() {
        let params = DampingParams {
            damping_init: 6e8,
            ..DampingParams::default()
        };
        let mut lm = LevenbergMarquardt::<f64>::new(SystemOptions::default(), params);
        assert!(lm.failed_step());
        assert_eq!(lm.damping(), 1e9);
        assert!(!lm.failed_step());
    }

    #[test]
    fn damped_matrix_is_exported() {
        use crate::accumulate::{Derivatives, Manual};

        let mut lm = solver();
        lm.resize(1).unwrap();
        let mut acc = Manual::new(|x: &f64, d: Option<Derivatives<'_, f64>>| {
            if let Some(d) = d {
                d.gradient[0] += *x;
                if let Some(h) = d.hessian {
                    h[(0, 0)] += 1.0;
                }
            }
            vec![*x]
        });
        lm.build(&2.0, &mut acc).unwrap();
        let dx = lm.solve().unwrap();
        assert!((dx[0] + 2.0 / (1.0 + 1e-4)).abs() < 1e-12);
        assert_eq!(lm.hessian().unwrap()[(0, 0)], 1.0 + 1e-4);
        assert_eq!(lm.system().hessian().unwrap()[(0, 0)], 1.0);
        assert!(lm.state().starts_with("λ:"));
    }
}
