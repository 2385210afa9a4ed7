use nalgebra::DVector;
use numbat::Parameter;

use crate::accumulate::Accumulator;
use crate::linalg::{self, Real};
use crate::log::f64_of;
use crate::optimizer::{Optimizer, OptimizerConfig};
use crate::result::Output;
use crate::solvers::{Solver, System, SystemOptions};

/// Configuration for [`gradient_descent`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradientDescentConfig<F> {
    pub system: SystemOptions<F>,
    /// Step is `-lr·g` (default: 1).
    pub lr: F,
    pub optimizer: OptimizerConfig<F>,
}

impl Default for GradientDescentConfig<f64> {
    fn default() -> Self {
        GradientDescentConfig {
            system: SystemOptions::default(),
            lr: 1.0,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl Default for GradientDescentConfig<f32> {
    fn default() -> Self {
        GradientDescentConfig {
            system: SystemOptions::default(),
            lr: 1.0,
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// First-order descent along `-g`. The learning rate is halved after each
/// rejected step and restored by [`Solver::reset`].
#[derive(Debug, Clone)]
pub struct GradientDescent<F> {
    system: System<F>,
    lr_init: F,
    lr: F,
}

impl<F: Real> GradientDescent<F> {
    pub fn new(options: SystemOptions<F>, lr: F) -> Self {
        GradientDescent {
            system: System::new(options, <Self as Solver<F>>::FIRST_ORDER),
            lr_init: lr,
            lr,
        }
    }

    pub fn learning_rate(&self) -> F {
        self.lr
    }
}

impl<F: Real> Solver<F> for GradientDescent<F> {
    const FIRST_ORDER: bool = true;

    fn system(&self) -> &System<F> {
        &self.system
    }

    fn system_mut(&mut self) -> &mut System<F> {
        &mut self.system
    }

    fn reset(&mut self) {
        self.system.clear();
        self.lr = self.lr_init;
    }

    fn solve(&mut self) -> Option<DVector<F>> {
        let dx = self.system.gradient() * -self.lr;
        linalg::all_finite(dx.iter()).then_some(dx)
    }

    fn bad_step(&mut self) {
        self.lr = self.lr * F::lit(0.5);
    }

    fn state(&self) -> String {
        format!("lr:{:.2e}", f64_of(self.lr))
    }
}

/// Minimize with gradient descent, updating `x` in place.
pub fn gradient_descent<X, A>(
    x: &mut X,
    acc: &mut A,
    config: &GradientDescentConfig<X::Scalar>,
) -> Output<X::Scalar>
where
    X: Parameter,
    X::Scalar: Real,
    A: Accumulator<X>,
{
    let solver = GradientDescent::new(config.system.clone(), config.lr);
    Optimizer::new(solver, config.optimizer.clone()).optimize(x, acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::{Derivatives, Manual};

    #[test]
    fn step_is_scaled_negative_gradient() {
        let mut gd = GradientDescent::new(SystemOptions::default(), 0.5);
        gd.resize(2).unwrap();
        let mut acc = Manual::new(|x: &[f64; 2], d: Option<Derivatives<'_, f64>>| {
            assert!(d.as_ref().is_some_and(|d| !d.wants_hessian()));
            if let Some(d) = d {
                d.gradient[0] += x[0];
                d.gradient[1] += x[1];
            }
            vec![x[0], x[1]]
        });
        gd.build(&[2.0, -4.0], &mut acc).unwrap();
        assert_eq!(gd.solve().unwrap().as_slice(), &[-1.0, 2.0]);
        assert!(gd.hessian().is_none());
    }

    #[test]
    fn rejected_steps_halve_the_rate() {
        let mut gd = GradientDescent::<f64>::new(SystemOptions::default(), 1.0);
        gd.bad_step();
        gd.bad_step();
        assert_eq!(gd.learning_rate(), 0.25);
        gd.reset();
        assert_eq!(gd.learning_rate(), 1.0);
    }
}
