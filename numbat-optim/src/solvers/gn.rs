use nalgebra::DVector;
use numbat::Parameter;

use crate::accumulate::Accumulator;
use crate::linalg::Real;
use crate::optimizer::{Optimizer, OptimizerConfig};
use crate::result::Output;
use crate::solvers::{Solver, System, SystemOptions};

/// Configuration for [`gauss_newton`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussNewtonConfig<F> {
    pub system: SystemOptions<F>,
    pub optimizer: OptimizerConfig<F>,
}

impl Default for GaussNewtonConfig<f64> {
    fn default() -> Self {
        GaussNewtonConfig {
            system: SystemOptions::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl Default for GaussNewtonConfig<f32> {
    fn default() -> Self {
        GaussNewtonConfig {
            system: SystemOptions::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Undamped Gauss-Newton. A system that cannot be solved ends the run.
#[derive(Debug, Clone)]
pub struct GaussNewton<F> {
    system: System<F>,
}

impl<F: Real> GaussNewton<F> {
    pub fn new(options: SystemOptions<F>) -> Self {
        GaussNewton {
            system: System::new(options, <Self as Solver<F>>::FIRST_ORDER),
        }
    }
}

impl<F: Real> Solver<F> for GaussNewton<F> {
    const FIRST_ORDER: bool = false;

    fn system(&self) -> &System<F> {
        &self.system
    }

    fn system_mut(&mut self) -> &mut System<F> {
        &mut self.system
    }

    fn reset(&mut self) {
        self.system.clear();
    }

    fn solve(&mut self) -> Option<DVector<F>> {
        let h = self.system.hessian()?;
        self.system.solve_with(h)
    }
}

/// Minimize with Gauss-Newton, updating `x` in place.
pub fn gauss_newton<X, A>(
    x: &mut X,
    acc: &mut A,
    config: &GaussNewtonConfig<X::Scalar>,
) -> Output<X::Scalar>
where
    X: Parameter,
    X::Scalar: Real,
    A: Accumulator<X>,
{
    let solver = GaussNewton::new(config.system.clone());
    Optimizer::new(solver, config.optimizer.clone()).optimize(x, acc)
}
