//! The iteration driver shared by every solver.

use std::time::Instant;

use numbat::Parameter;

use crate::accumulate::Accumulator;
use crate::convergence::{ConvergenceParams, Progress};
use crate::cost::Cost;
use crate::error::OptimError;
use crate::linalg::Real;
use crate::log::{f64_of, LogOptions};
use crate::result::{Output, StopReason};
use crate::solvers::Solver;

/// Solver-independent driver settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerConfig<F> {
    pub convergence: ConvergenceParams<F>,
    /// Copy the Hessian of the last solve into [`Output::last_hessian`].
    pub export_hessian: bool,
    pub log: LogOptions,
}

impl Default for OptimizerConfig<f64> {
    fn default() -> Self {
        OptimizerConfig {
            convergence: ConvergenceParams::default(),
            export_hessian: false,
            log: LogOptions::default(),
        }
    }
}

impl Default for OptimizerConfig<f32> {
    fn default() -> Self {
        OptimizerConfig {
            convergence: ConvergenceParams::default(),
            export_hessian: false,
            log: LogOptions::default(),
        }
    }
}

/// Runs a [`Solver`] to convergence.
///
/// Each iteration builds the system at the current point, solves for a
/// step and tries it. A step is kept only if the cost strictly decreases;
/// otherwise `x` is restored to its previous value and the solver adjusts
/// its step state without rebuilding.
#[derive(Debug, Clone)]
pub struct Optimizer<S, F> {
    solver: S,
    config: OptimizerConfig<F>,
}

fn progress<F: Real>(
    out: &Output<F>,
    delta2: Option<F>,
    cost: F,
    start: Instant,
) -> Progress<F> {
    Progress {
        iters: out.num_iters,
        consec_failures: out.num_consec_failures,
        total_failures: out.num_failures,
        delta2,
        cost,
        elapsed: start.elapsed(),
    }
}

impl<S, F> Optimizer<S, F>
where
    S: Solver<F>,
    F: Real,
{
    pub fn new(solver: S, config: OptimizerConfig<F>) -> Self {
        Optimizer { solver, config }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn config(&self) -> &OptimizerConfig<F> {
        &self.config
    }

    /// Minimize the cost of `acc` over `x`, updating `x` in place.
    ///
    /// On return `x` holds the last accepted point.
    pub fn optimize<X, A>(&mut self, x: &mut X, acc: &mut A) -> Output<F>
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        let start = Instant::now();
        let mut out = Output::new();

        out.stop_reason = match self.prepare(x) {
            Ok(()) => self.iterate(x, acc, &mut out, start),
            Err(err) => {
                tracing::warn!(%err, "optimization skipped");
                err.into()
            }
        };
        out.duration = start.elapsed();
        if self.config.export_hessian {
            out.last_hessian = self.solver.hessian();
        }

        tracing::debug!(
            reason = %out.stop_reason,
            iters = out.num_iters,
            cost = f64_of(out.last_cost),
            "optimization finished"
        );
        self.config.log.emit(|| {
            format!(
                "{} after {} iterations, ε²:{:.5e} n:{} in {:.3?}",
                out.stop_reason,
                out.num_iters,
                f64_of(out.last_cost),
                out.num_residuals,
                out.duration
            )
        });
        out
    }

    fn prepare<X: Parameter>(&mut self, x: &X) -> Result<(), OptimError> {
        let dims = x.dims();
        if dims == 0 {
            return Err(OptimError::ZeroDimensions);
        }
        if let Some(expected) = X::DIMS.size() {
            if expected != dims {
                return Err(OptimError::DimensionMismatch {
                    expected,
                    found: dims,
                });
            }
        }
        self.solver.resize(dims)?;
        self.solver.reset();
        Ok(())
    }

    fn iterate<X, A>(
        &mut self,
        x: &mut X,
        acc: &mut A,
        out: &mut Output<F>,
        start: Instant,
    ) -> StopReason
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        let conv = &self.config.convergence;
        let log = &self.config.log;

        if conv.max_iters == 0 {
            let c = self.solver.evaluate(x, acc);
            out.last_cost = c.cost;
            out.num_residuals = c.num_residuals;
            return StopReason::MaxIters;
        }

        let mut cost = Cost::empty();
        let mut built_once = false;
        let mut rebuild = true;

        loop {
            if rebuild {
                match self.solver.build(x, acc) {
                    Ok(c) => {
                        cost = c;
                        built_once = true;
                        rebuild = false;
                        out.last_cost = c.cost;
                        out.num_residuals = c.num_residuals;
                    }
                    Err(OptimError::NoResiduals | OptimError::WeakHessianDiagonal { .. })
                        if built_once =>
                    {
                        out.record(cost.cost, F::zero(), false);
                        log.emit(|| format!("#{} ✗ degenerate system", out.num_iters));
                        if let Some(reason) = conv.check(&progress(out, None, cost.cost, start)) {
                            return reason;
                        }
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "cannot build the system");
                        return err.into();
                    }
                }

                let grad2 = self.solver.gradient().norm_squared();
                if conv.gradient_converged(grad2) {
                    return StopReason::MinGradNorm;
                }
            }

            let Some(dx) = self.solver.solve() else {
                tracing::warn!(state = %self.solver.state(), "linear solve failed");
                out.record(cost.cost, F::zero(), false);
                log.emit(|| format!("#{} ✗ solve failed {}", out.num_iters, self.solver.state()));
                if !self.solver.failed_step() {
                    return StopReason::SolverFailed;
                }
                if let Some(reason) = conv.check(&progress(out, None, cost.cost, start)) {
                    return reason;
                }
                continue;
            };

            let delta2 = dx.norm_squared();
            let snapshot = x.clone();
            x.plus_eq(dx.as_slice());
            let trial = self.solver.evaluate(x, acc);
            if !num_traits::Float::is_finite(trial.cost) {
                *x = snapshot;
                tracing::warn!(iter = out.num_iters + 1, "trial cost is NaN or Inf");
                return StopReason::SystemHasNaNOrInf;
            }

            let accepted = trial.num_residuals > 0 && trial.cost < cost.cost;
            if accepted {
                self.solver.good_step();
                cost = trial;
                out.last_cost = trial.cost;
                out.num_residuals = trial.num_residuals;
                rebuild = true;
            } else {
                *x = snapshot;
                self.solver.bad_step();
            }
            out.record(trial.cost, delta2, accepted);

            tracing::debug!(
                iter = out.num_iters,
                cost = f64_of(trial.cost),
                delta2 = f64_of(delta2),
                accepted,
                state = %self.solver.state(),
                "step"
            );
            log.emit(|| {
                let mut line = format!(
                    "#{} {} |δx|²:{:.2e} {} ε²:{:.5e} n:{} ∇ε²:{:.3e}",
                    out.num_iters,
                    if accepted { "✓" } else { "✗" },
                    f64_of(delta2),
                    self.solver.state(),
                    f64_of(trial.cost),
                    trial.num_residuals,
                    f64_of(self.solver.gradient().norm_squared()),
                );
                if let Some(sigma) = self.solver.max_std_dev() {
                    line.push_str(&format!(" ⎡σ⎤:{:.2e}", f64_of(sigma)));
                }
                if log.print_x {
                    line.push_str(" x:");
                    line.push_str(&x.describe());
                }
                line
            });

            if let Some(reason) = conv.check(&progress(out, Some(delta2), cost.cost, start)) {
                return reason;
            }
        }
    }
}
