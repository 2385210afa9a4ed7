use std::fmt;
use std::time::Duration;

use nalgebra::DMatrix;

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// Reached the iteration budget.
    MaxIters,
    /// Squared step norm fell below tolerance.
    MinDeltaNorm,
    /// Squared gradient norm fell below tolerance.
    MinGradNorm,
    /// Cost fell below the requested error.
    MinError,
    /// Too many rejected or failed steps in total.
    MaxFails,
    /// Too many rejected or failed steps in a row.
    MaxConsecFails,
    /// Wall-clock budget exhausted.
    TimedOut,
    /// Cost, gradient or Hessian contained NaN or infinity.
    SystemHasNaNOrInf,
    /// The normal equations could not be solved.
    SolverFailed,
    /// Nothing to optimize: zero dimensions, no residuals or a degenerate
    /// first system.
    Skipped,
    /// The normal equations could not be allocated.
    OutOfMemory,
}

impl StopReason {
    /// Fatal reasons leave no usable improvement behind.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StopReason::SystemHasNaNOrInf
                | StopReason::SolverFailed
                | StopReason::Skipped
                | StopReason::OutOfMemory
        )
    }

    /// Whether the stop reflects an actual convergence criterion.
    pub fn is_convergence(&self) -> bool {
        matches!(
            self,
            StopReason::MinDeltaNorm | StopReason::MinGradNorm | StopReason::MinError
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxIters => write!(f, "maximum iterations reached"),
            StopReason::MinDeltaNorm => write!(f, "step norm below tolerance"),
            StopReason::MinGradNorm => write!(f, "gradient norm below tolerance"),
            StopReason::MinError => write!(f, "cost below minimum error"),
            StopReason::MaxFails => write!(f, "too many failed steps"),
            StopReason::MaxConsecFails => write!(f, "too many consecutive failed steps"),
            StopReason::TimedOut => write!(f, "time budget exhausted"),
            StopReason::SystemHasNaNOrInf => write!(f, "system has NaN or Inf"),
            StopReason::SolverFailed => write!(f, "linear solver failed"),
            StopReason::Skipped => write!(f, "skipped"),
            StopReason::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Result of an optimization run. The optimized value itself is written
/// back into the caller's parameter.
#[derive(Debug, Clone)]
pub struct Output<F> {
    /// Reason for termination.
    pub stop_reason: StopReason,
    /// Cost at the returned parameter.
    pub last_cost: F,
    /// Residual count behind `last_cost`.
    pub num_residuals: usize,
    /// Iterations that attempted a step, accepted or not.
    pub num_iters: usize,
    /// Rejected or failed steps in total.
    pub num_failures: usize,
    /// Rejected or failed steps since the last accepted one.
    pub num_consec_failures: usize,
    /// Cost after each attempted step (the trial cost for rejected ones).
    pub costs: Vec<F>,
    /// Squared step norm of each attempted step.
    pub deltas2: Vec<F>,
    /// Whether each attempted step was accepted.
    pub successes: Vec<bool>,
    /// Hessian from the last solve, damped when the solver damps. Only
    /// filled when requested in the configuration.
    pub last_hessian: Option<DMatrix<F>>,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl<F: num_traits::Zero> Output<F> {
    pub(crate) fn new() -> Self {
        Output {
            stop_reason: StopReason::MaxIters,
            last_cost: F::zero(),
            num_residuals: 0,
            num_iters: 0,
            num_failures: 0,
            num_consec_failures: 0,
            costs: Vec::new(),
            deltas2: Vec::new(),
            successes: Vec::new(),
            last_hessian: None,
            duration: Duration::ZERO,
        }
    }
}

impl<F> Output<F> {
    /// True unless the run hit a fatal condition. Budget stops count as
    /// success since the parameter still holds the best value found.
    pub fn succeeded(&self) -> bool {
        !self.stop_reason.is_fatal()
    }

    /// True only for the convergence criteria.
    pub fn converged(&self) -> bool {
        self.stop_reason.is_convergence()
    }

    pub fn stop_reason_description(&self) -> String {
        self.stop_reason.to_string()
    }

    pub(crate) fn record(&mut self, cost: F, delta2: F, accepted: bool) {
        self.num_iters += 1;
        if accepted {
            self.num_consec_failures = 0;
        } else {
            self.num_failures += 1;
            self.num_consec_failures += 1;
        }
        self.costs.push(cost);
        self.deltas2.push(delta2);
        self.successes.push(accepted);
    }
}
