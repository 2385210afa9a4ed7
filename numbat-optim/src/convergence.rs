use std::time::Duration;

use crate::linalg::Real;
use crate::result::StopReason;

/// Parameters controlling when a run stops.
///
/// Norm thresholds are on squared norms, so they compare directly with
/// `‖g‖²` and `‖δ‖²` without a square root per iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceParams<F> {
    /// Maximum number of attempted steps (default: 100).
    pub max_iters: usize,
    /// Stop when `‖g‖² < min_grad_norm2` (default: 1e-12).
    pub min_grad_norm2: F,
    /// Stop when `‖δ‖² < min_step_norm2` (default: 1e-20).
    pub min_step_norm2: F,
    /// Stop when the accepted cost drops below this (default: 0, disabled).
    pub min_error: F,
    /// Stop after this many failed steps in a row (default: 3, 0 disables).
    pub max_consec_failures: usize,
    /// Stop after this many failed steps in total (default: 0, disabled).
    pub max_total_failures: usize,
    /// Wall-clock budget, checked once per iteration (default: none).
    pub max_duration: Option<Duration>,
}

impl Default for ConvergenceParams<f64> {
    fn default() -> Self {
        ConvergenceParams {
            max_iters: 100,
            min_grad_norm2: 1e-12,
            min_step_norm2: 1e-20,
            min_error: 0.0,
            max_consec_failures: 3,
            max_total_failures: 0,
            max_duration: None,
        }
    }
}

impl Default for ConvergenceParams<f32> {
    fn default() -> Self {
        ConvergenceParams {
            max_iters: 100,
            min_grad_norm2: 1e-12,
            min_step_norm2: 1e-14,
            min_error: 0.0,
            max_consec_failures: 3,
            max_total_failures: 0,
            max_duration: None,
        }
    }
}

/// Snapshot of a run after one attempted step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Progress<F> {
    pub iters: usize,
    pub consec_failures: usize,
    pub total_failures: usize,
    /// Squared norm of the step just attempted, if one was computed.
    pub delta2: Option<F>,
    /// Cost at the current (last accepted) parameter.
    pub cost: F,
    pub elapsed: Duration,
}

impl<F: Real> ConvergenceParams<F> {
    pub(crate) fn gradient_converged(&self, grad2: F) -> bool {
        grad2 < self.min_grad_norm2
    }

    pub(crate) fn consec_failures_exceeded(&self, consec_failures: usize) -> bool {
        self.max_consec_failures > 0 && consec_failures >= self.max_consec_failures
    }

    /// Budget and convergence predicates, in priority order.
    pub(crate) fn check(&self, p: &Progress<F>) -> Option<StopReason> {
        if self.max_duration.is_some_and(|budget| p.elapsed >= budget) {
            return Some(StopReason::TimedOut);
        }
        if self.consec_failures_exceeded(p.consec_failures) {
            return Some(StopReason::MaxConsecFails);
        }
        if self.max_total_failures > 0 && p.total_failures >= self.max_total_failures {
            return Some(StopReason::MaxFails);
        }
        if p.delta2.is_some_and(|d2| d2 < self.min_step_norm2) {
            return Some(StopReason::MinDeltaNorm);
        }
        if self.min_error > F::zero() && p.cost < self.min_error {
            return Some(StopReason::MinError);
        }
        if p.iters >= self.max_iters {
            return Some(StopReason::MaxIters);
        }
        None
    }
}
