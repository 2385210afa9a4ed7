//! Solvers for the linearised system `H·δ = -g`.
//!
//! Every solver owns a [`System`] (gradient, Hessian and their options) and
//! adds its own step rule and damping state on top. The
//! [`Optimizer`](crate::Optimizer) drives them through the [`Solver`] trait.

pub mod gd;
pub mod gn;
pub mod lm;

use nalgebra::{DMatrix, DVector};
use numbat::Parameter;

use crate::accumulate::{Accumulator, Derivatives};
use crate::cost::{Cost, CostOptions};
use crate::error::OptimError;
use crate::linalg::{self, LinearSolver, Real};

/// Options shared by every solver's system build.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemOptions<F> {
    pub linear_solver: LinearSolver,
    /// The evaluator writes the whole Hessian. When false only the upper
    /// triangle is trusted and mirrored into the lower one.
    pub hessian_is_full: bool,
    /// Reject a build whose Hessian has a diagonal entry smaller than this in
    /// magnitude (0 disables).
    pub check_min_hessian_diag: F,
    /// Clamp every gradient entry into `[-v, v]` (0 disables).
    pub grad_clipping: F,
    pub cost: CostOptions,
}

impl<F: Real> Default for SystemOptions<F> {
    fn default() -> Self {
        SystemOptions {
            linear_solver: LinearSolver::default(),
            hessian_is_full: false,
            check_min_hessian_diag: F::zero(),
            grad_clipping: F::zero(),
            cost: CostOptions::default(),
        }
    }
}

/// Gradient and Hessian buffers, plus the build protocol around an
/// [`Accumulator`].
#[derive(Debug, Clone)]
pub struct System<F> {
    gradient: DVector<F>,
    hessian: Option<DMatrix<F>>,
    options: SystemOptions<F>,
}

fn zeroed<F: Real>(len: usize) -> Option<Vec<F>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, F::zero());
    Some(v)
}

impl<F: Real> System<F> {
    /// Empty system. First-order systems never allocate a Hessian.
    pub fn new(options: SystemOptions<F>, first_order: bool) -> Self {
        System {
            gradient: DVector::zeros(0),
            hessian: (!first_order).then(|| DMatrix::zeros(0, 0)),
            options,
        }
    }

    pub fn options(&self) -> &SystemOptions<F> {
        &self.options
    }

    pub fn dims(&self) -> usize {
        self.gradient.len()
    }

    pub fn gradient(&self) -> &DVector<F> {
        &self.gradient
    }

    /// Undamped Hessian, `None` for first-order systems.
    pub fn hessian(&self) -> Option<&DMatrix<F>> {
        self.hessian.as_ref()
    }

    /// Reallocate for `dims` parameters. Existing buffers of the right size
    /// are kept.
    pub fn resize(&mut self, dims: usize) -> Result<(), OptimError> {
        if self.gradient.len() == dims {
            return Ok(());
        }
        let oom = || OptimError::OutOfMemory { dims };

        let hessian = match self.hessian {
            None => None,
            Some(_) => {
                let entries = dims.checked_mul(dims).ok_or_else(oom)?;
                let data = zeroed(entries).ok_or_else(oom)?;
                Some(DMatrix::from_vec(dims, dims, data))
            }
        };
        let gradient = zeroed(dims).ok_or_else(oom)?;

        self.gradient = DVector::from_vec(gradient);
        self.hessian = hessian;
        tracing::debug!(dims, "resized system");
        Ok(())
    }

    /// Zero both buffers.
    pub fn clear(&mut self) {
        self.gradient.fill(F::zero());
        if let Some(h) = self.hessian.as_mut() {
            h.fill(F::zero());
        }
    }

    /// Accumulate `g` and `H` at `x` and return the normalised cost.
    ///
    /// A build is rejected when the evaluator produced no residuals, when
    /// the cost, `g` or `H` hold NaN or infinity, or when a Hessian diagonal
    /// entry is below [`SystemOptions::check_min_hessian_diag`]. Finiteness
    /// is checked before clipping.
    pub fn build<X, A>(&mut self, x: &X, acc: &mut A) -> Result<Cost<F>, OptimError>
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        self.clear();
        let raw = acc.accumulate(
            x,
            Some(Derivatives::new(&mut self.gradient, self.hessian.as_mut())),
        );
        let cost = self.options.cost.apply(raw);
        if cost.is_empty() {
            return Err(OptimError::NoResiduals);
        }

        if let Some(h) = self.hessian.as_mut() {
            if !self.options.hessian_is_full {
                h.fill_lower_triangle_with_upper_triangle();
            }
        }

        let finite = num_traits::Float::is_finite(cost.cost)
            && linalg::all_finite(self.gradient.iter())
            && self.hessian.as_ref().map_or(true, |h| linalg::all_finite(h.iter()));
        if !finite {
            tracing::warn!("system has NaN or Inf");
            return Err(OptimError::NonFinite);
        }

        linalg::clip(&mut self.gradient, self.options.grad_clipping);

        let min_diag = self.options.check_min_hessian_diag;
        if min_diag > F::zero() {
            if let Some(index) = self
                .hessian
                .as_ref()
                .and_then(|h| linalg::weak_diagonal(h, min_diag))
            {
                tracing::warn!(index, "hessian diagonal below minimum");
                return Err(OptimError::WeakHessianDiagonal { index });
            }
        }

        Ok(cost)
    }

    /// Cost at `x` without derivatives, normalised like [`System::build`].
    pub fn evaluate<X, A>(&self, x: &X, acc: &mut A) -> Cost<F>
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        self.options.cost.apply(acc.accumulate(x, None))
    }

    /// Solve `h·δ = -g` with the configured factorization.
    pub fn solve_with(&self, h: &DMatrix<F>) -> Option<DVector<F>> {
        linalg::solve_normal_equations(h, &self.gradient, self.options.linear_solver)
    }
}

/// A step rule over a [`System`].
///
/// The driver calls [`build`](Solver::build) at each accepted point,
/// [`solve`](Solver::solve) for a step, then reports the outcome through
/// [`good_step`](Solver::good_step) or [`bad_step`](Solver::bad_step).
pub trait Solver<F: Real> {
    /// First-order solvers only need the gradient.
    const FIRST_ORDER: bool;

    fn system(&self) -> &System<F>;

    fn system_mut(&mut self) -> &mut System<F>;

    /// Zero the buffers and restore the initial step state.
    fn reset(&mut self);

    /// Step `δ` for the current system, `None` if it cannot be solved.
    fn solve(&mut self) -> Option<DVector<F>>;

    fn resize(&mut self, dims: usize) -> Result<(), OptimError> {
        self.system_mut().resize(dims)
    }

    fn build<X, A>(&mut self, x: &X, acc: &mut A) -> Result<Cost<F>, OptimError>
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        self.system_mut().build(x, acc)
    }

    fn evaluate<X, A>(&self, x: &X, acc: &mut A) -> Cost<F>
    where
        X: Parameter<Scalar = F>,
        A: Accumulator<X>,
    {
        self.system().evaluate(x, acc)
    }

    /// The last step decreased the cost.
    fn good_step(&mut self) {}

    /// The last step did not decrease the cost and was rolled back.
    fn bad_step(&mut self) {}

    /// [`solve`](Solver::solve) failed. Returns whether retrying with
    /// adjusted state can help.
    fn failed_step(&mut self) -> bool {
        false
    }

    fn gradient(&self) -> &DVector<F> {
        self.system().gradient()
    }

    /// Hessian the last step was solved with.
    fn hessian(&self) -> Option<DMatrix<F>> {
        self.system().hessian().cloned()
    }

    /// Square root of the largest variance in `H⁻¹`.
    fn max_std_dev(&self) -> Option<F> {
        self.hessian().as_ref().and_then(linalg::max_std_dev)
    }

    /// Step state for logs, such as the damping.
    fn state(&self) -> String {
        String::new()
    }
}
