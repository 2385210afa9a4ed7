//! Dense linear algebra for the normal equations, delegated to `nalgebra`.
//!
//! Functions here are bounded by `RealField` only, so method calls resolve
//! without clashing with `num_traits::Float`.

use nalgebra::{DMatrix, DVector, RealField};

/// Float types the solvers run on: a [`numbat::Float`] that is also an
/// `nalgebra` real field. Implemented for `f32` and `f64`.
pub trait Real: numbat::Float + RealField {}

impl<F: numbat::Float + RealField> Real for F {}

/// Factorization used to solve `H·δ = -g`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinearSolver {
    /// Cholesky (`LLᵗ`). Fails unless `H` is positive definite.
    #[default]
    Cholesky,
    /// Explicit inverse through LU. Accepts indefinite `H`.
    Inverse,
}

/// Solve `h·δ = -g`. Returns `None` when the factorization fails or the
/// step is not finite.
pub fn solve_normal_equations<F: RealField + Copy>(
    h: &DMatrix<F>,
    g: &DVector<F>,
    solver: LinearSolver,
) -> Option<DVector<F>> {
    let dx = match solver {
        LinearSolver::Cholesky => {
            let chol = h.clone().cholesky()?;
            -chol.solve(g)
        }
        LinearSolver::Inverse => {
            let inv = h.clone().try_inverse()?;
            -(inv * g)
        }
    };
    dx.iter().all(|v| v.is_finite()).then_some(dx)
}

/// Whether every entry is finite.
pub fn all_finite<'a, F: RealField + Copy>(values: impl IntoIterator<Item = &'a F>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

/// Clamp every entry of `g` into `[-limit, limit]`. A zero limit is a no-op.
pub fn clip<F: RealField + Copy>(g: &mut DVector<F>, limit: F) {
    if limit <= F::zero() {
        return;
    }
    for v in g.iter_mut() {
        if *v > limit {
            *v = limit;
        } else if *v < -limit {
            *v = -limit;
        }
    }
}

/// Index of the first diagonal entry with magnitude below `min`.
pub fn weak_diagonal<F: RealField + Copy>(h: &DMatrix<F>, min: F) -> Option<usize> {
    h.diagonal().iter().position(|d| d.abs() < min)
}

/// Square root of the largest variance in `h⁻¹`, i.e. the worst-determined
/// direction of the solution.
pub fn max_std_dev<F: RealField + Copy>(h: &DMatrix<F>) -> Option<F> {
    let inv = h.clone().try_inverse()?;
    inv.diagonal().iter().copied().reduce(|a, b| a.max(b)).map(|v| v.sqrt())
}
