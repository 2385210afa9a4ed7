//! The cost record every evaluator returns, and how raw returns map onto it.

use nalgebra::{DMatrix, DVector};

use crate::linalg::Real;

/// Cost at a point and the number of residuals that produced it.
///
/// `num_residuals == 0` means the evaluator produced nothing to minimise.
/// The driver treats that as a skipped or failed iteration, never as a
/// perfect fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cost<F> {
    pub cost: F,
    pub num_residuals: usize,
}

impl<F: Real> Cost<F> {
    pub fn new(cost: F, num_residuals: usize) -> Self {
        Cost {
            cost,
            num_residuals,
        }
    }

    /// No residuals.
    pub fn empty() -> Self {
        Cost::new(F::zero(), 0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_residuals == 0
    }

    /// Squared L2 norm of `residuals`, one residual per entry.
    pub fn from_residuals(residuals: &[F]) -> Self {
        let cost = residuals.iter().fold(F::zero(), |acc, &r| acc + r * r);
        Cost::new(cost, residuals.len())
    }
}

/// A bare scalar is one residual's worth of cost, taken as is.
impl<F: Real> From<F> for Cost<F> {
    fn from(cost: F) -> Self {
        Cost::new(cost, 1)
    }
}

/// An explicit `(cost, count)` pair is used verbatim, which lets callers
/// report weighted or inlier-only counts.
impl<F: Real> From<(F, usize)> for Cost<F> {
    fn from((cost, num_residuals): (F, usize)) -> Self {
        Cost::new(cost, num_residuals)
    }
}

impl<F: Real> From<Vec<F>> for Cost<F> {
    fn from(residuals: Vec<F>) -> Self {
        Cost::from_residuals(&residuals)
    }
}

impl<F: Real> From<DVector<F>> for Cost<F> {
    fn from(residuals: DVector<F>) -> Self {
        Cost::from_residuals(residuals.as_slice())
    }
}

/// Frobenius norm squared, one residual per entry.
impl<F: Real> From<DMatrix<F>> for Cost<F> {
    fn from(residuals: DMatrix<F>) -> Self {
        Cost::from_residuals(residuals.as_slice())
    }
}

/// How a raw cost is reported and compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostOptions {
    /// Keep the squared norm; when false the square root is taken.
    pub use_squared_norm: bool,
    /// Halve the cost, giving the `½‖r‖²` convention.
    pub downscale_by_2: bool,
    /// Divide by the residual count.
    pub normalize: bool,
}

impl Default for CostOptions {
    fn default() -> Self {
        CostOptions {
            use_squared_norm: true,
            downscale_by_2: false,
            normalize: false,
        }
    }
}

impl CostOptions {
    pub fn apply<F: Real>(&self, mut c: Cost<F>) -> Cost<F> {
        if !self.use_squared_norm {
            c.cost = num_traits::Float::sqrt(c.cost);
        }
        if self.downscale_by_2 {
            c.cost = c.cost * F::lit(0.5);
        }
        if self.normalize && c.num_residuals > 0 {
            c.cost = c.cost / F::lit(c.num_residuals as f64);
        }
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn returns_normalise_to_cost_records() {
        assert_eq!(Cost::from(2.5), Cost::new(2.5, 1));
        assert_eq!(Cost::from((2.5, 7)), Cost::new(2.5, 7));
        assert_eq!(Cost::from(vec![1.0, 2.0]), Cost::new(5.0, 2));
        assert_eq!(Cost::from(dvector![3.0, 4.0]), Cost::new(25.0, 2));
        assert!(Cost::from(Vec::<f64>::new()).is_empty());
        assert!(Cost::from((0.0, 0)).is_empty());
    }

    #[test]
    fn options_chain_in_order() {
        let opts = CostOptions {
            use_squared_norm: false,
            downscale_by_2: true,
            normalize: true,
        };
        let c = opts.apply(Cost::new(16.0, 2));
        assert_eq!(c.cost, 1.0);
        assert_eq!(c.num_residuals, 2);
    }

    #[test]
    fn normalize_ignores_empty() {
        let opts = CostOptions {
            normalize: true,
            ..CostOptions::default()
        };
        assert_eq!(opts.apply(Cost::<f64>::empty()).cost, 0.0);
    }
}
