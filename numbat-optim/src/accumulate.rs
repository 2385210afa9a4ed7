//! Adapters that give every evaluator the same shape.
//!
//! Solvers only ever call [`Accumulator::accumulate`]: evaluate the cost at
//! `x` and, when [`Derivatives`] are passed, add the gradient and the
//! Gauss-Newton Hessian into the solver-owned buffers. Users pick one of the
//! wrappers below depending on what they can write:
//!
//! | wrapper | user writes | derivatives from |
//! |---|---|---|
//! | [`Manual`] | `FnMut(&X, Option<Derivatives>) -> cost` | the user |
//! | [`AutoDiff`] | a [`ResidualFunction`] | forward-mode jets |
//! | [`AutoDiffCost`] | a [`CostFunction`] | forward-mode jets |
//! | [`NumDiff`] | `FnMut(&X) -> Vec<F>` | finite differences |

use nalgebra::{DMatrix, DVector};
use numbat::{Jet, Parameter, Scalar};

use crate::cost::Cost;
use crate::linalg::Real;
use crate::numdiff::{self, NumDiffConfig};

/// Solver-owned buffers an evaluator adds its derivatives into.
///
/// Both buffers are zeroed before each build. Only the upper triangle of
/// `hessian` needs to be written unless the solver was configured with a
/// full Hessian; the lower triangle is mirrored from it afterwards.
/// `hessian` is `None` for first-order solvers.
#[derive(Debug)]
pub struct Derivatives<'a, F> {
    pub gradient: &'a mut DVector<F>,
    pub hessian: Option<&'a mut DMatrix<F>>,
}

impl<'a, F: Real> Derivatives<'a, F> {
    pub fn new(gradient: &'a mut DVector<F>, hessian: Option<&'a mut DMatrix<F>>) -> Self {
        Derivatives { gradient, hessian }
    }

    /// Shorter-lived copy, for handing the buffers to a helper.
    pub fn reborrow(&mut self) -> Derivatives<'_, F> {
        Derivatives {
            gradient: &mut *self.gradient,
            hessian: self.hessian.as_deref_mut(),
        }
    }

    /// Whether a Hessian is being accumulated.
    pub fn wants_hessian(&self) -> bool {
        self.hessian.is_some()
    }

    /// Add one block of residuals: `g += Jᵗr` and `H += JᵗJ`.
    ///
    /// `jacobian` is `residuals.len() × dims`. Writes the full `JᵗJ`.
    pub fn add_jacobian(&mut self, residuals: &[F], jacobian: &DMatrix<F>) {
        let r = DVector::from_column_slice(residuals);
        self.gradient.gemv_tr(F::one(), jacobian, &r, F::one());
        if let Some(h) = self.hessian.as_deref_mut() {
            h.gemm_tr(F::one(), jacobian, jacobian, F::one());
        }
    }
}

/// Uniform evaluator interface used by the solvers.
pub trait Accumulator<X: Parameter> {
    /// Cost at `x`. With `derivatives`, also add the gradient (and the
    /// Hessian when requested) at `x` into the buffers.
    fn accumulate(
        &mut self,
        x: &X,
        derivatives: Option<Derivatives<'_, X::Scalar>>,
    ) -> Cost<X::Scalar>;
}

/// Residuals written once for floats and jets.
///
/// ```
/// use numbat::Scalar;
/// use numbat_optim::ResidualFunction;
///
/// struct Line { points: Vec<(f64, f64)> }
///
/// impl ResidualFunction<[f64; 2]> for Line {
///     fn residuals<T: Scalar<Float = f64>>(&self, ab: &[T; 2]) -> Vec<T> {
///         self.points
///             .iter()
///             .map(|&(x, y)| ab[0] * T::from_f(x) + ab[1] - T::from_f(y))
///             .collect()
///     }
/// }
/// ```
pub trait ResidualFunction<X: Parameter> {
    fn residuals<T: Scalar<Float = X::Scalar>>(&self, x: &X::Cast<T>) -> Vec<T>;
}

/// A single scalar residual written once for floats and jets.
pub trait CostFunction<X: Parameter> {
    fn cost<T: Scalar<Float = X::Scalar>>(&self, x: &X::Cast<T>) -> T;
}

impl<X: Parameter, E: ResidualFunction<X> + ?Sized> ResidualFunction<X> for &E {
    fn residuals<T: Scalar<Float = X::Scalar>>(&self, x: &X::Cast<T>) -> Vec<T> {
        (**self).residuals::<T>(x)
    }
}

impl<X: Parameter, E: CostFunction<X> + ?Sized> CostFunction<X> for &E {
    fn cost<T: Scalar<Float = X::Scalar>>(&self, x: &X::Cast<T>) -> T {
        (**self).cost::<T>(x)
    }
}

/// Evaluator that fills derivatives itself.
///
/// The closure returns anything convertible into a [`Cost`]: a bare
/// scalar, a `(cost, count)` pair, or a residual vector.
pub struct Manual<Func>(pub Func);

impl<Func> Manual<Func> {
    pub fn new(f: Func) -> Self {
        Manual(f)
    }
}

impl<X, C, Func> Accumulator<X> for Manual<Func>
where
    X: Parameter,
    Func: FnMut(&X, Option<Derivatives<'_, X::Scalar>>) -> C,
    C: Into<Cost<X::Scalar>>,
{
    fn accumulate(
        &mut self,
        x: &X,
        derivatives: Option<Derivatives<'_, X::Scalar>>,
    ) -> Cost<X::Scalar> {
        (self.0)(x, derivatives).into()
    }
}

/// Residual evaluator differentiated with `L`-lane jets.
///
/// With `L >= dims` each build evaluates the residuals once; otherwise once
/// per chunk of `L` parameters. The default of 8 lanes does not follow
/// `X::DIMS`: a static 20-dimensional parameter takes three passes per
/// build unless it is wrapped with `AutoDiff::<_, 20>::with_lanes`.
pub struct AutoDiff<E, const L: usize = 8> {
    function: E,
}

impl<E> AutoDiff<E> {
    pub fn new(function: E) -> Self {
        AutoDiff { function }
    }
}

impl<E, const L: usize> AutoDiff<E, L> {
    /// Same as [`AutoDiff::new`] with an explicit lane count. Pick
    /// `L = dims` for static parameters to get one pass per build.
    pub fn with_lanes(function: E) -> Self {
        AutoDiff { function }
    }

    pub fn function(&self) -> &E {
        &self.function
    }
}

impl<X, E, const L: usize> Accumulator<X> for AutoDiff<E, L>
where
    X: Parameter,
    X::Scalar: Real,
    E: ResidualFunction<X>,
{
    fn accumulate(
        &mut self,
        x: &X,
        derivatives: Option<Derivatives<'_, X::Scalar>>,
    ) -> Cost<X::Scalar> {
        match derivatives {
            None => {
                let r = self.function.residuals::<X::Scalar>(&x.cast::<X::Scalar>());
                Cost::from_residuals(&r)
            }
            Some(mut d) => {
                let function = &self.function;
                let (r, jac) = numbat::jacobian::<X, _, L>(x, |v| {
                    function.residuals::<Jet<X::Scalar, L>>(v)
                });
                d.add_jacobian(&r, &jac);
                Cost::from_residuals(&r)
            }
        }
    }
}

/// Scalar evaluator differentiated with `L`-lane jets.
///
/// The scalar is treated as one residual `r`: the cost is `r²`, the
/// gradient `Jᵗr` and the Hessian `JᵗJ`. Lanes work as for [`AutoDiff`].
pub struct AutoDiffCost<E, const L: usize = 8> {
    function: E,
}

impl<E> AutoDiffCost<E> {
    pub fn new(function: E) -> Self {
        AutoDiffCost { function }
    }
}

impl<E, const L: usize> AutoDiffCost<E, L> {
    /// Same as [`AutoDiffCost::new`] with an explicit lane count.
    pub fn with_lanes(function: E) -> Self {
        AutoDiffCost { function }
    }
}

impl<X, E, const L: usize> Accumulator<X> for AutoDiffCost<E, L>
where
    X: Parameter,
    X::Scalar: Real,
    E: CostFunction<X>,
{
    fn accumulate(
        &mut self,
        x: &X,
        derivatives: Option<Derivatives<'_, X::Scalar>>,
    ) -> Cost<X::Scalar> {
        match derivatives {
            None => {
                let r = self.function.cost::<X::Scalar>(&x.cast::<X::Scalar>());
                Cost::from_residuals(&[r])
            }
            Some(mut d) => {
                let function = &self.function;
                let (r, jac) = numbat::jacobian::<X, _, L>(x, |v| {
                    vec![function.cost::<Jet<X::Scalar, L>>(v)]
                });
                d.add_jacobian(&r, &jac);
                Cost::from_residuals(&r)
            }
        }
    }
}

/// Residual evaluator differentiated numerically.
pub struct NumDiff<Func, F> {
    function: Func,
    config: NumDiffConfig<F>,
}

impl<Func, F: Real> NumDiff<Func, F> {
    pub fn new(function: Func) -> Self
    where
        NumDiffConfig<F>: Default,
    {
        NumDiff {
            function,
            config: NumDiffConfig::default(),
        }
    }

    pub fn with_config(function: Func, config: NumDiffConfig<F>) -> Self {
        NumDiff { function, config }
    }
}

impl<X, Func> Accumulator<X> for NumDiff<Func, X::Scalar>
where
    X: Parameter,
    X::Scalar: Real,
    Func: FnMut(&X) -> Vec<X::Scalar>,
{
    fn accumulate(
        &mut self,
        x: &X,
        derivatives: Option<Derivatives<'_, X::Scalar>>,
    ) -> Cost<X::Scalar> {
        match derivatives {
            None => Cost::from_residuals(&(self.function)(x)),
            Some(mut d) => {
                let (r, jac) = numdiff::jacobian(x, &mut self.function, &self.config);
                d.add_jacobian(&r, &jac);
                Cost::from_residuals(&r)
            }
        }
    }
}
