use nalgebra::{DMatrix, DVector};
use num_traits::Zero;

use crate::jet::Jet;
use crate::param::Parameter;

/// Value and Jacobian of a vector function of a parameter, in forward mode.
///
/// `f` is written against the parameter cast to [`Jet`] scalars. Column `j`
/// of the returned Jacobian is the derivative with respect to entry `j` of
/// the update `δ` in `x ⊞ δ`, evaluated at `δ = 0`; for Euclidean parameters
/// that is plain `∂f/∂x_j`.
///
/// The input dimension comes from `x.dims()`, so dynamically sized
/// parameters work unchanged. With `L >= x.dims()` one call to `f` yields
/// both value and Jacobian; otherwise `f` runs once per chunk of `L`
/// columns.
///
/// ```
/// use numbat::{jacobian, Jet};
///
/// let x = [3.0f64, 4.0];
/// let (r, j) = jacobian::<_, _, 2>(&x, |v: &[Jet<f64, 2>; 2]| vec![v[0] * v[1], v[0] + v[1]]);
/// assert_eq!(r, vec![12.0, 7.0]);
/// assert_eq!(j[(0, 0)], 4.0);
/// assert_eq!(j[(0, 1)], 3.0);
/// assert_eq!(j[(1, 1)], 1.0);
/// ```
pub fn jacobian<X, E, const L: usize>(
    x: &X,
    mut f: E,
) -> (Vec<X::Scalar>, DMatrix<X::Scalar>)
where
    X: Parameter,
    E: FnMut(&X::Cast<Jet<X::Scalar, L>>) -> Vec<Jet<X::Scalar, L>>,
{
    const { assert!(L > 0, "jets need at least one derivative lane") };

    let n = x.dims();
    let zero = <X::Scalar as Zero>::zero();

    if n == 0 {
        let outputs = f(&x.cast::<Jet<X::Scalar, L>>());
        let values: Vec<X::Scalar> = outputs.iter().map(|r| r.re).collect();
        let rows = values.len();
        return (values, DMatrix::zeros(rows, 0));
    }

    let mut values = Vec::new();
    let mut jac = DMatrix::zeros(0, n);
    let mut delta = vec![Jet::constant(zero); n];

    for start in (0..n).step_by(L) {
        let width = L.min(n - start);
        for (i, d) in delta.iter_mut().enumerate() {
            *d = Jet::variable(zero, i.wrapping_sub(start));
        }

        let mut seeded = x.cast::<Jet<X::Scalar, L>>();
        X::plus_eq_cast(&mut seeded, &delta);
        let outputs = f(&seeded);

        if start == 0 {
            values = outputs.iter().map(|r| r.re).collect();
            jac = DMatrix::zeros(values.len(), n);
        }
        debug_assert_eq!(outputs.len(), values.len(), "output count changed between passes");

        for (row, r) in outputs.iter().enumerate().take(jac.nrows()) {
            for lane in 0..width {
                jac[(row, start + lane)] = r.eps[lane];
            }
        }
    }

    (values, jac)
}

/// Value and gradient of a scalar function of a parameter, in forward mode.
///
/// Same seeding rules as [`jacobian`].
pub fn gradient<X, E, const L: usize>(x: &X, mut f: E) -> (X::Scalar, DVector<X::Scalar>)
where
    X: Parameter,
    E: FnMut(&X::Cast<Jet<X::Scalar, L>>) -> Jet<X::Scalar, L>,
{
    let (values, jac) = jacobian::<X, _, L>(x, |v| vec![f(v)]);
    let value = values.first().copied().unwrap_or_else(<X::Scalar as Zero>::zero);
    (value, jac.row(0).transpose())
}

/// Evaluate a vector function of a parameter at a plain float value.
pub fn evaluate<X, E, Out>(x: &X, f: E) -> Out
where
    X: Parameter,
    E: FnOnce(&X::Cast<X::Scalar>) -> Out,
{
    f(&x.cast::<X::Scalar>())
}
