use approx::assert_relative_eq;
use nalgebra::{DVector, Vector2};
use numbat::Scalar;
use numbat_optim::{
    gauss_newton, gradient_descent, levenberg_marquardt, AutoDiff, AutoDiffCost, CostFunction,
    Derivatives, GaussNewtonConfig, GradientDescentConfig, LevenbergMarquardtConfig, LinearSolver,
    Manual, Method, NumDiff, NumDiffConfig, ResidualFunction, StopReason,
};

// ============================================================
// Test problems
// ============================================================

/// r = x - 2
struct Shift;

impl ResidualFunction<f64> for Shift {
    fn residuals<T: Scalar<Float = f64>>(&self, x: &T) -> Vec<T> {
        vec![*x - T::lit(2.0)]
    }
}

/// r = x² - 2, minimum at √2 from a positive start.
struct SquareRootOfTwo;

impl CostFunction<f64> for SquareRootOfTwo {
    fn cost<T: Scalar<Float = f64>>(&self, x: &T) -> T {
        *x * *x - T::lit(2.0)
    }
}

/// Rosenbrock as two residuals.
struct Rosenbrock;

impl ResidualFunction<Vector2<f64>> for Rosenbrock {
    fn residuals<T: Scalar<Float = f64>>(&self, x: &Vector2<T>) -> Vec<T> {
        vec![T::lit(1.0) - x[0], T::lit(10.0) * (x[1] - x[0] * x[0])]
    }
}

/// Exponential decay `y = a·exp(-b·t)` against samples of `a = 3`, `b = 0.5`.
struct Decay {
    samples: Vec<(f64, f64)>,
}

impl Decay {
    fn new() -> Self {
        let samples = (0..20)
            .map(|i| {
                let t = i as f64 * 0.25;
                (t, 3.0 * (-0.5 * t).exp())
            })
            .collect();
        Decay { samples }
    }
}

impl ResidualFunction<DVector<f64>> for Decay {
    fn residuals<T: Scalar<Float = f64>>(&self, p: &DVector<T>) -> Vec<T> {
        self.samples
            .iter()
            .map(|&(t, y)| p[0] * (-p[1] * T::from_f(t)).exp() - T::from_f(y))
            .collect()
    }
}

// ============================================================
// (x - 2)² from 1
// ============================================================

#[test]
fn lm_minimizes_shifted_square() {
    let mut x = 1.0f64;
    let config = LevenbergMarquardtConfig::default();
    let out = levenberg_marquardt(&mut x, &mut AutoDiff::new(Shift), &config);
    assert!(out.converged(), "{}", out.stop_reason);
    assert!((x - 2.0).abs() < 1e-5);
    assert!(out.num_iters >= 1 && out.num_iters <= 5);
}

#[test]
fn gn_minimizes_shifted_square() {
    let mut x = 1.0f64;
    let out = gauss_newton(&mut x, &mut AutoDiff::new(Shift), &GaussNewtonConfig::default());
    assert!(out.converged(), "{}", out.stop_reason);
    assert_eq!(out.stop_reason, StopReason::MinGradNorm);
    assert!((x - 2.0).abs() < 1e-5);
}

#[test]
fn gd_minimizes_shifted_square() {
    let mut x = 1.0f64;
    let config = GradientDescentConfig::default();
    let out = gradient_descent(&mut x, &mut AutoDiff::new(Shift), &config);
    assert!(out.converged(), "{}", out.stop_reason);
    assert!((x - 2.0).abs() < 1e-5);
    assert!(out.last_hessian.is_none());
}

#[test]
fn gd_backs_off_when_overshooting() {
    let mut config = GradientDescentConfig::default();
    config.lr = 4.0;
    config.optimizer.convergence.max_consec_failures = 10;
    config.optimizer.convergence.max_iters = 500;
    let mut x = 1.0f64;
    let out = gradient_descent(&mut x, &mut AutoDiff::new(Shift), &config);
    assert!(out.succeeded());
    assert!(out.successes.iter().any(|s| !s));
    assert!((x - 2.0).abs() < 1e-5);
}

// ============================================================
// sqrt(2)
// ============================================================

#[test]
fn square_root_of_two_manual() {
    let mut acc = Manual::new(|x: &f64, d: Option<Derivatives<'_, f64>>| {
        let r = x * x - 2.0;
        if let Some(d) = d {
            let j = 2.0 * x;
            d.gradient[0] += j * r;
            if let Some(h) = d.hessian {
                h[(0, 0)] += j * j;
            }
        }
        vec![r]
    });
    let mut x = 1.0f64;
    let out = levenberg_marquardt(&mut x, &mut acc, &LevenbergMarquardtConfig::default());
    assert!(out.converged());
    assert_relative_eq!(x, 2f64.sqrt(), epsilon = 1e-6);
}

#[test]
fn square_root_of_two_autodiff() {
    let mut x = 1.0f64;
    let out = levenberg_marquardt(
        &mut x,
        &mut AutoDiffCost::new(SquareRootOfTwo),
        &LevenbergMarquardtConfig::default(),
    );
    assert!(out.converged());
    assert_relative_eq!(x, 2f64.sqrt(), epsilon = 1e-6);
}

#[test]
fn square_root_of_two_in_f32() {
    let mut acc = Manual::new(|x: &f32, d: Option<Derivatives<'_, f32>>| {
        let r = x * x - 2.0;
        if let Some(d) = d {
            d.gradient[0] += 2.0 * x * r;
            if let Some(h) = d.hessian {
                h[(0, 0)] += 4.0 * x * x;
            }
        }
        vec![r]
    });
    let mut x = 1.0f32;
    let out = levenberg_marquardt(&mut x, &mut acc, &LevenbergMarquardtConfig::default());
    assert!(out.succeeded());
    assert_relative_eq!(x, 2f32.sqrt(), epsilon = 1e-5);
}

// ============================================================
// Multi-dimensional problems
// ============================================================

#[test]
fn lm_solves_rosenbrock() {
    let mut x = Vector2::new(-1.2f64, 1.0);
    // JᵗJ entries are in the hundreds here, far above the default λ
    let mut config = LevenbergMarquardtConfig::default();
    config.damping.damping_init = 1.0;
    config.optimizer.convergence.max_consec_failures = 0;
    config.optimizer.convergence.max_iters = 500;
    let out = levenberg_marquardt(&mut x, &mut AutoDiff::new(Rosenbrock), &config);
    assert!(out.converged(), "{}", out.stop_reason);
    assert_relative_eq!(x, Vector2::new(1.0, 1.0), epsilon = 1e-5);
}

#[test]
fn numeric_and_automatic_derivatives_fit_the_same_curve() {
    let decay = Decay::new();
    let mut config = LevenbergMarquardtConfig::default();
    config.optimizer.convergence.max_consec_failures = 20;
    config.optimizer.convergence.max_iters = 200;

    let mut x_ad = DVector::from_vec(vec![1.0f64, 1.0]);
    let out_ad = levenberg_marquardt(&mut x_ad, &mut AutoDiff::new(Decay::new()), &config);

    for method in [Method::Forward, Method::Central, Method::FastCentral] {
        let mut x_nd = DVector::from_vec(vec![1.0f64, 1.0]);
        let mut acc = NumDiff::with_config(
            |p: &DVector<f64>| decay.residuals::<f64>(p),
            NumDiffConfig { method, step: None },
        );
        let out_nd = levenberg_marquardt(&mut x_nd, &mut acc, &config);
        assert!(out_nd.succeeded(), "{method:?}: {}", out_nd.stop_reason);
        assert_relative_eq!(x_nd, x_ad, epsilon = 1e-5);
    }

    assert!(out_ad.converged());
    assert_relative_eq!(x_ad[0], 3.0, epsilon = 1e-6);
    assert_relative_eq!(x_ad[1], 0.5, epsilon = 1e-6);
}

#[test]
fn lanes_do_not_change_the_result() {
    let config = LevenbergMarquardtConfig::default();
    let mut wide = DVector::from_vec(vec![1.0f64, 1.0]);
    let mut narrow = wide.clone();
    levenberg_marquardt(&mut wide, &mut AutoDiff::<_, 8>::with_lanes(Decay::new()), &config);
    levenberg_marquardt(&mut narrow, &mut AutoDiff::<_, 1>::with_lanes(Decay::new()), &config);
    assert_eq!(wide, narrow);
}

// ============================================================
// Rank-deficient systems
// ============================================================

/// r = x0 + x1 - 1: JᵗJ is singular.
fn sum_to_one(x: &[f64; 2], d: Option<Derivatives<'_, f64>>) -> Vec<f64> {
    let r = x[0] + x[1] - 1.0;
    if let Some(d) = d {
        d.gradient[0] += r;
        d.gradient[1] += r;
        if let Some(h) = d.hessian {
            h.fill(1.0);
        }
    }
    vec![r]
}

#[test]
fn singular_system_fails_gn_but_not_lm() {
    let mut x = [0.0f64, 0.0];
    let out = gauss_newton(&mut x, &mut Manual::new(sum_to_one), &GaussNewtonConfig::default());
    assert_eq!(out.stop_reason, StopReason::SolverFailed);
    assert!(!out.succeeded());

    let mut x = [0.0f64, 0.0];
    let config = LevenbergMarquardtConfig::default();
    let out = levenberg_marquardt(&mut x, &mut Manual::new(sum_to_one), &config);
    assert!(out.succeeded(), "{}", out.stop_reason);
    assert_relative_eq!(x[0] + x[1], 1.0, epsilon = 1e-6);
}

#[test]
fn inverse_solver_handles_indefinite_hessians() {
    // H = -1 is rejected by Cholesky but inverted by LU; the step then goes
    // uphill and is rolled back.
    let mut acc = Manual::new(|x: &f64, d: Option<Derivatives<'_, f64>>| {
        let r = x - 2.0;
        if let Some(d) = d {
            d.gradient[0] = r;
            if let Some(h) = d.hessian {
                h[(0, 0)] = -1.0;
            }
        }
        vec![r]
    });

    let mut x = 1.0f64;
    let out = gauss_newton(&mut x, &mut acc, &GaussNewtonConfig::default());
    assert_eq!(out.stop_reason, StopReason::SolverFailed);

    let mut config = GaussNewtonConfig::default();
    config.system.linear_solver = LinearSolver::Inverse;
    let mut x = 1.0f64;
    let out = gauss_newton(&mut x, &mut acc, &config);
    assert_eq!(out.stop_reason, StopReason::MaxConsecFails);
    assert_eq!(x, 1.0);
}
