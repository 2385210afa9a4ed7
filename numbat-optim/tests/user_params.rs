use approx::assert_relative_eq;
use nalgebra::Vector2;
use numbat::{Dims, Parameter, Scalar};
use numbat_optim::{
    levenberg_marquardt, AutoDiff, Derivatives, LevenbergMarquardtConfig, Manual,
    ResidualFunction,
};

/// Axis-aligned rectangle given by two corners.
#[derive(Clone, Debug)]
struct Rectangle<T> {
    p1: Vector2<T>,
    p2: Vector2<T>,
}

impl<T: Scalar> Rectangle<T> {
    fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Rectangle {
            p1: Vector2::new(x1, y1),
            p2: Vector2::new(x2, y2),
        }
    }

    fn center(&self) -> Vector2<T> {
        let half = T::lit(0.5);
        Vector2::new((self.p1[0] + self.p2[0]) * half, (self.p1[1] + self.p2[1]) * half)
    }

    fn area(&self) -> T {
        ((self.p2[0] - self.p1[0]) * (self.p2[1] - self.p1[1])).abs()
    }
}

impl Parameter for Rectangle<f64> {
    type Scalar = f64;
    const DIMS: Dims = Dims::Static(4);
    type Cast<T: Scalar<Float = f64>> = Rectangle<T>;

    fn cast<T: Scalar<Float = f64>>(&self) -> Rectangle<T> {
        Rectangle::new(
            T::from_f(self.p1[0]),
            T::from_f(self.p1[1]),
            T::from_f(self.p2[0]),
            T::from_f(self.p2[1]),
        )
    }

    fn plus_eq(&mut self, delta: &[f64]) {
        Self::plus_eq_cast(self, delta);
    }

    fn plus_eq_cast<T: Scalar<Float = f64>>(x: &mut Rectangle<T>, delta: &[T]) {
        x.p1[0] = x.p1[0] + delta[0];
        x.p1[1] = x.p1[1] + delta[1];
        x.p2[0] = x.p2[0] + delta[2];
        x.p2[1] = x.p2[1] + delta[3];
    }

    fn describe(&self) -> String {
        format!(
            "[{} {}] -> [{} {}]",
            self.p1[0], self.p1[1], self.p2[0], self.p2[1]
        )
    }
}

/// Pin the center at (2, 3) and the area at 4, and ask for a square.
struct CenteredSquare;

impl ResidualFunction<Rectangle<f64>> for CenteredSquare {
    fn residuals<T: Scalar<Float = f64>>(&self, rect: &Rectangle<T>) -> Vec<T> {
        let c = rect.center();
        vec![
            c[0] - T::lit(2.0),
            c[1] - T::lit(3.0),
            rect.area() - T::lit(4.0),
            (rect.p2[0] - rect.p1[0]) - (rect.p2[1] - rect.p1[1]),
        ]
    }
}

fn config() -> LevenbergMarquardtConfig<f64> {
    let mut config = LevenbergMarquardtConfig::default();
    config.optimizer.convergence.max_consec_failures = 10;
    config.optimizer.convergence.max_iters = 100;
    config
}

#[test]
fn rectangle_fit_with_autodiff() {
    let mut rect = Rectangle::new(0.0f64, 0.0, 1.0, 1.0);
    let out = levenberg_marquardt(&mut rect, &mut AutoDiff::new(CenteredSquare), &config());
    assert!(out.converged(), "{}", out.stop_reason);
    assert_relative_eq!(rect.p1, Vector2::new(1.0, 2.0), epsilon = 1e-5);
    assert_relative_eq!(rect.p2, Vector2::new(3.0, 4.0), epsilon = 1e-5);
}

#[test]
fn rectangle_fit_with_manual_derivatives() {
    // r = [p1 - (1, 2), p2 - (3, 4)]: J is the identity
    let mut acc = Manual::new(|rect: &Rectangle<f64>, d: Option<Derivatives<'_, f64>>| {
        let r = [
            rect.p1[0] - 1.0,
            rect.p1[1] - 2.0,
            rect.p2[0] - 3.0,
            rect.p2[1] - 4.0,
        ];
        if let Some(d) = d {
            for (i, ri) in r.iter().enumerate() {
                d.gradient[i] += *ri;
            }
            if let Some(h) = d.hessian {
                for i in 0..4 {
                    h[(i, i)] += 1.0;
                }
            }
        }
        r.to_vec()
    });
    let mut rect = Rectangle::new(0.0f64, 0.0, 1.0, 1.0);
    let out = levenberg_marquardt(&mut rect, &mut acc, &config());
    assert!(out.converged(), "{}", out.stop_reason);
    assert_relative_eq!(rect.p1, Vector2::new(1.0, 2.0), epsilon = 1e-6);
    assert_relative_eq!(rect.p2, Vector2::new(3.0, 4.0), epsilon = 1e-6);
}

#[test]
fn custom_describe_is_used() {
    let rect = Rectangle::new(0.0f64, 0.5, 1.0, 1.5);
    assert_eq!(rect.describe(), "[0 0.5] -> [1 1.5]");
    assert_eq!(rect.dims(), 4);
}
