pub mod accumulate;
pub mod check;
pub mod convergence;
pub mod cost;
pub mod error;
pub mod linalg;
pub mod log;
pub mod numdiff;
pub mod optimizer;
pub mod result;
pub mod solvers;

pub use accumulate::{
    Accumulator, AutoDiff, AutoDiffCost, CostFunction, Derivatives, Manual, NumDiff,
    ResidualFunction,
};
pub use check::{check_gradient, check_residuals_gradient, CheckParams};
pub use convergence::ConvergenceParams;
pub use cost::{Cost, CostOptions};
pub use error::OptimError;
pub use linalg::{LinearSolver, Real};
pub use log::{LogOptions, LogSink};
pub use numdiff::{Method, NumDiffConfig};
pub use optimizer::{Optimizer, OptimizerConfig};
pub use result::{Output, StopReason};
pub use solvers::gd::{gradient_descent, GradientDescent, GradientDescentConfig};
pub use solvers::gn::{gauss_newton, GaussNewton, GaussNewtonConfig};
pub use solvers::lm::{
    levenberg_marquardt, DampingParams, LevenbergMarquardt, LevenbergMarquardtConfig,
};
pub use solvers::{Solver, System, SystemOptions};
