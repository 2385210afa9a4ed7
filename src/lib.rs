//! Forward-mode automatic differentiation and parameter types for nonlinear
//! optimization.
//!
//! - [`Jet`]: a value with `N` derivative lanes.
//! - [`Scalar`]: write residuals once as `fn r<T: Scalar>(...)` and run them on
//!   floats or jets.
//! - [`Parameter`]: how an optimizer sees and updates a value of any shape.
//! - [`jacobian`] / [`gradient`]: extract derivatives of a function of a
//!   [`Parameter`] with respect to its update.

pub mod api;
pub mod float;
pub mod jet;
pub mod param;
pub mod scalar;
mod traits;

pub use api::{evaluate, gradient, jacobian};
pub use float::Float;
pub use jet::Jet;
pub use param::{Dims, Parameter};
pub use scalar::Scalar;

/// Jet over `f64` with `N` lanes.
pub type Jet64<const N: usize> = Jet<f64, N>;
/// Jet over `f32` with `N` lanes.
pub type Jet32<const N: usize> = Jet<f32, N>;
