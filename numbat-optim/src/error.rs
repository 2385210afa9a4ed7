use thiserror::Error;

use crate::result::StopReason;

/// Conditions that stop a run before or during a build of the normal
/// equations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimError {
    #[error("parameter has zero dimensions")]
    ZeroDimensions,

    #[error("parameter reports {found} dimensions but its type declares {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("cannot allocate the normal equations for {dims} dimensions")]
    OutOfMemory { dims: usize },

    #[error("evaluator produced no residuals")]
    NoResiduals,

    #[error("cost, gradient or hessian is not finite")]
    NonFinite,

    #[error("hessian diagonal entry {index} is below the configured minimum")]
    WeakHessianDiagonal { index: usize },
}

impl From<OptimError> for StopReason {
    fn from(err: OptimError) -> Self {
        match err {
            OptimError::OutOfMemory { .. } => StopReason::OutOfMemory,
            OptimError::NonFinite => StopReason::SystemHasNaNOrInf,
            OptimError::ZeroDimensions
            | OptimError::DimensionMismatch { .. }
            | OptimError::NoResiduals
            | OptimError::WeakHessianDiagonal { .. } => StopReason::Skipped,
        }
    }
}
