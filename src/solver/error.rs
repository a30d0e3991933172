//! Solver error taxonomy

use thiserror::Error;

/// Errors reported by the [`Solver`](super::Solver).
///
/// Every failure leaves the solver as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("constraint is already present")]
    DuplicateConstraint,

    #[error("constraint is not present")]
    UnknownConstraint,

    #[error("required constraint cannot be satisfied together with the existing required constraints")]
    UnsatisfiableConstraint,

    #[error("variable is already registered as an edit variable")]
    DuplicateEditVariable,

    #[error("variable is not registered as an edit variable")]
    UnknownEditVariable,

    #[error("edit variables cannot have required strength")]
    BadRequiredStrength,

    #[error("value is not a finite number")]
    NonFiniteValue,

    #[error("internal solver error: {0}")]
    Internal(String),
}

impl SolverError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
