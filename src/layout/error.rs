//! Error types for the packer

use thiserror::Error;

use crate::solver::{SolverError, Variable};

use super::item::ItemId;

/// Errors that can occur while managing or allocating a packer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),

    /// The id does not name a registered item (never registered or already removed)
    #[error("unknown item {id}")]
    UnknownItem { id: ItemId },

    /// A constraint mentions a variable owned by neither the container nor a registered item
    #[error("constraint references variable {variable} which belongs to no registered item")]
    ForeignVariable { variable: Variable },
}

impl LayoutError {
    pub fn unknown_item(id: ItemId) -> Self {
        Self::UnknownItem { id }
    }

    pub fn foreign_variable(variable: Variable) -> Self {
        Self::ForeignVariable { variable }
    }

    /// The underlying solver error, if this is one
    pub fn solver_error(&self) -> Option<&SolverError> {
        match self {
            Self::Solver(e) => Some(e),
            _ => None,
        }
    }
}
