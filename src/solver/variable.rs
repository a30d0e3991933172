//! Variable handles

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// A scalar unknown in the constraint system.
///
/// A `Variable` is only a handle: its value lives in the [`Solver`](super::Solver)
/// that last resolved it. Handles are unique within the process and ordered by
/// creation, which is what the solver uses to keep its results reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(u64);

impl Variable {
    /// Allocate a fresh variable handle
    pub fn new() -> Self {
        Self(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_distinct_and_ordered() {
        let a = Variable::new();
        let b = Variable::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_copies_share_identity() {
        let a = Variable::new();
        let copy = a;
        assert_eq!(a, copy);
        assert_eq!(a.to_string(), format!("v{}", a.id()));
    }
}
