//! Incremental linear constraint solver
//!
//! Variables, linear expressions and prioritized constraints, resolved by an
//! incremental Cassowary simplex that keeps its basis between calls.

mod constraint;
mod error;
mod expression;
mod row;
mod simplex;
mod strength;
mod variable;

pub use constraint::{Constraint, ConstraintId, PartialConstraint, RelationalOperator, WeightedRelation};
pub use error::SolverError;
pub use expression::{Expression, Term};
pub use simplex::Solver;
pub use strength::{Strength, StrengthLevel};
pub use variable::Variable;
