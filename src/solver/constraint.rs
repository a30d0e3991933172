//! Constraints and the `lhs | OP(strength) | rhs` builder

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitOr;
use std::sync::atomic::{AtomicU64, Ordering};

use super::expression::{Expression, Term};
use super::strength::Strength;
use super::variable::Variable;

static NEXT_CONSTRAINT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationalOperator {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::GreaterOrEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Stable identity of a constraint, shared by all of its clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

/// `expression OP 0` at a given strength.
///
/// Equality is identity: clones of one constraint are equal, two constraints
/// built separately from the same expression are not.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConstraintId,
    expression: Expression,
    operator: RelationalOperator,
    strength: Strength,
}

impl Constraint {
    pub fn new(expression: Expression, operator: RelationalOperator, strength: Strength) -> Self {
        Self {
            id: ConstraintId(NEXT_CONSTRAINT_ID.fetch_add(1, Ordering::Relaxed)),
            expression,
            operator,
            strength,
        }
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn operator(&self) -> RelationalOperator {
        self.operator
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    /// A new constraint with the same relation at another strength
    pub fn with_strength(&self, strength: Strength) -> Constraint {
        Constraint::new(self.expression.clone(), self.operator, strength)
    }

    pub fn involves(&self, variable: Variable) -> bool {
        self.expression.involves(variable)
    }

    /// Whether the relation holds for the given values, within `tolerance`
    pub fn is_satisfied_by(&self, lookup: impl Fn(Variable) -> f64, tolerance: f64) -> bool {
        let value = self.expression.value_with(lookup);
        match self.operator {
            RelationalOperator::LessOrEqual => value <= tolerance,
            RelationalOperator::Equal => value.abs() <= tolerance,
            RelationalOperator::GreaterOrEqual => value >= -tolerance,
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Constraint {}

impl Hash for Constraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0 | {}",
            self.expression, self.operator, self.strength
        )
    }
}

/// Relation half of the `lhs | EQ(strength) | rhs` builder
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightedRelation {
    EQ(Strength),
    LE(Strength),
    GE(Strength),
}

impl WeightedRelation {
    fn split(self) -> (RelationalOperator, Strength) {
        match self {
            Self::EQ(strength) => (RelationalOperator::Equal, strength),
            Self::LE(strength) => (RelationalOperator::LessOrEqual, strength),
            Self::GE(strength) => (RelationalOperator::GreaterOrEqual, strength),
        }
    }
}

/// Left-hand side and relation, waiting for the right-hand side
#[derive(Debug, Clone)]
pub struct PartialConstraint(Expression, WeightedRelation);

impl<R: Into<Expression>> BitOr<R> for PartialConstraint {
    type Output = Constraint;
    fn bitor(self, rhs: R) -> Constraint {
        let PartialConstraint(lhs, relation) = self;
        let (operator, strength) = relation.split();
        Constraint::new(lhs - rhs.into(), operator, strength)
    }
}

impl BitOr<WeightedRelation> for Expression {
    type Output = PartialConstraint;
    fn bitor(self, rhs: WeightedRelation) -> PartialConstraint {
        PartialConstraint(self, rhs)
    }
}

impl BitOr<WeightedRelation> for Variable {
    type Output = PartialConstraint;
    fn bitor(self, rhs: WeightedRelation) -> PartialConstraint {
        PartialConstraint(self.into(), rhs)
    }
}

impl BitOr<WeightedRelation> for Term {
    type Output = PartialConstraint;
    fn bitor(self, rhs: WeightedRelation) -> PartialConstraint {
        PartialConstraint(self.into(), rhs)
    }
}

impl BitOr<WeightedRelation> for f64 {
    type Output = PartialConstraint;
    fn bitor(self, rhs: WeightedRelation) -> PartialConstraint {
        PartialConstraint(self.into(), rhs)
    }
}
