//! Linear expressions over [`Variable`]s

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use super::variable::Variable;

/// A variable scaled by a coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub variable: Variable,
    pub coefficient: f64,
}

impl Term {
    pub fn new(variable: Variable, coefficient: f64) -> Self {
        Self {
            variable,
            coefficient,
        }
    }
}

/// An immutable linear combination of variables plus a constant.
///
/// Terms naming the same variable are merged by summing their coefficients and
/// terms whose coefficient cancels to zero are dropped. Term order follows the
/// order in which variables were first mentioned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    terms: Vec<Term>,
    constant: f64,
}

impl Expression {
    /// Build an expression, merging duplicate variables
    pub fn new(terms: impl IntoIterator<Item = Term>, constant: f64) -> Self {
        let mut merged: Vec<Term> = Vec::new();
        for term in terms {
            match merged.iter_mut().find(|t| t.variable == term.variable) {
                Some(existing) => existing.coefficient += term.coefficient,
                None => merged.push(term),
            }
        }
        merged.retain(|t| t.coefficient != 0.0);
        Self {
            terms: merged,
            constant,
        }
    }

    /// An expression with no variables
    pub fn from_constant(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Coefficient of `variable`, zero when it does not appear
    pub fn coefficient_of(&self, variable: Variable) -> f64 {
        self.terms
            .iter()
            .find(|t| t.variable == variable)
            .map_or(0.0, |t| t.coefficient)
    }

    /// Whether `variable` appears with a non-zero coefficient
    pub fn involves(&self, variable: Variable) -> bool {
        self.terms.iter().any(|t| t.variable == variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.terms.iter().map(|t| t.variable)
    }

    /// Evaluate against a value lookup
    pub fn value_with(&self, lookup: impl Fn(Variable) -> f64) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, t| acc + t.coefficient * lookup(t.variable))
    }

    fn plus(self, other: Expression) -> Expression {
        let constant = self.constant + other.constant;
        Expression::new(self.terms.into_iter().chain(other.terms), constant)
    }

    fn scaled(self, factor: f64) -> Expression {
        Expression::new(
            self.terms
                .into_iter()
                .map(|t| Term::new(t.variable, t.coefficient * factor)),
            self.constant * factor,
        )
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::new([Term::new(variable, 1.0)], 0.0)
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::new([term], 0.0)
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Expression::from_constant(constant)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            let (sign, magnitude) = if term.coefficient < 0.0 {
                ("-", -term.coefficient)
            } else {
                ("+", term.coefficient)
            };
            if first {
                if sign == "-" {
                    write!(f, "-")?;
                }
            } else {
                write!(f, " {} ", sign)?;
            }
            if magnitude == 1.0 {
                write!(f, "{}", term.variable)?;
            } else {
                write!(f, "{} * {}", magnitude, term.variable)?;
            }
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

// Operator plumbing. Every left-hand operand converts into an Expression; the
// right-hand side accepts anything that does.

impl<R: Into<Expression>> Add<R> for Expression {
    type Output = Expression;
    fn add(self, rhs: R) -> Expression {
        self.plus(rhs.into())
    }
}

impl<R: Into<Expression>> Add<R> for Variable {
    type Output = Expression;
    fn add(self, rhs: R) -> Expression {
        Expression::from(self).plus(rhs.into())
    }
}

impl<R: Into<Expression>> Add<R> for Term {
    type Output = Expression;
    fn add(self, rhs: R) -> Expression {
        Expression::from(self).plus(rhs.into())
    }
}

impl Add<Variable> for f64 {
    type Output = Expression;
    fn add(self, rhs: Variable) -> Expression {
        Expression::from(rhs) + self
    }
}

impl Add<Expression> for f64 {
    type Output = Expression;
    fn add(self, rhs: Expression) -> Expression {
        rhs + self
    }
}

impl<R: Into<Expression>> Sub<R> for Expression {
    type Output = Expression;
    fn sub(self, rhs: R) -> Expression {
        self.plus(rhs.into().scaled(-1.0))
    }
}

impl<R: Into<Expression>> Sub<R> for Variable {
    type Output = Expression;
    fn sub(self, rhs: R) -> Expression {
        Expression::from(self) - rhs
    }
}

impl<R: Into<Expression>> Sub<R> for Term {
    type Output = Expression;
    fn sub(self, rhs: R) -> Expression {
        Expression::from(self) - rhs
    }
}

impl Sub<Variable> for f64 {
    type Output = Expression;
    fn sub(self, rhs: Variable) -> Expression {
        Expression::from_constant(self) - rhs
    }
}

impl Sub<Expression> for f64 {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        Expression::from_constant(self) - rhs
    }
}

impl Mul<f64> for Variable {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = Term;
    fn mul(self, rhs: Variable) -> Term {
        Term::new(rhs, self)
    }
}

impl Mul<f64> for Term {
    type Output = Term;
    fn mul(self, rhs: f64) -> Term {
        Term::new(self.variable, self.coefficient * rhs)
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;
    fn mul(self, rhs: f64) -> Expression {
        self.scaled(rhs)
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;
    fn mul(self, rhs: Expression) -> Expression {
        rhs.scaled(self)
    }
}

impl Div<f64> for Variable {
    type Output = Term;
    fn div(self, rhs: f64) -> Term {
        Term::new(self, 1.0 / rhs)
    }
}

impl Div<f64> for Expression {
    type Output = Expression;
    fn div(self, rhs: f64) -> Expression {
        self.scaled(1.0 / rhs)
    }
}

impl Neg for Variable {
    type Output = Term;
    fn neg(self) -> Term {
        Term::new(self, -1.0)
    }
}

impl Neg for Term {
    type Output = Term;
    fn neg(self) -> Term {
        Term::new(self.variable, -self.coefficient)
    }
}

impl Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        self.scaled(-1.0)
    }
}
