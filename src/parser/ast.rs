//! Abstract Syntax Tree for the constraint language

use crate::layout::Property;
use crate::solver::{RelationalOperator, Strength};

pub use crate::error::Span;

/// A node with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// `target.property`, where `target` is an item name or `container`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    pub target: Spanned<String>,
    pub property: Spanned<Property>,
}

/// One summand: a constant, or a property reference scaled by a coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub coefficient: f64,
    pub reference: Option<PropertyRef>,
}

impl Operand {
    pub fn constant(value: f64) -> Self {
        Self {
            coefficient: value,
            reference: None,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            coefficient: self.coefficient * factor,
            reference: self.reference,
        }
    }
}

/// Sum of operands, signs already folded into the coefficients
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    pub operands: Vec<Spanned<Operand>>,
}

impl LinearExpr {
    /// Property references in source order
    pub fn references(&self) -> impl Iterator<Item = &PropertyRef> + '_ {
        self.operands
            .iter()
            .filter_map(|operand| operand.node.reference.as_ref())
    }
}

/// `lhs OP rhs @strength`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDecl {
    pub lhs: LinearExpr,
    pub operator: RelationalOperator,
    pub rhs: LinearExpr,
    /// Required when no `@strength` suffix was given
    pub strength: Strength,
    pub span: Span,
}

impl ConstraintDecl {
    /// Property references on both sides, in source order
    pub fn references(&self) -> impl Iterator<Item = &PropertyRef> + '_ {
        self.lhs.references().chain(self.rhs.references())
    }
}
