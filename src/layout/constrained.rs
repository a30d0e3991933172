//! Per-item geometry variables and constraints

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::{trace, warn};

use crate::solver::{Constraint, Expression, Solver, SolverError, Strength, Variable, WeightedRelation::*};

use super::item::{ItemId, LayoutItem};
use super::types::{Point, Property, Rect, Size};

/// `width >= min` and `height >= min` (required) plus `width == natural` and
/// `height == natural` at `natural_strength`.
fn intrinsic_constraints(
    width: Variable,
    height: Variable,
    minimum: Size,
    natural: Size,
    natural_strength: Strength,
) -> Vec<Constraint> {
    vec![
        width | GE(Strength::REQUIRED) | minimum.width,
        height | GE(Strength::REQUIRED) | minimum.height,
        width | EQ(natural_strength) | natural.width,
        height | EQ(natural_strength) | natural.height,
    ]
}

/// A registered item together with its four geometry variables.
///
/// Owns two constraint lists: the intrinsic ones regenerated from the item's
/// preferred size on every rebuild, and the ones callers attached explicitly.
pub struct ConstrainedItem {
    id: ItemId,
    item: Weak<RefCell<dyn LayoutItem>>,
    left: Variable,
    top: Variable,
    width: Variable,
    height: Variable,
    intrinsic: Vec<Constraint>,
    constraints: Vec<Constraint>,
    geometry: Option<Rect>,
}

impl ConstrainedItem {
    pub(crate) fn new(id: ItemId, item: Weak<RefCell<dyn LayoutItem>>) -> Self {
        Self {
            id,
            item,
            left: Variable::new(),
            top: Variable::new(),
            width: Variable::new(),
            height: Variable::new(),
            intrinsic: Vec::new(),
            constraints: Vec::new(),
            geometry: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn left(&self) -> Variable {
        self.left
    }

    pub fn top(&self) -> Variable {
        self.top
    }

    pub fn width(&self) -> Variable {
        self.width
    }

    pub fn height(&self) -> Variable {
        self.height
    }

    pub fn right(&self) -> Expression {
        self.left + self.width
    }

    pub fn bottom(&self) -> Expression {
        self.top + self.height
    }

    pub fn center_x(&self) -> Expression {
        self.left + self.width * 0.5
    }

    pub fn center_y(&self) -> Expression {
        self.top + self.height * 0.5
    }

    pub fn property(&self, property: Property) -> Expression {
        match property {
            Property::Left => self.left.into(),
            Property::Top => self.top.into(),
            Property::Width => self.width.into(),
            Property::Height => self.height.into(),
            Property::Right => self.right(),
            Property::Bottom => self.bottom(),
            Property::CenterX => self.center_x(),
            Property::CenterY => self.center_y(),
        }
    }

    /// The four geometry variables: left, top, width, height
    pub fn variables(&self) -> [Variable; 4] {
        [self.left, self.top, self.width, self.height]
    }

    pub fn owns(&self, variable: Variable) -> bool {
        self.variables().contains(&variable)
    }

    /// Whether `constraint` references any of this item's variables
    pub fn involves(&self, constraint: &Constraint) -> bool {
        self.variables().iter().any(|v| constraint.involves(*v))
    }

    /// Whether the wrapped item is still alive
    pub fn is_alive(&self) -> bool {
        self.item.strong_count() > 0
    }

    /// `(minimum, natural)` as reported by the wrapped item, `None` if it was
    /// released or is borrowed elsewhere
    pub fn query_sizes(&self) -> Option<(Size, Size)> {
        let item = self.item.upgrade()?;
        let item = item.try_borrow().ok()?;
        Some(item.preferred_size())
    }

    /// Regenerate the intrinsic constraints from the wrapped item's sizes.
    ///
    /// A released item ends up with none. An item that cannot be borrowed right
    /// now keeps the list from the previous rebuild.
    pub fn generate_intrinsic_constraints(&mut self, natural_strength: Strength) -> &[Constraint] {
        if !self.is_alive() {
            self.intrinsic.clear();
        } else if let Some((minimum, natural)) = self.query_sizes() {
            self.set_intrinsic_sizes(minimum, natural, natural_strength);
        } else {
            warn!(item = %self.id, "item busy, keeping previous intrinsic constraints");
        }
        &self.intrinsic
    }

    fn set_intrinsic_sizes(&mut self, minimum: Size, natural: Size, natural_strength: Strength) {
        self.intrinsic = intrinsic_constraints(
            self.width,
            self.height,
            minimum,
            natural,
            natural_strength,
        );
    }

    /// Intrinsic constraints as they would be generated now, without storing them
    pub(crate) fn fresh_intrinsic_constraints(&self, natural_strength: Strength) -> Vec<Constraint> {
        match self.query_sizes() {
            Some((minimum, natural)) => intrinsic_constraints(
                self.width,
                self.height,
                minimum,
                natural,
                natural_strength,
            ),
            None => self.intrinsic.clone(),
        }
    }

    pub fn intrinsic_constraints(&self) -> &[Constraint] {
        &self.intrinsic
    }

    /// Constraints attached with [`add_constraint`](Self::add_constraint)
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Intrinsic constraints followed by attached ones
    pub fn all_constraints(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.intrinsic.iter().chain(self.constraints.iter())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        if self.constraints.contains(&constraint) {
            return Err(SolverError::DuplicateConstraint);
        }
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let index = self
            .constraints
            .iter()
            .position(|c| c == constraint)
            .ok_or(SolverError::UnknownConstraint)?;
        self.constraints.remove(index);
        Ok(())
    }

    /// Drop attached constraints matching `predicate`; returns how many went
    pub(crate) fn remove_constraints_where(&mut self, predicate: impl Fn(&Constraint) -> bool) -> usize {
        let before = self.constraints.len();
        self.constraints.retain(|c| !predicate(c));
        before - self.constraints.len()
    }

    /// Geometry pushed by the last successful [`apply`](Self::apply)
    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    /// Geometry as currently solved by `solver`
    pub fn solved_geometry(&self, solver: &Solver) -> Rect {
        Rect::new(
            solver.value_of(self.left),
            solver.value_of(self.top),
            solver.value_of(self.width),
            solver.value_of(self.height),
        )
    }

    /// Push the solved geometry onto the wrapped item. Returns whether it was
    /// delivered; released or busy items are skipped.
    pub fn apply(&mut self, solver: &Solver) -> bool {
        let rect = self.solved_geometry(solver);
        let Some(item) = self.item.upgrade() else {
            return false;
        };
        let Ok(mut item) = item.try_borrow_mut() else {
            warn!(item = %self.id, "item busy, geometry not applied");
            return false;
        };
        item.apply_geometry(rect);
        trace!(item = %self.id, %rect, "applied geometry");
        self.geometry = Some(rect);
        true
    }

    /// `self` ends at least `gap` before `other` starts
    pub fn left_of(&self, other: &ConstrainedItem, gap: f64) -> Constraint {
        self.right() + gap | LE(Strength::REQUIRED) | other.left
    }

    /// `self` starts at least `gap` after `other` ends
    pub fn right_of(&self, other: &ConstrainedItem, gap: f64) -> Constraint {
        other.left_of(self, gap)
    }

    pub fn above(&self, other: &ConstrainedItem, gap: f64) -> Constraint {
        self.bottom() + gap | LE(Strength::REQUIRED) | other.top
    }

    pub fn below(&self, other: &ConstrainedItem, gap: f64) -> Constraint {
        other.above(self, gap)
    }

    pub fn left_aligned_with(&self, other: &ConstrainedItem) -> Constraint {
        self.left | EQ(Strength::REQUIRED) | other.left
    }

    pub fn right_aligned_with(&self, other: &ConstrainedItem) -> Constraint {
        self.right() | EQ(Strength::REQUIRED) | other.right()
    }

    pub fn top_aligned_with(&self, other: &ConstrainedItem) -> Constraint {
        self.top | EQ(Strength::REQUIRED) | other.top
    }

    pub fn bottom_aligned_with(&self, other: &ConstrainedItem) -> Constraint {
        self.bottom() | EQ(Strength::REQUIRED) | other.bottom()
    }

    pub fn x_centered_on(&self, other: &ConstrainedItem) -> Constraint {
        self.center_x() | EQ(Strength::REQUIRED) | other.center_x()
    }

    pub fn y_centered_on(&self, other: &ConstrainedItem) -> Constraint {
        self.center_y() | EQ(Strength::REQUIRED) | other.center_y()
    }

    /// Both centers coincide
    pub fn centered_on(&self, other: &ConstrainedItem) -> [Constraint; 2] {
        [self.x_centered_on(other), self.y_centered_on(other)]
    }

    pub fn same_width_as(&self, other: &ConstrainedItem) -> Constraint {
        self.width | EQ(Strength::REQUIRED) | other.width
    }

    pub fn same_height_as(&self, other: &ConstrainedItem) -> Constraint {
        self.height | EQ(Strength::REQUIRED) | other.height
    }

    pub fn same_size_as(&self, other: &ConstrainedItem) -> [Constraint; 2] {
        [self.same_width_as(other), self.same_height_as(other)]
    }

    /// Pin the top-left corner
    pub fn at(&self, point: Point) -> [Constraint; 2] {
        [
            self.left | EQ(Strength::REQUIRED) | point.x,
            self.top | EQ(Strength::REQUIRED) | point.y,
        ]
    }
}

impl fmt::Debug for ConstrainedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstrainedItem")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .field("variables", &self.variables())
            .field("intrinsic", &self.intrinsic.len())
            .field("constraints", &self.constraints.len())
            .field("geometry", &self.geometry)
            .finish()
    }
}
