//! Constraint packer: lays out a dynamic set of items by solving linear
//! constraints over their geometry.
//!
//! The packer keeps its solver between allocations. Membership and constraint
//! changes only mark it dirty; the next [`Packer::allocate`] rebuilds the
//! constraint set once and then re-solves incrementally for the new size.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::solver::{
    Constraint, Expression, Solver, SolverError, Strength, Variable, WeightedRelation::*,
};

use super::config::PackerConfig;
use super::constrained::ConstrainedItem;
use super::error::LayoutError;
use super::item::{ChangeNotifier, ItemId, LayoutItem, NotificationQueue};
use super::types::{Property, Rect, Size};

/// Container that sizes and positions its registered items
#[derive(Debug)]
pub struct Packer {
    config: PackerConfig,
    solver: Solver,
    width: Variable,
    height: Variable,
    items: BTreeMap<ItemId, ConstrainedItem>,
    constraints: Vec<Constraint>,
    dirty: bool,
    notifications: NotificationQueue,
    next_item: u64,
    allocation: Option<Size>,
}

impl Default for Packer {
    fn default() -> Self {
        Self::with_config(PackerConfig::default())
    }
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PackerConfig) -> Self {
        Self {
            config,
            solver: Solver::new(),
            width: Variable::new(),
            height: Variable::new(),
            items: BTreeMap::new(),
            constraints: Vec::new(),
            dirty: true,
            notifications: NotificationQueue::default(),
            next_item: 0,
            allocation: None,
        }
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Container width edit variable
    pub fn width(&self) -> Variable {
        self.width
    }

    /// Container height edit variable
    pub fn height(&self) -> Variable {
        self.height
    }

    /// A property of the container itself. Its origin is fixed at zero.
    pub fn property(&self, property: Property) -> Expression {
        match property {
            Property::Left | Property::Top => Expression::from_constant(0.0),
            Property::Width | Property::Right => self.width.into(),
            Property::Height | Property::Bottom => self.height.into(),
            Property::CenterX => Expression::from(self.width * 0.5),
            Property::CenterY => Expression::from(self.height * 0.5),
        }
    }

    /// Register an item and hand it a [`ChangeNotifier`].
    ///
    /// The packer only keeps a weak reference; dropping the last `Rc` releases
    /// the item and it is pruned on the next allocation.
    pub fn register_item<I: LayoutItem + 'static>(&mut self, item: &Rc<RefCell<I>>) -> ItemId {
        self.next_item += 1;
        let id = ItemId::from_raw(self.next_item);
        let shared: Rc<RefCell<dyn LayoutItem>> = item.clone();
        self.items
            .insert(id, ConstrainedItem::new(id, Rc::downgrade(&shared)));

        let notifier = ChangeNotifier::new(id, &self.notifications);
        match item.try_borrow_mut() {
            Ok(mut item) => item.attached(id, notifier),
            Err(_) => warn!(item = %id, "item busy, not attached to a change notifier"),
        }

        debug!(item = %id, "registered item");
        self.dirty = true;
        id
    }

    /// Remove an item and every constraint, anywhere, that references it
    pub fn unregister_item(&mut self, id: ItemId) -> Result<(), LayoutError> {
        self.remove_item(id)
            .map(|_| ())
            .ok_or_else(|| LayoutError::unknown_item(id))
    }

    fn remove_item(&mut self, id: ItemId) -> Option<ConstrainedItem> {
        let removed = self.items.remove(&id)?;
        let involves = |c: &Constraint| removed.involves(c);

        let before = self.constraints.len();
        self.constraints.retain(|c| !involves(c));
        let mut dropped = before - self.constraints.len();
        for item in self.items.values_mut() {
            dropped += item.remove_constraints_where(&involves);
        }

        debug!(item = %id, dependent_constraints = dropped, "unregistered item");
        self.dirty = true;
        Some(removed)
    }

    /// Add a container-level constraint
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), LayoutError> {
        self.check_variables(&constraint)?;
        if self.constraints.contains(&constraint) {
            return Err(LayoutError::from(SolverError::DuplicateConstraint));
        }
        self.constraints.push(constraint);
        self.dirty = true;
        Ok(())
    }

    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), LayoutError> {
        let index = self
            .constraints
            .iter()
            .position(|c| c == constraint)
            .ok_or(SolverError::UnknownConstraint)?;
        self.constraints.remove(index);
        self.dirty = true;
        Ok(())
    }

    /// Container-level constraints in insertion order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Attach a constraint to an item so it is torn down with it
    pub fn add_item_constraint(
        &mut self,
        id: ItemId,
        constraint: Constraint,
    ) -> Result<(), LayoutError> {
        self.check_variables(&constraint)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| LayoutError::unknown_item(id))?;
        item.add_constraint(constraint)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_item_constraint(
        &mut self,
        id: ItemId,
        constraint: &Constraint,
    ) -> Result<(), LayoutError> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| LayoutError::unknown_item(id))?;
        item.remove_constraint(constraint)?;
        self.dirty = true;
        Ok(())
    }

    /// Note that an item's preferred size may have changed
    pub fn child_changed(&mut self, id: ItemId) -> Result<(), LayoutError> {
        if !self.items.contains_key(&id) {
            return Err(LayoutError::unknown_item(id));
        }
        trace!(item = %id, "child changed");
        self.dirty = true;
        Ok(())
    }

    /// Lay the items out in a container of `size` and push the geometry to them.
    ///
    /// A size with a NaN or infinite dimension is rejected with
    /// [`SolverError::NonFiniteValue`] before anything changes. If the
    /// constraint set has to be rebuilt and the rebuild fails, the error is
    /// returned, the solver keeps its previous state and no item receives new
    /// geometry.
    pub fn allocate(&mut self, size: Size) -> Result<(), LayoutError> {
        if !size.width.is_finite() || !size.height.is_finite() {
            return Err(SolverError::NonFiniteValue.into());
        }
        self.drain_notifications();
        self.prune_released();

        if self.dirty {
            self.rebuild()?;
        }

        self.solver.suggest_value(self.width, size.width)?;
        self.solver.suggest_value(self.height, size.height)?;
        self.solver.update_variables()?;
        self.allocation = Some(size);

        let mut applied = 0;
        for item in self.items.values_mut() {
            if item.apply(&self.solver) {
                applied += 1;
            }
        }
        debug!(
            width = size.width,
            height = size.height,
            items = self.items.len(),
            applied,
            pivots = self.solver.pivot_count(),
            "allocated"
        );
        Ok(())
    }

    /// `(minimum, natural)` size of the container as implied by its constraints.
    ///
    /// Solved on a scratch solver: the live solver, the dirty flag and every
    /// item's geometry are left as they were.
    pub fn preferred_size(&self) -> Result<(Size, Size), LayoutError> {
        let mut scratch = Solver::new();
        for item in self.items.values().filter(|item| item.is_alive()) {
            for constraint in item.fresh_intrinsic_constraints(self.config.natural_strength) {
                scratch.add_constraint_or_discard(constraint)?;
            }
            for constraint in item.constraints() {
                scratch.add_constraint_or_discard(constraint.clone())?;
            }
        }
        for constraint in &self.constraints {
            scratch.add_constraint_or_discard(constraint.clone())?;
        }

        let minimum = self.solve_container_size(scratch.clone(), Strength::STRONG)?;
        let natural = self.solve_container_size(scratch, Strength::WEAK)?;
        trace!(?minimum, ?natural, "preferred size");
        Ok((minimum, natural))
    }

    fn solve_container_size(
        &self,
        mut solver: Solver,
        strength: Strength,
    ) -> Result<Size, LayoutError> {
        solver.add_constraint_or_discard(self.width | EQ(strength) | 0.0)?;
        solver.add_constraint_or_discard(self.height | EQ(strength) | 0.0)?;
        solver.update_variables()?;
        Ok(Size::new(solver.value_of(self.width), solver.value_of(self.height)).clamped())
    }

    pub fn item(&self, id: ItemId) -> Option<&ConstrainedItem> {
        self.items.get(&id)
    }

    /// Registered items in registration order
    pub fn items(&self) -> impl Iterator<Item = &ConstrainedItem> + '_ {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Geometry last applied to the item
    pub fn geometry_of(&self, id: ItemId) -> Option<Rect> {
        self.items.get(&id).and_then(ConstrainedItem::geometry)
    }

    /// Size passed to the last successful allocation
    pub fn allocation(&self) -> Option<Size> {
        self.allocation
    }

    /// Whether the next [`allocate`](Self::allocate) rebuilds the constraint
    /// set, counting change notifications still in the queue and items
    /// released since the last pass
    pub fn is_dirty(&self) -> bool {
        self.dirty
            || self
                .notifications
                .borrow()
                .iter()
                .any(|id| self.items.contains_key(id))
            || self.items.values().any(|item| !item.is_alive())
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    fn check_variables(&self, constraint: &Constraint) -> Result<(), LayoutError> {
        for variable in constraint.expression().variables() {
            let known = variable == self.width
                || variable == self.height
                || self.items.values().any(|item| item.owns(variable));
            if !known {
                return Err(LayoutError::foreign_variable(variable));
            }
        }
        Ok(())
    }

    fn drain_notifications(&mut self) {
        let pending: Vec<ItemId> = self.notifications.borrow_mut().drain(..).collect();
        for id in pending {
            if self.items.contains_key(&id) {
                trace!(item = %id, "change notification");
                self.dirty = true;
            }
        }
    }

    fn prune_released(&mut self) {
        let released: Vec<ItemId> = self
            .items
            .values()
            .filter(|item| !item.is_alive())
            .map(ConstrainedItem::id)
            .collect();
        for id in released {
            warn!(item = %id, "item was released without being unregistered");
            self.remove_item(id);
        }
    }

    fn rebuild(&mut self) -> Result<(), LayoutError> {
        match self.populate() {
            Ok(solver) => {
                self.solver = solver;
                self.dirty = false;
                debug!(
                    constraints = self.solver.constraint_count(),
                    items = self.items.len(),
                    "rebuilt constraint set"
                );
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "rebuild failed, previous solver kept");
                Err(e)
            }
        }
    }

    /// Build a solver for the current constraint set. A failed build is
    /// dropped whole, so constraints go in without per-add rollback.
    fn populate(&mut self) -> Result<Solver, LayoutError> {
        let mut solver = Solver::new();
        solver.add_edit_variable(self.width, self.config.edit_strength)?;
        solver.add_edit_variable(self.height, self.config.edit_strength)?;

        for item in self.items.values_mut() {
            item.generate_intrinsic_constraints(self.config.natural_strength);
            for constraint in item.all_constraints() {
                solver.add_constraint_or_discard(constraint.clone())?;
            }
        }
        for constraint in &self.constraints {
            solver.add_constraint_or_discard(constraint.clone())?;
        }
        Ok(solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    #[derive(Default)]
    struct Widget {
        minimum: Size,
        natural: Size,
        applied: Vec<Rect>,
        notifier: Option<ChangeNotifier>,
        grow_on_apply: bool,
    }

    impl LayoutItem for Widget {
        fn preferred_size(&self) -> (Size, Size) {
            (self.minimum, self.natural)
        }

        fn apply_geometry(&mut self, rect: Rect) {
            self.applied.push(rect);
            if self.grow_on_apply {
                self.grow_on_apply = false;
                self.natural.width += 10.0;
                if let Some(notifier) = &self.notifier {
                    notifier.notify();
                }
            }
        }

        fn attached(&mut self, _id: ItemId, notifier: ChangeNotifier) {
            self.notifier = Some(notifier);
        }
    }

    fn widget(minimum: (f64, f64), natural: (f64, f64)) -> Rc<RefCell<Widget>> {
        Rc::new(RefCell::new(Widget {
            minimum: minimum.into(),
            natural: natural.into(),
            ..Default::default()
        }))
    }

    fn last_rect(item: &Rc<RefCell<Widget>>) -> Rect {
        *item.borrow().applied.last().unwrap()
    }

    #[test]
    fn test_single_item_takes_natural_size() {
        let mut packer = Packer::new();
        let item = widget((10.0, 10.0), (80.0, 30.0));
        let id = packer.register_item(&item);
        packer.allocate(Size::new(200.0, 100.0)).unwrap();

        let rect = last_rect(&item);
        assert!((rect.width - 80.0).abs() < TOLERANCE);
        assert!((rect.height - 30.0).abs() < TOLERANCE);
        assert_eq!(packer.geometry_of(id), Some(rect));
        assert!(!packer.is_dirty());
    }

    #[test]
    fn test_register_marks_dirty_and_attaches_notifier() {
        let mut packer = Packer::new();
        packer.allocate(Size::new(10.0, 10.0)).unwrap();
        assert!(!packer.is_dirty());

        let item = widget((0.0, 0.0), (1.0, 1.0));
        let id = packer.register_item(&item);
        assert!(packer.is_dirty());
        assert_eq!(item.borrow().notifier.as_ref().map(|n| n.id()), Some(id));
    }

    #[test]
    fn test_resize_does_not_rebuild() {
        let mut packer = Packer::new();
        let a = widget((50.0, 10.0), (150.0, 10.0));
        let id = packer.register_item(&a);
        let a_width = packer.item(id).unwrap().width();
        packer
            .add_constraint(a_width | LE(Strength::REQUIRED) | packer.width())
            .unwrap();

        packer.allocate(Size::new(300.0, 100.0)).unwrap();
        let constraints = packer.solver().constraint_count();
        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        assert_eq!(packer.solver().constraint_count(), constraints);
        assert!((last_rect(&a).width - 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_foreign_variable_rejected() {
        let mut packer = Packer::new();
        let stray = Variable::new();
        let result = packer.add_constraint(stray | EQ(Strength::REQUIRED) | 1.0);
        assert_eq!(result, Err(LayoutError::foreign_variable(stray)));
        assert!(packer.constraints().is_empty());
    }

    #[test]
    fn test_duplicate_and_unknown_container_constraints() {
        let mut packer = Packer::new();
        let c = packer.width() | GE(Strength::REQUIRED) | 0.0;
        packer.add_constraint(c.clone()).unwrap();
        assert_eq!(
            packer.add_constraint(c.clone()),
            Err(LayoutError::from(SolverError::DuplicateConstraint))
        );
        packer.remove_constraint(&c).unwrap();
        assert_eq!(
            packer.remove_constraint(&c),
            Err(LayoutError::from(SolverError::UnknownConstraint))
        );
    }

    #[test]
    fn test_unknown_item() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (1.0, 1.0));
        let id = packer.register_item(&item);
        packer.unregister_item(id).unwrap();

        assert_eq!(
            packer.unregister_item(id),
            Err(LayoutError::unknown_item(id))
        );
        assert_eq!(packer.child_changed(id), Err(LayoutError::unknown_item(id)));
        let c = packer.width() | GE(Strength::REQUIRED) | 0.0;
        assert_eq!(
            packer.add_item_constraint(id, c),
            Err(LayoutError::unknown_item(id))
        );
    }

    #[test]
    fn test_unregister_removes_dependent_constraints() {
        let mut packer = Packer::new();
        let a = widget((0.0, 0.0), (10.0, 10.0));
        let b = widget((0.0, 0.0), (10.0, 10.0));
        let a_id = packer.register_item(&a);
        let b_id = packer.register_item(&b);

        let (a_width, b_width) = (
            packer.item(a_id).unwrap().width(),
            packer.item(b_id).unwrap().width(),
        );
        packer
            .add_constraint(a_width + b_width | LE(Strength::REQUIRED) | packer.width())
            .unwrap();
        packer
            .add_item_constraint(b_id, b_width | EQ(Strength::REQUIRED) | a_width)
            .unwrap();

        packer.unregister_item(a_id).unwrap();
        assert!(packer.constraints().is_empty());
        assert!(packer.item(b_id).unwrap().constraints().is_empty());
        packer.allocate(Size::new(50.0, 50.0)).unwrap();
    }

    #[test]
    fn test_notification_during_apply_is_deferred() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (40.0, 10.0));
        item.borrow_mut().grow_on_apply = true;
        packer.register_item(&item);

        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        assert!((last_rect(&item).width - 40.0).abs() < TOLERANCE);
        // notification sits in the queue until the next pass
        assert!(packer.is_dirty());

        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        assert!((last_rect(&item).width - 50.0).abs() < TOLERANCE);
        assert!(!packer.is_dirty());
    }

    #[test]
    fn test_released_item_is_pruned() {
        let mut packer = Packer::new();
        let keep = widget((0.0, 0.0), (10.0, 10.0));
        let gone = widget((0.0, 0.0), (20.0, 20.0));
        packer.register_item(&keep);
        let gone_id = packer.register_item(&gone);
        packer.allocate(Size::new(100.0, 100.0)).unwrap();

        assert!(!packer.is_dirty());

        drop(gone);
        assert!(packer.is_dirty());
        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        assert!(packer.item(gone_id).is_none());
        assert_eq!(packer.len(), 1);
        assert!(!packer.is_dirty());
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_geometry() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (60.0, 10.0));
        let id = packer.register_item(&item);
        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        let before = packer.geometry_of(id);
        let constraints = packer.solver().constraint_count();

        let width = packer.item(id).unwrap().width();
        packer
            .add_item_constraint(id, width | EQ(Strength::REQUIRED) | 10.0)
            .unwrap();
        packer
            .add_item_constraint(id, width | EQ(Strength::REQUIRED) | 20.0)
            .unwrap();

        let result = packer.allocate(Size::new(100.0, 100.0));
        assert_eq!(
            result,
            Err(LayoutError::from(SolverError::UnsatisfiableConstraint))
        );
        assert_eq!(packer.geometry_of(id), before);
        assert_eq!(item.borrow().applied.len(), 1);
        assert_eq!(packer.solver().constraint_count(), constraints);
        assert!(packer.is_dirty());
    }

    #[test]
    fn test_preferred_size_is_side_effect_free() {
        let mut packer = Packer::new();
        let a = widget((50.0, 20.0), (150.0, 40.0));
        let b = widget((30.0, 10.0), (100.0, 60.0));
        let a_id = packer.register_item(&a);
        let b_id = packer.register_item(&b);
        let (a_item, b_item) = (packer.item(a_id).unwrap(), packer.item(b_id).unwrap());
        let constraints = vec![
            a_item.width() + b_item.width() | LE(Strength::REQUIRED) | packer.width(),
            a_item.height() | LE(Strength::REQUIRED) | packer.height(),
            b_item.height() | LE(Strength::REQUIRED) | packer.height(),
        ];
        for c in constraints {
            packer.add_constraint(c).unwrap();
        }
        packer.allocate(Size::new(400.0, 100.0)).unwrap();
        let dump = packer.solver().dump();
        let applied = a.borrow().applied.len();

        let (minimum, natural) = packer.preferred_size().unwrap();
        assert!((minimum.width - 80.0).abs() < TOLERANCE);
        assert!((minimum.height - 20.0).abs() < TOLERANCE);
        assert!((natural.width - 250.0).abs() < TOLERANCE);
        assert!((natural.height - 60.0).abs() < TOLERANCE);

        assert_eq!(packer.solver().dump(), dump);
        assert_eq!(a.borrow().applied.len(), applied);
        assert!(!packer.is_dirty());
    }

    #[test]
    fn test_preferred_size_of_empty_packer() {
        let packer = Packer::new();
        assert_eq!(
            packer.preferred_size().unwrap(),
            (Size::zero(), Size::zero())
        );
    }

    #[test]
    fn test_item_constraint_marks_dirty() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (10.0, 10.0));
        let id = packer.register_item(&item);
        packer.allocate(Size::new(10.0, 10.0)).unwrap();
        assert!(!packer.is_dirty());

        let left = packer.item(id).unwrap().left();
        packer
            .add_item_constraint(id, left | GE(Strength::REQUIRED) | 2.0)
            .unwrap();
        assert!(packer.is_dirty());
    }

    #[test]
    fn test_foreign_item_constraint_is_rejected() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (10.0, 10.0));
        let id = packer.register_item(&item);
        let stray = Variable::new();

        let left = packer.item(id).unwrap().left();
        let err = packer
            .add_item_constraint(id, left | EQ(Strength::REQUIRED) | stray)
            .unwrap_err();
        assert_eq!(err, LayoutError::foreign_variable(stray));
        assert!(packer.item(id).unwrap().constraints().is_empty());
    }

    #[test]
    fn test_non_finite_allocation_is_rejected() {
        let mut packer = Packer::new();
        let item = widget((10.0, 10.0), (80.0, 30.0));
        let id = packer.register_item(&item);
        let width = packer.item(id).unwrap().width();
        packer
            .add_constraint(width | LE(Strength::REQUIRED) | packer.width())
            .unwrap();
        packer.allocate(Size::new(50.0, 50.0)).unwrap();

        for size in [
            Size::new(f64::NAN, 50.0),
            Size::new(50.0, f64::INFINITY),
        ] {
            assert_eq!(
                packer.allocate(size),
                Err(LayoutError::from(SolverError::NonFiniteValue))
            );
        }
        assert_eq!(item.borrow().applied.len(), 1);
        assert_eq!(packer.allocation(), Some(Size::new(50.0, 50.0)));

        packer.allocate(Size::new(60.0, 50.0)).unwrap();
        assert!((last_rect(&item).width - 60.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_failed_rebuild_keeps_live_solver() {
        let mut packer = Packer::new();
        let item = widget((0.0, 0.0), (10.0, 10.0));
        let id = packer.register_item(&item);
        let left = packer.item(id).unwrap().left();
        packer
            .add_constraint(left | EQ(Strength::REQUIRED) | 5.0)
            .unwrap();
        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        let before = packer.solver().dump();

        let conflict = left | EQ(Strength::REQUIRED) | 6.0;
        packer.add_constraint(conflict.clone()).unwrap();
        assert!(packer.allocate(Size::new(100.0, 100.0)).is_err());
        assert_eq!(packer.solver().dump(), before);
        assert!(packer.is_dirty());

        packer.remove_constraint(&conflict).unwrap();
        packer.allocate(Size::new(100.0, 100.0)).unwrap();
        assert!((last_rect(&item).x - 5.0).abs() < TOLERANCE);
        assert!(!packer.is_dirty());
    }

    #[test]
    fn test_container_properties() {
        let packer = Packer::new();
        assert_eq!(packer.property(Property::Left).constant(), 0.0);
        assert_eq!(
            packer.property(Property::CenterX).coefficient_of(packer.width()),
            0.5
        );
        assert!(packer.property(Property::Bottom).involves(packer.height()));
    }
}
