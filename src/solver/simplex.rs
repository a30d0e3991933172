//! Incremental Cassowary solver
//!
//! The tableau keeps one row per basic symbol. Adding a constraint pivots it
//! into the existing basis and re-optimizes from there; suggesting edit values
//! only moves row constants and repairs feasibility with the dual simplex, so a
//! resize costs a handful of pivots instead of a fresh solve.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::trace;

use super::constraint::{Constraint, ConstraintId, RelationalOperator};
use super::error::SolverError;
use super::expression::Expression;
use super::row::{near_zero, ObjectiveRow, Row, Symbol, SymbolKind};
use super::strength::{Strength, SymbolicWeight};
use super::variable::Variable;

/// Symbols a constraint introduced into the tableau
#[derive(Debug, Clone, Copy)]
struct Tag {
    marker: Symbol,
    other: Option<Symbol>,
}

#[derive(Debug, Clone)]
struct EditInfo {
    tag: Tag,
    constraint: Constraint,
    constant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rollback {
    Checkpoint,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    Main,
    Artificial,
}

/// Incremental linear constraint solver.
///
/// Required constraints are enforced exactly; violations of the others are
/// minimized level by level (strong, then medium, then weak). All internal
/// maps are ordered by creation so that identical call sequences produce
/// identical solutions.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    constraints: BTreeMap<ConstraintId, (Constraint, Tag)>,
    rows: BTreeMap<Symbol, Row>,
    vars: BTreeMap<Variable, Symbol>,
    edits: BTreeMap<Variable, EditInfo>,
    pending: BTreeMap<Variable, f64>,
    values: BTreeMap<Variable, f64>,
    published: BTreeMap<Variable, f64>,
    infeasible_rows: Vec<Symbol>,
    objective: ObjectiveRow,
    artificial: Option<ObjectiveRow>,
    next_symbol: u64,
    pivots: u64,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint to the system.
    ///
    /// Fails with [`SolverError::DuplicateConstraint`] if it is already present,
    /// with [`SolverError::NonFiniteValue`] if a coefficient or the constant is
    /// NaN or infinite, and with [`SolverError::UnsatisfiableConstraint`] if it
    /// is required and contradicts the required constraints already present. A
    /// failed call leaves the solver untouched.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        self.insert_constraint(constraint, Rollback::Checkpoint)
    }

    /// [`add_constraint`](Self::add_constraint) without the rollback
    /// checkpoint. After an error the solver is inconsistent and must be
    /// dropped; for building a solver that is discarded on failure.
    pub(crate) fn add_constraint_or_discard(
        &mut self,
        constraint: Constraint,
    ) -> Result<(), SolverError> {
        self.insert_constraint(constraint, Rollback::Discard)
    }

    fn insert_constraint(
        &mut self,
        constraint: Constraint,
        rollback: Rollback,
    ) -> Result<(), SolverError> {
        if self.constraints.contains_key(&constraint.id()) {
            return Err(SolverError::DuplicateConstraint);
        }
        let expression = constraint.expression();
        if !expression.constant().is_finite()
            || expression.terms().iter().any(|t| !t.coefficient.is_finite())
        {
            return Err(SolverError::NonFiniteValue);
        }

        let symbol_mark = self.next_symbol;
        let (mut row, tag, fresh) = self.create_row(&constraint);

        let subject = match Self::choose_subject(&row, &tag) {
            None if row.all_dummies() => {
                if !near_zero(row.constant) {
                    // only `fresh` and the symbol counter were touched so far
                    self.next_symbol = symbol_mark;
                    return Err(SolverError::UnsatisfiableConstraint);
                }
                // redundant equality: its marker becomes basic
                Some(tag.marker)
            }
            subject => subject,
        };

        match subject {
            Some(subject) => {
                self.vars.extend(fresh);
                row.solve_for(subject);
                self.substitute(subject, &row);
                self.rows.insert(subject, row);
            }
            None => {
                let checkpoint = match rollback {
                    Rollback::Checkpoint => {
                        let mut checkpoint = self.clone();
                        checkpoint.next_symbol = symbol_mark;
                        Some(checkpoint)
                    }
                    Rollback::Discard => None,
                };
                self.vars.extend(fresh);
                let result = match self.add_with_artificial_variable(row) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(SolverError::UnsatisfiableConstraint),
                    Err(error) => Err(error),
                };
                if let Err(error) = result {
                    if let Some(checkpoint) = checkpoint {
                        *self = checkpoint;
                    }
                    return Err(error);
                }
            }
        }

        trace!(constraint = %constraint, "added constraint");
        self.constraints.insert(constraint.id(), (constraint, tag));
        self.optimize(Objective::Main)
    }

    /// Remove a previously added constraint.
    ///
    /// The constraint behind an edit variable is owned by it and can only go
    /// through [`remove_edit_variable`](Self::remove_edit_variable); passing it
    /// here fails with [`SolverError::UnknownConstraint`].
    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        if self.is_edit_constraint(constraint) {
            return Err(SolverError::UnknownConstraint);
        }
        self.drop_constraint(constraint)
    }

    fn is_edit_constraint(&self, constraint: &Constraint) -> bool {
        self.edits
            .values()
            .any(|info| info.constraint.id() == constraint.id())
    }

    fn drop_constraint(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let (constraint, tag) = self
            .constraints
            .remove(&constraint.id())
            .ok_or(SolverError::UnknownConstraint)?;

        self.remove_constraint_effects(constraint.strength(), tag);

        if self.rows.remove(&tag.marker).is_none() {
            let leaving = self
                .marker_leaving_symbol(tag.marker)
                .ok_or_else(|| SolverError::internal("failed to find leaving row"))?;
            let mut row = self
                .rows
                .remove(&leaving)
                .ok_or_else(|| SolverError::internal("leaving row vanished"))?;
            row.solve_for_pair(leaving, tag.marker);
            self.substitute(tag.marker, &row);
        }

        trace!(constraint = %constraint, "removed constraint");
        self.optimize(Objective::Main)
    }

    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains_key(&constraint.id())
    }

    /// Number of constraints currently in the system, edit constraints included
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Constraints in the order they were created, edit constraints included
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.constraints.values().map(|(constraint, _)| constraint)
    }

    /// Register `variable` for repeated cheap suggestions at `strength`
    pub fn add_edit_variable(
        &mut self,
        variable: Variable,
        strength: Strength,
    ) -> Result<(), SolverError> {
        if self.edits.contains_key(&variable) {
            return Err(SolverError::DuplicateEditVariable);
        }
        if strength.is_required() {
            return Err(SolverError::BadRequiredStrength);
        }

        let constraint = Constraint::new(
            Expression::from(variable),
            RelationalOperator::Equal,
            strength,
        );
        self.add_constraint(constraint.clone())?;
        let tag = self
            .constraints
            .get(&constraint.id())
            .map(|(_, tag)| *tag)
            .ok_or_else(|| SolverError::internal("edit constraint vanished"))?;
        self.edits.insert(
            variable,
            EditInfo {
                tag,
                constraint,
                constant: 0.0,
            },
        );
        Ok(())
    }

    pub fn remove_edit_variable(&mut self, variable: Variable) -> Result<(), SolverError> {
        let constraint = self
            .edits
            .get(&variable)
            .map(|info| info.constraint.clone())
            .ok_or(SolverError::UnknownEditVariable)?;
        self.drop_constraint(&constraint)?;
        self.edits.remove(&variable);
        self.pending.remove(&variable);
        Ok(())
    }

    pub fn has_edit_variable(&self, variable: Variable) -> bool {
        self.edits.contains_key(&variable)
    }

    /// Record a desired value for an edit variable.
    ///
    /// Nothing is solved here: suggestions accumulate until the next
    /// [`update_variables`](Self::update_variables), the last one per variable
    /// winning. NaN and infinite values are rejected and leave any earlier
    /// pending suggestion in place.
    pub fn suggest_value(&mut self, variable: Variable, value: f64) -> Result<(), SolverError> {
        if !self.edits.contains_key(&variable) {
            return Err(SolverError::UnknownEditVariable);
        }
        if !value.is_finite() {
            return Err(SolverError::NonFiniteValue);
        }
        trace!(%variable, value, "suggested value");
        self.pending.insert(variable, value);
        Ok(())
    }

    /// Resolve: apply pending suggestions to the current basis, restore
    /// feasibility and publish every variable's value.
    pub fn update_variables(&mut self) -> Result<(), SolverError> {
        let pending = std::mem::take(&mut self.pending);
        for (variable, value) in pending {
            self.apply_suggestion(variable, value);
        }
        self.dual_optimize()?;

        for (variable, symbol) in &self.vars {
            let value = self.rows.get(symbol).map_or(0.0, |row| row.constant);
            self.values.insert(*variable, value);
        }
        Ok(())
    }

    /// Value of `variable` as of the last resolve; zero if never solved
    pub fn value_of(&self, variable: Variable) -> f64 {
        self.values.get(&variable).copied().unwrap_or(0.0)
    }

    /// Variables whose value changed since the previous call, in variable order
    pub fn fetch_changes(&mut self) -> Vec<(Variable, f64)> {
        let mut changes = Vec::new();
        for (variable, value) in &self.values {
            let previous = self.published.insert(*variable, *value);
            if previous != Some(*value) {
                changes.push((*variable, *value));
            }
        }
        let values = &self.values;
        self.published.retain(|variable, previous| {
            let keep = values.contains_key(variable);
            if !keep && *previous != 0.0 {
                changes.push((*variable, 0.0));
            }
            keep
        });
        changes.sort_by_key(|(variable, _)| *variable);
        changes
    }

    /// Total pivots performed since construction or the last reset
    pub fn pivot_count(&self) -> u64 {
        self.pivots
    }

    /// Drop every constraint and edit variable
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Human readable snapshot of the tableau
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Objective\n---------\n{}\n", self.objective);
        let _ = writeln!(out, "Tableau\n-------");
        for (symbol, row) in &self.rows {
            let _ = writeln!(out, "{} | {}", symbol, row);
        }
        let _ = writeln!(out, "\nInfeasible\n----------");
        for symbol in &self.infeasible_rows {
            let _ = writeln!(out, "{}", symbol);
        }
        let _ = writeln!(out, "\nVariables\n---------");
        for (variable, symbol) in &self.vars {
            let _ = writeln!(out, "{} = {}", variable, symbol);
        }
        let _ = writeln!(out, "\nEdit Variables\n--------------");
        for (variable, info) in &self.edits {
            let _ = writeln!(out, "{} ({})", variable, info.constant);
        }
        let _ = writeln!(out, "\nConstraints\n-----------");
        for (constraint, _) in self.constraints.values() {
            let _ = writeln!(out, "{}", constraint);
        }
        out
    }

    fn new_symbol(&mut self, kind: SymbolKind) -> Symbol {
        self.next_symbol += 1;
        Symbol::new(self.next_symbol, kind)
    }

    /// Build the tableau row for a constraint, with basic variables already
    /// substituted out. Symbols for variables seen for the first time are
    /// returned rather than registered, so a rejected constraint leaves no trace.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag, Vec<(Variable, Symbol)>) {
        let expression = constraint.expression();
        let strength = constraint.strength();
        let mut row = Row::new(expression.constant());
        let mut fresh = Vec::new();

        for term in expression.terms() {
            if near_zero(term.coefficient) {
                continue;
            }
            let symbol = match self.vars.get(&term.variable) {
                Some(symbol) => *symbol,
                None => {
                    let symbol = self.new_symbol(SymbolKind::External);
                    fresh.push((term.variable, symbol));
                    symbol
                }
            };
            match self.rows.get(&symbol) {
                Some(basic) => row.insert_row(basic, term.coefficient),
                None => row.insert_symbol(symbol, term.coefficient),
            }
        }

        let tag = match constraint.operator() {
            RelationalOperator::LessOrEqual | RelationalOperator::GreaterOrEqual => {
                let coefficient = if constraint.operator() == RelationalOperator::LessOrEqual {
                    1.0
                } else {
                    -1.0
                };
                let slack = self.new_symbol(SymbolKind::Slack);
                row.insert_symbol(slack, coefficient);
                let other = if strength.is_required() {
                    None
                } else {
                    let error = self.new_symbol(SymbolKind::Error);
                    row.insert_symbol(error, -coefficient);
                    self.objective
                        .insert_symbol(error, strength.symbolic_weight());
                    Some(error)
                };
                Tag {
                    marker: slack,
                    other,
                }
            }
            RelationalOperator::Equal => {
                if strength.is_required() {
                    let dummy = self.new_symbol(SymbolKind::Dummy);
                    row.insert_symbol(dummy, 1.0);
                    Tag {
                        marker: dummy,
                        other: None,
                    }
                } else {
                    let plus = self.new_symbol(SymbolKind::Error);
                    let minus = self.new_symbol(SymbolKind::Error);
                    row.insert_symbol(plus, -1.0);
                    row.insert_symbol(minus, 1.0);
                    self.objective
                        .insert_symbol(plus, strength.symbolic_weight());
                    self.objective
                        .insert_symbol(minus, strength.symbolic_weight());
                    Tag {
                        marker: plus,
                        other: Some(minus),
                    }
                }
            }
        };

        if row.constant < 0.0 {
            row.reverse_sign();
        }
        (row, tag, fresh)
    }

    /// Pick the symbol a new row is solved for: any external symbol, otherwise
    /// a slack/error marker with a negative coefficient.
    fn choose_subject(row: &Row, tag: &Tag) -> Option<Symbol> {
        if let Some(symbol) = row.cells.keys().find(|symbol| symbol.is_external()) {
            return Some(*symbol);
        }
        [Some(tag.marker), tag.other]
            .into_iter()
            .flatten()
            .find(|symbol| symbol.is_pivotable() && row.coefficient_for(*symbol) < 0.0)
    }

    /// Phase one for a row without a usable subject. Returns whether the row
    /// could be made feasible.
    fn add_with_artificial_variable(&mut self, row: Row) -> Result<bool, SolverError> {
        let artificial = self.new_symbol(SymbolKind::Slack);
        self.artificial = Some(ObjectiveRow::from_row(&row));
        self.rows.insert(artificial, row);
        self.optimize(Objective::Artificial)?;

        let success = self
            .artificial
            .take()
            .is_some_and(|objective| objective.constant.is_near_zero());

        if let Some(mut row) = self.rows.remove(&artificial) {
            if row.cells.is_empty() {
                return Ok(success);
            }
            let Some(entering) = row.any_pivotable_symbol() else {
                return Ok(false);
            };
            row.solve_for_pair(artificial, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }

        for row in self.rows.values_mut() {
            row.remove(artificial);
        }
        self.objective.remove(artificial);
        Ok(success)
    }

    /// Primal simplex on the chosen objective
    fn optimize(&mut self, objective: Objective) -> Result<(), SolverError> {
        loop {
            let entering = match objective {
                Objective::Main => self.objective.entering_symbol(),
                Objective::Artificial => self
                    .artificial
                    .as_ref()
                    .and_then(ObjectiveRow::entering_symbol),
            };
            let Some(entering) = entering else {
                return Ok(());
            };
            let leaving = self
                .leaving_symbol(entering)
                .ok_or_else(|| SolverError::internal("objective is unbounded"))?;
            self.pivot(leaving, entering)?;
        }
    }

    /// Dual simplex over the rows made infeasible by edit suggestions
    fn dual_optimize(&mut self) -> Result<(), SolverError> {
        while let Some(leaving) = self.infeasible_rows.pop() {
            let entering = match self.rows.get(&leaving) {
                Some(row) if row.constant < 0.0 && !near_zero(row.constant) => self
                    .dual_entering_symbol(row)
                    .ok_or_else(|| SolverError::internal("dual optimize failed"))?,
                _ => continue,
            };
            self.pivot(leaving, entering)?;
        }
        Ok(())
    }

    fn pivot(&mut self, leaving: Symbol, entering: Symbol) -> Result<(), SolverError> {
        let mut row = self
            .rows
            .remove(&leaving)
            .ok_or_else(|| SolverError::internal("pivot row missing"))?;
        row.solve_for_pair(leaving, entering);
        self.substitute(entering, &row);
        self.rows.insert(entering, row);
        self.pivots += 1;
        trace!(%leaving, %entering, "pivot");
        Ok(())
    }

    /// Row that limits how far `entering` can grow (minimum ratio test)
    fn leaving_symbol(&self, entering: Symbol) -> Option<Symbol> {
        let mut best: Option<(f64, Symbol)> = None;
        for (symbol, row) in &self.rows {
            if symbol.is_external() {
                continue;
            }
            let coefficient = row.coefficient_for(entering);
            if coefficient < 0.0 {
                let ratio = -row.constant / coefficient;
                if best.map_or(true, |(current, _)| ratio < current) {
                    best = Some((ratio, *symbol));
                }
            }
        }
        best.map(|(_, symbol)| symbol)
    }

    fn dual_entering_symbol(&self, row: &Row) -> Option<Symbol> {
        let mut best: Option<(SymbolicWeight, Symbol)> = None;
        for (symbol, coefficient) in &row.cells {
            if *coefficient > 0.0 && !symbol.is_dummy() {
                let ratio = self
                    .objective
                    .coefficient_for(*symbol)
                    .scaled(1.0 / coefficient);
                let better = best.map_or(true, |(current, _)| {
                    ratio.lexicographic_cmp(&current) == std::cmp::Ordering::Less
                });
                if better {
                    best = Some((ratio, *symbol));
                }
            }
        }
        best.map(|(_, symbol)| symbol)
    }

    /// Row to pivot on when removing a constraint whose marker is not basic
    fn marker_leaving_symbol(&self, marker: Symbol) -> Option<Symbol> {
        let mut restricted_negative: Option<(f64, Symbol)> = None;
        let mut restricted_positive: Option<(f64, Symbol)> = None;
        let mut unrestricted: Option<Symbol> = None;

        for (symbol, row) in &self.rows {
            let coefficient = row.coefficient_for(marker);
            if coefficient == 0.0 {
                continue;
            }
            if symbol.is_external() {
                unrestricted = Some(*symbol);
            } else if coefficient < 0.0 {
                let ratio = -row.constant / coefficient;
                if restricted_negative.map_or(true, |(current, _)| ratio < current) {
                    restricted_negative = Some((ratio, *symbol));
                }
            } else {
                let ratio = row.constant / coefficient;
                if restricted_positive.map_or(true, |(current, _)| ratio < current) {
                    restricted_positive = Some((ratio, *symbol));
                }
            }
        }

        restricted_negative
            .or(restricted_positive)
            .map(|(_, symbol)| symbol)
            .or(unrestricted)
    }

    /// Replace `symbol` everywhere by `row`, noting rows that became infeasible
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        for (basic, entry) in self.rows.iter_mut() {
            entry.substitute(symbol, row);
            if !basic.is_external() && entry.constant < 0.0 {
                self.infeasible_rows.push(*basic);
            }
        }
        self.objective.substitute(symbol, row);
        if let Some(artificial) = self.artificial.as_mut() {
            artificial.substitute(symbol, row);
        }
    }

    fn remove_constraint_effects(&mut self, strength: Strength, tag: Tag) {
        for symbol in [Some(tag.marker), tag.other].into_iter().flatten() {
            if symbol.kind() != SymbolKind::Error {
                continue;
            }
            let weight = strength.symbolic_weight().scaled(-1.0);
            match self.rows.get(&symbol) {
                Some(row) => self.objective.insert_row(row, weight),
                None => self.objective.insert_symbol(symbol, weight),
            }
        }
    }

    fn apply_suggestion(&mut self, variable: Variable, value: f64) {
        let Some(info) = self.edits.get_mut(&variable) else {
            return;
        };
        let delta = value - info.constant;
        info.constant = value;
        let tag = info.tag;

        if let Some(row) = self.rows.get_mut(&tag.marker) {
            if row.add(-delta) < 0.0 {
                self.infeasible_rows.push(tag.marker);
            }
            return;
        }
        if let Some(other) = tag.other {
            if let Some(row) = self.rows.get_mut(&other) {
                if row.add(delta) < 0.0 {
                    self.infeasible_rows.push(other);
                }
                return;
            }
        }
        for (basic, row) in self.rows.iter_mut() {
            let coefficient = row.coefficient_for(tag.marker);
            if coefficient != 0.0 && row.add(delta * coefficient) < 0.0 && !basic.is_external() {
                self.infeasible_rows.push(*basic);
            }
        }
    }
}
