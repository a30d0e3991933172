//! Tableau symbols and rows

use std::collections::BTreeMap;
use std::fmt;

use super::strength::SymbolicWeight;

const EPSILON: f64 = 1.0e-8;

pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum SymbolKind {
    /// Stands for a user [`Variable`](super::Variable), unrestricted in sign
    External,
    /// Slack of an inequality, restricted to be non-negative
    Slack,
    /// Error term of a non-required constraint, non-negative
    Error,
    /// Marker of a required equality, never allowed to enter the basis
    Dummy,
}

/// A tableau column. Ordered by creation, which fixes every tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Symbol {
    id: u64,
    kind: SymbolKind,
}

impl Symbol {
    pub(crate) fn new(id: u64, kind: SymbolKind) -> Self {
        Self { id, kind }
    }

    pub(crate) fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub(crate) fn is_external(&self) -> bool {
        self.kind == SymbolKind::External
    }

    pub(crate) fn is_dummy(&self) -> bool {
        self.kind == SymbolKind::Dummy
    }

    /// Slack and error symbols may be chosen as a row's subject
    pub(crate) fn is_pivotable(&self) -> bool {
        matches!(self.kind, SymbolKind::Slack | SymbolKind::Error)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            SymbolKind::External => 'x',
            SymbolKind::Slack => 's',
            SymbolKind::Error => 'e',
            SymbolKind::Dummy => 'd',
        };
        write!(f, "{}{}", prefix, self.id)
    }
}

/// `constant + sum(coefficient * symbol)`; as a tableau entry it is the value of
/// its basic symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Row {
    pub(crate) cells: BTreeMap<Symbol, f64>,
    pub(crate) constant: f64,
}

impl Row {
    pub(crate) fn new(constant: f64) -> Self {
        Self {
            cells: BTreeMap::new(),
            constant,
        }
    }

    /// Add to the constant and return the new constant
    pub(crate) fn add(&mut self, value: f64) -> f64 {
        self.constant += value;
        self.constant
    }

    pub(crate) fn insert_symbol(&mut self, symbol: Symbol, coefficient: f64) {
        let cell = self.cells.entry(symbol).or_insert(0.0);
        *cell += coefficient;
        if near_zero(*cell) {
            self.cells.remove(&symbol);
        }
    }

    pub(crate) fn insert_row(&mut self, other: &Row, coefficient: f64) {
        self.constant += other.constant * coefficient;
        for (symbol, value) in &other.cells {
            self.insert_symbol(*symbol, value * coefficient);
        }
    }

    pub(crate) fn remove(&mut self, symbol: Symbol) {
        self.cells.remove(&symbol);
    }

    pub(crate) fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for value in self.cells.values_mut() {
            *value = -*value;
        }
    }

    /// Rearrange `0 = row` into `symbol = row'`, dropping `symbol` from the cells
    pub(crate) fn solve_for(&mut self, symbol: Symbol) {
        if let Some(coefficient) = self.cells.remove(&symbol) {
            let factor = -1.0 / coefficient;
            self.constant *= factor;
            for value in self.cells.values_mut() {
                *value *= factor;
            }
        }
    }

    /// Rearrange `lhs = row` (with `rhs` in row) into `rhs = row'`
    pub(crate) fn solve_for_pair(&mut self, lhs: Symbol, rhs: Symbol) {
        self.insert_symbol(lhs, -1.0);
        self.solve_for(rhs);
    }

    pub(crate) fn coefficient_for(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    /// Replace `symbol` by the expression `row`
    pub(crate) fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(coefficient) = self.cells.remove(&symbol) {
            self.insert_row(row, coefficient);
        }
    }

    pub(crate) fn all_dummies(&self) -> bool {
        self.cells.keys().all(Symbol::is_dummy)
    }

    pub(crate) fn any_pivotable_symbol(&self) -> Option<Symbol> {
        self.cells.keys().copied().find(Symbol::is_pivotable)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constant)?;
        for (symbol, value) in &self.cells {
            write!(f, " + {} * {}", value, symbol)?;
        }
        Ok(())
    }
}

/// The objective being minimized, with symbolic (per-level) coefficients
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ObjectiveRow {
    pub(crate) cells: BTreeMap<Symbol, SymbolicWeight>,
    pub(crate) constant: SymbolicWeight,
}

impl ObjectiveRow {
    /// Objective equal to a plain row, used to drive an artificial variable out
    pub(crate) fn from_row(row: &Row) -> Self {
        let mut objective = Self::default();
        objective.insert_row(row, SymbolicWeight::scalar(1.0));
        objective
    }

    pub(crate) fn insert_symbol(&mut self, symbol: Symbol, weight: SymbolicWeight) {
        let cell = self.cells.entry(symbol).or_default();
        *cell += weight;
        if cell.is_near_zero() {
            self.cells.remove(&symbol);
        }
    }

    pub(crate) fn insert_row(&mut self, row: &Row, weight: SymbolicWeight) {
        self.constant += weight.scaled(row.constant);
        for (symbol, value) in &row.cells {
            self.insert_symbol(*symbol, weight.scaled(*value));
        }
    }

    pub(crate) fn remove(&mut self, symbol: Symbol) {
        self.cells.remove(&symbol);
    }

    pub(crate) fn coefficient_for(&self, symbol: Symbol) -> SymbolicWeight {
        self.cells.get(&symbol).copied().unwrap_or_default()
    }

    pub(crate) fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(weight) = self.cells.remove(&symbol) {
            self.insert_row(row, weight);
        }
    }

    /// First non-dummy symbol whose coefficient would decrease the objective
    pub(crate) fn entering_symbol(&self) -> Option<Symbol> {
        self.cells
            .iter()
            .find(|(symbol, weight)| !symbol.is_dummy() && weight.is_negative())
            .map(|(symbol, _)| *symbol)
    }
}

impl fmt::Display for ObjectiveRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constant)?;
        for (symbol, weight) in &self.cells {
            write!(f, " + {} * {}", weight, symbol)?;
        }
        Ok(())
    }
}
