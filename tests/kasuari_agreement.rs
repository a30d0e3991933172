//! Cross-checks the solver against kasuari on systems with a unique optimum

use std::collections::HashMap;

use constraint_packer::solver::{Expression, RelationalOperator, Term};
use RelationalOperator::{Equal, GreaterOrEqual, LessOrEqual};
use constraint_packer::{Constraint, Solver, Strength, Variable};

#[derive(Debug, Clone, Copy)]
enum Level {
    Required,
    Strong,
    Medium,
    Weak,
}

/// The handful of operations both solvers share
trait Backend {
    type Var: Copy;

    fn var(&mut self) -> Self::Var;
    /// `sum(coefficient * var) + constant <op> 0`; false if rejected
    fn add(
        &mut self,
        terms: &[(Self::Var, f64)],
        constant: f64,
        op: RelationalOperator,
        level: Level,
    ) -> bool;
    fn edit(&mut self, var: Self::Var, level: Level);
    fn suggest(&mut self, var: Self::Var, value: f64);
    fn values(&mut self, vars: &[Self::Var]) -> Vec<f64>;
}

#[derive(Default)]
struct Ours {
    solver: Solver,
}

fn ours_strength(level: Level) -> Strength {
    match level {
        Level::Required => Strength::REQUIRED,
        Level::Strong => Strength::STRONG,
        Level::Medium => Strength::MEDIUM,
        Level::Weak => Strength::WEAK,
    }
}

impl Backend for Ours {
    type Var = Variable;

    fn var(&mut self) -> Variable {
        Variable::new()
    }

    fn add(
        &mut self,
        terms: &[(Variable, f64)],
        constant: f64,
        op: RelationalOperator,
        level: Level,
    ) -> bool {
        let expression = Expression::new(terms.iter().map(|(v, c)| Term::new(*v, *c)), constant);
        self.solver
            .add_constraint(Constraint::new(expression, op, ours_strength(level)))
            .is_ok()
    }

    fn edit(&mut self, var: Variable, level: Level) {
        self.solver
            .add_edit_variable(var, ours_strength(level))
            .unwrap();
    }

    fn suggest(&mut self, var: Variable, value: f64) {
        self.solver.suggest_value(var, value).unwrap();
    }

    fn values(&mut self, vars: &[Variable]) -> Vec<f64> {
        self.solver.update_variables().unwrap();
        vars.iter().map(|v| self.solver.value_of(*v)).collect()
    }
}

struct Oracle {
    solver: kasuari::Solver,
    values: HashMap<kasuari::Variable, f64>,
}

impl Default for Oracle {
    fn default() -> Self {
        Self {
            solver: kasuari::Solver::new(),
            values: HashMap::new(),
        }
    }
}

fn oracle_strength(level: Level) -> kasuari::Strength {
    match level {
        Level::Required => kasuari::Strength::REQUIRED,
        Level::Strong => kasuari::Strength::STRONG,
        Level::Medium => kasuari::Strength::MEDIUM,
        Level::Weak => kasuari::Strength::WEAK,
    }
}

impl Backend for Oracle {
    type Var = kasuari::Variable;

    fn var(&mut self) -> kasuari::Variable {
        kasuari::Variable::new()
    }

    fn add(
        &mut self,
        terms: &[(kasuari::Variable, f64)],
        constant: f64,
        op: RelationalOperator,
        level: Level,
    ) -> bool {
        use kasuari::WeightedRelation::{EQ, GE, LE};

        let expression = terms
            .iter()
            .fold(kasuari::Expression::from(constant), |e, (v, c)| e + *v * *c);
        let strength = oracle_strength(level);
        let constraint = match op {
            RelationalOperator::Equal => expression | EQ(strength) | 0.0,
            RelationalOperator::LessOrEqual => expression | LE(strength) | 0.0,
            RelationalOperator::GreaterOrEqual => expression | GE(strength) | 0.0,
        };
        self.solver.add_constraint(constraint).is_ok()
    }

    fn edit(&mut self, var: kasuari::Variable, level: Level) {
        self.solver
            .add_edit_variable(var, oracle_strength(level))
            .unwrap();
    }

    fn suggest(&mut self, var: kasuari::Variable, value: f64) {
        self.solver.suggest_value(var, value).unwrap();
    }

    fn values(&mut self, vars: &[kasuari::Variable]) -> Vec<f64> {
        for (v, value) in self.solver.fetch_changes() {
            self.values.insert(*v, *value);
        }
        vars.iter()
            .map(|v| self.values.get(v).copied().unwrap_or(0.0))
            .collect()
    }
}

fn assert_agree(ours: &[f64], oracle: &[f64]) {
    assert_eq!(ours.len(), oracle.len());
    for (a, b) in ours.iter().zip(oracle) {
        assert!((a - b).abs() < 1e-6, "ours {:?} vs kasuari {:?}", ours, oracle);
    }
}

fn strong_beats_medium<B: Backend>(b: &mut B) -> Vec<f64> {
    let (a_width, b_width) = (b.var(), b.var());
    assert!(b.add(&[(a_width, 1.0)], -50.0, GreaterOrEqual, Level::Required));
    assert!(b.add(&[(b_width, 1.0)], -50.0, GreaterOrEqual, Level::Required));
    assert!(b.add(&[(a_width, 1.0)], -150.0, Equal, Level::Medium));
    assert!(b.add(&[(b_width, 1.0)], -150.0, Equal, Level::Medium));
    assert!(b.add(&[(a_width, 1.0)], -250.0, Equal, Level::Strong));
    assert!(b.add(
        &[(a_width, 1.0), (b_width, 1.0)],
        -300.0,
        LessOrEqual,
        Level::Required
    ));
    b.values(&[a_width, b_width])
}

fn offsets_and_midpoint<B: Backend>(b: &mut B) -> Vec<f64> {
    let (a_x, b_x, b_width, c_x, d_x) = (b.var(), b.var(), b.var(), b.var(), b.var());
    // a.x == b.x
    assert!(b.add(&[(a_x, 1.0), (b_x, -1.0)], 0.0, Equal, Level::Required));
    // c.x == b.x + b.width + 20
    assert!(b.add(
        &[(c_x, 1.0), (b_x, -1.0), (b_width, -1.0)],
        -20.0,
        Equal,
        Level::Required
    ));
    // 2 d.x == a.x + c.x
    assert!(b.add(
        &[(d_x, 2.0), (a_x, -1.0), (c_x, -1.0)],
        0.0,
        Equal,
        Level::Required
    ));
    b.edit(b_x, Level::Strong);
    b.edit(b_width, Level::Strong);
    b.suggest(b_x, 0.0);
    b.suggest(b_width, 100.0);
    b.values(&[a_x, c_x, d_x])
}

fn clamped_edits<B: Backend>(b: &mut B, suggestions: &[f64]) -> Vec<f64> {
    let (x, y) = (b.var(), b.var());
    assert!(b.add(&[(x, 1.0)], -10.0, GreaterOrEqual, Level::Required));
    assert!(b.add(&[(x, 1.0)], -90.0, LessOrEqual, Level::Required));
    // y trails x by 5 unless that pushes it past 80
    assert!(b.add(&[(y, 1.0), (x, -1.0)], -5.0, Equal, Level::Medium));
    assert!(b.add(&[(y, 1.0)], -80.0, LessOrEqual, Level::Required));
    b.edit(x, Level::Strong);

    let mut trace = Vec::new();
    for value in suggestions {
        b.suggest(x, *value);
        trace.extend(b.values(&[x, y]));
    }
    trace
}

fn levels_stack<B: Backend>(b: &mut B) -> Vec<f64> {
    let (x, y) = (b.var(), b.var());
    assert!(b.add(&[(x, 1.0)], -10.0, Equal, Level::Weak));
    assert!(b.add(&[(x, 1.0)], -20.0, Equal, Level::Medium));
    assert!(b.add(&[(x, 1.0)], -30.0, Equal, Level::Strong));
    assert!(b.add(&[(x, 1.0), (y, 1.0)], -100.0, Equal, Level::Required));
    assert!(b.add(&[(y, 1.0)], -80.0, Equal, Level::Medium));
    b.values(&[x, y])
}

fn rejected_conflict<B: Backend>(b: &mut B) -> Vec<f64> {
    let x = b.var();
    assert!(b.add(&[(x, 1.0)], -5.0, Equal, Level::Required));
    let before = b.values(&[x]);
    assert!(!b.add(&[(x, 1.0)], -6.0, Equal, Level::Required));
    let mut after = b.values(&[x]);
    after.extend(before);
    after
}

#[test]
fn agrees_on_strong_beating_medium() {
    let ours = strong_beats_medium(&mut Ours::default());
    assert_agree(&ours, &strong_beats_medium(&mut Oracle::default()));
    assert_agree(&ours, &[250.0, 50.0]);
}

#[test]
fn agrees_on_offsets_and_midpoint() {
    let ours = offsets_and_midpoint(&mut Ours::default());
    assert_agree(&ours, &offsets_and_midpoint(&mut Oracle::default()));
    assert_agree(&ours, &[0.0, 120.0, 60.0]);
}

#[test]
fn agrees_on_clamped_edit_sequence() {
    let suggestions = [50.0, 200.0, -5.0, 42.0, 78.0, 90.0];
    let ours = clamped_edits(&mut Ours::default(), &suggestions);
    assert_agree(&ours, &clamped_edits(&mut Oracle::default(), &suggestions));
}

#[test]
fn agrees_on_strength_levels() {
    let ours = levels_stack(&mut Ours::default());
    assert_agree(&ours, &levels_stack(&mut Oracle::default()));
    assert_agree(&ours, &[30.0, 70.0]);
}

#[test]
fn agrees_on_rejected_conflict() {
    let ours = rejected_conflict(&mut Ours::default());
    assert_agree(&ours, &rejected_conflict(&mut Oracle::default()));
    assert_agree(&ours, &[5.0, 5.0]);
}
