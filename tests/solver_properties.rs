//! Property-based tests for the incremental solver.
//! Verifies invariants hold for generated constraint systems, not just fixed examples.

use std::collections::HashSet;

use constraint_packer::solver::WeightedRelation::*;
use constraint_packer::{Constraint, Solver, SolverError, Strength, Variable};

const TOLERANCE: f64 = 1e-6;

/// A chain `x0 >= start`, `x[i+1] >= x[i] + gap[i]` with weak preferences on every variable
fn chain(
    start: f64,
    gaps: &[f64],
    preferences: &[f64],
) -> (Vec<Variable>, Vec<Constraint>, Vec<Constraint>) {
    let variables: Vec<Variable> = (0..=gaps.len()).map(|_| Variable::new()).collect();
    let mut required = vec![variables[0] | GE(Strength::REQUIRED) | start];
    for (pair, gap) in variables.windows(2).zip(gaps) {
        required.push(pair[1] | GE(Strength::REQUIRED) | pair[0] + *gap);
    }
    let preferred = variables
        .iter()
        .zip(preferences.iter().cycle())
        .map(|(v, p)| *v | EQ(Strength::WEAK) | *p)
        .collect();
    (variables, required, preferred)
}

/// Three variables under jointly satisfiable required bounds plus preferences
/// that pull against them. Returns the pool and which entries are required.
fn mixed_pool(start: f64, gap: f64, preference: f64, cap: f64) -> (Vec<Constraint>, Vec<bool>) {
    let (a, b, c) = (Variable::new(), Variable::new(), Variable::new());
    let pool = vec![
        (a | GE(Strength::REQUIRED) | start, true),
        (b | GE(Strength::REQUIRED) | a + gap, true),
        (c | GE(Strength::REQUIRED) | b + gap, true),
        (c | GE(Strength::REQUIRED) | a, true),
        (a | EQ(Strength::WEAK) | preference, false),
        (b | EQ(Strength::MEDIUM) | preference, false),
        (c | LE(Strength::STRONG) | cap, false),
        (a + b | EQ(Strength::WEAK) | c, false),
    ];
    pool.into_iter().unzip()
}

proptest::proptest! {
    /// Every required constraint holds after a resolve, whatever the weak preferences ask for.
    #[test]
    fn required_constraints_always_hold(
        start in 0u16..500,
        gaps in proptest::collection::vec(0u16..100, 1..6),
        preferences in proptest::collection::vec(0u16..1000, 1..6),
    ) {
        let gaps: Vec<f64> = gaps.into_iter().map(f64::from).collect();
        let preferences: Vec<f64> = preferences.into_iter().map(f64::from).collect();
        let (_, required, preferred) = chain(f64::from(start), &gaps, &preferences);

        let mut solver = Solver::new();
        for constraint in preferred.iter().chain(&required) {
            solver.add_constraint(constraint.clone()).unwrap();
        }
        solver.update_variables().unwrap();

        for constraint in &required {
            assert!(
                constraint.is_satisfied_by(|v| solver.value_of(v), TOLERANCE),
                "violated: {}",
                constraint
            );
        }
    }

    /// An edit variable between required bounds lands on the clamped suggestion.
    #[test]
    fn suggestion_is_clamped_to_required_bounds(
        lo in 0u16..500,
        span in 0u16..500,
        suggestion in 0u16..1500,
    ) {
        let lo = f64::from(lo);
        let hi = lo + f64::from(span);
        let suggestion = f64::from(suggestion);
        let x = Variable::new();

        let mut solver = Solver::new();
        solver.add_constraint(x | GE(Strength::REQUIRED) | lo).unwrap();
        solver.add_constraint(x | LE(Strength::REQUIRED) | hi).unwrap();
        solver.add_edit_variable(x, Strength::STRONG).unwrap();
        solver.suggest_value(x, suggestion).unwrap();
        solver.update_variables().unwrap();

        assert!((solver.value_of(x) - suggestion.clamp(lo, hi)).abs() < TOLERANCE);
    }

    /// A rejected required constraint leaves the tableau exactly as it was.
    #[test]
    fn rejected_constraint_leaves_solver_untouched(
        bound in 0u16..1000,
        overlap in 1u16..100,
        preference in 0u16..1000,
    ) {
        let bound = f64::from(bound);
        let x = Variable::new();

        let mut solver = Solver::new();
        solver.add_constraint(x | EQ(Strength::WEAK) | f64::from(preference)).unwrap();
        solver.add_constraint(x | GE(Strength::REQUIRED) | bound).unwrap();
        let before = solver.dump();

        let conflicting = x | LE(Strength::REQUIRED) | bound - f64::from(overlap);
        assert_eq!(
            solver.add_constraint(conflicting.clone()),
            Err(SolverError::UnsatisfiableConstraint)
        );
        assert_eq!(solver.dump(), before);
        assert!(!solver.has_constraint(&conflicting));

        solver.update_variables().unwrap();
        assert!(solver.value_of(x) >= bound - TOLERANCE);
    }

    /// Resolving twice with nothing new changes nothing and costs no pivots.
    #[test]
    fn resolve_is_idempotent(
        start in 0u16..500,
        gaps in proptest::collection::vec(0u16..100, 1..5),
        preferences in proptest::collection::vec(0u16..1000, 1..5),
        size in 0u16..2000,
    ) {
        let gaps: Vec<f64> = gaps.into_iter().map(f64::from).collect();
        let preferences: Vec<f64> = preferences.into_iter().map(f64::from).collect();
        let (variables, required, preferred) = chain(f64::from(start), &gaps, &preferences);
        let last = variables[variables.len() - 1];

        let mut solver = Solver::new();
        for constraint in required.iter().chain(&preferred) {
            solver.add_constraint(constraint.clone()).unwrap();
        }
        solver.add_edit_variable(last, Strength::STRONG).unwrap();
        solver.suggest_value(last, f64::from(size)).unwrap();
        solver.update_variables().unwrap();
        solver.fetch_changes();

        let values: Vec<f64> = variables.iter().map(|v| solver.value_of(*v)).collect();
        let pivots = solver.pivot_count();

        solver.suggest_value(last, f64::from(size)).unwrap();
        solver.update_variables().unwrap();

        assert!(solver.fetch_changes().is_empty());
        assert_eq!(solver.pivot_count(), pivots);
        let again: Vec<f64> = variables.iter().map(|v| solver.value_of(*v)).collect();
        assert_eq!(values, again);
    }

    /// Removing a constraint gives the same answer as never having added it.
    #[test]
    fn removal_restores_previous_solution(
        lo in 0u16..500,
        preference in 0u16..1000,
        pin in 0u16..1000,
    ) {
        let lo = f64::from(lo);
        let preference = f64::from(preference);
        let x = Variable::new();

        let mut solver = Solver::new();
        solver.add_constraint(x | EQ(Strength::WEAK) | preference).unwrap();
        solver.add_constraint(x | GE(Strength::REQUIRED) | lo).unwrap();

        let pinned = x | EQ(Strength::STRONG) | f64::from(pin);
        solver.add_constraint(pinned.clone()).unwrap();
        solver.update_variables().unwrap();
        assert!((solver.value_of(x) - f64::from(pin).max(lo)).abs() < TOLERANCE);

        solver.remove_constraint(&pinned).unwrap();
        solver.update_variables().unwrap();
        assert!((solver.value_of(x) - preference.max(lo)).abs() < TOLERANCE);
    }

    /// Two solvers fed the same calls agree to the bit.
    #[test]
    fn identical_call_sequences_agree(
        start in 0u16..500,
        gaps in proptest::collection::vec(0u16..100, 1..6),
        preferences in proptest::collection::vec(0u16..1000, 1..6),
    ) {
        let gaps: Vec<f64> = gaps.into_iter().map(f64::from).collect();
        let preferences: Vec<f64> = preferences.into_iter().map(f64::from).collect();
        let (variables, required, preferred) = chain(f64::from(start), &gaps, &preferences);

        let mut first = Solver::new();
        let mut second = Solver::new();
        for constraint in preferred.iter().chain(&required) {
            first.add_constraint(constraint.clone()).unwrap();
            second.add_constraint(constraint.clone()).unwrap();
        }
        first.update_variables().unwrap();
        second.update_variables().unwrap();

        for v in &variables {
            assert_eq!(first.value_of(*v).to_bits(), second.value_of(*v).to_bits());
        }
    }

    /// Interleaved adds and removes, repeats included, track a plain set of
    /// what should be present, and the required part still holds afterwards.
    #[test]
    fn interleaved_adds_and_removes_match_a_set(
        start in 0u16..200,
        gap in 0u16..50,
        preference in 0u16..500,
        cap in 0u16..500,
        ops in proptest::collection::vec((proptest::bool::ANY, 0usize..8), 1..40),
    ) {
        let (pool, required) = mixed_pool(
            f64::from(start),
            f64::from(gap),
            f64::from(preference),
            f64::from(cap),
        );
        let mut present = HashSet::new();
        let mut solver = Solver::new();

        for (add, index) in ops {
            let constraint = &pool[index];
            if add {
                let result = solver.add_constraint(constraint.clone());
                if present.insert(index) {
                    assert_eq!(result, Ok(()));
                } else {
                    assert_eq!(result, Err(SolverError::DuplicateConstraint));
                }
            } else {
                let result = solver.remove_constraint(constraint);
                if present.remove(&index) {
                    assert_eq!(result, Ok(()));
                } else {
                    assert_eq!(result, Err(SolverError::UnknownConstraint));
                }
            }
            assert_eq!(solver.has_constraint(constraint), present.contains(&index));
            assert_eq!(solver.constraint_count(), present.len());
        }

        solver.update_variables().unwrap();
        for index in &present {
            if required[*index] {
                assert!(
                    pool[*index].is_satisfied_by(|v| solver.value_of(v), TOLERANCE),
                    "violated: {}",
                    pool[*index]
                );
            }
        }
        for (index, constraint) in pool.iter().enumerate() {
            assert_eq!(solver.has_constraint(constraint), present.contains(&index));
        }
    }
}
