//! Constraint strengths and the symbolic weights the objective is built from

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign};

use super::row::near_zero;

/// Priority level of a constraint, ordered `Weak < Medium < Strong < Required`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
    Required,
}

impl StrengthLevel {
    /// Names accepted by [`StrengthLevel::from_name`]
    pub const NAMES: &'static [&'static str] = &["required", "strong", "medium", "weak"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "required" => Some(Self::Required),
            "strong" => Some(Self::Strong),
            "medium" => Some(Self::Medium),
            "weak" => Some(Self::Weak),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Strong => "strong",
            Self::Medium => "medium",
            Self::Weak => "weak",
        }
    }
}

/// A strength level plus a weight within that level.
///
/// Levels are strictly prioritized: no amount of weight at a lower level can
/// outweigh a higher level. The weight only arbitrates between constraints of
/// the same level that cannot all be satisfied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strength {
    level: StrengthLevel,
    weight: f64,
}

impl Strength {
    pub const REQUIRED: Strength = Strength::new(StrengthLevel::Required);
    pub const STRONG: Strength = Strength::new(StrengthLevel::Strong);
    pub const MEDIUM: Strength = Strength::new(StrengthLevel::Medium);
    pub const WEAK: Strength = Strength::new(StrengthLevel::Weak);

    pub const fn new(level: StrengthLevel) -> Self {
        Self { level, weight: 1.0 }
    }

    /// Same level, different weight. Negative and NaN weights clamp to zero.
    pub fn with_weight(self, weight: f64) -> Self {
        Self {
            level: self.level,
            weight: weight.max(0.0),
        }
    }

    pub fn level(&self) -> StrengthLevel {
        self.level
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_required(&self) -> bool {
        self.level == StrengthLevel::Required
    }

    /// Objective coefficient for one unit of violation at this strength
    pub(crate) fn symbolic_weight(&self) -> SymbolicWeight {
        match self.level {
            // required constraints never enter the objective
            StrengthLevel::Required => SymbolicWeight::ZERO,
            StrengthLevel::Strong => SymbolicWeight([self.weight, 0.0, 0.0]),
            StrengthLevel::Medium => SymbolicWeight([0.0, self.weight, 0.0]),
            StrengthLevel::Weak => SymbolicWeight([0.0, 0.0, self.weight]),
        }
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl PartialOrd for Strength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.level.cmp(&other.level) {
            Ordering::Equal => self.weight.partial_cmp(&other.weight),
            ordering => Some(ordering),
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weight == 1.0 {
            write!(f, "{}", self.level.name())
        } else {
            write!(f, "{}({})", self.level.name(), self.weight)
        }
    }
}

/// Objective coefficient with one component per non-required level
/// (strong, medium, weak), compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct SymbolicWeight(pub(crate) [f64; 3]);

impl SymbolicWeight {
    pub(crate) const ZERO: SymbolicWeight = SymbolicWeight([0.0; 3]);

    /// A weight living entirely in the most significant component
    pub(crate) fn scalar(value: f64) -> Self {
        Self([value, 0.0, 0.0])
    }

    pub(crate) fn scaled(self, factor: f64) -> Self {
        let [a, b, c] = self.0;
        Self([a * factor, b * factor, c * factor])
    }

    pub(crate) fn is_near_zero(&self) -> bool {
        self.0.iter().all(|c| near_zero(*c))
    }

    /// Lexicographically below zero: the first significant component is negative
    pub(crate) fn is_negative(&self) -> bool {
        self.0
            .iter()
            .find(|c| !near_zero(**c))
            .is_some_and(|c| *c < 0.0)
    }

    pub(crate) fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            let difference = a - b;
            if !near_zero(difference) {
                return if difference < 0.0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
        }
        Ordering::Equal
    }
}

impl Add for SymbolicWeight {
    type Output = SymbolicWeight;
    fn add(self, rhs: SymbolicWeight) -> SymbolicWeight {
        let [a, b, c] = self.0;
        let [x, y, z] = rhs.0;
        SymbolicWeight([a + x, b + y, c + z])
    }
}

impl AddAssign for SymbolicWeight {
    fn add_assign(&mut self, rhs: SymbolicWeight) {
        *self = *self + rhs;
    }
}

impl fmt::Display for SymbolicWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "[{}, {}, {}]", a, b, c)
    }
}
