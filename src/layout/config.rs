//! Configuration for the packer

use crate::solver::Strength;

/// Strengths the packer uses for the constraints it generates itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackerConfig {
    /// Strength of the container width/height edit variables
    pub edit_strength: Strength,

    /// Strength of each item's `width == natural` / `height == natural`
    pub natural_strength: Strength,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            edit_strength: Strength::STRONG,
            natural_strength: Strength::MEDIUM,
        }
    }
}

impl PackerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the edit variable strength.
    ///
    /// A required strength is not a valid edit strength; the packer reports
    /// [`SolverError::BadRequiredStrength`](crate::solver::SolverError) on its
    /// next rebuild.
    pub fn with_edit_strength(mut self, strength: Strength) -> Self {
        self.edit_strength = strength;
        self
    }

    /// Set the strength items hold their natural size with
    pub fn with_natural_strength(mut self, strength: Strength) -> Self {
        self.natural_strength = strength;
        self
    }
}
