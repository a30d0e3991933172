//! Constraint-based container layout
//!
//! A [`Packer`] owns a [`Solver`](crate::solver::Solver) and a set of
//! registered items. Each item contributes four geometry variables and a few
//! intrinsic constraints derived from its preferred size; callers relate items
//! to each other and to the container with further constraints. Allocating the
//! container suggests its size, resolves, and pushes the result to every item.

pub mod config;
pub mod constrained;
pub mod error;
pub mod item;
pub mod packer;
pub mod types;

pub use config::PackerConfig;
pub use constrained::ConstrainedItem;
pub use error::LayoutError;
pub use item::{ChangeNotifier, ItemId, LayoutItem};
pub use packer::Packer;
pub use types::*;
