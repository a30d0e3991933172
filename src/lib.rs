//! Constraint Packer - linear-constraint layout for a container of items
//!
//! This library provides an incremental Cassowary solver, a packer that lays
//! out items against it, and a small textual constraint language for scenes.
//!
//! # Example
//!
//! ```rust
//! use constraint_packer::layout_scene;
//!
//! let rects = layout_scene(r#"
//!     constraints = ["a.right <= b.left"]
//!
//!     [container]
//!     width = 300.0
//!     height = 100.0
//!
//!     [[item]]
//!     name = "a"
//!     natural = [100.0, 40.0]
//!
//!     [[item]]
//!     name = "b"
//!     natural = [100.0, 40.0]
//! "#).unwrap();
//!
//! assert_eq!(rects.len(), 2);
//! assert!(rects[0].1.right() <= rects[1].1.x + 1e-9);
//! ```

pub mod error;
pub mod layout;
pub mod parser;
pub mod scene;
pub mod solver;

pub use error::ParseError;
pub use layout::{
    ChangeNotifier, ConstrainedItem, ItemId, LayoutError, LayoutItem, Packer, PackerConfig,
    Point, Property, Rect, Size,
};
pub use parser::parse_constraint;
pub use scene::{Scene, SceneError, SceneItem, SceneLayout};
pub use solver::{
    Constraint, Expression, RelationalOperator, Solver, SolverError, Strength, Variable,
    WeightedRelation,
};

/// Lay out a TOML scene with the default configuration
///
/// Dimensions the `[container]` table leaves out are taken from the
/// scene's natural size.
pub fn layout_scene(source: &str) -> Result<Vec<(String, Rect)>, SceneError> {
    layout_scene_with_config(source, PackerConfig::default())
}

/// Lay out a TOML scene with a custom packer configuration
///
/// # Example
///
/// ```rust
/// use constraint_packer::{layout_scene_with_config, PackerConfig, Strength};
///
/// let config = PackerConfig::new().with_natural_strength(Strength::WEAK);
/// let rects = layout_scene_with_config(r#"
///     [[item]]
///     name = "solo"
///     natural = [80.0, 30.0]
/// "#, config).unwrap();
///
/// assert_eq!(rects[0].1.width, 80.0);
/// ```
pub fn layout_scene_with_config(
    source: &str,
    config: PackerConfig,
) -> Result<Vec<(String, Rect)>, SceneError> {
    let scene = Scene::from_str(source)?;
    let mut layout = SceneLayout::build(&scene, config)?;

    let size = match (scene.container.width, scene.container.height) {
        (Some(width), Some(height)) => Size::new(width, height),
        (width, height) => {
            let (_, natural) = layout.preferred_size()?;
            Size::new(
                width.unwrap_or(natural.width),
                height.unwrap_or(natural.height),
            )
        }
    };
    layout.allocate(size)?;

    Ok(layout.results())
}
