//! Scenes: a container, its items and their constraints, described in TOML
//!
//! ```toml
//! constraints = ["a.width + b.width <= container.width"]
//!
//! [container]
//! width = 300.0
//! height = 100.0
//!
//! [[item]]
//! name = "a"
//! minimum = [50.0, 20.0]
//! natural = [150.0, 40.0]
//! constraints = ["a.width == 250 @strong"]
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::error::{ParseError, Span};
use crate::layout::{
    ChangeNotifier, ItemId, LayoutError, LayoutItem, Packer, PackerConfig, Rect, Size,
};
use crate::parser::{parse_constraint, ConstraintDecl, LinearExpr};
use crate::solver::{Constraint, Expression};

/// Name under which constraints refer to the container itself
pub const CONTAINER: &str = "container";

/// Errors that can occur when loading or laying out a scene
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scene TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid constraint '{text}': {}", format_parse_errors(.errors))]
    Parse {
        text: String,
        errors: Vec<ParseError>,
    },

    #[error("undefined item '{name}' in constraint '{text}'")]
    UndefinedItem {
        name: String,
        text: String,
        span: Span,
        suggestions: Vec<String>,
    },

    #[error("duplicate item '{name}'")]
    DuplicateItem { name: String },

    #[error("invalid item '{name}': {reason}")]
    InvalidItem { name: String, reason: String },

    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SceneError {
    /// Human readable report, with source context for constraint errors
    pub fn report(&self) -> String {
        match self {
            SceneError::Parse { text, errors } => errors
                .iter()
                .map(|e| e.format(text, "constraint"))
                .collect::<Vec<_>>()
                .join("\n"),
            SceneError::UndefinedItem {
                name,
                text,
                span,
                suggestions,
            } => {
                let mut message = format!("undefined item '{}'", name);
                if !suggestions.is_empty() {
                    message.push_str(&format!(" (did you mean: {}?)", suggestions.join(", ")));
                }
                ParseError::syntax(span.clone(), message).format(text, "constraint")
            }
            other => other.to_string(),
        }
    }

    /// Suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UndefinedItem { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}

/// TOML structure of a scene
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    /// Container-level constraints
    #[serde(default)]
    pub constraints: Vec<String>,

    #[serde(default)]
    pub container: ContainerSpec,

    #[serde(default, rename = "item")]
    pub items: Vec<ItemSpec>,
}

/// Size the container is allocated with, if the scene specifies one
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub minimum: [f64; 2],
    pub natural: [f64; 2],
    /// Constraints torn down together with this item
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Scene {
    /// Load scene from TOML file
    pub fn from_file(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load scene from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(content)?)
    }

    /// Container size from the `[container]` table, missing dimensions zero
    pub fn container_size(&self) -> Size {
        Size::new(
            self.container.width.unwrap_or(0.0),
            self.container.height.unwrap_or(0.0),
        )
    }
}

/// A scene item: fixed minimum and natural sizes, records the geometry it gets
#[derive(Debug, Clone)]
pub struct SceneItem {
    name: String,
    minimum: Size,
    natural: Size,
    geometry: Option<Rect>,
    notifier: Option<ChangeNotifier>,
}

impl SceneItem {
    pub fn new(name: impl Into<String>, minimum: Size, natural: Size) -> Self {
        Self {
            name: name.into(),
            minimum,
            natural,
            geometry: None,
            notifier: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    /// Change the natural size and tell the packer about it
    pub fn set_natural(&mut self, natural: Size) {
        self.natural = natural;
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }

    /// Change the minimum size and tell the packer about it
    pub fn set_minimum(&mut self, minimum: Size) {
        self.minimum = minimum;
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }
}

impl LayoutItem for SceneItem {
    fn preferred_size(&self) -> (Size, Size) {
        (self.minimum, self.natural)
    }

    fn apply_geometry(&mut self, rect: Rect) {
        self.geometry = Some(rect);
    }

    fn attached(&mut self, _id: ItemId, notifier: ChangeNotifier) {
        self.notifier = Some(notifier);
    }
}

struct Entry {
    name: String,
    id: ItemId,
    item: Rc<RefCell<SceneItem>>,
}

/// A scene loaded into a [`Packer`]
pub struct SceneLayout {
    packer: Packer,
    entries: Vec<Entry>,
}

impl SceneLayout {
    /// Register every item, then lower and attach every constraint
    pub fn build(scene: &Scene, config: PackerConfig) -> Result<Self, SceneError> {
        let mut layout = SceneLayout {
            packer: Packer::with_config(config),
            entries: Vec::new(),
        };

        let mut ids = Vec::with_capacity(scene.items.len());
        for spec in &scene.items {
            ids.push(layout.insert_item(spec)?);
        }
        for (spec, id) in scene.items.iter().zip(ids) {
            for text in &spec.constraints {
                let constraint = layout.lower(text)?;
                layout.packer.add_item_constraint(id, constraint)?;
            }
        }
        for text in &scene.constraints {
            layout.add_constraint(text)?;
        }

        debug!(
            items = layout.entries.len(),
            constraints = scene.constraints.len(),
            "scene built"
        );
        Ok(layout)
    }

    fn insert_item(&mut self, spec: &ItemSpec) -> Result<ItemId, SceneError> {
        let name = spec.name.as_str();
        if name == CONTAINER {
            return Err(SceneError::InvalidItem {
                name: name.to_string(),
                reason: format!("'{}' names the container", CONTAINER),
            });
        }
        if self.id_of(name).is_some() {
            return Err(SceneError::DuplicateItem {
                name: name.to_string(),
            });
        }
        let minimum = Size::from((spec.minimum[0], spec.minimum[1]));
        let natural = Size::from((spec.natural[0], spec.natural[1]));
        if [minimum.width, minimum.height, natural.width, natural.height]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(SceneError::InvalidItem {
                name: name.to_string(),
                reason: "sizes must be finite and non-negative".to_string(),
            });
        }

        let item = Rc::new(RefCell::new(SceneItem::new(name, minimum, natural)));
        let id = self.packer.register_item(&item);
        self.entries.push(Entry {
            name: name.to_string(),
            id,
            item,
        });
        Ok(id)
    }

    fn id_of(&self, name: &str) -> Option<ItemId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Parse a constraint and resolve its names against this scene
    pub fn lower(&self, text: &str) -> Result<Constraint, SceneError> {
        let decl = parse_constraint(text).map_err(|errors| SceneError::Parse {
            text: text.to_string(),
            errors,
        })?;
        self.lower_decl(&decl, text)
    }

    fn lower_decl(&self, decl: &ConstraintDecl, text: &str) -> Result<Constraint, SceneError> {
        let lhs = self.lower_expr(&decl.lhs, text)?;
        let rhs = self.lower_expr(&decl.rhs, text)?;
        Ok(Constraint::new(lhs - rhs, decl.operator, decl.strength))
    }

    fn lower_expr(&self, expr: &LinearExpr, text: &str) -> Result<Expression, SceneError> {
        let mut result = Expression::default();
        for operand in &expr.operands {
            let Some(reference) = &operand.node.reference else {
                result = result + operand.node.coefficient;
                continue;
            };
            let target = reference.target.node.as_str();
            let property = reference.property.node;
            let value = if target == CONTAINER {
                self.packer.property(property)
            } else {
                self.id_of(target)
                    .and_then(|id| self.packer.item(id))
                    .map(|item| item.property(property))
                    .ok_or_else(|| SceneError::UndefinedItem {
                        name: target.to_string(),
                        text: text.to_string(),
                        span: reference.target.span.clone(),
                        suggestions: find_similar(self.names(), target, 2),
                    })?
            };
            result = result + value * operand.node.coefficient;
        }
        Ok(result)
    }

    /// Parse and add a container-level constraint
    pub fn add_constraint(&mut self, text: &str) -> Result<Constraint, SceneError> {
        let constraint = self.lower(text)?;
        self.packer.add_constraint(constraint.clone())?;
        Ok(constraint)
    }

    /// Unregister an item and every constraint mentioning it
    pub fn remove_item(&mut self, name: &str) -> Result<(), SceneError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| SceneError::UndefinedItem {
                name: name.to_string(),
                text: name.to_string(),
                span: 0..name.len(),
                suggestions: find_similar(self.names(), name, 2),
            })?;
        let entry = self.entries.remove(index);
        self.packer.unregister_item(entry.id)?;
        Ok(())
    }

    pub fn allocate(&mut self, size: Size) -> Result<(), SceneError> {
        Ok(self.packer.allocate(size)?)
    }

    pub fn preferred_size(&self) -> Result<(Size, Size), SceneError> {
        Ok(self.packer.preferred_size()?)
    }

    /// Item names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn item(&self, name: &str) -> Option<&Rc<RefCell<SceneItem>>> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.item)
    }

    /// Geometry last applied to the named item
    pub fn geometry(&self, name: &str) -> Option<Rect> {
        self.item(name).and_then(|item| item.borrow().geometry())
    }

    /// `(name, geometry)` for every item that has been laid out, in registration order
    pub fn results(&self) -> Vec<(String, Rect)> {
        self.entries
            .iter()
            .filter_map(|e| e.item.borrow().geometry().map(|rect| (e.name.clone(), rect)))
            .collect()
    }

    pub fn packer(&self) -> &Packer {
        &self.packer
    }

    pub fn packer_mut(&mut self) -> &mut Packer {
        &mut self.packer
    }
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    if a_chars.is_empty() {
        return n;
    }
    if n == 0 {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=n).collect();
    let mut current = vec![0usize; n + 1];
    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[n]
}

/// Find similar names within a maximum edit distance, closest first, at most three
fn find_similar<'a>(
    defined: impl Iterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<(String, usize)> = defined
        .chain(std::iter::once(CONTAINER))
        .filter(|name| seen.insert(*name))
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            if dist <= max_distance && dist > 0 {
                Some((name.to_string(), dist))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by_key(|(_, d)| *d);
    candidates
        .into_iter()
        .map(|(name, _)| name)
        .take(3)
        .collect()
}
