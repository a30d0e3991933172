//! Geometry types shared by the packer and its items

use std::fmt;

/// A 2D point in the container's coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Both dimensions clamped to be non-negative
    pub fn clamped(self) -> Self {
        Self::new(self.width.max(0.0), self.height.max(0.0))
    }
}

impl From<(f64, f64)> for Size {
    fn from((width, height): (f64, f64)) -> Self {
        Self::new(width, height)
    }
}

/// An axis-aligned rectangle: the geometry handed to an item after a resolve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} w={} h={}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Geometric property of an item or of the container.
///
/// `Left`, `Top`, `Width` and `Height` are backed by solver variables; the rest
/// are derived expressions over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Left,
    Top,
    Width,
    Height,
    /// left + width
    Right,
    /// top + height
    Bottom,
    /// left + width / 2
    CenterX,
    /// top + height / 2
    CenterY,
}

impl Property {
    /// Names accepted by [`Property::from_name`]
    pub const NAMES: &'static [&'static str] = &[
        "left", "top", "width", "height", "right", "bottom", "center_x", "center_y",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" | "x" => Some(Self::Left),
            "top" | "y" => Some(Self::Top),
            "width" => Some(Self::Width),
            "height" => Some(Self::Height),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "center_x" => Some(Self::CenterX),
            "center_y" => Some(Self::CenterY),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Width => "width",
            Self::Height => "height",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::CenterX => "center_x",
            Self::CenterY => "center_y",
        }
    }

    /// Whether the property is a plain variable rather than a derived expression
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Left | Self::Top | Self::Width | Self::Height)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
