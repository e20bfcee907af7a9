//! Geometric shapes attached to annotations.

use serde::{Deserialize, Serialize};

use super::color::Color;

/// A point in image coordinates, serialized as `[x, y]`.
pub type Point = (f64, f64);

/// Kind of geometry a shape describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    /// Closed polygon (the default when a file does not say otherwise)
    #[default]
    Polygon,
    /// Axis-aligned rectangle given by two corners
    Rectangle,
    /// Circle given by center and a point on the rim
    Circle,
    /// Single line segment
    Line,
    /// Single point marker
    Point,
    /// Open polyline
    Linestrip,
}

impl ShapeType {
    /// Get the on-disk name of this shape type.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeType::Polygon => "polygon",
            ShapeType::Rectangle => "rectangle",
            ShapeType::Circle => "circle",
            ShapeType::Line => "line",
            ShapeType::Point => "point",
            ShapeType::Linestrip => "linestrip",
        }
    }
}

/// One geometric shape: kind, ordered points and optional colors.
///
/// A shape is built point by point and then closed; once closed it no
/// longer accepts points. Shapes read from a file are complete and start
/// out closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type", default)]
    pub shape_type: ShapeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_color: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,

    #[serde(default)]
    pub points: Vec<Point>,

    #[serde(skip, default = "closed_on_load")]
    closed: bool,
}

fn closed_on_load() -> bool {
    true
}

impl Shape {
    /// Create an empty, open shape of the given kind.
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            line_color: None,
            fill_color: None,
            points: Vec::new(),
            closed: false,
        }
    }

    /// Append a point. Returns false (and ignores the point) if the shape
    /// is already closed.
    pub fn add_point(&mut self, point: Point) -> bool {
        if self.closed {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Seal the shape; no further points are accepted.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the shape has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set the stroke color.
    pub fn with_line_color(mut self, color: Option<Color>) -> Self {
        self.line_color = color;
        self
    }

    /// Set the fill color.
    pub fn with_fill_color(mut self, color: Option<Color>) -> Self {
        self.fill_color = color;
        self
    }
}
