//! Annotation tree and the flat shape records of older label files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::color::Color;
use super::shape::{Point, Shape, ShapeType};

/// Annotation type assigned when a file does not specify one.
pub const DEFAULT_ANNOTATION_TYPE: &str = "label";

fn default_annotation_type() -> String {
    DEFAULT_ANNOTATION_TYPE.to_string()
}

/// One labeled region: its shapes, free-form attributes and nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Label text
    pub name: String,

    /// Annotation category (`"label"`, `"guide"`, or user defined)
    #[serde(rename = "type", default = "default_annotation_type")]
    pub kind: String,

    /// Geometry, in drawing order
    #[serde(default)]
    pub shapes: Vec<Shape>,

    /// Arbitrary key/value attributes
    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Nested annotations (label hierarchies)
    #[serde(default)]
    pub children: Vec<Annotation>,
}

impl Annotation {
    /// Create a `"label"` annotation with no shapes, attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_annotation_type(),
            shapes: Vec::new(),
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    /// Add a shape to this annotation.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Add a nested child annotation.
    pub fn with_child(mut self, child: Annotation) -> Self {
        self.children.push(child);
        self
    }
}

/// Flat shape record: the `shapes` entries of a label file.
///
/// This is the pre-annotation schema. Loading migrates each record into a
/// single-shape [`Annotation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub label: String,

    pub points: Vec<Point>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeType>,

    #[serde(default)]
    pub line_color: Option<Color>,

    #[serde(default)]
    pub fill_color: Option<Color>,

    /// Any other per-shape fields (e.g. `flags`, `group_id`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShapeRecord {
    /// Create a record with the given label and points and no colors.
    pub fn new(label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            points,
            shape_type: None,
            line_color: None,
            fill_color: None,
            extra: Map::new(),
        }
    }

    /// Set the shape type.
    pub fn with_shape_type(mut self, shape_type: ShapeType) -> Self {
        self.shape_type = Some(shape_type);
        self
    }
}
