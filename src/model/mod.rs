//! Data models for label documents.

mod annotation;
mod color;
mod shape;

pub use annotation::{Annotation, DEFAULT_ANNOTATION_TYPE, ShapeRecord};
pub use color::{Color, ParseColorError};
pub use shape::{Point, Shape, ShapeType};
