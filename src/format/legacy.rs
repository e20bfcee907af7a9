//! Annotation schemas found in label files.
//!
//! Older files store a flat top-level `shapes` list of shape records; newer
//! files store an `annotations` tree. Files written by [`LabelFile::save`]
//! keep the `shapes` key but store full annotations in it, so a `shapes`
//! entry may be either form. A file is read into exactly one
//! [`AnnotationSchema`] and immediately converted into the canonical
//! `Vec<Annotation>`, so nothing downstream has to know which schema a file
//! used.
//!
//! [`LabelFile::save`]: crate::format::LabelFile::save

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::format::error::FormatError;
use crate::model::{Annotation, Shape, ShapeRecord};

/// Top-level key of the flat shape schema.
pub const SHAPES_KEY: &str = "shapes";

/// Top-level key of the annotation tree schema.
pub const ANNOTATIONS_KEY: &str = "annotations";

/// One entry of a `shapes` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ShapeEntry {
    /// Flat record (`label`, `points`, `shape_type`, colors)
    Record(ShapeRecord),
    /// Full annotation (`name`, `type`, `shapes`, `attributes`, `children`)
    Annotation(Annotation),
}

impl ShapeEntry {
    /// Resolve into an annotation, migrating flat records.
    pub fn into_annotation(self) -> Annotation {
        match self {
            ShapeEntry::Record(record) => migrate_shape_record(record),
            ShapeEntry::Annotation(annotation) => annotation,
        }
    }
}

/// The annotation payload of a label file, in whichever schema it was stored.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationSchema {
    /// `shapes` list
    Legacy(Vec<ShapeEntry>),
    /// `annotations` tree
    Current(Vec<Annotation>),
}

impl AnnotationSchema {
    /// Pick the schema of a parsed document. `shapes` wins if both keys exist.
    pub fn from_document(data: &Map<String, Value>) -> Result<Self, FormatError> {
        if let Some(shapes) = data.get(SHAPES_KEY) {
            let entries: Vec<ShapeEntry> = serde_json::from_value(shapes.clone())?;
            return Ok(AnnotationSchema::Legacy(entries));
        }

        let annotations = data
            .get(ANNOTATIONS_KEY)
            .ok_or_else(|| FormatError::missing_field(ANNOTATIONS_KEY))?;
        Ok(AnnotationSchema::Current(serde_json::from_value(
            annotations.clone(),
        )?))
    }

    /// Resolve into the canonical annotation list.
    pub fn into_annotations(self) -> Vec<Annotation> {
        match self {
            AnnotationSchema::Legacy(entries) => entries
                .into_iter()
                .map(ShapeEntry::into_annotation)
                .collect(),
            AnnotationSchema::Current(annotations) => annotations,
        }
    }
}

/// Convert flat shape records into single-shape `"label"` annotations.
///
/// Each record's points are appended in order and the shape is then closed.
/// The shape kind defaults to polygon when the record does not name one.
pub fn migrate_legacy_shapes(records: Vec<ShapeRecord>) -> Vec<Annotation> {
    records.into_iter().map(migrate_shape_record).collect()
}

fn migrate_shape_record(record: ShapeRecord) -> Annotation {
    let mut shape = Shape::new(record.shape_type.unwrap_or_default())
        .with_line_color(record.line_color)
        .with_fill_color(record.fill_color);
    for point in record.points {
        shape.add_point(point);
    }
    shape.close();

    log::trace!(
        "Migrated legacy {} shape '{}' with {} points",
        shape.shape_type.name(),
        record.label,
        shape.points.len()
    );

    Annotation::new(record.label).with_shape(shape)
}
