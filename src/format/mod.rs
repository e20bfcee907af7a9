//! Label file loading and saving.
//!
//! A label file is a JSON document describing the annotations of a single
//! image. This module provides:
//!
//! - [`LabelFile`]: the in-memory document with `load`/`save`
//! - [`AnnotationSchema`]: the flat `shapes` and `annotations` tree schemas,
//!   and the migration from the former to the latter
//! - Image helpers that normalize orientation and reconcile declared image
//!   dimensions with the decoded pixels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use label_store::format::LabelFile;
//!
//! let mut label_file = LabelFile::open("photos/cat.json")?;
//! println!("{} annotations", label_file.annotations.len());
//! label_file.save_document("photos/cat_copy.json", false)?;
//! # Ok::<(), label_store::format::LabelFileError>(())
//! ```

mod error;
mod image_bytes;
mod label_file;
mod legacy;

#[cfg(test)]
mod tests;

pub use error::{FormatError, LabelFileError};
pub use image_bytes::{
    check_image_dimensions, image_b64_to_array, image_bytes_to_array, load_image_bytes,
};
pub use label_file::{Flags, LabelFile, SavePayload, VERSION};
pub use legacy::{ANNOTATIONS_KEY, AnnotationSchema, SHAPES_KEY, ShapeEntry, migrate_legacy_shapes};
