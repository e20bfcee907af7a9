//! The label document: one image plus its annotations.
//!
//! # File layout
//!
//! A label file is a JSON object:
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "flags": {"occluded": false},
//!   "shapes": [{"label": "cat", "points": [[0, 0], [1, 0], [1, 1]], "shape_type": "polygon"}],
//!   "lineColor": [0, 255, 0, 128],
//!   "fillColor": [255, 0, 0, 128],
//!   "imagePath": "cat.jpg",
//!   "imageData": null,
//!   "imageHeight": 480,
//!   "imageWidth": 640
//! }
//! ```
//!
//! Older files hold flat records like the one above. Files written by this
//! crate store full annotations (type, attributes, children) in `shapes`,
//! and newer tools may carry an `annotations` tree instead; see
//! [`AnnotationSchema`](crate::format::AnnotationSchema).
//! Every top-level key outside the parsed set (including `version` and
//! `shapes`) is kept in [`LabelFile::other_data`] and written back on save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::format::error::{FormatError, LabelFileError};
use crate::format::image_bytes::{
    check_image_bytes_dimensions, check_image_dimensions, decode_image_data, encode_image_data,
    load_image_bytes,
};
use crate::format::legacy::{ANNOTATIONS_KEY, AnnotationSchema, SHAPES_KEY};
use crate::model::{Annotation, Color};

/// Version written to the `version` key of saved files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level keys that are parsed rather than kept in `other_data`.
const RECOGNIZED_KEYS: &[&str] = &[
    "imageData",
    "imagePath",
    "lineColor",
    "fillColor",
    ANNOTATIONS_KEY,
    "labels",
    "flags",
    "imageHeight",
    "imageWidth",
];

/// Residual keys that [`LabelFile::save_document`] writes from the document
/// itself instead of from `other_data`.
const REGENERATED_KEYS: &[&str] = &["version", SHAPES_KEY];

/// Image-level boolean tags.
pub type Flags = BTreeMap<String, bool>;

/// An annotation document for a single image.
#[derive(Debug, Clone, Default)]
pub struct LabelFile {
    /// File this document was loaded from or last saved to (`None` if unsaved)
    pub filename: Option<PathBuf>,

    /// Image path relative to the label file
    pub image_path: Option<String>,

    /// Encoded image bytes (not base64)
    pub image_data: Option<Vec<u8>>,

    /// Image height, reconciled against the decoded image when available
    pub image_height: Option<u32>,

    /// Image width, reconciled against the decoded image when available
    pub image_width: Option<u32>,

    /// Annotations in document order
    pub annotations: Vec<Annotation>,

    /// Image-level flags
    pub flags: Flags,

    /// Default stroke color
    pub line_color: Option<Color>,

    /// Default fill color
    pub fill_color: Option<Color>,

    /// Unrecognized top-level fields, preserved across load and save
    pub other_data: Map<String, Value>,
}

impl LabelFile {
    /// File extension of label documents (compared case-insensitively).
    pub const SUFFIX: &'static str = ".json";

    /// Create an empty, unsaved document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LabelFileError> {
        let mut label_file = Self::new();
        label_file.load(path)?;
        Ok(label_file)
    }

    /// Check whether a path names a label document, by suffix only.
    pub fn is_label_file(path: impl AsRef<Path>) -> bool {
        let extension = Self::SUFFIX.trim_start_matches('.');
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Replace this document with the contents of `path`.
    ///
    /// The document is only modified once the whole file has been parsed
    /// and its image resolved; on error it is left exactly as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), LabelFileError> {
        let path = path.as_ref();
        log::info!("Loading label file from {:?}", path);

        let loaded = read_document(path).map_err(|source| LabelFileError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        *self = loaded;

        log::info!(
            "Loaded {} annotations ({} unrecognized fields kept)",
            self.annotations.len(),
            self.other_data.len()
        );
        Ok(())
    }

    /// Write a label file and record `path` as this document's filename.
    ///
    /// The file content comes entirely from `payload`, not from the
    /// document's fields; see [`LabelFile::save_document`] for that. The
    /// filename is only updated once the write has succeeded.
    pub fn save(
        &mut self,
        path: impl AsRef<Path>,
        payload: &SavePayload<'_>,
    ) -> Result<(), LabelFileError> {
        let path = path.as_ref();
        log::info!("Saving label file to {:?}", path);

        write_document(path, payload).map_err(|source| LabelFileError::Save {
            path: path.to_path_buf(),
            source,
        })?;
        self.filename = Some(path.to_path_buf());

        log::info!("Saved {} annotations", payload.shapes.len());
        Ok(())
    }

    /// Save this document's own state to `path`.
    ///
    /// The full annotation tree is written under `shapes`. The image is
    /// embedded only when `store_image_data` is set. A `shapes` or `version`
    /// entry carried over in `other_data` from the loaded file is not
    /// written, so it cannot shadow the current annotations.
    pub fn save_document(
        &mut self,
        path: impl AsRef<Path>,
        store_image_data: bool,
    ) -> Result<(), LabelFileError> {
        let annotations = self.annotations.clone();
        let image_path = self.image_path.clone().unwrap_or_default();
        let image_data = self.image_data.clone().filter(|_| store_image_data);
        let other_data: Map<String, Value> = self
            .other_data
            .iter()
            .filter(|(key, _)| !REGENERATED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let flags = self.flags.clone();

        let payload = SavePayload::new(&annotations, &image_path, self.image_height, self.image_width)
            .image_data(image_data.as_deref())
            .line_color(self.line_color)
            .fill_color(self.fill_color)
            .other_data(&other_data)
            .flags(&flags);
        self.save(path, &payload)
    }
}

/// Everything written by [`LabelFile::save`].
#[derive(Debug, Clone)]
pub struct SavePayload<'a> {
    /// Annotations written under `shapes`
    pub shapes: &'a [Annotation],

    /// Image path relative to the label file
    pub image_path: &'a str,

    /// Declared image height
    pub image_height: Option<u32>,

    /// Declared image width
    pub image_width: Option<u32>,

    /// Encoded image bytes to embed (base64) in the file
    pub image_data: Option<&'a [u8]>,

    /// Default stroke color
    pub line_color: Option<Color>,

    /// Default fill color
    pub fill_color: Option<Color>,

    /// Extra top-level fields, written over the standard ones
    pub other_data: Option<&'a Map<String, Value>>,

    /// Image-level flags
    pub flags: Option<&'a Flags>,
}

impl<'a> SavePayload<'a> {
    /// Create a payload with the required fields and no optional ones.
    pub fn new(
        shapes: &'a [Annotation],
        image_path: &'a str,
        image_height: Option<u32>,
        image_width: Option<u32>,
    ) -> Self {
        Self {
            shapes,
            image_path,
            image_height,
            image_width,
            image_data: None,
            line_color: None,
            fill_color: None,
            other_data: None,
            flags: None,
        }
    }

    /// Embed image bytes.
    pub fn image_data(mut self, image_data: Option<&'a [u8]>) -> Self {
        self.image_data = image_data;
        self
    }

    /// Set the default stroke color.
    pub fn line_color(mut self, color: Option<Color>) -> Self {
        self.line_color = color;
        self
    }

    /// Set the default fill color.
    pub fn fill_color(mut self, color: Option<Color>) -> Self {
        self.fill_color = color;
        self
    }

    /// Set extra top-level fields.
    pub fn other_data(mut self, other_data: &'a Map<String, Value>) -> Self {
        self.other_data = Some(other_data);
        self
    }

    /// Set image-level flags.
    pub fn flags(mut self, flags: &'a Flags) -> Self {
        self.flags = Some(flags);
        self
    }
}

fn read_document(path: &Path) -> Result<LabelFile, FormatError> {
    let json = std::fs::read_to_string(path)?;
    let data: Map<String, Value> = serde_json::from_str(&json)?;

    let image_path: String = required(&data, "imagePath")?;
    let image_data = match data.get("imageData") {
        None => return Err(FormatError::missing_field("imageData")),
        Some(Value::Null) => {
            // imagePath is relative to the label file, not the working directory
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            load_image_bytes(&base.join(&image_path))
        }
        Some(Value::String(encoded)) => Some(decode_image_data(encoded)?),
        Some(_) => {
            return Err(FormatError::invalid_format(
                "imageData must be a base64 string or null",
            ));
        }
    };

    let declared_height = dimension(&data, "imageHeight")?;
    let declared_width = dimension(&data, "imageWidth")?;
    let (image_height, image_width) = match &image_data {
        Some(bytes) => check_image_bytes_dimensions(bytes, declared_height, declared_width)?,
        None => {
            log::warn!(
                "No image data available for {:?}, keeping declared dimensions",
                image_path
            );
            (declared_height, declared_width)
        }
    };

    let line_color: Option<Color> = required(&data, "lineColor")?;
    let fill_color: Option<Color> = required(&data, "fillColor")?;
    let flags: Flags = optional(&data, "flags")?.unwrap_or_default();
    let annotations = AnnotationSchema::from_document(&data)?.into_annotations();

    let other_data: Map<String, Value> = data
        .into_iter()
        .filter(|(key, _)| !RECOGNIZED_KEYS.contains(&key.as_str()))
        .collect();

    Ok(LabelFile {
        filename: Some(path.to_path_buf()),
        image_path: Some(image_path),
        image_data,
        image_height,
        image_width,
        annotations,
        flags,
        line_color,
        fill_color,
        other_data,
    })
}

/// Read a key that must be present (its value may still be `null` if `T` allows it).
fn required<T: DeserializeOwned>(data: &Map<String, Value>, key: &str) -> Result<T, FormatError> {
    let value = data
        .get(key)
        .ok_or_else(|| FormatError::missing_field(key))?;
    Ok(serde_json::from_value(value.clone())?)
}

/// Read a key that may be absent or `null`.
fn optional<T: DeserializeOwned>(
    data: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, FormatError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

/// Read an image dimension. Integral floats (`480.0`) are accepted.
fn dimension(data: &Map<String, Value>, key: &str) -> Result<Option<u32>, FormatError> {
    let number = match data.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number,
        Some(other) => {
            return Err(FormatError::invalid_format(format!(
                "{} must be a number, got {}",
                key, other
            )));
        }
    };

    let parsed = match number.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => number
            .as_f64()
            .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(n))
            .map(|n| n as u32),
    };
    parsed.map(Some).ok_or_else(|| {
        FormatError::invalid_format(format!(
            "{} must be a non-negative integer, got {}",
            key, number
        ))
    })
}

/// Build the JSON object written for `payload`.
///
/// The standard keys come first; `other_data` is then written over them,
/// so a residual field with a standard name wins.
pub(crate) fn build_document(payload: &SavePayload<'_>) -> Result<Map<String, Value>, FormatError> {
    let mut image_height = payload.image_height;
    let mut image_width = payload.image_width;
    let image_data = match payload.image_data {
        Some(bytes) => {
            let encoded = encode_image_data(bytes);
            (image_height, image_width) =
                check_image_dimensions(&encoded, image_height, image_width)?;
            Some(encoded)
        }
        None => None,
    };

    let mut data = Map::new();
    data.insert("version".to_string(), Value::from(VERSION));
    data.insert(
        "flags".to_string(),
        serde_json::to_value(payload.flags.cloned().unwrap_or_default())?,
    );
    data.insert(SHAPES_KEY.to_string(), serde_json::to_value(payload.shapes)?);
    data.insert("lineColor".to_string(), serde_json::to_value(payload.line_color)?);
    data.insert("fillColor".to_string(), serde_json::to_value(payload.fill_color)?);
    data.insert("imagePath".to_string(), Value::from(payload.image_path));
    data.insert("imageData".to_string(), Value::from(image_data));
    data.insert("imageHeight".to_string(), Value::from(image_height));
    data.insert("imageWidth".to_string(), Value::from(image_width));

    if let Some(other_data) = payload.other_data {
        for (key, value) in other_data {
            data.insert(key.clone(), value.clone());
        }
    }

    Ok(data)
}

fn write_document(path: &Path, payload: &SavePayload<'_>) -> Result<(), FormatError> {
    let data = build_document(payload)?;
    // Pretty printing keeps non-ASCII text as-is
    let json = serde_json::to_string_pretty(&data)?;
    std::fs::write(path, json)?;
    Ok(())
}
