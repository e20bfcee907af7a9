//! Image byte handling for label documents.
//!
//! Label files either embed the image as base64 or reference it by path.
//! Referenced images are decoded, rotated according to their EXIF
//! orientation and re-encoded, so the bytes a document holds always
//! display upright without relying on metadata.
//!
//! Declared `imageHeight`/`imageWidth` values are advisory: the decoded
//! pixel array is authoritative.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use ndarray::Array3;

use crate::format::error::FormatError;

/// Source extensions that are re-encoded as JPEG; everything else becomes PNG.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Load an image file and return it re-encoded with orientation applied.
///
/// JPEG sources are re-encoded as JPEG, all other formats as PNG. Returns
/// `None` (after logging) if the file cannot be opened, decoded or encoded;
/// callers treat that as "no image data available".
pub fn load_image_bytes(path: &Path) -> Option<Vec<u8>> {
    let image = match decode_oriented(path) {
        Ok(image) => image,
        Err(e) => {
            log::error!("Failed opening image file: {:?}: {}", path, e);
            return None;
        }
    };

    let format = output_format(path);
    let image = match format {
        // The JPEG encoder has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    let mut buffer = Cursor::new(Vec::new());
    if let Err(e) = image.write_to(&mut buffer, format) {
        log::error!("Failed encoding image file: {:?}: {}", path, e);
        return None;
    }

    log::debug!(
        "Loaded {}x{} image from {:?} as {:?}",
        image.width(),
        image.height(),
        path,
        format
    );
    Some(buffer.into_inner())
}

fn decode_oriented(path: &Path) -> Result<DynamicImage, FormatError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn output_format(path: &Path) -> ImageFormat {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            JPEG_EXTENSIONS
                .iter()
                .any(|jpeg| ext.eq_ignore_ascii_case(jpeg))
        });

    if is_jpeg {
        ImageFormat::Jpeg
    } else {
        ImageFormat::Png
    }
}

/// Decode encoded image bytes into a `(height, width, 4)` RGBA pixel array.
pub fn image_bytes_to_array(bytes: &[u8]) -> Result<Array3<u8>, FormatError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 4), rgba.into_raw())
        .map_err(|e| FormatError::invalid_format(format!("Unexpected pixel layout: {}", e)))
}

/// Decode a base64 image payload into a `(height, width, 4)` RGBA pixel array.
pub fn image_b64_to_array(image_data: &str) -> Result<Array3<u8>, FormatError> {
    let bytes = BASE64.decode(image_data)?;
    image_bytes_to_array(&bytes)
}

/// Reconcile declared image dimensions with a base64 image payload.
///
/// Each declared dimension that disagrees with the decoded pixels is logged
/// and replaced by the actual value. Undeclared dimensions stay `None`.
/// Returns `(height, width)`.
pub fn check_image_dimensions(
    image_data: &str,
    image_height: Option<u32>,
    image_width: Option<u32>,
) -> Result<(Option<u32>, Option<u32>), FormatError> {
    let pixels = image_b64_to_array(image_data)?;
    Ok(reconcile_dimensions(&pixels, image_height, image_width))
}

/// Same as [`check_image_dimensions`] for raw (not base64) image bytes.
pub(crate) fn check_image_bytes_dimensions(
    bytes: &[u8],
    image_height: Option<u32>,
    image_width: Option<u32>,
) -> Result<(Option<u32>, Option<u32>), FormatError> {
    let pixels = image_bytes_to_array(bytes)?;
    Ok(reconcile_dimensions(&pixels, image_height, image_width))
}

fn reconcile_dimensions(
    pixels: &Array3<u8>,
    image_height: Option<u32>,
    image_width: Option<u32>,
) -> (Option<u32>, Option<u32>) {
    let (actual_height, actual_width, _) = pixels.dim();
    let actual_height = actual_height as u32;
    let actual_width = actual_width as u32;

    let image_height = image_height.map(|declared| {
        if declared == actual_height {
            declared
        } else {
            log::error!(
                "imageHeight {} does not match with imageData or imagePath, \
                 so getting imageHeight {} from actual image.",
                declared,
                actual_height
            );
            actual_height
        }
    });

    let image_width = image_width.map(|declared| {
        if declared == actual_width {
            declared
        } else {
            log::error!(
                "imageWidth {} does not match with imageData or imagePath, \
                 so getting imageWidth {} from actual image.",
                declared,
                actual_width
            );
            actual_width
        }
    });

    (image_height, image_width)
}

/// Base64-encode image bytes for embedding in a label file.
pub(crate) fn encode_image_data(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode an embedded base64 image payload.
pub(crate) fn decode_image_data(image_data: &str) -> Result<Vec<u8>, FormatError> {
    Ok(BASE64.decode(image_data)?)
}
