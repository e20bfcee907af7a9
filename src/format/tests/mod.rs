//! Unit tests for label file loading and saving.
//!
//! These tests exercise whole documents on disk: schema migration, image
//! resolution, dimension reconciliation and lossless round-trips.

mod label_file_tests;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};

/// Encode a solid `width`x`height` test image in the given format.
fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 100, 50]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Encode a solid `width`x`height` test PNG.
fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, ImageFormat::Png)
}

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
