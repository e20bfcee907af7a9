//! RGBA colors as stored in label files.
//!
//! On disk a color is an `[r, g, b, a]` array. Older files and hand-written
//! documents also use `[r, g, b]` arrays or `#rrggbb` / `#rrggbbaa` strings,
//! which are accepted on input and normalized to RGBA.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a color value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseColorError {
    /// Channel list of the wrong length
    #[error("expected 3 or 4 color channels, found {0}")]
    ChannelCount(usize),

    /// Channel value outside 0-255
    #[error("color channel {0} is outside the range 0-255")]
    ChannelRange(i64),

    /// Malformed hex string
    #[error("invalid hex color '{0}'")]
    Hex(String),
}

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a color from RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Build a color from a list of 3 (opaque) or 4 integer channels.
    pub fn from_channels(channels: &[i64]) -> Result<Self, ParseColorError> {
        let mut rgba = [255u8; 4];
        if !(3..=4).contains(&channels.len()) {
            return Err(ParseColorError::ChannelCount(channels.len()));
        }
        for (slot, &value) in rgba.iter_mut().zip(channels) {
            *slot = u8::try_from(value).map_err(|_| ParseColorError::ChannelRange(value))?;
        }
        let [r, g, b, a] = rgba;
        Ok(Self::rgba(r, g, b, a))
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex string.
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let invalid = || ParseColorError::Hex(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(invalid());
        }

        let channels = (0..digits.len())
            .step_by(2)
            .map(|i| i64::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_channels(&channels)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b, color.a]
    }
}

/// Accepted on-disk representations of a color.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Channels(Vec<i64>),
    Hex(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ParseColorError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Channels(channels) => Color::from_channels(&channels),
            ColorRepr::Hex(hex) => Color::from_hex(&hex),
        }
    }
}
