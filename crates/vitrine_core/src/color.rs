use serde::Deserialize;
use thiserror::Error;

/// Linear RGB color. Deserializes from either a `"#rrggbb"` hex string or a
/// `[r, g, b]` float array, which is what manifests carry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorParseError {
    #[error("invalid hex color '{0}': expected 6 hex digits, e.g. \"#1a2b3c\"")]
    BadHex(String),
    #[error("color components must be finite numbers")]
    NonFinite,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `"#rrggbb"` (leading `#` optional).
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let digits = value.strip_prefix('#').unwrap_or(value);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadHex(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|byte| byte as f32 / 255.0)
                .map_err(|_| ColorParseError::BadHex(value.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb([f32; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ColorParseError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(text) => Color::from_hex(&text),
            ColorRepr::Rgb(rgb) => {
                if rgb.iter().any(|component| !component.is_finite()) {
                    return Err(ColorParseError::NonFinite);
                }
                Ok(Color::new(rgb[0], rgb[1], rgb[2]))
            }
        }
    }
}
