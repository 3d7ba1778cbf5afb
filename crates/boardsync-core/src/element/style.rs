//! Colors and stroke/fill style of elements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color: {0:?}")]
pub struct ColorParseError(pub String);

/// RGBA8 color, serialized as a CSS hex string (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` or `transparent`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let s = input.trim();
        let err = || ColorParseError(input.to_string());

        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Self::transparent());
        }

        if let Some(hex) = s.strip_prefix('#') {
            let channel = |range: std::ops::Range<usize>| {
                hex.get(range)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(err)
            };
            return match hex.len() {
                3 => Ok(Self::new(
                    channel(0..1)? * 17,
                    channel(1..2)? * 17,
                    channel(2..3)? * 17,
                    255,
                )),
                6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
                8 => Ok(Self::new(
                    channel(0..2)?,
                    channel(2..4)?,
                    channel(4..6)?,
                    channel(6..8)?,
                )),
                _ => Err(err()),
            };
        }

        let args = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let byte = |p: &str| p.parse::<u8>().map_err(|_| err());
        match parts.as_slice() {
            [r, g, b] => Ok(Self::new(byte(r)?, byte(g)?, byte(b)?, 255)),
            [r, g, b, a] => {
                let alpha: f64 = a.parse().map_err(|_| err())?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(err());
                }
                Ok(Self::new(byte(r)?, byte(g)?, byte(b)?, (alpha * 255.0).round() as u8))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Stroke and fill of an element. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl ElementStyle {
    /// Stroke-only style.
    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            stroke: Some(color),
            fill: None,
            stroke_width: Some(width),
        }
    }

    /// Fill-only style.
    pub fn filled(color: Color) -> Self {
        Self {
            stroke: None,
            fill: Some(color),
            stroke_width: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse("#000000").unwrap(), Color::black());
        assert_eq!(Color::parse("#fff").unwrap(), Color::white());
        assert_eq!(Color::parse("#ff000080").unwrap(), Color::new(255, 0, 0, 128));
    }

    #[test]
    fn test_parse_css_functions() {
        assert_eq!(Color::parse("rgb(1, 2, 3)").unwrap(), Color::new(1, 2, 3, 255));
        assert_eq!(
            Color::parse("rgba(0, 255, 0, 0.2)").unwrap(),
            Color::new(0, 255, 0, 51)
        );
        assert_eq!(Color::parse("transparent").unwrap(), Color::transparent());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Color::parse("#12").is_err());
        assert!(Color::parse("#gggggg").is_err());
        assert!(Color::parse("blue").is_err());
        assert!(Color::parse("rgba(0, 0, 0, 2)").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::new(255, 0, 16, 255).to_string(), "#ff0010");
        assert_eq!(Color::new(255, 0, 16, 0).to_string(), "#ff001000");
    }

    #[test]
    fn test_style_json_omits_missing_fields() {
        let style = ElementStyle::stroke(Color::black(), 5.0);
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r##"{"stroke":"#000000","strokeWidth":5.0}"##);
    }
}
