//! RGBA color values and parsing.
//!
//! Accepts `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA` and a fixed palette of
//! named colors. Serialized as an `#RRGGBBAA` string in KIR JSON.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A color with explicit alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::TRANSPARENT
    }
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Parse a color value: hex forms or a palette name.
    pub fn parse(text: &str) -> Option<Color> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        Self::from_name(text)
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            // #RGB: each nibble duplicated, alpha opaque
            3 => Some(Color::rgba(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                255,
            )),
            4 => Some(Color::rgba(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                nibble(3)? * 17,
            )),
            6 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// The fixed named palette. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Option<Color> {
        let color = match name.to_ascii_lowercase().as_str() {
            "transparent" => Color::TRANSPARENT,
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "lime" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "orange" => Color::rgb(255, 165, 0),
            "purple" => Color::rgb(128, 0, 128),
            "pink" => Color::rgb(255, 192, 203),
            "cyan" => Color::rgb(0, 255, 255),
            "magenta" => Color::rgb(255, 0, 255),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
            "darkgray" | "darkgrey" => Color::rgb(64, 64, 64),
            "silver" => Color::rgb(192, 192, 192),
            "brown" => Color::rgb(165, 42, 42),
            "navy" => Color::rgb(0, 0, 128),
            "teal" => Color::rgb(0, 128, 128),
            "olive" => Color::rgb(128, 128, 0),
            "maroon" => Color::rgb(128, 0, 0),
            "gold" => Color::rgb(255, 215, 0),
            _ => return None,
        };
        Some(color)
    }

    /// Render as `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Pack into a little-endian `u32` as `0xAABBGGRR` for the binary codec.
    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    pub fn from_u32(packed: u32) -> Color {
        let [r, g, b, a] = packed.to_le_bytes();
        Color { r, g, b, a }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Color::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#FF8040", Color::rgba(255, 128, 64, 255))]
    #[case("#8F2", Color::rgba(136, 255, 34, 255))]
    #[case("#8F2A", Color::rgba(136, 255, 34, 170))]
    #[case("#11223344", Color::rgba(17, 34, 51, 68))]
    #[case("transparent", Color::rgba(0, 0, 0, 0))]
    #[case("RED", Color::rgb(255, 0, 0))]
    #[case("grey", Color::rgb(128, 128, 128))]
    fn test_parse(#[case] text: &str, #[case] expected: Color) {
        assert_eq!(Color::parse(text), Some(expected));
    }

    #[rstest]
    #[case("#12345")]
    #[case("#GG0000")]
    #[case("chartreuse-ish")]
    #[case("")]
    fn test_parse_rejects(#[case] text: &str) {
        assert_eq!(Color::parse(text), None);
    }

    #[test]
    fn test_hex_roundtrip() {
        let color = Color::rgba(1, 2, 3, 4);
        assert_eq!(Color::parse(&color.to_hex()), Some(color));
    }

    #[test]
    fn test_u32_roundtrip() {
        let color = Color::rgba(10, 20, 30, 40);
        assert_eq!(Color::from_u32(color.to_u32()), color);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(255, 128, 64)).unwrap();
        assert_eq!(json, "\"#FF8040FF\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(255, 128, 64));
    }
}
