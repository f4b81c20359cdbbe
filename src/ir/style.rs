//! Per-component visual style record.
//!
//! Every field is optional; `None` means "not set here" so stylesheet rules
//! and inherited templates can merge without clobbering. Missing fields are
//! omitted from KIR JSON.

use serde::{Deserialize, Serialize};

use super::color::Color;

bitflags::bitflags! {
    /// Font style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FontFlags: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
    }
}

impl Serialize for FontFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for FontFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        FontFlags::from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid font flags: {bits:#x}")))
    }
}

/// Padding/margin edges, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeRect {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl EdgeRect {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// How a component participates in layout positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    #[default]
    Flow,
    Absolute,
}

/// The visual style of a component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,

    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,

    #[serde(rename = "borderWidth", skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,

    #[serde(rename = "borderRadius", skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f32>,

    #[serde(rename = "fontFamily", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    #[serde(rename = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// CSS-style numeric weight (400 normal, 700 bold).
    #[serde(rename = "fontWeight", skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,

    #[serde(rename = "fontFlags", skip_serializing_if = "Option::is_none")]
    pub font_flags: Option<FontFlags>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<EdgeRect>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<EdgeRect>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionMode>,

    #[serde(rename = "posX", skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<f32>,

    #[serde(rename = "posY", skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,

    #[serde(rename = "zIndex", skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        self == &Style::default()
    }

    /// Overlay `other` onto `self`: fields set in `other` win.
    /// Template inheritance and stylesheet resolution both use this.
    pub fn merge_from(&mut self, other: &Style) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field.clone();
                }
            };
        }
        take!(background);
        take!(color);
        take!(border_color);
        take!(border_width);
        take!(border_radius);
        take!(font_family);
        take!(font_size);
        take!(font_weight);
        take!(font_flags);
        take!(padding);
        take!(margin);
        take!(position);
        take!(pos_x);
        take!(pos_y);
        take!(visible);
        take!(opacity);
        take!(z_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_child_wins() {
        let mut parent = Style {
            background: Some(Color::BLACK),
            font_size: Some(14.0),
            ..Style::default()
        };
        let child = Style {
            background: Some(Color::WHITE),
            opacity: Some(0.5),
            ..Style::default()
        };
        parent.merge_from(&child);
        assert_eq!(parent.background, Some(Color::WHITE));
        assert_eq!(parent.font_size, Some(14.0));
        assert_eq!(parent.opacity, Some(0.5));
    }

    #[test]
    fn test_empty_style_serializes_to_empty_object() {
        let json = serde_json::to_string(&Style::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_font_flags_roundtrip() {
        let style = Style {
            font_flags: Some(FontFlags::BOLD | FontFlags::ITALIC),
            ..Style::default()
        };
        let json = serde_json::to_string(&style).unwrap();
        let back: Style = serde_json::from_str(&json).unwrap();
        assert_eq!(back, style);
    }
}
