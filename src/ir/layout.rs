//! Per-component layout record.

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use super::style::EdgeRect;

/// Layout algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Flex,
    Grid,
    Block,
}

/// Flex main-axis direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    Row,
    #[default]
    Column,
    RowReverse,
    ColumnReverse,
}

/// Alignment keywords, with their hyphenated CSS synonyms accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
    Stretch,
}

impl Alignment {
    /// Parse an alignment keyword. `flex-start`/`flex-end` are accepted as
    /// synonyms of `start`/`end`.
    pub fn parse(text: &str) -> Option<Alignment> {
        let value = match text.trim() {
            "start" | "flex-start" => Alignment::Start,
            "end" | "flex-end" => Alignment::End,
            "center" => Alignment::Center,
            "space-between" | "spaceBetween" => Alignment::SpaceBetween,
            "space-around" | "spaceAround" => Alignment::SpaceAround,
            "space-evenly" | "spaceEvenly" => Alignment::SpaceEvenly,
            "stretch" => Alignment::Stretch,
            _ => return None,
        };
        Some(value)
    }
}

/// The layout configuration of a component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<LayoutMode>,

    /// True when the source set `display:` explicitly rather than the mode
    /// being implied by the component type.
    #[serde(rename = "explicitDisplay", default, skip_serializing_if = "std::ops::Not::not")]
    pub explicit_display: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,

    #[serde(rename = "minWidth", skip_serializing_if = "Option::is_none")]
    pub min_width: Option<Dimension>,

    #[serde(rename = "maxWidth", skip_serializing_if = "Option::is_none")]
    pub max_width: Option<Dimension>,

    #[serde(rename = "minHeight", skip_serializing_if = "Option::is_none")]
    pub min_height: Option<Dimension>,

    #[serde(rename = "maxHeight", skip_serializing_if = "Option::is_none")]
    pub max_height: Option<Dimension>,

    #[serde(rename = "flexDirection", skip_serializing_if = "Option::is_none")]
    pub flex_direction: Option<FlexDirection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f32>,

    #[serde(rename = "justifyContent", skip_serializing_if = "Option::is_none")]
    pub justify_content: Option<Alignment>,

    #[serde(rename = "alignItems", skip_serializing_if = "Option::is_none")]
    pub align_items: Option<Alignment>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wrap: bool,

    #[serde(rename = "gridColumns", skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<u16>,

    #[serde(rename = "gridRows", skip_serializing_if = "Option::is_none")]
    pub grid_rows: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<EdgeRect>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<EdgeRect>,

    #[serde(rename = "aspectRatio", skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f32>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self == &Layout::default()
    }

    /// Overlay `other` onto `self`: fields set in `other` win.
    pub fn merge_from(&mut self, other: &Layout) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field.clone();
                }
            };
        }
        take!(mode);
        if other.explicit_display {
            self.explicit_display = true;
        }
        take!(width);
        take!(height);
        take!(min_width);
        take!(max_width);
        take!(min_height);
        take!(max_height);
        take!(flex_direction);
        take!(gap);
        take!(justify_content);
        take!(align_items);
        if other.wrap {
            self.wrap = true;
        }
        take!(grid_columns);
        take!(grid_rows);
        take!(padding);
        take!(margin);
        take!(aspect_ratio);
    }
}
