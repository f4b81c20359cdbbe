//! Global stylesheet.
//!
//! `style <selector> { ... }` blocks contribute rules here; at resolve time
//! component CSS classes are matched by exact equality and the rule's
//! properties are merged into the component's style/layout records.
//! Class-chain resolution is the renderer's problem, not this core's.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::ir::{Alignment, Color, Component, Dimension, EdgeRect, FlexDirection, LayoutMode};

bitflags::bitflags! {
    /// Which fields a rule sets. A rule only writes flagged fields when it
    /// is merged into a component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleFlags: u32 {
        const BACKGROUND      = 1 << 0;
        const COLOR           = 1 << 1;
        const DISPLAY         = 1 << 2;
        const FLEX_DIRECTION  = 1 << 3;
        const JUSTIFY_CONTENT = 1 << 4;
        const ALIGN_ITEMS     = 1 << 5;
        const PADDING         = 1 << 6;
        const MARGIN          = 1 << 7;
        const GAP             = 1 << 8;
        const FONT_SIZE       = 1 << 9;
        const FONT_WEIGHT     = 1 << 10;
        const BORDER_RADIUS   = 1 << 11;
        const BORDER_WIDTH    = 1 << 12;
        const BORDER_COLOR    = 1 << 13;
        const WIDTH           = 1 << 14;
        const HEIGHT          = 1 << 15;
        const OPACITY         = 1 << 16;
    }
}

/// A typed property record: plain fields plus the set-flag bitmap saying
/// which of them are present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleProps {
    pub flags: StyleFlags,
    pub background: Color,
    pub color: Color,
    pub display: LayoutMode,
    pub flex_direction: FlexDirection,
    pub justify_content: Option<Alignment>,
    pub align_items: Option<Alignment>,
    pub padding: f32,
    pub margin: f32,
    pub gap: f32,
    pub font_size: f32,
    pub font_weight: u16,
    pub border_radius: f32,
    pub border_width: f32,
    pub border_color: Color,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub opacity: f32,
}

impl StyleProps {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Overlay `other`: every field flagged in `other` wins.
    pub fn merge_from(&mut self, other: &StyleProps) {
        macro_rules! take {
            ($flag:ident, $field:ident) => {
                if other.flags.contains(StyleFlags::$flag) {
                    self.$field = other.$field.clone();
                    self.flags |= StyleFlags::$flag;
                }
            };
        }
        take!(BACKGROUND, background);
        take!(COLOR, color);
        take!(DISPLAY, display);
        take!(FLEX_DIRECTION, flex_direction);
        take!(JUSTIFY_CONTENT, justify_content);
        take!(ALIGN_ITEMS, align_items);
        take!(PADDING, padding);
        take!(MARGIN, margin);
        take!(GAP, gap);
        take!(FONT_SIZE, font_size);
        take!(FONT_WEIGHT, font_weight);
        take!(BORDER_RADIUS, border_radius);
        take!(BORDER_WIDTH, border_width);
        take!(BORDER_COLOR, border_color);
        take!(WIDTH, width);
        take!(HEIGHT, height);
        take!(OPACITY, opacity);
    }

    /// Merge the flagged fields into a component's style/layout records.
    pub fn apply_to(&self, component: &mut Component) {
        if self.flags.contains(StyleFlags::BACKGROUND) {
            component.style_mut().background = Some(self.background);
        }
        if self.flags.contains(StyleFlags::COLOR) {
            component.style_mut().color = Some(self.color);
        }
        if self.flags.contains(StyleFlags::FONT_SIZE) {
            component.style_mut().font_size = Some(self.font_size);
        }
        if self.flags.contains(StyleFlags::FONT_WEIGHT) {
            component.style_mut().font_weight = Some(self.font_weight);
        }
        if self.flags.contains(StyleFlags::BORDER_RADIUS) {
            component.style_mut().border_radius = Some(self.border_radius);
        }
        if self.flags.contains(StyleFlags::BORDER_WIDTH) {
            component.style_mut().border_width = Some(self.border_width);
        }
        if self.flags.contains(StyleFlags::BORDER_COLOR) {
            component.style_mut().border_color = Some(self.border_color);
        }
        if self.flags.contains(StyleFlags::PADDING) {
            component.style_mut().padding = Some(EdgeRect::uniform(self.padding));
        }
        if self.flags.contains(StyleFlags::MARGIN) {
            component.style_mut().margin = Some(EdgeRect::uniform(self.margin));
        }
        if self.flags.contains(StyleFlags::OPACITY) {
            component.style_mut().opacity = Some(self.opacity);
        }
        if self.flags.contains(StyleFlags::DISPLAY) {
            let layout = component.layout_mut();
            layout.mode = Some(self.display);
            layout.explicit_display = true;
        }
        if self.flags.contains(StyleFlags::FLEX_DIRECTION) {
            component.layout_mut().flex_direction = Some(self.flex_direction);
        }
        if self.flags.contains(StyleFlags::JUSTIFY_CONTENT) {
            component.layout_mut().justify_content = self.justify_content;
        }
        if self.flags.contains(StyleFlags::ALIGN_ITEMS) {
            component.layout_mut().align_items = self.align_items;
        }
        if self.flags.contains(StyleFlags::GAP) {
            component.layout_mut().gap = Some(self.gap);
        }
        if self.flags.contains(StyleFlags::WIDTH) {
            component.layout_mut().width = self.width;
        }
        if self.flags.contains(StyleFlags::HEIGHT) {
            component.layout_mut().height = self.height;
        }
    }
}

/// Serde mirror: only flagged fields appear in KIR JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StylePropsWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    background: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<LayoutMode>,
    #[serde(rename = "flexDirection", skip_serializing_if = "Option::is_none")]
    flex_direction: Option<FlexDirection>,
    #[serde(rename = "justifyContent", skip_serializing_if = "Option::is_none")]
    justify_content: Option<Alignment>,
    #[serde(rename = "alignItems", skip_serializing_if = "Option::is_none")]
    align_items: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    padding: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gap: Option<f32>,
    #[serde(rename = "fontSize", skip_serializing_if = "Option::is_none")]
    font_size: Option<f32>,
    #[serde(rename = "fontWeight", skip_serializing_if = "Option::is_none")]
    font_weight: Option<u16>,
    #[serde(rename = "borderRadius", skip_serializing_if = "Option::is_none")]
    border_radius: Option<f32>,
    #[serde(rename = "borderWidth", skip_serializing_if = "Option::is_none")]
    border_width: Option<f32>,
    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    border_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    opacity: Option<f32>,
}

impl Serialize for StyleProps {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let f = self.flags;
        let get = |flag: StyleFlags| f.contains(flag);
        StylePropsWire {
            background: get(StyleFlags::BACKGROUND).then_some(self.background),
            color: get(StyleFlags::COLOR).then_some(self.color),
            display: get(StyleFlags::DISPLAY).then_some(self.display),
            flex_direction: get(StyleFlags::FLEX_DIRECTION).then_some(self.flex_direction),
            justify_content: get(StyleFlags::JUSTIFY_CONTENT)
                .then_some(self.justify_content)
                .flatten(),
            align_items: get(StyleFlags::ALIGN_ITEMS).then_some(self.align_items).flatten(),
            padding: get(StyleFlags::PADDING).then_some(self.padding),
            margin: get(StyleFlags::MARGIN).then_some(self.margin),
            gap: get(StyleFlags::GAP).then_some(self.gap),
            font_size: get(StyleFlags::FONT_SIZE).then_some(self.font_size),
            font_weight: get(StyleFlags::FONT_WEIGHT).then_some(self.font_weight),
            border_radius: get(StyleFlags::BORDER_RADIUS).then_some(self.border_radius),
            border_width: get(StyleFlags::BORDER_WIDTH).then_some(self.border_width),
            border_color: get(StyleFlags::BORDER_COLOR).then_some(self.border_color),
            width: get(StyleFlags::WIDTH).then_some(self.width).flatten(),
            height: get(StyleFlags::HEIGHT).then_some(self.height).flatten(),
            opacity: get(StyleFlags::OPACITY).then_some(self.opacity),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StyleProps {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = StylePropsWire::deserialize(deserializer)?;
        let mut props = StyleProps::default();
        macro_rules! set {
            ($flag:ident, $field:ident) => {
                if let Some(v) = wire.$field {
                    props.$field = v;
                    props.flags |= StyleFlags::$flag;
                }
            };
            (opt $flag:ident, $field:ident) => {
                if let Some(v) = wire.$field {
                    props.$field = Some(v);
                    props.flags |= StyleFlags::$flag;
                }
            };
        }
        set!(BACKGROUND, background);
        set!(COLOR, color);
        set!(DISPLAY, display);
        set!(FLEX_DIRECTION, flex_direction);
        set!(opt JUSTIFY_CONTENT, justify_content);
        set!(opt ALIGN_ITEMS, align_items);
        set!(PADDING, padding);
        set!(MARGIN, margin);
        set!(GAP, gap);
        set!(FONT_SIZE, font_size);
        set!(FONT_WEIGHT, font_weight);
        set!(BORDER_RADIUS, border_radius);
        set!(BORDER_WIDTH, border_width);
        set!(BORDER_COLOR, border_color);
        set!(opt WIDTH, width);
        set!(opt HEIGHT, height);
        set!(OPACITY, opacity);
        Ok(props)
    }
}

/// Selector → rule table for a compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stylesheet {
    rules: IndexMap<SmolStr, StyleProps>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Re-declaring a selector merges per-field, later wins.
    pub fn add_rule(&mut self, selector: impl Into<SmolStr>, props: StyleProps) {
        let selector = selector.into();
        match self.rules.get_mut(&selector) {
            Some(existing) => existing.merge_from(&props),
            None => {
                self.rules.insert(selector, props);
            }
        }
    }

    pub fn rule(&self, selector: &str) -> Option<&StyleProps> {
        self.rules.get(selector)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &StyleProps)> {
        self.rules.iter()
    }

    /// Walk the tree, merging every rule whose selector exactly equals a
    /// component's CSS class into that component.
    pub fn resolve_tree(&self, root: &mut Component) {
        if let Some(class) = root.class_name.clone() {
            if let Some(props) = self.rules.get(class.as_str()) {
                props.apply_to(root);
            }
        }
        for child in &mut root.children {
            self.resolve_tree(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ComponentType;

    fn background_rule(color: Color) -> StyleProps {
        StyleProps {
            flags: StyleFlags::BACKGROUND,
            background: color,
            ..StyleProps::default()
        }
    }

    #[test]
    fn test_resolve_by_exact_class() {
        let mut sheet = Stylesheet::new();
        sheet.add_rule("panel", background_rule(Color::BLACK));

        let mut root = Component::new(ComponentType::Container, 0);
        root.class_name = Some("panel".into());
        let mut child = Component::new(ComponentType::Text, 1);
        child.class_name = Some("panel-title".into());
        root.add_child(child);

        sheet.resolve_tree(&mut root);
        assert_eq!(root.style.as_ref().unwrap().background, Some(Color::BLACK));
        // "panel-title" is not an exact match for "panel"
        assert!(root.children[0].style.is_none());
    }

    #[test]
    fn test_redeclared_selector_merges() {
        let mut sheet = Stylesheet::new();
        sheet.add_rule("panel", background_rule(Color::BLACK));
        let mut second = StyleProps::default();
        second.flags |= StyleFlags::GAP;
        second.gap = 8.0;
        sheet.add_rule("panel", second);

        let rule = sheet.rule("panel").unwrap();
        assert!(rule.flags.contains(StyleFlags::BACKGROUND | StyleFlags::GAP));
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_wire_roundtrip_preserves_flags() {
        let mut props = StyleProps::default();
        props.flags = StyleFlags::BACKGROUND | StyleFlags::FONT_SIZE | StyleFlags::WIDTH;
        props.background = Color::rgb(10, 20, 30);
        props.font_size = 14.0;
        props.width = Some(Dimension::Percent(100.0));

        let json = serde_json::to_string(&props).unwrap();
        let back: StyleProps = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }

    #[test]
    fn test_apply_only_flagged_fields() {
        let mut props = StyleProps::default();
        props.flags = StyleFlags::OPACITY;
        props.opacity = 0.5;
        // Unflagged background must not leak through
        props.background = Color::WHITE;

        let mut component = Component::new(ComponentType::Container, 0);
        props.apply_to(&mut component);
        let style = component.style.as_ref().unwrap();
        assert_eq!(style.opacity, Some(0.5));
        assert_eq!(style.background, None);
    }
}
