//! Property dispatch.
//!
//! A single static table maps property names to handlers; a plugin-
//! registered parser is a second lookup consulted after the built-in
//! table. Value resolution follows the hybrid policy: substitute from the
//! parameter table, and preserve what stays unresolved as property
//! bindings for the runtime.

use serde_json::json;

use crate::capability;
use crate::ir::{
    self, Alignment, BindingKind, Color, Component, ComponentType, Dimension, EdgeRect, EventKind,
    KryValue, PositionMode, PropertyBinding,
};
use crate::manifest::{EventBinding, LogicFunction};
use crate::parser::ast::{PropertyNode, PropertyValue};
use crate::style::{StyleFlags, StyleProps};

use super::LowerContext;

/// A property's value after substitution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedValue {
    /// Usable textual value (literal or fully substituted).
    Text(String),
    /// Typed literal straight from the AST.
    Value(KryValue),
    /// Expression the compile could not resolve.
    Unresolved {
        expr: String,
        fallback: Option<String>,
    },
}

impl ResolvedValue {
    pub(crate) fn as_text(&self) -> Option<String> {
        match self {
            ResolvedValue::Text(t) => Some(t.clone()),
            ResolvedValue::Value(v) => Some(v.to_display_string()),
            ResolvedValue::Unresolved { .. } => None,
        }
    }

    fn as_f32(&self) -> Option<f32> {
        match self {
            ResolvedValue::Value(KryValue::Int(i)) => Some(*i as f32),
            ResolvedValue::Value(KryValue::Float(f)) => Some(*f as f32),
            other => Dimension::parse(&other.as_text()?).and_then(|d| d.value()),
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            ResolvedValue::Value(KryValue::Bool(b)) => Some(*b),
            other => match other.as_text()?.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            ResolvedValue::Value(KryValue::Int(i)) => Some(*i),
            other => other.as_text()?.parse().ok(),
        }
    }
}

type PropertyHandler =
    fn(&mut LowerContext, &mut Component, &PropertyNode, &ResolvedValue) -> bool;

/// (name, handler, needs-style). The needs-style flag pre-creates the
/// style record before dispatch.
static PROPERTY_TABLE: &[(&str, PropertyHandler, bool)] = &[
    // Content
    ("text", handle_text, false),
    ("label", handle_text, false),
    ("checked", handle_checked, false),
    ("class", handle_class, false),
    ("className", handle_class, false),
    ("placeholder", handle_placeholder, false),
    // Dimensions
    ("width", handle_dimension, false),
    ("height", handle_dimension, false),
    ("minWidth", handle_dimension, false),
    ("maxWidth", handle_dimension, false),
    ("minHeight", handle_dimension, false),
    ("maxHeight", handle_dimension, false),
    ("padding", handle_padding, true),
    ("margin", handle_margin, true),
    ("gap", handle_gap, false),
    ("posX", handle_position, true),
    ("left", handle_position, true),
    ("posY", handle_position, true),
    ("top", handle_position, true),
    // Colors
    ("backgroundColor", handle_color, true),
    ("background", handle_color, true),
    ("color", handle_color, true),
    ("borderColor", handle_color, true),
    // Border
    ("borderWidth", handle_border_number, true),
    ("borderRadius", handle_border_number, true),
    // Font
    ("fontSize", handle_font, true),
    ("fontWeight", handle_font, true),
    ("fontFamily", handle_font, true),
    // Window metadata
    ("windowTitle", handle_window, false),
    ("windowWidth", handle_window, false),
    ("windowHeight", handle_window, false),
    // Alignment
    ("contentAlignment", handle_alignment, false),
    ("alignItems", handle_alignment, false),
    ("justifyContent", handle_alignment, false),
    // Component-specific
    ("selectedIndex", handle_selected_index, false),
    ("options", handle_options, false),
    ("opacity", handle_opacity, true),
    ("visible", handle_visible, true),
];

impl LowerContext {
    /// Dispatch one property. Event properties are routed first, then the
    /// built-in table, then plugin property parsers. Reports `true` when
    /// the property was consumed.
    pub(crate) fn apply_property(&mut self, component: &mut Component, prop: &PropertyNode) -> bool {
        if let Some(kind) = EventKind::from_property(&prop.name) {
            return self.apply_event(component, kind, prop);
        }

        let Some(&(_, handler, needs_style)) = PROPERTY_TABLE
            .iter()
            .find(|(name, _, _)| *name == prop.name)
        else {
            // Plugin extension point, consulted after the built-in table
            let raw = prop.value.as_text();
            if capability::try_parse_property(component, &prop.name, &raw) {
                return true;
            }
            self.error_at(prop.span, format!("unknown property '{}'", prop.name));
            return false;
        };

        let resolved = self.resolve_value(prop);
        if let ResolvedValue::Unresolved { expr, fallback } = &resolved {
            return self.preserve_unresolved(component, prop, expr, fallback.clone());
        }
        if needs_style {
            component.style_mut();
        }
        let applied = handler(self, component, prop, &resolved);
        if !applied {
            self.warn_at(
                prop.span,
                format!("property '{}' could not be applied", prop.name),
            );
        }
        applied
    }

    /// Resolve a property value: literals pass through, expressions go
    /// through substitution, and what stays unresolved is preserved.
    pub(crate) fn resolve_value(&mut self, prop: &PropertyNode) -> ResolvedValue {
        match &prop.value {
            PropertyValue::Str(s) => ResolvedValue::Text(s.clone()),
            PropertyValue::Int(i) => ResolvedValue::Value(KryValue::Int(*i)),
            PropertyValue::Float(f) => ResolvedValue::Value(KryValue::Float(*f)),
            PropertyValue::Bool(b) => ResolvedValue::Value(KryValue::Bool(*b)),
            PropertyValue::Null => ResolvedValue::Value(KryValue::Null),
            PropertyValue::Color(c) => ResolvedValue::Text(c.clone()),
            PropertyValue::Array(items) => {
                let values: Vec<KryValue> = items.iter().map(kry_from_property_value).collect();
                ResolvedValue::Value(KryValue::Array(values))
            }
            PropertyValue::Lambda(_) => {
                // Lambdas only make sense on events; reaching here means a
                // non-event property carried one
                ResolvedValue::Unresolved {
                    expr: prop.value.as_text(),
                    fallback: None,
                }
            }
            PropertyValue::Expression(text) => self.resolve_expression(text),
        }
    }

    pub(crate) fn resolve_expression(&mut self, text: &str) -> ResolvedValue {
        // 1. whole-expression substitution (covers dotted paths the loop
        //    pre-registered)
        if let Some(substituted) = self.params.substitute(text) {
            return ResolvedValue::Text(substituted.to_string());
        }
        // Keyword literals ("transparent", "center", "bold") and literal
        // dimensions ("100px") pass through as text
        if is_keyword_literal(text) || Dimension::parse(text).is_some() {
            return ResolvedValue::Text(text.to_string());
        }
        // 2. dotted/indexed access on a registered name that has no entry:
        //    out-of-shape access, keep raw text
        if self.params.has_base(text) {
            tracing::debug!(expr = text, "access on registered name has no entry");
            return ResolvedValue::Text(text.to_string());
        }
        // 3. unresolved; a reactive variable's initial value becomes the
        //    fallback
        let base = text.split(['.', '[', ' ']).next().unwrap_or(text);
        let fallback = self
            .manifest
            .variable_any_scope(base)
            .map(|v| v.value.to_display_string());
        ResolvedValue::Unresolved {
            expr: text.to_string(),
            fallback,
        }
    }

    /// Unresolved expression: preserve (HYBRID), error (RUNTIME), or keep
    /// as a template binding (CODEGEN).
    fn preserve_unresolved(
        &mut self,
        component: &mut Component,
        prop: &PropertyNode,
        expr: &str,
        fallback: Option<String>,
    ) -> bool {
        match self.mode {
            super::CompileMode::Runtime => {
                self.error_at(
                    prop.span,
                    format!(
                        "cannot resolve expression '{}' for property '{}'",
                        expr, prop.name
                    ),
                );
                false
            }
            super::CompileMode::Hybrid | super::CompileMode::Codegen => {
                let is_reactive = {
                    let base = expr.split(['.', '[', ' ']).next().unwrap_or(expr);
                    self.manifest.variable_any_scope(base).is_some()
                };
                let binding_kind = if is_reactive {
                    BindingKind::Runtime
                } else {
                    BindingKind::StaticTemplate
                };
                component.property_bindings.push(PropertyBinding {
                    property: prop.name.clone(),
                    expression: expr.to_string(),
                    fallback,
                    binding_kind,
                });
                if matches!(prop.name.as_str(), "text" | "label") {
                    component.set_text_expression(expr);
                }
                true
            }
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn apply_event(&mut self, component: &mut Component, kind: EventKind, prop: &PropertyNode) -> bool {
        match &prop.value {
            // Bare function identifier: bind directly (inline event only;
            // the logic-block binding is reserved for functions this
            // compile owns)
            PropertyValue::Expression(name) if is_identifier(name) => {
                component.events.push(ir::Event::new(kind, name.clone()));
                true
            }
            PropertyValue::Lambda(lambda) => {
                let name = format!("handler_{}_{}", self.handler_counter, kind.as_str());
                self.handler_counter += 1;

                let source: crate::base::SharedSource =
                    self.interner.intern(&lambda.body).into();
                let mut function = LogicFunction::new(name.clone());
                function.params = lambda
                    .params
                    .iter()
                    .map(|p| crate::manifest::Param {
                        name: p.clone(),
                        type_tag: None,
                    })
                    .collect();
                function
                    .sources
                    .insert(self.source_language.clone(), source.clone());
                self.logic.add_function(function);

                self.logic.add_event_binding(EventBinding {
                    component_id: component.id,
                    event_type: kind,
                    handler: name.clone(),
                });

                // Legacy inline event for older renderers; shares the
                // snippet buffer with the logic function
                let mut event = ir::Event::new(kind, name.clone());
                event.logic_id = Some(name);
                event.handler_data = Some(source);
                component.events.push(event);
                true
            }
            other => {
                self.error_at(
                    prop.span,
                    format!(
                        "event '{}' needs a function name or a lambda, got '{}'",
                        prop.name,
                        other.as_text()
                    ),
                );
                false
            }
        }
    }
}

/// Bare identifiers that are value keywords, not variable references:
/// palette colors, alignment keywords, font weights, layout modes.
fn is_keyword_literal(text: &str) -> bool {
    Color::from_name(text).is_some()
        || Alignment::parse(text).is_some()
        || matches!(
            text,
            "bold" | "normal" | "regular" | "medium" | "light"
                | "flex" | "grid" | "block"
                | "row" | "column" | "row-reverse" | "column-reverse"
                | "auto"
        )
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn kry_from_property_value(value: &PropertyValue) -> KryValue {
    match value {
        PropertyValue::Str(s) => KryValue::String(s.clone()),
        PropertyValue::Int(i) => KryValue::Int(*i),
        PropertyValue::Float(f) => KryValue::Float(*f),
        PropertyValue::Bool(b) => KryValue::Bool(*b),
        PropertyValue::Null => KryValue::Null,
        PropertyValue::Color(c) => KryValue::String(c.clone()),
        PropertyValue::Array(items) => {
            KryValue::Array(items.iter().map(kry_from_property_value).collect())
        }
        PropertyValue::Expression(e) | PropertyValue::Lambda(crate::parser::ast::LambdaValue { body: e, .. }) => {
            KryValue::String(e.clone())
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn handle_text(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_text() {
        Some(text) => {
            component.set_text_content(text);
            true
        }
        None => false,
    }
}

fn handle_checked(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_bool() {
        Some(checked) => {
            let data = component.custom_data.get_or_insert_with(|| json!({}));
            data["checked"] = json!(checked);
            true
        }
        None => false,
    }
}

fn handle_class(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_text() {
        Some(class) => {
            component.class_name = Some(class.into());
            true
        }
        None => false,
    }
}

fn handle_placeholder(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_text() {
        Some(text) => {
            let data = component.custom_data.get_or_insert_with(|| json!({}));
            data["placeholder"] = json!(text);
            true
        }
        None => false,
    }
}

fn handle_dimension(
    ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let Some(text) = value.as_text() else {
        return false;
    };
    let Some(dimension) = Dimension::parse(&text) else {
        ctx.error_at(
            prop.span,
            format!("'{}' is not a dimension for '{}'", text, prop.name),
        );
        return false;
    };
    let layout = component.layout_mut();
    match prop.name.as_str() {
        "width" => layout.width = Some(dimension),
        "height" => layout.height = Some(dimension),
        "minWidth" => layout.min_width = Some(dimension),
        "maxWidth" => layout.max_width = Some(dimension),
        "minHeight" => layout.min_height = Some(dimension),
        "maxHeight" => layout.max_height = Some(dimension),
        _ => return false,
    }
    true
}

fn handle_padding(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_f32() {
        Some(pixels) => {
            component.style_mut().padding = Some(EdgeRect::uniform(pixels));
            true
        }
        None => false,
    }
}

fn handle_margin(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_f32() {
        Some(pixels) => {
            component.style_mut().margin = Some(EdgeRect::uniform(pixels));
            true
        }
        None => false,
    }
}

fn handle_gap(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_f32() {
        Some(gap) => {
            component.layout_mut().gap = Some(gap);
            true
        }
        None => false,
    }
}

fn handle_position(
    _ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let Some(coord) = value.as_f32() else {
        return false;
    };
    let style = component.style_mut();
    style.position = Some(PositionMode::Absolute);
    match prop.name.as_str() {
        "posX" | "left" => style.pos_x = Some(coord),
        "posY" | "top" => style.pos_y = Some(coord),
        _ => return false,
    }
    true
}

fn handle_color(
    ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let Some(text) = value.as_text() else {
        return false;
    };
    let Some(color) = Color::parse(&text) else {
        ctx.error_at(prop.span, format!("'{}' is not a color", text));
        return false;
    };
    let style = component.style_mut();
    match prop.name.as_str() {
        "backgroundColor" | "background" => style.background = Some(color),
        "color" => style.color = Some(color),
        "borderColor" => style.border_color = Some(color),
        _ => return false,
    }
    true
}

fn handle_border_number(
    _ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let Some(number) = value.as_f32() else {
        return false;
    };
    let style = component.style_mut();
    match prop.name.as_str() {
        "borderWidth" => style.border_width = Some(number),
        "borderRadius" => style.border_radius = Some(number),
        _ => return false,
    }
    true
}

fn handle_font(
    _ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let style = component.style_mut();
    match prop.name.as_str() {
        "fontSize" => match value.as_f32() {
            Some(size) => style.font_size = Some(size),
            None => return false,
        },
        "fontWeight" => match font_weight_of(value) {
            Some(weight) => style.font_weight = Some(weight),
            None => return false,
        },
        "fontFamily" => match value.as_text() {
            Some(family) => style.font_family = Some(family),
            None => return false,
        },
        _ => return false,
    }
    true
}

fn font_weight_of(value: &ResolvedValue) -> Option<u16> {
    if let Some(number) = value.as_i64() {
        return u16::try_from(number).ok();
    }
    match value.as_text()?.as_str() {
        "light" => Some(300),
        "normal" | "regular" => Some(400),
        "medium" => Some(500),
        "bold" => Some(700),
        _ => None,
    }
}

fn handle_window(
    ctx: &mut LowerContext,
    _component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let applied = ir::context::with_current(|ir_ctx| match prop.name.as_str() {
        "windowTitle" => match value.as_text() {
            Some(title) => {
                ir_ctx.metadata.window_title = Some(title);
                true
            }
            None => false,
        },
        "windowWidth" => match value.as_i64().and_then(|v| u32::try_from(v).ok()) {
            Some(width) => {
                ir_ctx.metadata.window_width = Some(width);
                true
            }
            None => false,
        },
        "windowHeight" => match value.as_i64().and_then(|v| u32::try_from(v).ok()) {
            Some(height) => {
                ir_ctx.metadata.window_height = Some(height);
                true
            }
            None => false,
        },
        _ => false,
    });
    match applied {
        Some(true) => true,
        Some(false) => false,
        None => {
            ctx.warn_at(prop.span, "no IR context installed; window metadata dropped");
            false
        }
    }
}

fn handle_alignment(
    ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    let Some(text) = value.as_text() else {
        return false;
    };
    let Some(alignment) = Alignment::parse(&text) else {
        ctx.error_at(prop.span, format!("'{}' is not an alignment keyword", text));
        return false;
    };
    let layout = component.layout_mut();
    match prop.name.as_str() {
        "contentAlignment" | "alignItems" => layout.align_items = Some(alignment),
        "justifyContent" => layout.justify_content = Some(alignment),
        _ => return false,
    }
    true
}

fn handle_selected_index(
    ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    if !matches!(
        component.component_type,
        ComponentType::Dropdown | ComponentType::TabGroup
    ) {
        ctx.warn_at(
            prop.span,
            "'selectedIndex' only applies to Dropdown and TabGroup",
        );
        return false;
    }
    match value.as_i64() {
        Some(index) => {
            let data = component.custom_data.get_or_insert_with(|| json!({}));
            data["selected_index"] = json!(index);
            true
        }
        None => false,
    }
}

fn handle_options(
    ctx: &mut LowerContext,
    component: &mut Component,
    prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    if component.component_type != ComponentType::Dropdown {
        ctx.warn_at(prop.span, "'options' only applies to Dropdown");
        return false;
    }
    match value {
        ResolvedValue::Value(v @ KryValue::Array(_)) => {
            let data = component.custom_data.get_or_insert_with(|| json!({}));
            data["options"] = v.to_json();
            true
        }
        _ => false,
    }
}

fn handle_opacity(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_f32() {
        Some(opacity) => {
            component.style_mut().opacity = Some(opacity);
            true
        }
        None => false,
    }
}

fn handle_visible(
    _ctx: &mut LowerContext,
    component: &mut Component,
    _prop: &PropertyNode,
    value: &ResolvedValue,
) -> bool {
    match value.as_bool() {
        Some(visible) => {
            component.style_mut().visible = Some(visible);
            true
        }
        None => false,
    }
}

// =============================================================================
// Style-block translation
// =============================================================================

/// Translate a style block's properties into the typed rule record.
pub(crate) fn translate_style_properties(
    ctx: &mut LowerContext,
    properties: &[PropertyNode],
) -> StyleProps {
    let mut props = StyleProps::default();
    for prop in properties {
        let resolved = ctx.resolve_value(prop);
        let Some(text) = resolved.as_text() else {
            ctx.warn_at(
                prop.span,
                format!("style rule value for '{}' must be resolvable", prop.name),
            );
            continue;
        };
        let ok = match prop.name.as_str() {
            "background" | "backgroundColor" => set_color(&mut props, StyleFlags::BACKGROUND, &text, |p, c| p.background = c),
            "color" => set_color(&mut props, StyleFlags::COLOR, &text, |p, c| p.color = c),
            "borderColor" => set_color(&mut props, StyleFlags::BORDER_COLOR, &text, |p, c| p.border_color = c),
            "display" => match text.as_str() {
                "flex" => { props.display = crate::ir::LayoutMode::Flex; props.flags |= StyleFlags::DISPLAY; true }
                "grid" => { props.display = crate::ir::LayoutMode::Grid; props.flags |= StyleFlags::DISPLAY; true }
                "block" => { props.display = crate::ir::LayoutMode::Block; props.flags |= StyleFlags::DISPLAY; true }
                _ => false,
            },
            "flexDirection" | "direction" => match text.as_str() {
                "row" => { props.flex_direction = crate::ir::FlexDirection::Row; props.flags |= StyleFlags::FLEX_DIRECTION; true }
                "column" => { props.flex_direction = crate::ir::FlexDirection::Column; props.flags |= StyleFlags::FLEX_DIRECTION; true }
                "row-reverse" => { props.flex_direction = crate::ir::FlexDirection::RowReverse; props.flags |= StyleFlags::FLEX_DIRECTION; true }
                "column-reverse" => { props.flex_direction = crate::ir::FlexDirection::ColumnReverse; props.flags |= StyleFlags::FLEX_DIRECTION; true }
                _ => false,
            },
            "justifyContent" => match Alignment::parse(&text) {
                Some(a) => { props.justify_content = Some(a); props.flags |= StyleFlags::JUSTIFY_CONTENT; true }
                None => false,
            },
            "alignItems" | "contentAlignment" => match Alignment::parse(&text) {
                Some(a) => { props.align_items = Some(a); props.flags |= StyleFlags::ALIGN_ITEMS; true }
                None => false,
            },
            "padding" => set_number(&mut props, StyleFlags::PADDING, &text, |p, v| p.padding = v),
            "margin" => set_number(&mut props, StyleFlags::MARGIN, &text, |p, v| p.margin = v),
            "gap" => set_number(&mut props, StyleFlags::GAP, &text, |p, v| p.gap = v),
            "fontSize" => set_number(&mut props, StyleFlags::FONT_SIZE, &text, |p, v| p.font_size = v),
            "fontWeight" => match font_weight_of(&resolved) {
                Some(w) => { props.font_weight = w; props.flags |= StyleFlags::FONT_WEIGHT; true }
                None => false,
            },
            "borderRadius" => set_number(&mut props, StyleFlags::BORDER_RADIUS, &text, |p, v| p.border_radius = v),
            "borderWidth" => set_number(&mut props, StyleFlags::BORDER_WIDTH, &text, |p, v| p.border_width = v),
            "width" => match Dimension::parse(&text) {
                Some(d) => { props.width = Some(d); props.flags |= StyleFlags::WIDTH; true }
                None => false,
            },
            "height" => match Dimension::parse(&text) {
                Some(d) => { props.height = Some(d); props.flags |= StyleFlags::HEIGHT; true }
                None => false,
            },
            "opacity" => set_number(&mut props, StyleFlags::OPACITY, &text, |p, v| p.opacity = v),
            other => {
                ctx.warn_at(prop.span, format!("unknown style property '{other}'"));
                continue;
            }
        };
        if !ok {
            ctx.warn_at(
                prop.span,
                format!("bad value '{}' for style property '{}'", text, prop.name),
            );
        }
    }
    props
}

fn set_color(
    props: &mut StyleProps,
    flag: StyleFlags,
    text: &str,
    write: impl FnOnce(&mut StyleProps, Color),
) -> bool {
    match Color::parse(text) {
        Some(color) => {
            write(props, color);
            props.flags |= flag;
            true
        }
        None => false,
    }
}

fn set_number(
    props: &mut StyleProps,
    flag: StyleFlags,
    text: &str,
    write: impl FnOnce(&mut StyleProps, f32),
) -> bool {
    match Dimension::parse(text).and_then(|d| d.value()) {
        Some(value) => {
            write(props, value);
            props.flags |= flag;
            true
        }
        None => false,
    }
}
