//! Binary KIR.
//!
//! Little-endian tag-length-value stream: 4-byte magic `KIRB`, a u16
//! format version, the document version string, then one section per side
//! table. Component trees, events, styles, and layouts are encoded
//! field-by-field; free-form payloads (custom data, statement trees,
//! variable values) ride as JSON bytes inside their TLV field. Unknown
//! section tags are a fatal decode error: there is no forward
//! compatibility within a major version.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::Value as JsonValue;

use crate::ir::context::Metadata;
use crate::ir::{
    Alignment, BindingKind, Color, Component, ComponentType, Dimension, EdgeRect, Event,
    EventKind, FlexDirection, FontFlags, ForEachBinding, ForEachDef, Layout, LayoutMode,
    LoopKind, PositionMode, PropertyBinding, Style, VisibleCondition,
};
use crate::manifest::source::{
    ExportKind, ForLoopRecord, ImportRecord, ModuleExport, SourceStructures, StaticBlockRecord,
    StructField, StructType, VarKind, VariableDecl,
};
use crate::manifest::{
    ComponentDef, EventBinding, LogicBlock, LogicFunction, ManifestWire, Param, PropDef,
    ReactiveVariable, StateVarDef,
};
use crate::style::{StyleProps, Stylesheet};

use super::{KirDocument, KirError, SourceMetadata};

const MAGIC: &[u8; 4] = b"KIRB";
const VERSION: u16 = 1;

// Section tags
const SEC_ROOT: u8 = 0x01;
const SEC_MANIFEST: u8 = 0x02;
const SEC_LOGIC: u8 = 0x03;
const SEC_SOURCES: u8 = 0x04;
const SEC_SOURCE_META: u8 = 0x05;
const SEC_STYLESHEET: u8 = 0x06;
const SEC_WINDOW_META: u8 = 0x07;

/// Encode a document into the binary stream.
pub fn encode(doc: &KirDocument) -> Result<Vec<u8>, KirError> {
    let mut out = Vec::with_capacity(4096);
    out.extend_from_slice(MAGIC);
    out.write_u16::<LittleEndian>(VERSION).unwrap();
    w_str(&mut out, &doc.version);

    write_section(&mut out, SEC_ROOT, |buf| w_component(buf, &doc.root));
    write_section(&mut out, SEC_MANIFEST, |buf| {
        w_manifest(buf, &doc.reactive_manifest)
    });
    write_section(&mut out, SEC_LOGIC, |buf| w_logic(buf, &doc.logic_block));
    if !doc.source_structures.is_empty() {
        write_section(&mut out, SEC_SOURCES, |buf| {
            w_sources(buf, &doc.source_structures)
        });
    }
    write_section(&mut out, SEC_SOURCE_META, |buf| {
        w_str(buf, &doc.source_metadata.source_language);
        w_str(buf, &doc.source_metadata.compiler_version);
        w_str(buf, &doc.source_metadata.timestamp);
    });
    if let Some(stylesheet) = &doc.stylesheet {
        write_section(&mut out, SEC_STYLESHEET, |buf| w_stylesheet(buf, stylesheet));
    }
    if let Some(metadata) = &doc.metadata {
        write_section(&mut out, SEC_WINDOW_META, |buf| w_window(buf, metadata));
    }
    Ok(out)
}

/// Decode a binary stream back into a document.
pub fn decode(bytes: &[u8]) -> Result<KirDocument, KirError> {
    let mut r = Reader::new(bytes);
    if r.bytes_exact(4)? != MAGIC {
        return Err(KirError::BadMagic);
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(KirError::UnsupportedVersion(version));
    }
    let doc_version = r.str()?;

    let mut root = None;
    let mut manifest = ManifestWire::default();
    let mut logic = LogicBlock::default();
    let mut sources = SourceStructures::default();
    let mut source_metadata = None;
    let mut stylesheet = None;
    let mut window = None;

    while !r.at_end() {
        let tag = r.u8()?;
        let len = r.u32()? as usize;
        let payload = r.bytes_exact(len)?;
        let mut section = Reader::new(payload);
        match tag {
            SEC_ROOT => root = Some(r_component(&mut section)?),
            SEC_MANIFEST => manifest = r_manifest(&mut section)?,
            SEC_LOGIC => logic = r_logic(&mut section)?,
            SEC_SOURCES => sources = r_sources(&mut section)?,
            SEC_SOURCE_META => {
                source_metadata = Some(SourceMetadata {
                    source_language: section.str()?,
                    compiler_version: section.str()?,
                    timestamp: section.str()?,
                });
            }
            SEC_STYLESHEET => stylesheet = Some(r_stylesheet(&mut section)?),
            SEC_WINDOW_META => window = Some(r_window(&mut section)?),
            unknown => return Err(KirError::UnknownTag(unknown)),
        }
    }

    Ok(KirDocument {
        version: doc_version,
        root: root.ok_or_else(|| KirError::InvalidValue("missing root section".to_string()))?,
        reactive_manifest: manifest,
        logic_block: logic,
        source_metadata: source_metadata
            .ok_or_else(|| KirError::InvalidValue("missing source metadata".to_string()))?,
        source_structures: sources,
        stylesheet,
        metadata: window,
    })
}

fn write_section(out: &mut Vec<u8>, tag: u8, body: impl FnOnce(&mut Vec<u8>)) {
    let mut payload = Vec::new();
    body(&mut payload);
    out.push(tag);
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.extend_from_slice(&payload);
}

// =============================================================================
// Primitive writers
// =============================================================================

fn w_str(out: &mut Vec<u8>, s: &str) {
    out.write_u32::<LittleEndian>(s.len() as u32).unwrap();
    out.extend_from_slice(s.as_bytes());
}

fn w_opt_str(out: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            out.push(1);
            w_str(out, s);
        }
        None => out.push(0),
    }
}

fn w_json(out: &mut Vec<u8>, value: &JsonValue) {
    w_str(out, &value.to_string());
}

fn w_dimension(out: &mut Vec<u8>, dim: &Dimension) {
    let (kind, value) = match dim {
        Dimension::Px(v) => (0u8, *v),
        Dimension::Percent(v) => (1, *v),
        Dimension::Em(v) => (2, *v),
        Dimension::Rem(v) => (3, *v),
        Dimension::Vw(v) => (4, *v),
        Dimension::Vh(v) => (5, *v),
        Dimension::Auto => (6, 0.0),
    };
    out.push(kind);
    out.write_f32::<LittleEndian>(value).unwrap();
}

fn w_rect(out: &mut Vec<u8>, rect: &EdgeRect) {
    for v in [rect.top, rect.right, rect.bottom, rect.left] {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
}

fn alignment_byte(a: Alignment) -> u8 {
    match a {
        Alignment::Start => 0,
        Alignment::End => 1,
        Alignment::Center => 2,
        Alignment::SpaceBetween => 3,
        Alignment::SpaceAround => 4,
        Alignment::SpaceEvenly => 5,
        Alignment::Stretch => 6,
    }
}

// =============================================================================
// Reader
// =============================================================================

struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
    len: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            len: bytes.len(),
        }
    }

    fn at_end(&self) -> bool {
        self.cursor.position() as usize >= self.len
    }

    fn u8(&mut self) -> Result<u8, KirError> {
        self.cursor.read_u8().map_err(|_| KirError::UnexpectedEnd)
    }

    fn u16(&mut self) -> Result<u16, KirError> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| KirError::UnexpectedEnd)
    }

    fn u32(&mut self) -> Result<u32, KirError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| KirError::UnexpectedEnd)
    }

    fn i32(&mut self) -> Result<i32, KirError> {
        self.cursor
            .read_i32::<LittleEndian>()
            .map_err(|_| KirError::UnexpectedEnd)
    }

    fn f32(&mut self) -> Result<f32, KirError> {
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| KirError::UnexpectedEnd)
    }

    fn bytes_exact(&mut self, len: usize) -> Result<&'a [u8], KirError> {
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let end = start.checked_add(len).ok_or(KirError::UnexpectedEnd)?;
        let slice = data.get(start..end).ok_or(KirError::UnexpectedEnd)?;
        self.cursor.set_position(end as u64);
        Ok(slice)
    }

    fn str(&mut self) -> Result<String, KirError> {
        let len = self.u32()? as usize;
        let bytes = self.bytes_exact(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| KirError::InvalidUtf8)
    }

    fn opt_str(&mut self) -> Result<Option<String>, KirError> {
        match self.u8()? {
            0 => Ok(None),
            _ => Ok(Some(self.str()?)),
        }
    }

    fn json(&mut self) -> Result<JsonValue, KirError> {
        let text = self.str()?;
        serde_json::from_str(&text).map_err(|e| KirError::Json(e.to_string()))
    }

    fn bool(&mut self) -> Result<bool, KirError> {
        Ok(self.u8()? != 0)
    }

    fn dimension(&mut self) -> Result<Dimension, KirError> {
        let kind = self.u8()?;
        let value = self.f32()?;
        let dim = match kind {
            0 => Dimension::Px(value),
            1 => Dimension::Percent(value),
            2 => Dimension::Em(value),
            3 => Dimension::Rem(value),
            4 => Dimension::Vw(value),
            5 => Dimension::Vh(value),
            6 => Dimension::Auto,
            other => return Err(KirError::InvalidValue(format!("dimension kind {other}"))),
        };
        Ok(dim)
    }

    fn rect(&mut self) -> Result<EdgeRect, KirError> {
        Ok(EdgeRect {
            top: self.f32()?,
            right: self.f32()?,
            bottom: self.f32()?,
            left: self.f32()?,
        })
    }

    fn alignment(&mut self) -> Result<Alignment, KirError> {
        let byte = self.u8()?;
        let a = match byte {
            0 => Alignment::Start,
            1 => Alignment::End,
            2 => Alignment::Center,
            3 => Alignment::SpaceBetween,
            4 => Alignment::SpaceAround,
            5 => Alignment::SpaceEvenly,
            6 => Alignment::Stretch,
            other => return Err(KirError::InvalidValue(format!("alignment {other}"))),
        };
        Ok(a)
    }
}

// =============================================================================
// Style and layout
// =============================================================================

mod style_bits {
    pub const BACKGROUND: u32 = 1 << 0;
    pub const COLOR: u32 = 1 << 1;
    pub const BORDER_COLOR: u32 = 1 << 2;
    pub const BORDER_WIDTH: u32 = 1 << 3;
    pub const BORDER_RADIUS: u32 = 1 << 4;
    pub const FONT_FAMILY: u32 = 1 << 5;
    pub const FONT_SIZE: u32 = 1 << 6;
    pub const FONT_WEIGHT: u32 = 1 << 7;
    pub const FONT_FLAGS: u32 = 1 << 8;
    pub const PADDING: u32 = 1 << 9;
    pub const MARGIN: u32 = 1 << 10;
    pub const POSITION: u32 = 1 << 11;
    pub const POS_X: u32 = 1 << 12;
    pub const POS_Y: u32 = 1 << 13;
    pub const VISIBLE: u32 = 1 << 14;
    pub const OPACITY: u32 = 1 << 15;
    pub const Z_INDEX: u32 = 1 << 16;
}

fn w_style(out: &mut Vec<u8>, style: &Style) {
    use style_bits::*;
    let mut mask = 0u32;
    let set = |mask: &mut u32, bit: u32, present: bool| {
        if present {
            *mask |= bit;
        }
    };
    set(&mut mask, BACKGROUND, style.background.is_some());
    set(&mut mask, COLOR, style.color.is_some());
    set(&mut mask, BORDER_COLOR, style.border_color.is_some());
    set(&mut mask, BORDER_WIDTH, style.border_width.is_some());
    set(&mut mask, BORDER_RADIUS, style.border_radius.is_some());
    set(&mut mask, FONT_FAMILY, style.font_family.is_some());
    set(&mut mask, FONT_SIZE, style.font_size.is_some());
    set(&mut mask, FONT_WEIGHT, style.font_weight.is_some());
    set(&mut mask, FONT_FLAGS, style.font_flags.is_some());
    set(&mut mask, PADDING, style.padding.is_some());
    set(&mut mask, MARGIN, style.margin.is_some());
    set(&mut mask, POSITION, style.position.is_some());
    set(&mut mask, POS_X, style.pos_x.is_some());
    set(&mut mask, POS_Y, style.pos_y.is_some());
    set(&mut mask, VISIBLE, style.visible.is_some());
    set(&mut mask, OPACITY, style.opacity.is_some());
    set(&mut mask, Z_INDEX, style.z_index.is_some());
    out.write_u32::<LittleEndian>(mask).unwrap();

    if let Some(c) = style.background {
        out.write_u32::<LittleEndian>(c.to_u32()).unwrap();
    }
    if let Some(c) = style.color {
        out.write_u32::<LittleEndian>(c.to_u32()).unwrap();
    }
    if let Some(c) = style.border_color {
        out.write_u32::<LittleEndian>(c.to_u32()).unwrap();
    }
    if let Some(v) = style.border_width {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = style.border_radius {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(s) = &style.font_family {
        w_str(out, s);
    }
    if let Some(v) = style.font_size {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = style.font_weight {
        out.write_u16::<LittleEndian>(v).unwrap();
    }
    if let Some(f) = style.font_flags {
        out.push(f.bits());
    }
    if let Some(r) = &style.padding {
        w_rect(out, r);
    }
    if let Some(r) = &style.margin {
        w_rect(out, r);
    }
    if let Some(p) = style.position {
        out.push(match p {
            PositionMode::Flow => 0,
            PositionMode::Absolute => 1,
        });
    }
    if let Some(v) = style.pos_x {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = style.pos_y {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = style.visible {
        out.push(v as u8);
    }
    if let Some(v) = style.opacity {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = style.z_index {
        out.write_i32::<LittleEndian>(v).unwrap();
    }
}

fn r_style(r: &mut Reader<'_>) -> Result<Style, KirError> {
    use style_bits::*;
    let mask = r.u32()?;
    let mut style = Style::default();
    if mask & BACKGROUND != 0 {
        style.background = Some(Color::from_u32(r.u32()?));
    }
    if mask & COLOR != 0 {
        style.color = Some(Color::from_u32(r.u32()?));
    }
    if mask & BORDER_COLOR != 0 {
        style.border_color = Some(Color::from_u32(r.u32()?));
    }
    if mask & BORDER_WIDTH != 0 {
        style.border_width = Some(r.f32()?);
    }
    if mask & BORDER_RADIUS != 0 {
        style.border_radius = Some(r.f32()?);
    }
    if mask & FONT_FAMILY != 0 {
        style.font_family = Some(r.str()?);
    }
    if mask & FONT_SIZE != 0 {
        style.font_size = Some(r.f32()?);
    }
    if mask & FONT_WEIGHT != 0 {
        style.font_weight = Some(r.u16()?);
    }
    if mask & FONT_FLAGS != 0 {
        let bits = r.u8()?;
        style.font_flags = Some(
            FontFlags::from_bits(bits)
                .ok_or_else(|| KirError::InvalidValue(format!("font flags {bits:#x}")))?,
        );
    }
    if mask & PADDING != 0 {
        style.padding = Some(r.rect()?);
    }
    if mask & MARGIN != 0 {
        style.margin = Some(r.rect()?);
    }
    if mask & POSITION != 0 {
        style.position = Some(match r.u8()? {
            0 => PositionMode::Flow,
            1 => PositionMode::Absolute,
            other => return Err(KirError::InvalidValue(format!("position mode {other}"))),
        });
    }
    if mask & POS_X != 0 {
        style.pos_x = Some(r.f32()?);
    }
    if mask & POS_Y != 0 {
        style.pos_y = Some(r.f32()?);
    }
    if mask & VISIBLE != 0 {
        style.visible = Some(r.bool()?);
    }
    if mask & OPACITY != 0 {
        style.opacity = Some(r.f32()?);
    }
    if mask & Z_INDEX != 0 {
        style.z_index = Some(r.i32()?);
    }
    Ok(style)
}

mod layout_bits {
    pub const MODE: u32 = 1 << 0;
    pub const EXPLICIT_DISPLAY: u32 = 1 << 1;
    pub const WIDTH: u32 = 1 << 2;
    pub const HEIGHT: u32 = 1 << 3;
    pub const MIN_WIDTH: u32 = 1 << 4;
    pub const MAX_WIDTH: u32 = 1 << 5;
    pub const MIN_HEIGHT: u32 = 1 << 6;
    pub const MAX_HEIGHT: u32 = 1 << 7;
    pub const FLEX_DIRECTION: u32 = 1 << 8;
    pub const GAP: u32 = 1 << 9;
    pub const JUSTIFY: u32 = 1 << 10;
    pub const ALIGN: u32 = 1 << 11;
    pub const WRAP: u32 = 1 << 12;
    pub const GRID_COLUMNS: u32 = 1 << 13;
    pub const GRID_ROWS: u32 = 1 << 14;
    pub const PADDING: u32 = 1 << 15;
    pub const MARGIN: u32 = 1 << 16;
    pub const ASPECT_RATIO: u32 = 1 << 17;
}

fn w_layout(out: &mut Vec<u8>, layout: &Layout) {
    use layout_bits::*;
    let mut mask = 0u32;
    if layout.mode.is_some() {
        mask |= MODE;
    }
    if layout.explicit_display {
        mask |= EXPLICIT_DISPLAY;
    }
    if layout.width.is_some() {
        mask |= WIDTH;
    }
    if layout.height.is_some() {
        mask |= HEIGHT;
    }
    if layout.min_width.is_some() {
        mask |= MIN_WIDTH;
    }
    if layout.max_width.is_some() {
        mask |= MAX_WIDTH;
    }
    if layout.min_height.is_some() {
        mask |= MIN_HEIGHT;
    }
    if layout.max_height.is_some() {
        mask |= MAX_HEIGHT;
    }
    if layout.flex_direction.is_some() {
        mask |= FLEX_DIRECTION;
    }
    if layout.gap.is_some() {
        mask |= GAP;
    }
    if layout.justify_content.is_some() {
        mask |= JUSTIFY;
    }
    if layout.align_items.is_some() {
        mask |= ALIGN;
    }
    if layout.wrap {
        mask |= WRAP;
    }
    if layout.grid_columns.is_some() {
        mask |= GRID_COLUMNS;
    }
    if layout.grid_rows.is_some() {
        mask |= GRID_ROWS;
    }
    if layout.padding.is_some() {
        mask |= PADDING;
    }
    if layout.margin.is_some() {
        mask |= MARGIN;
    }
    if layout.aspect_ratio.is_some() {
        mask |= ASPECT_RATIO;
    }
    out.write_u32::<LittleEndian>(mask).unwrap();

    if let Some(mode) = layout.mode {
        out.push(match mode {
            LayoutMode::Flex => 0,
            LayoutMode::Grid => 1,
            LayoutMode::Block => 2,
        });
    }
    for dim in [
        &layout.width,
        &layout.height,
        &layout.min_width,
        &layout.max_width,
        &layout.min_height,
        &layout.max_height,
    ]
    .into_iter()
    .flatten()
    {
        w_dimension(out, dim);
    }
    if let Some(direction) = layout.flex_direction {
        out.push(match direction {
            FlexDirection::Row => 0,
            FlexDirection::Column => 1,
            FlexDirection::RowReverse => 2,
            FlexDirection::ColumnReverse => 3,
        });
    }
    if let Some(gap) = layout.gap {
        out.write_f32::<LittleEndian>(gap).unwrap();
    }
    if let Some(a) = layout.justify_content {
        out.push(alignment_byte(a));
    }
    if let Some(a) = layout.align_items {
        out.push(alignment_byte(a));
    }
    if let Some(v) = layout.grid_columns {
        out.write_u16::<LittleEndian>(v).unwrap();
    }
    if let Some(v) = layout.grid_rows {
        out.write_u16::<LittleEndian>(v).unwrap();
    }
    if let Some(rect) = &layout.padding {
        w_rect(out, rect);
    }
    if let Some(rect) = &layout.margin {
        w_rect(out, rect);
    }
    if let Some(ratio) = layout.aspect_ratio {
        out.write_f32::<LittleEndian>(ratio).unwrap();
    }
}

fn r_layout(r: &mut Reader<'_>) -> Result<Layout, KirError> {
    use layout_bits::*;
    let mask = r.u32()?;
    let mut layout = Layout::default();
    if mask & MODE != 0 {
        layout.mode = Some(match r.u8()? {
            0 => LayoutMode::Flex,
            1 => LayoutMode::Grid,
            2 => LayoutMode::Block,
            other => return Err(KirError::InvalidValue(format!("layout mode {other}"))),
        });
    }
    layout.explicit_display = mask & EXPLICIT_DISPLAY != 0;
    if mask & WIDTH != 0 {
        layout.width = Some(r.dimension()?);
    }
    if mask & HEIGHT != 0 {
        layout.height = Some(r.dimension()?);
    }
    if mask & MIN_WIDTH != 0 {
        layout.min_width = Some(r.dimension()?);
    }
    if mask & MAX_WIDTH != 0 {
        layout.max_width = Some(r.dimension()?);
    }
    if mask & MIN_HEIGHT != 0 {
        layout.min_height = Some(r.dimension()?);
    }
    if mask & MAX_HEIGHT != 0 {
        layout.max_height = Some(r.dimension()?);
    }
    if mask & FLEX_DIRECTION != 0 {
        layout.flex_direction = Some(match r.u8()? {
            0 => FlexDirection::Row,
            1 => FlexDirection::Column,
            2 => FlexDirection::RowReverse,
            3 => FlexDirection::ColumnReverse,
            other => return Err(KirError::InvalidValue(format!("flex direction {other}"))),
        });
    }
    if mask & GAP != 0 {
        layout.gap = Some(r.f32()?);
    }
    if mask & JUSTIFY != 0 {
        layout.justify_content = Some(r.alignment()?);
    }
    if mask & ALIGN != 0 {
        layout.align_items = Some(r.alignment()?);
    }
    layout.wrap = mask & WRAP != 0;
    if mask & GRID_COLUMNS != 0 {
        layout.grid_columns = Some(r.u16()?);
    }
    if mask & GRID_ROWS != 0 {
        layout.grid_rows = Some(r.u16()?);
    }
    if mask & PADDING != 0 {
        layout.padding = Some(r.rect()?);
    }
    if mask & MARGIN != 0 {
        layout.margin = Some(r.rect()?);
    }
    if mask & ASPECT_RATIO != 0 {
        layout.aspect_ratio = Some(r.f32()?);
    }
    Ok(layout)
}

// =============================================================================
// Components
// =============================================================================

mod component_bits {
    pub const TAG: u16 = 1 << 0;
    pub const CLASS_NAME: u16 = 1 << 1;
    pub const TEXT: u16 = 1 << 2;
    pub const TEXT_EXPRESSION: u16 = 1 << 3;
    pub const STYLE: u16 = 1 << 4;
    pub const LAYOUT: u16 = 1 << 5;
    pub const CUSTOM_DATA: u16 = 1 << 6;
    pub const COMPONENT_REF: u16 = 1 << 7;
    pub const COMPONENT_PROPS: u16 = 1 << 8;
    pub const SCOPE: u16 = 1 << 9;
    pub const VISIBLE_CONDITION: u16 = 1 << 10;
    pub const FOREACH_DEF: u16 = 1 << 11;
}

fn event_kind_byte(kind: EventKind) -> u8 {
    match kind {
        EventKind::Click => 0,
        EventKind::Hover => 1,
        EventKind::Change => 2,
        EventKind::Focus => 3,
        EventKind::Blur => 4,
        EventKind::Submit => 5,
        EventKind::Custom => 6,
    }
}

fn event_kind_of(byte: u8) -> Result<EventKind, KirError> {
    let kind = match byte {
        0 => EventKind::Click,
        1 => EventKind::Hover,
        2 => EventKind::Change,
        3 => EventKind::Focus,
        4 => EventKind::Blur,
        5 => EventKind::Submit,
        6 => EventKind::Custom,
        other => return Err(KirError::InvalidValue(format!("event kind {other}"))),
    };
    Ok(kind)
}

fn w_event(out: &mut Vec<u8>, event: &Event) {
    // type | bytecode_function_id | logic_id | handler_data | event_name
    out.push(event_kind_byte(event.event_type));
    w_str(out, &event.handler);
    out.write_u32::<LittleEndian>(event.bytecode_function_id)
        .unwrap();
    w_opt_str(out, event.logic_id.as_deref());
    w_opt_str(out, event.handler_data.as_ref().map(|s| s.as_str()));
    w_opt_str(out, event.event_name.as_deref());
}

fn r_event(r: &mut Reader<'_>) -> Result<Event, KirError> {
    Ok(Event {
        event_type: event_kind_of(r.u8()?)?,
        handler: r.str()?,
        bytecode_function_id: r.u32()?,
        logic_id: r.opt_str()?,
        handler_data: r.opt_str()?.map(Into::into),
        event_name: r.opt_str()?,
    })
}

fn w_component(out: &mut Vec<u8>, component: &Component) {
    use component_bits::*;
    out.write_u32::<LittleEndian>(component.id).unwrap();
    out.write_u32::<LittleEndian>(component.component_type.type_id())
        .unwrap();

    let mut mask = 0u16;
    let flags = [
        (TAG, component.tag.is_some()),
        (CLASS_NAME, component.class_name.is_some()),
        (TEXT, component.text.is_some()),
        (TEXT_EXPRESSION, component.text_expression.is_some()),
        (STYLE, component.style.is_some()),
        (LAYOUT, component.layout.is_some()),
        (CUSTOM_DATA, component.custom_data.is_some()),
        (COMPONENT_REF, component.component_ref.is_some()),
        (COMPONENT_PROPS, component.component_props.is_some()),
        (SCOPE, component.scope.is_some()),
        (VISIBLE_CONDITION, component.visible_condition.is_some()),
        (FOREACH_DEF, component.foreach_def.is_some()),
    ];
    for (bit, present) in flags {
        if present {
            mask |= bit;
        }
    }
    out.write_u16::<LittleEndian>(mask).unwrap();

    if let Some(tag) = &component.tag {
        w_str(out, tag);
    }
    if let Some(class) = &component.class_name {
        w_str(out, class);
    }
    if let Some(text) = &component.text {
        w_str(out, text);
    }
    if let Some(expr) = &component.text_expression {
        w_str(out, expr);
    }
    if let Some(style) = &component.style {
        w_style(out, style);
    }
    if let Some(layout) = &component.layout {
        w_layout(out, layout);
    }
    if let Some(data) = &component.custom_data {
        w_json(out, data);
    }
    if let Some(reference) = &component.component_ref {
        w_str(out, reference);
    }
    if let Some(props) = &component.component_props {
        w_json(out, props);
    }
    if let Some(scope) = &component.scope {
        w_str(out, scope);
    }
    if let Some(cond) = &component.visible_condition {
        w_str(out, &cond.expression);
        out.push(cond.visible_when as u8);
    }
    if let Some(def) = &component.foreach_def {
        w_foreach_def(out, def);
    }

    out.write_u16::<LittleEndian>(component.events.len() as u16)
        .unwrap();
    for event in &component.events {
        w_event(out, event);
    }
    out.write_u16::<LittleEndian>(component.property_bindings.len() as u16)
        .unwrap();
    for binding in &component.property_bindings {
        w_str(out, &binding.property);
        w_str(out, &binding.expression);
        w_opt_str(out, binding.fallback.as_deref());
        out.push(match binding.binding_kind {
            BindingKind::StaticTemplate => 0,
            BindingKind::Runtime => 1,
        });
    }
    out.write_u32::<LittleEndian>(component.children.len() as u32)
        .unwrap();
    for child in &component.children {
        w_component(out, child);
    }
}

fn r_component(r: &mut Reader<'_>) -> Result<Component, KirError> {
    use component_bits::*;
    let id = r.u32()?;
    let type_id = r.u32()?;
    let component_type = ComponentType::from_type_id(type_id)
        .ok_or_else(|| KirError::InvalidValue(format!("component type id {type_id}")))?;
    let mask = r.u16()?;

    let mut component = Component::new(component_type, id);
    if mask & TAG != 0 {
        component.tag = Some(r.str()?.into());
    }
    if mask & CLASS_NAME != 0 {
        component.class_name = Some(r.str()?.into());
    }
    if mask & TEXT != 0 {
        component.text = Some(r.str()?);
    }
    if mask & TEXT_EXPRESSION != 0 {
        component.text_expression = Some(r.str()?);
    }
    if mask & STYLE != 0 {
        component.style = Some(Box::new(r_style(r)?));
    }
    if mask & LAYOUT != 0 {
        component.layout = Some(Box::new(r_layout(r)?));
    }
    if mask & CUSTOM_DATA != 0 {
        component.custom_data = Some(r.json()?);
    }
    if mask & COMPONENT_REF != 0 {
        component.component_ref = Some(r.str()?);
    }
    if mask & COMPONENT_PROPS != 0 {
        component.component_props = Some(r.json()?);
    }
    if mask & SCOPE != 0 {
        component.scope = Some(r.str()?);
    }
    if mask & VISIBLE_CONDITION != 0 {
        component.visible_condition = Some(VisibleCondition {
            expression: r.str()?,
            visible_when: r.bool()?,
        });
    }
    if mask & FOREACH_DEF != 0 {
        component.foreach_def = Some(Box::new(r_foreach_def(r)?));
    }

    let event_count = r.u16()?;
    for _ in 0..event_count {
        component.events.push(r_event(r)?);
    }
    let binding_count = r.u16()?;
    for _ in 0..binding_count {
        component.property_bindings.push(PropertyBinding {
            property: r.str()?,
            expression: r.str()?,
            fallback: r.opt_str()?,
            binding_kind: match r.u8()? {
                0 => BindingKind::StaticTemplate,
                1 => BindingKind::Runtime,
                other => {
                    return Err(KirError::InvalidValue(format!("binding kind {other}")));
                }
            },
        });
    }
    let child_count = r.u32()?;
    for _ in 0..child_count {
        component.children.push(r_component(r)?);
    }
    Ok(component)
}

fn w_foreach_def(out: &mut Vec<u8>, def: &ForEachDef) {
    w_str(out, &def.item_name);
    w_opt_str(out, def.index_name.as_deref());
    out.push(match def.loop_kind {
        LoopKind::Explicit => 0,
        LoopKind::Implicit => 1,
    });
    w_str(out, &def.data_source);
    out.write_u16::<LittleEndian>(def.bindings.len() as u16)
        .unwrap();
    for binding in &def.bindings {
        w_str(out, &binding.property);
        w_str(out, &binding.expression);
        out.push(binding.reactive as u8);
    }
}

fn r_foreach_def(r: &mut Reader<'_>) -> Result<ForEachDef, KirError> {
    let item_name = r.str()?;
    let index_name = r.opt_str()?;
    let loop_kind = match r.u8()? {
        0 => LoopKind::Explicit,
        1 => LoopKind::Implicit,
        other => return Err(KirError::InvalidValue(format!("loop kind {other}"))),
    };
    let data_source = r.str()?;
    let binding_count = r.u16()?;
    let mut bindings = Vec::with_capacity(binding_count as usize);
    for _ in 0..binding_count {
        bindings.push(ForEachBinding {
            property: r.str()?,
            expression: r.str()?,
            reactive: r.bool()?,
        });
    }
    Ok(ForEachDef {
        item_name,
        index_name,
        loop_kind,
        data_source,
        bindings,
    })
}

// =============================================================================
// Manifest
// =============================================================================

fn w_manifest(out: &mut Vec<u8>, manifest: &ManifestWire) {
    out.write_u32::<LittleEndian>(manifest.variables.len() as u32)
        .unwrap();
    for var in &manifest.variables {
        out.write_u32::<LittleEndian>(var.id).unwrap();
        w_str(out, &var.name);
        w_str(out, &var.type_tag);
        w_json(out, &var.initial_value);
        w_str(out, &var.scope);
    }
    out.write_u32::<LittleEndian>(manifest.component_definitions.len() as u32)
        .unwrap();
    for def in &manifest.component_definitions {
        w_str(out, &def.name);
        w_opt_str(out, def.extends_parent.as_deref());
        out.write_u16::<LittleEndian>(def.props.len() as u16).unwrap();
        for prop in &def.props {
            w_str(out, &prop.name);
            w_str(out, &prop.type_tag);
            w_opt_str(out, prop.default.as_deref());
        }
        out.write_u16::<LittleEndian>(def.state_vars.len() as u16)
            .unwrap();
        for state in &def.state_vars {
            w_str(out, &state.name);
            w_str(out, &state.var_type);
            w_str(out, &state.initial_expr);
        }
        w_component(out, &def.template);
        w_opt_str(out, def.module_path.as_deref());
        w_opt_str(out, def.source_module.as_deref());
    }
}

fn r_manifest(r: &mut Reader<'_>) -> Result<ManifestWire, KirError> {
    let var_count = r.u32()?;
    let mut variables = Vec::with_capacity(var_count as usize);
    for _ in 0..var_count {
        let id = r.u32()?;
        let name = r.str()?;
        let type_tag = r.str()?;
        let initial_value = r.json()?;
        let scope = r.str()?;
        variables.push(ReactiveVariable {
            id,
            name,
            value: crate::ir::KryValue::from_json(&initial_value),
            type_tag,
            initial_value,
            scope,
        });
    }
    let def_count = r.u32()?;
    let mut component_definitions = Vec::with_capacity(def_count as usize);
    for _ in 0..def_count {
        let name = r.str()?;
        let extends_parent = r.opt_str()?;
        let prop_count = r.u16()?;
        let mut props = Vec::with_capacity(prop_count as usize);
        for _ in 0..prop_count {
            props.push(PropDef {
                name: r.str()?,
                type_tag: r.str()?,
                default: r.opt_str()?,
            });
        }
        let state_count = r.u16()?;
        let mut state_vars = Vec::with_capacity(state_count as usize);
        for _ in 0..state_count {
            state_vars.push(StateVarDef {
                name: r.str()?,
                var_type: r.str()?,
                initial_expr: r.str()?,
            });
        }
        let template = r_component(r)?;
        component_definitions.push(ComponentDef {
            name,
            extends_parent,
            props,
            state_vars,
            template,
            module_path: r.opt_str()?,
            source_module: r.opt_str()?,
        });
    }
    Ok(ManifestWire {
        variables,
        component_definitions,
    })
}

// =============================================================================
// Logic block
// =============================================================================

fn w_logic(out: &mut Vec<u8>, logic: &LogicBlock) {
    out.write_u32::<LittleEndian>(logic.functions.len() as u32)
        .unwrap();
    for function in &logic.functions {
        w_str(out, &function.name);
        out.write_u16::<LittleEndian>(function.params.len() as u16)
            .unwrap();
        for param in &function.params {
            w_str(out, &param.name);
            w_opt_str(out, param.type_tag.as_deref());
        }
        w_opt_str(out, function.return_type.as_deref());
        // Statement trees ride as JSON payloads inside the TLV field
        let body = serde_json::to_value(&function.body)
            .expect("statement trees always serialize");
        w_json(out, &body);
        out.write_u16::<LittleEndian>(function.sources.len() as u16)
            .unwrap();
        for (language, source) in &function.sources {
            w_str(out, language);
            w_str(out, source.as_str());
        }
    }
    out.write_u32::<LittleEndian>(logic.event_bindings.len() as u32)
        .unwrap();
    for binding in &logic.event_bindings {
        out.write_u32::<LittleEndian>(binding.component_id).unwrap();
        out.push(event_kind_byte(binding.event_type));
        w_str(out, &binding.handler);
    }
}

fn r_logic(r: &mut Reader<'_>) -> Result<LogicBlock, KirError> {
    let function_count = r.u32()?;
    let mut logic = LogicBlock::default();
    for _ in 0..function_count {
        let mut function = LogicFunction::new(r.str()?);
        let param_count = r.u16()?;
        for _ in 0..param_count {
            function.params.push(Param {
                name: r.str()?,
                type_tag: r.opt_str()?,
            });
        }
        function.return_type = r.opt_str()?;
        let body = r.json()?;
        function.body =
            serde_json::from_value(body).map_err(|e| KirError::Json(e.to_string()))?;
        let source_count = r.u16()?;
        for _ in 0..source_count {
            let language = r.str()?;
            let source = r.str()?;
            function.sources.insert(language, source.into());
        }
        logic.functions.push(function);
    }
    let binding_count = r.u32()?;
    for _ in 0..binding_count {
        logic.event_bindings.push(EventBinding {
            component_id: r.u32()?,
            event_type: event_kind_of(r.u8()?)?,
            handler: r.str()?,
        });
    }
    Ok(logic)
}

// =============================================================================
// Source structures
// =============================================================================

fn w_sources(out: &mut Vec<u8>, sources: &SourceStructures) {
    out.write_u32::<LittleEndian>(sources.static_blocks.len() as u32)
        .unwrap();
    for block in &sources.static_blocks {
        w_str(out, &block.id);
        match block.parent_component_id {
            Some(id) => {
                out.push(1);
                out.write_u32::<LittleEndian>(id).unwrap();
            }
            None => out.push(0),
        }
    }
    out.write_u32::<LittleEndian>(sources.for_loops.len() as u32)
        .unwrap();
    for record in &sources.for_loops {
        w_str(out, &record.scope_id);
        w_str(out, &record.iterator);
        w_str(out, &record.collection_ref);
        w_component(out, &record.template);
        out.write_u32::<LittleEndian>(record.expanded_component_ids.len() as u32)
            .unwrap();
        for id in &record.expanded_component_ids {
            out.write_u32::<LittleEndian>(*id).unwrap();
        }
    }
    out.write_u32::<LittleEndian>(sources.variables.len() as u32)
        .unwrap();
    for decl in &sources.variables {
        w_str(out, &decl.name);
        out.push(match decl.var_kind {
            VarKind::Const => 0,
            VarKind::Let => 1,
            VarKind::Var => 2,
        });
        w_json(out, &decl.value);
        w_str(out, &decl.scope);
    }
    out.write_u32::<LittleEndian>(sources.imports.len() as u32)
        .unwrap();
    for import in &sources.imports {
        w_str(out, &import.local_name);
        w_str(out, &import.module_path);
    }
    out.write_u32::<LittleEndian>(sources.struct_types.len() as u32)
        .unwrap();
    for struct_type in &sources.struct_types {
        w_str(out, &struct_type.name);
        out.write_u16::<LittleEndian>(struct_type.fields.len() as u16)
            .unwrap();
        for field in &struct_type.fields {
            w_str(out, &field.name);
            w_str(out, &field.type_tag);
        }
    }
    out.write_u32::<LittleEndian>(sources.module_exports.len() as u32)
        .unwrap();
    for export in &sources.module_exports {
        w_str(out, &export.name);
        out.push(match export.kind {
            ExportKind::Value => 0,
            ExportKind::Function => 1,
            ExportKind::StructRef => 2,
        });
        match &export.value {
            Some(value) => {
                out.push(1);
                w_json(out, value);
            }
            None => out.push(0),
        }
        w_opt_str(out, export.reference.as_deref());
    }
}

fn r_sources(r: &mut Reader<'_>) -> Result<SourceStructures, KirError> {
    let mut sources = SourceStructures::default();
    let block_count = r.u32()?;
    for _ in 0..block_count {
        let id = r.str()?;
        let parent_component_id = match r.u8()? {
            0 => None,
            _ => Some(r.u32()?),
        };
        sources.static_blocks.push(StaticBlockRecord {
            id,
            parent_component_id,
        });
    }
    let loop_count = r.u32()?;
    for _ in 0..loop_count {
        let scope_id = r.str()?;
        let iterator = r.str()?;
        let collection_ref = r.str()?;
        let template = r_component(r)?;
        let id_count = r.u32()?;
        let mut expanded_component_ids = Vec::with_capacity(id_count as usize);
        for _ in 0..id_count {
            expanded_component_ids.push(r.u32()?);
        }
        sources.for_loops.push(ForLoopRecord {
            scope_id,
            iterator,
            collection_ref,
            template,
            expanded_component_ids,
        });
    }
    let var_count = r.u32()?;
    for _ in 0..var_count {
        let name = r.str()?;
        let var_kind = match r.u8()? {
            0 => VarKind::Const,
            1 => VarKind::Let,
            2 => VarKind::Var,
            other => return Err(KirError::InvalidValue(format!("var kind {other}"))),
        };
        let value = r.json()?;
        let scope = r.str()?;
        sources.variables.push(VariableDecl {
            name,
            var_kind,
            value,
            scope,
        });
    }
    let import_count = r.u32()?;
    for _ in 0..import_count {
        sources.imports.push(ImportRecord {
            local_name: r.str()?,
            module_path: r.str()?,
        });
    }
    let struct_count = r.u32()?;
    for _ in 0..struct_count {
        let name = r.str()?;
        let field_count = r.u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(StructField {
                name: r.str()?,
                type_tag: r.str()?,
            });
        }
        sources.struct_types.push(StructType { name, fields });
    }
    let export_count = r.u32()?;
    for _ in 0..export_count {
        let name = r.str()?;
        let kind = match r.u8()? {
            0 => ExportKind::Value,
            1 => ExportKind::Function,
            2 => ExportKind::StructRef,
            other => return Err(KirError::InvalidValue(format!("export kind {other}"))),
        };
        let value = match r.u8()? {
            0 => None,
            _ => Some(r.json()?),
        };
        sources.module_exports.push(ModuleExport {
            name,
            kind,
            value,
            reference: r.opt_str()?,
        });
    }
    Ok(sources)
}

// =============================================================================
// Stylesheet and window metadata
// =============================================================================

fn w_stylesheet(out: &mut Vec<u8>, stylesheet: &Stylesheet) {
    out.write_u32::<LittleEndian>(stylesheet.len() as u32).unwrap();
    for (selector, props) in stylesheet.iter() {
        w_str(out, selector);
        // The rule record reuses the JSON wire shape (flags reconstruct on
        // read)
        let value = serde_json::to_value(props).expect("style props always serialize");
        w_json(out, &value);
    }
}

fn r_stylesheet(r: &mut Reader<'_>) -> Result<Stylesheet, KirError> {
    let rule_count = r.u32()?;
    let mut stylesheet = Stylesheet::new();
    for _ in 0..rule_count {
        let selector = r.str()?;
        let props: StyleProps =
            serde_json::from_value(r.json()?).map_err(|e| KirError::Json(e.to_string()))?;
        stylesheet.add_rule(selector.as_str(), props);
    }
    Ok(stylesheet)
}

fn w_window(out: &mut Vec<u8>, metadata: &Metadata) {
    let mut mask = 0u8;
    if metadata.window_title.is_some() {
        mask |= 1;
    }
    if metadata.window_width.is_some() {
        mask |= 2;
    }
    if metadata.window_height.is_some() {
        mask |= 4;
    }
    out.push(mask);
    if let Some(title) = &metadata.window_title {
        w_str(out, title);
    }
    if let Some(width) = metadata.window_width {
        out.write_u32::<LittleEndian>(width).unwrap();
    }
    if let Some(height) = metadata.window_height {
        out.write_u32::<LittleEndian>(height).unwrap();
    }
}

fn r_window(r: &mut Reader<'_>) -> Result<Metadata, KirError> {
    let mask = r.u8()?;
    let mut metadata = Metadata::default();
    if mask & 1 != 0 {
        metadata.window_title = Some(r.str()?);
    }
    if mask & 2 != 0 {
        metadata.window_width = Some(r.u32()?);
    }
    if mask & 4 != 0 {
        metadata.window_height = Some(r.u32()?);
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::KryValue;
    use serde_json::json;

    fn rich_document() -> KirDocument {
        let mut text = Component::new(ComponentType::Text, 1);
        text.set_text_expression("value");
        text.property_bindings.push(PropertyBinding {
            property: "text".to_string(),
            expression: "value".to_string(),
            fallback: Some("5".to_string()),
            binding_kind: BindingKind::Runtime,
        });
        let style = text.style_mut();
        style.background = Some(Color::rgba(10, 20, 30, 40));
        style.font_size = Some(14.0);
        style.padding = Some(EdgeRect::uniform(4.0));
        let layout = text.layout_mut();
        layout.width = Some(Dimension::Percent(100.0));
        layout.justify_content = Some(Alignment::SpaceBetween);

        let mut button = Component::new(ComponentType::Button, 2);
        button.set_text_content("Go");
        let mut event = Event::new(EventKind::Click, "handler_0_click");
        event.logic_id = Some("handler_0_click".to_string());
        event.handler_data = Some("count = count + 1".into());
        button.events.push(event);

        let mut root = Component::new(ComponentType::Container, 0);
        root.scope = Some("Counter#0".to_string());
        root.custom_data = Some(json!({"theme": "dark"}));
        root.add_child(text);
        root.add_child(button);

        let mut doc = KirDocument::new(root);
        doc.source_metadata = SourceMetadata {
            source_language: "kry".to_string(),
            compiler_version: "0.1.0".to_string(),
            timestamp: "1700000000".to_string(),
        };

        doc.reactive_manifest.variables.push(ReactiveVariable {
            id: 1,
            name: "value".to_string(),
            value: KryValue::Int(5),
            type_tag: "int".to_string(),
            initial_value: json!(5),
            scope: "Counter#0".to_string(),
        });
        doc.reactive_manifest.component_definitions.push(ComponentDef {
            name: "Counter".to_string(),
            extends_parent: None,
            props: vec![PropDef {
                name: "initialValue".to_string(),
                type_tag: "int".to_string(),
                default: None,
            }],
            state_vars: vec![StateVarDef {
                name: "value".to_string(),
                var_type: "int".to_string(),
                initial_expr: "initialValue".to_string(),
            }],
            template: Component::new(ComponentType::Container, 90),
            module_path: None,
            source_module: None,
        });

        let mut function = LogicFunction::new("handler_0_click");
        function.sources.insert("kry".to_string(), "count = count + 1".into());
        doc.logic_block.functions.push(function);
        doc.logic_block.event_bindings.push(EventBinding {
            component_id: 2,
            event_type: EventKind::Click,
            handler: "handler_0_click".to_string(),
        });

        doc.source_structures.add_static_block("static_0", Some(0));
        doc.source_structures.add_variable(
            "items",
            VarKind::Const,
            json!([1, 2, 3]),
            "static_0",
        );
        doc.source_structures.add_for_loop(ForLoopRecord {
            scope_id: "static_0".to_string(),
            iterator: "x".to_string(),
            collection_ref: "items".to_string(),
            template: Component::new(ComponentType::Text, 91),
            expanded_component_ids: vec![3, 4, 5],
        });

        let mut stylesheet = Stylesheet::new();
        let mut props = StyleProps::default();
        props.flags |= crate::style::StyleFlags::GAP;
        props.gap = 8.0;
        stylesheet.add_rule("panel", props);
        doc.stylesheet = Some(stylesheet);

        doc.metadata = Some(Metadata {
            window_title: Some("Demo".to_string()),
            window_width: Some(800),
            window_height: Some(600),
        });
        doc
    }

    #[test]
    fn test_magic_and_version_prefix() {
        let bytes = encode(&rich_document()).unwrap();
        assert_eq!(&bytes[0..4], b"KIRB");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1);
    }

    #[test]
    fn test_binary_roundtrip_is_lossless() {
        let doc = rich_document();
        let bytes = encode(&doc).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_bad_magic_rejected() {
        assert_eq!(decode(b"NOPE\x01\x00"), Err(KirError::BadMagic));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = encode(&rich_document()).unwrap();
        bytes[4] = 0x63;
        assert_eq!(decode(&bytes), Err(KirError::UnsupportedVersion(0x63)));
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let mut bytes = encode(&rich_document()).unwrap();
        // Append a bogus section
        bytes.push(0x7E);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode(&bytes), Err(KirError::UnknownTag(0x7E)));
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = encode(&rich_document()).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn test_minimal_document() {
        let doc = KirDocument::new(Component::new(ComponentType::Container, 0));
        let bytes = encode(&doc).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back, doc);
    }
}
