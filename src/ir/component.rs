//! The IR component tree.
//!
//! A component exclusively owns its children, style, layout, events, text
//! buffers, and for-each template (which, by invariant, is `children[0]`
//! when `foreach_def` is present).

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::layout::Layout;
use super::style::Style;
use crate::base::SharedSource;

/// Enumerated component kinds, plus `Custom` for plugin-defined types
/// (the component's `tag` then carries the concrete name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComponentType {
    // Layout containers
    #[default]
    Container,
    /// Application root; window properties apply here.
    App,
    Row,
    Column,
    Center,
    Grid,
    ScrollView,
    Spacer,
    Divider,
    Card,
    Form,
    FieldSet,
    // Text content
    Text,
    Heading,
    Paragraph,
    Blockquote,
    CodeBlock,
    CodeInline,
    Link,
    Span,
    Strong,
    Em,
    Small,
    Mark,
    List,
    ListItem,
    Label,
    Markdown,
    // Interactive controls
    Button,
    Input,
    TextArea,
    Checkbox,
    RadioButton,
    Toggle,
    Dropdown,
    Slider,
    ProgressBar,
    DatePicker,
    // Media
    Image,
    Video,
    Audio,
    Canvas,
    EmbedView,
    // Tables
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell,
    TableHeaderCell,
    // Tabs
    TabGroup,
    TabBar,
    Tab,
    TabContent,
    TabPanel,
    // Overlays and chrome
    Modal,
    Tooltip,
    Badge,
    NavBar,
    Sidebar,
    Header,
    Footer,
    // Structured diagrams
    Flowchart,
    // Runtime iteration
    ForEach,
    /// A plugin-defined component; `Component::tag` names it.
    Custom,
}

impl ComponentType {
    /// All built-in kinds, in declaration order. The index in this table is
    /// the numeric type id plugins address components by.
    pub const ALL: &'static [ComponentType] = &[
        ComponentType::Container,
        ComponentType::App,
        ComponentType::Row,
        ComponentType::Column,
        ComponentType::Center,
        ComponentType::Grid,
        ComponentType::ScrollView,
        ComponentType::Spacer,
        ComponentType::Divider,
        ComponentType::Card,
        ComponentType::Form,
        ComponentType::FieldSet,
        ComponentType::Text,
        ComponentType::Heading,
        ComponentType::Paragraph,
        ComponentType::Blockquote,
        ComponentType::CodeBlock,
        ComponentType::CodeInline,
        ComponentType::Link,
        ComponentType::Span,
        ComponentType::Strong,
        ComponentType::Em,
        ComponentType::Small,
        ComponentType::Mark,
        ComponentType::List,
        ComponentType::ListItem,
        ComponentType::Label,
        ComponentType::Markdown,
        ComponentType::Button,
        ComponentType::Input,
        ComponentType::TextArea,
        ComponentType::Checkbox,
        ComponentType::RadioButton,
        ComponentType::Toggle,
        ComponentType::Dropdown,
        ComponentType::Slider,
        ComponentType::ProgressBar,
        ComponentType::DatePicker,
        ComponentType::Image,
        ComponentType::Video,
        ComponentType::Audio,
        ComponentType::Canvas,
        ComponentType::EmbedView,
        ComponentType::Table,
        ComponentType::TableHead,
        ComponentType::TableBody,
        ComponentType::TableRow,
        ComponentType::TableCell,
        ComponentType::TableHeaderCell,
        ComponentType::TabGroup,
        ComponentType::TabBar,
        ComponentType::Tab,
        ComponentType::TabContent,
        ComponentType::TabPanel,
        ComponentType::Modal,
        ComponentType::Tooltip,
        ComponentType::Badge,
        ComponentType::NavBar,
        ComponentType::Sidebar,
        ComponentType::Header,
        ComponentType::Footer,
        ComponentType::Flowchart,
        ComponentType::ForEach,
        ComponentType::Custom,
    ];

    /// The snake_case name plugins address this type by
    /// (`code_block`, `table_header_cell`, ...).
    pub fn snake_case_name(&self) -> &'static str {
        match self {
            ComponentType::Container => "container",
            ComponentType::App => "app",
            ComponentType::Row => "row",
            ComponentType::Column => "column",
            ComponentType::Center => "center",
            ComponentType::Grid => "grid",
            ComponentType::ScrollView => "scroll_view",
            ComponentType::Spacer => "spacer",
            ComponentType::Divider => "divider",
            ComponentType::Card => "card",
            ComponentType::Form => "form",
            ComponentType::FieldSet => "field_set",
            ComponentType::Text => "text",
            ComponentType::Heading => "heading",
            ComponentType::Paragraph => "paragraph",
            ComponentType::Blockquote => "blockquote",
            ComponentType::CodeBlock => "code_block",
            ComponentType::CodeInline => "code_inline",
            ComponentType::Link => "link",
            ComponentType::Span => "span",
            ComponentType::Strong => "strong",
            ComponentType::Em => "em",
            ComponentType::Small => "small",
            ComponentType::Mark => "mark",
            ComponentType::List => "list",
            ComponentType::ListItem => "list_item",
            ComponentType::Label => "label",
            ComponentType::Markdown => "markdown",
            ComponentType::Button => "button",
            ComponentType::Input => "input",
            ComponentType::TextArea => "text_area",
            ComponentType::Checkbox => "checkbox",
            ComponentType::RadioButton => "radio_button",
            ComponentType::Toggle => "toggle",
            ComponentType::Dropdown => "dropdown",
            ComponentType::Slider => "slider",
            ComponentType::ProgressBar => "progress_bar",
            ComponentType::DatePicker => "date_picker",
            ComponentType::Image => "image",
            ComponentType::Video => "video",
            ComponentType::Audio => "audio",
            ComponentType::Canvas => "canvas",
            ComponentType::EmbedView => "embed_view",
            ComponentType::Table => "table",
            ComponentType::TableHead => "table_head",
            ComponentType::TableBody => "table_body",
            ComponentType::TableRow => "table_row",
            ComponentType::TableCell => "table_cell",
            ComponentType::TableHeaderCell => "table_header_cell",
            ComponentType::TabGroup => "tab_group",
            ComponentType::TabBar => "tab_bar",
            ComponentType::Tab => "tab",
            ComponentType::TabContent => "tab_content",
            ComponentType::TabPanel => "tab_panel",
            ComponentType::Modal => "modal",
            ComponentType::Tooltip => "tooltip",
            ComponentType::Badge => "badge",
            ComponentType::NavBar => "nav_bar",
            ComponentType::Sidebar => "sidebar",
            ComponentType::Header => "header",
            ComponentType::Footer => "footer",
            ComponentType::Flowchart => "flowchart",
            ComponentType::ForEach => "for_each",
            ComponentType::Custom => "custom",
        }
    }

    /// The numeric id plugins receive from `get_component_type_id`.
    pub fn type_id(&self) -> u32 {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0) as u32
    }

    pub fn from_type_id(id: u32) -> Option<ComponentType> {
        Self::ALL.get(id as usize).copied()
    }

    /// Resolve a snake_case plugin name to a type.
    pub fn from_snake_case(name: &str) -> Option<ComponentType> {
        Self::ALL
            .iter()
            .find(|t| t.snake_case_name() == name)
            .copied()
    }

    /// Resolve a source-level component name, case-insensitively.
    /// Unknown names are candidates for custom-component expansion.
    pub fn from_source_name(name: &str) -> Option<ComponentType> {
        Self::ALL.iter().copied().find(|t| {
            t != &ComponentType::Custom && format!("{t:?}").eq_ignore_ascii_case(name)
        })
    }

    /// Default layout containers render as flex columns; rows as flex rows.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ComponentType::Container
                | ComponentType::App
                | ComponentType::Row
                | ComponentType::Column
                | ComponentType::Center
                | ComponentType::Grid
                | ComponentType::ScrollView
                | ComponentType::Card
                | ComponentType::Form
        )
    }
}

/// The events a component can bind handlers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Hover,
    Change,
    Focus,
    Blur,
    Submit,
    Custom,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Hover => "hover",
            EventKind::Change => "change",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::Submit => "submit",
            EventKind::Custom => "custom",
        }
    }

    /// Map a source property name (`onClick`, ...) to an event kind.
    pub fn from_property(name: &str) -> Option<EventKind> {
        match name {
            "onClick" => Some(EventKind::Click),
            "onHover" => Some(EventKind::Hover),
            "onChange" => Some(EventKind::Change),
            "onFocus" => Some(EventKind::Focus),
            "onBlur" => Some(EventKind::Blur),
            "onSubmit" => Some(EventKind::Submit),
            _ => None,
        }
    }
}

/// An event attached to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventKind,

    /// Name of the logic function this event dispatches to.
    pub handler: String,

    /// Compiled bytecode function id, 0 when the handler is source-only.
    #[serde(rename = "bytecode_function_id", default)]
    pub bytecode_function_id: u32,

    #[serde(rename = "logic_id", skip_serializing_if = "Option::is_none")]
    pub logic_id: Option<String>,

    /// Legacy inline handler source, kept for older renderers. Shares its
    /// buffer with the logic function's source alternate.
    #[serde(rename = "handler_data", skip_serializing_if = "Option::is_none")]
    pub handler_data: Option<SharedSource>,

    /// Concrete event name when `event_type` is `Custom`.
    #[serde(rename = "event_name", skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

impl Event {
    pub fn new(event_type: EventKind, handler: impl Into<String>) -> Self {
        Self {
            event_type,
            handler: handler.into(),
            bytecode_function_id: 0,
            logic_id: None,
            handler_data: None,
            event_name: None,
        }
    }
}

/// Conditional-rendering marker: the component is visible when
/// `expression` evaluates to `visible_when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleCondition {
    pub expression: String,
    pub visible_when: bool,
}

/// Whether a for-each came from explicit `for each` syntax or was inferred
/// from an unresolvable compile-time loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    Explicit,
    Implicit,
}

/// A property bound inside a for-each template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForEachBinding {
    pub property: String,
    pub expression: String,
    pub reactive: bool,
}

/// Runtime-iteration descriptor. The template is the owning component's
/// `children[0]`; later children are expansion results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForEachDef {
    pub item_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    pub loop_kind: LoopKind,

    /// Name of the reactive variable supplying the collection.
    pub data_source: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<ForEachBinding>,
}

/// How a property binding participates in updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    StaticTemplate,
    Runtime,
}

/// A preserved unresolved expression on a component, with the substituted
/// fallback the runtime shows until the expression first evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyBinding {
    pub property: String,
    pub expression: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    pub binding_kind: BindingKind,
}

/// A node in the IR component tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Component {
    /// Unique within the compilation unit, monotonic in traversal order.
    pub id: u32,

    #[serde(rename = "type")]
    pub component_type: ComponentType,

    /// Concrete name for `Custom` components; HTML-ish tag otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<SmolStr>,

    #[serde(rename = "className", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<SmolStr>,

    /// Static text content. Mutually exclusive with `text_expression`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Unresolved text expression the runtime evaluates. A component with
    /// this set also carries a matching `text` property binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_expression: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Box<Style>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Box<Layout>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,

    /// Opaque plugin payload, read through the capability data handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,

    /// Unexpanded reference to a component definition (runtime instantiates).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_ref: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_props: Option<serde_json::Value>,

    /// Instance scope token (`Counter#3`) on custom-component roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_condition: Option<VisibleCondition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreach_def: Option<Box<ForEachDef>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_bindings: Vec<PropertyBinding>,
}

impl Component {
    pub fn new(component_type: ComponentType, id: u32) -> Self {
        Component {
            id,
            component_type,
            ..Component::default()
        }
    }

    pub fn add_child(&mut self, child: Component) {
        self.children.push(child);
    }

    /// Style record, created on first touch.
    pub fn style_mut(&mut self) -> &mut Style {
        self.style.get_or_insert_with(Default::default)
    }

    /// Layout record, created on first touch.
    pub fn layout_mut(&mut self) -> &mut Layout {
        self.layout.get_or_insert_with(Default::default)
    }

    /// Set static text content, clearing any text expression.
    /// Exactly one of the two may be set.
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
        self.text_expression = None;
    }

    /// Set a runtime text expression, clearing static text.
    pub fn set_text_expression(&mut self, expression: impl Into<String>) {
        self.text_expression = Some(expression.into());
        self.text = None;
    }

    /// Count of nodes in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Component::subtree_len).sum::<usize>()
    }

    /// Depth-first traversal over the subtree.
    pub fn walk(&self, f: &mut impl FnMut(&Component)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}
