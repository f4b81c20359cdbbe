//! Logic block: named functions and event bindings.
//!
//! Functions carry a typed statement body plus per-language source
//! alternates so a code generator can emit them in multiple targets.
//! Order is preserved from source.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::base::SharedSource;
use crate::ir::{EventKind, Stmt};

/// Per-language source text for a function (`lua` → snippet, `js` → ...).
/// Buffers are shared with legacy inline events via [`SharedSource`].
pub type SourceAlternates = IndexMap<String, SharedSource>;

/// A typed function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
}

/// A named logic function. Identity: unique name within its logic block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicFunction {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Stmt>,

    /// `{language tag → source text}` alternates.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sources: SourceAlternates,
}

impl LogicFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: None,
            body: Vec::new(),
            sources: SourceAlternates::new(),
        }
    }

    /// Attach a source alternate under a language tag.
    pub fn with_source(mut self, language: impl Into<String>, source: SharedSource) -> Self {
        self.sources.insert(language.into(), source);
        self
    }
}

/// (component, event, handler) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBinding {
    pub component_id: u32,
    pub event_type: EventKind,
    pub handler: String,
}

/// Ordered set of logic functions and event bindings, shared by the whole
/// compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicBlock {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<LogicFunction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_bindings: Vec<EventBinding>,
}

impl LogicBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a function. Returns `false` (and keeps the original) when the
    /// name is already taken.
    pub fn add_function(&mut self, function: LogicFunction) -> bool {
        if self.function(&function.name).is_some() {
            tracing::warn!(name = %function.name, "duplicate logic function ignored");
            return false;
        }
        self.functions.push(function);
        true
    }

    pub fn function(&self, name: &str) -> Option<&LogicFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn add_event_binding(&mut self, binding: EventBinding) {
        self.event_bindings.push(binding);
    }

    /// Every event binding must refer to a function that exists here.
    pub fn unresolved_bindings(&self) -> Vec<&EventBinding> {
        self.event_bindings
            .iter()
            .filter(|b| self.function(&b.handler).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.event_bindings.is_empty()
    }
}
