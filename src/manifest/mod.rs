//! Reactive-state manifest.
//!
//! The ordered set of reactive variables and component definitions of one
//! compilation unit, with lookup by name. Variable ids are assigned
//! sequentially on first add (ids start at 1; id 0 means "not registered").

pub mod logic;
pub mod source;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ir::{Component, KryValue};

pub use logic::{EventBinding, LogicBlock, LogicFunction, Param, SourceAlternates};
pub use source::SourceStructures;

/// A reactive variable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReactiveVariableWire", into = "ReactiveVariableWire")]
pub struct ReactiveVariable {
    /// Stable id, ≥ 1 and monotonic within a manifest.
    pub id: u32,
    pub name: String,
    /// Typed initial value (derived view of `initial_value`).
    pub value: KryValue,
    /// Type tag: `int`, `float`, `bool`, `string`, `array`, `object`.
    pub type_tag: String,
    /// JSON encoding of the initial value, as serialized into KIR.
    pub initial_value: JsonValue,
    /// `"global"`, `"component"`, or an instance scope like `Counter#3`.
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReactiveVariableWire {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    type_tag: String,
    initial_value: JsonValue,
    scope: String,
}

impl From<ReactiveVariableWire> for ReactiveVariable {
    fn from(wire: ReactiveVariableWire) -> Self {
        let value = KryValue::from_json(&wire.initial_value);
        ReactiveVariable {
            id: wire.id,
            name: wire.name,
            value,
            type_tag: wire.type_tag,
            initial_value: wire.initial_value,
            scope: wire.scope,
        }
    }
}

impl From<ReactiveVariable> for ReactiveVariableWire {
    fn from(var: ReactiveVariable) -> Self {
        ReactiveVariableWire {
            id: var.id,
            name: var.name,
            type_tag: var.type_tag,
            initial_value: var.initial_value,
            scope: var.scope,
        }
    }
}

/// A property declared by a component definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A state variable declared by a component definition. On instantiation
/// each becomes a reactive variable in the instance scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVarDef {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    /// Initial-value expression text; a bare prop name binds the prop.
    pub initial_expr: String,
}

/// A named component template, optionally extending another definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends_parent: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<PropDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_vars: Vec<StateVarDef>,

    /// The template root. The link is unidirectional (definition →
    /// template); instances are deep clones.
    pub template: Component,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_module: Option<String>,
}

/// The reactive manifest of a compilation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactiveManifest {
    variables: Vec<ReactiveVariable>,
    definitions: Vec<ComponentDef>,
    /// (name, scope) → variable index.
    var_index: FxHashMap<(String, String), usize>,
    def_index: FxHashMap<String, usize>,
    next_var_id: u32,
}

impl ReactiveManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable, returning its id. A (name, scope) pair is
    /// registered once; re-adding returns the existing id unchanged.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        value: KryValue,
        scope: impl Into<String>,
    ) -> u32 {
        let name = name.into();
        let scope = scope.into();
        if let Some(&idx) = self.var_index.get(&(name.clone(), scope.clone())) {
            return self.variables[idx].id;
        }
        self.next_var_id += 1;
        let id = self.next_var_id;
        let var = ReactiveVariable {
            id,
            name: name.clone(),
            type_tag: value.type_tag().to_string(),
            initial_value: value.to_json(),
            value,
            scope: scope.clone(),
        };
        tracing::debug!(name = %var.name, scope = %var.scope, id, "register reactive variable");
        self.var_index.insert((name, scope), self.variables.len());
        self.variables.push(var);
        id
    }

    /// Overwrite the type tag and initial-value JSON of a registered
    /// variable. Separate from [`add_variable`](Self::add_variable) so the
    /// primary add stays type-focused.
    pub fn set_variable_metadata(
        &mut self,
        id: u32,
        type_tag: impl Into<String>,
        initial_value: JsonValue,
    ) -> bool {
        match self.variables.iter_mut().find(|v| v.id == id) {
            Some(var) => {
                var.type_tag = type_tag.into();
                var.value = KryValue::from_json(&initial_value);
                var.initial_value = initial_value;
                true
            }
            None => false,
        }
    }

    /// Look up a variable id by (name, scope). 0 means "not registered".
    pub fn variable_id(&self, name: &str, scope: &str) -> u32 {
        self.var_index
            .get(&(name.to_string(), scope.to_string()))
            .map(|&idx| self.variables[idx].id)
            .unwrap_or(0)
    }

    pub fn variable(&self, name: &str, scope: &str) -> Option<&ReactiveVariable> {
        self.var_index
            .get(&(name.to_string(), scope.to_string()))
            .map(|&idx| &self.variables[idx])
    }

    /// Find a variable by bare name in any scope, preferring `"global"`.
    pub fn variable_any_scope(&self, name: &str) -> Option<&ReactiveVariable> {
        self.variable(name, "global")
            .or_else(|| self.variables.iter().find(|v| v.name == name))
    }

    pub fn variable_by_id(&self, id: u32) -> Option<&ReactiveVariable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn variables(&self) -> &[ReactiveVariable] {
        &self.variables
    }

    /// Register a component definition. Re-registering a name replaces the
    /// old definition (later module wins) and reports `false`.
    pub fn add_definition(&mut self, def: ComponentDef) -> bool {
        match self.def_index.get(&def.name) {
            Some(&idx) => {
                tracing::warn!(name = %def.name, "component definition redefined");
                self.definitions[idx] = def;
                false
            }
            None => {
                self.def_index.insert(def.name.clone(), self.definitions.len());
                self.definitions.push(def);
                true
            }
        }
    }

    pub fn definition(&self, name: &str) -> Option<&ComponentDef> {
        self.def_index.get(name).map(|&idx| &self.definitions[idx])
    }

    pub fn definitions(&self) -> &[ComponentDef] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.definitions.is_empty()
    }
}

/// Wire form of the manifest in KIR JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<ReactiveVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_definitions: Vec<ComponentDef>,
}

impl From<&ReactiveManifest> for ManifestWire {
    fn from(manifest: &ReactiveManifest) -> Self {
        ManifestWire {
            variables: manifest.variables.clone(),
            component_definitions: manifest.definitions.clone(),
        }
    }
}

impl From<ManifestWire> for ReactiveManifest {
    fn from(wire: ManifestWire) -> Self {
        let mut manifest = ReactiveManifest::new();
        for var in wire.variables {
            manifest
                .var_index
                .insert((var.name.clone(), var.scope.clone()), manifest.variables.len());
            manifest.next_var_id = manifest.next_var_id.max(var.id);
            manifest.variables.push(var);
        }
        for def in wire.component_definitions {
            manifest.add_definition(def);
        }
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ComponentType;

    #[test]
    fn test_variable_ids_start_at_one() {
        let mut manifest = ReactiveManifest::new();
        let a = manifest.add_variable("count", KryValue::Int(0), "global");
        let b = manifest.add_variable("label", KryValue::String("hi".into()), "global");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(manifest.variable_id("missing", "global"), 0);
    }

    #[test]
    fn test_same_name_different_scope_is_distinct() {
        let mut manifest = ReactiveManifest::new();
        let a = manifest.add_variable("value", KryValue::Int(5), "Counter#0");
        let b = manifest.add_variable("value", KryValue::Int(10), "Counter#1");
        assert_ne!(a, b);
        assert_eq!(manifest.variable("value", "Counter#0").unwrap().value, KryValue::Int(5));
        assert_eq!(manifest.variable("value", "Counter#1").unwrap().value, KryValue::Int(10));
    }

    #[test]
    fn test_duplicate_add_returns_existing_id() {
        let mut manifest = ReactiveManifest::new();
        let a = manifest.add_variable("count", KryValue::Int(0), "global");
        let b = manifest.add_variable("count", KryValue::Int(99), "global");
        assert_eq!(a, b);
        assert_eq!(manifest.variable("count", "global").unwrap().value, KryValue::Int(0));
    }

    #[test]
    fn test_set_metadata() {
        let mut manifest = ReactiveManifest::new();
        let id = manifest.add_variable("theme", KryValue::Null, "global");
        assert!(manifest.set_variable_metadata(id, "string", JsonValue::String("dark".into())));
        let var = manifest.variable_by_id(id).unwrap();
        assert_eq!(var.type_tag, "string");
        assert_eq!(var.value, KryValue::String("dark".into()));
        assert!(!manifest.set_variable_metadata(999, "int", JsonValue::Null));
    }

    #[test]
    fn test_definition_lookup_and_replace() {
        let mut manifest = ReactiveManifest::new();
        let def = ComponentDef {
            name: "Counter".to_string(),
            extends_parent: None,
            props: vec![],
            state_vars: vec![],
            template: Component::new(ComponentType::Container, 0),
            module_path: None,
            source_module: None,
        };
        assert!(manifest.add_definition(def.clone()));
        assert!(manifest.definition("Counter").is_some());
        assert!(!manifest.add_definition(def));
    }

    #[test]
    fn test_wire_roundtrip() {
        let mut manifest = ReactiveManifest::new();
        manifest.add_variable("count", KryValue::Int(3), "global");
        manifest.add_variable("value", KryValue::Int(5), "Counter#0");

        let wire = ManifestWire::from(&manifest);
        let json = serde_json::to_string(&wire).unwrap();
        let back: ManifestWire = serde_json::from_str(&json).unwrap();
        let restored = ReactiveManifest::from(back);
        assert_eq!(restored.variables(), manifest.variables());
        assert_eq!(restored.variable_id("value", "Counter#0"), 2);
    }
}
