//! Source-preservation metadata.
//!
//! Round-trip records that let a code generator regenerate the original
//! `.kry` source from KIR: static blocks, compile-time for-loops, variable
//! declarations, imports, struct types, and module exports.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ir::Component;

/// A `static { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticBlockRecord {
    /// Stable id of the form `static_<N>`.
    pub id: String,
    /// Id of the IR component the block's children were attached to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_component_id: Option<u32>,
}

/// A compile-time `for` loop, preserved pre-expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForLoopRecord {
    /// Id of the static block the loop appeared in.
    pub scope_id: String,
    /// Iterator variable name.
    pub iterator: String,
    /// Name of the collection the loop walks.
    pub collection_ref: String,
    /// Loop body converted with an empty parameter context.
    pub template: Component,
    /// Ids of the components each iteration produced, in order.
    #[serde(default)]
    pub expanded_component_ids: Vec<u32>,
}

/// Kind of a module-level variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

/// A preserved variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub var_kind: VarKind,
    /// JSON-serialized declared value.
    pub value: JsonValue,
    /// `"module"` or a static-block id.
    pub scope: String,
}

/// An `import Name from dotted.path` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub local_name: String,
    pub module_path: String,
}

/// A field of a struct type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// A `struct Name { fields }` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<StructField>,
}

/// What a module export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Value,
    Function,
    StructRef,
}

/// One entry of a module's `return { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleExport {
    pub name: String,
    pub kind: ExportKind,
    /// Constant value, for `ExportKind::Value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
    /// Referenced function or struct name, for the other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// The bag of compile-time metadata enabling source regeneration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStructures {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_blocks: Vec<StaticBlockRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub for_loops: Vec<ForLoopRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ImportRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub struct_types: Vec<StructType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module_exports: Vec<ModuleExport>,
}

impl SourceStructures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static_block(&mut self, id: impl Into<String>, parent: Option<u32>) {
        self.static_blocks.push(StaticBlockRecord {
            id: id.into(),
            parent_component_id: parent,
        });
    }

    pub fn add_for_loop(&mut self, record: ForLoopRecord) {
        self.for_loops.push(record);
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        var_kind: VarKind,
        value: JsonValue,
        scope: impl Into<String>,
    ) {
        self.variables.push(VariableDecl {
            name: name.into(),
            var_kind,
            value,
            scope: scope.into(),
        });
    }

    pub fn add_import(&mut self, local_name: impl Into<String>, module_path: impl Into<String>) {
        self.imports.push(ImportRecord {
            local_name: local_name.into(),
            module_path: module_path.into(),
        });
    }

    pub fn add_struct_type(&mut self, struct_type: StructType) {
        self.struct_types.push(struct_type);
    }

    pub fn add_module_export(&mut self, export: ModuleExport) {
        self.module_exports.push(export);
    }

    pub fn is_empty(&self) -> bool {
        self == &SourceStructures::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_serializes_to_empty_object() {
        let json = serde_json::to_string(&SourceStructures::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_roundtrip() {
        let mut structures = SourceStructures::new();
        structures.add_static_block("static_0", Some(3));
        structures.add_variable(
            "items",
            VarKind::Const,
            serde_json::json!([1, 2, 3]),
            "static_0",
        );
        structures.add_import("Card", "ui.card");
        structures.add_module_export(ModuleExport {
            name: "PI".to_string(),
            kind: ExportKind::Value,
            value: Some(serde_json::json!(3.14)),
            reference: None,
        });

        let json = serde_json::to_string(&structures).unwrap();
        let back: SourceStructures = serde_json::from_str(&json).unwrap();
        assert_eq!(back, structures);
    }
}
