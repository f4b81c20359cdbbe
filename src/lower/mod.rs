//! AST→IR lowering.
//!
//! Consumes the parsed AST and produces the IR component tree, filling the
//! reactive manifest, logic block, stylesheet, and source structures along
//! the way. Property dispatch, template instantiation, loop expansion, and
//! import resolution live in the submodules.

pub mod component;
pub mod imports;
pub mod loops;
pub mod params;
pub mod properties;
pub mod statements;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::base::Interner;
use crate::ir::{self, Component, ComponentType, IrContext, KryValue};
use crate::kir::{KirDocument, SourceMetadata};
use crate::manifest::source::{ExportKind, ModuleExport, SourceStructures};
use crate::manifest::{LogicBlock, ReactiveManifest};
use crate::parser::ast::*;
use crate::parser::errors::{Category, ErrorList};
use crate::parser::{self};

use params::ParamTable;

/// What the lowerer does with unresolved expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Expand only; unresolved expressions are errors.
    Runtime,
    /// Preserve only; for code generation.
    Codegen,
    /// Expand what resolves, preserve the rest as bindings.
    #[default]
    Hybrid,
}

impl CompileMode {
    pub fn preserves(&self) -> bool {
        matches!(self, CompileMode::Codegen | CompileMode::Hybrid)
    }

    pub fn expands(&self) -> bool {
        matches!(self, CompileMode::Runtime | CompileMode::Hybrid)
    }
}

/// Compile configuration.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub mode: CompileMode,
    /// Directory module imports resolve against.
    pub base_dir: Option<PathBuf>,
    /// Record import references without inlining definitions
    /// (multi-file KIR codegen).
    pub skip_import_expansion: bool,
    /// Target platform tag (`web`, `terminal`, `desktop`).
    pub target_platform: String,
    /// Language tag synthesized handler snippets are filed under.
    pub source_language: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: CompileMode::Hybrid,
            base_dir: None,
            skip_import_expansion: false,
            target_platform: "web".to_string(),
            source_language: "kry".to_string(),
        }
    }
}

/// Compile outcome: a best-effort document unless a fatal error occurred,
/// plus every diagnostic accumulated along the way.
#[derive(Debug)]
pub struct CompileResult {
    pub document: Option<KirDocument>,
    pub errors: ErrorList,
}

impl CompileResult {
    pub fn ok(&self) -> bool {
        self.document.is_some() && !self.errors.has_errors()
    }
}

/// The conversion context threaded through all lowering passes.
pub struct LowerContext {
    pub(crate) errors: ErrorList,
    pub(crate) params: ParamTable,
    pub(crate) manifest: ReactiveManifest,
    pub(crate) logic: LogicBlock,
    pub(crate) sources: SourceStructures,
    pub(crate) mode: CompileMode,
    pub(crate) base_dir: Option<PathBuf>,
    pub(crate) skip_import_expansion: bool,
    pub(crate) target_platform: String,
    pub(crate) source_language: String,
    /// `static_<N>` id generator.
    pub(crate) static_counter: u32,
    /// Non-`None` only while converting inside a static block.
    pub(crate) current_static_block: Option<String>,
    /// Monotonic suffix for synthesized handler names.
    pub(crate) handler_counter: u32,
    pub(crate) code_block_counter: u32,
    /// Reactive scope new variables land in.
    pub(crate) scope: String,
    /// Per-definition instance counters (`Counter#0`, `Counter#1`, ...).
    pub(crate) instance_counters: FxHashMap<String, u32>,
    /// Component name for namespacing functions declared in its body.
    pub(crate) component_name: Option<String>,
    /// Shared buffers for handler source snippets.
    pub(crate) interner: Interner,
}

impl LowerContext {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            errors: ErrorList::new(),
            params: ParamTable::new(),
            manifest: ReactiveManifest::new(),
            logic: LogicBlock::new(),
            sources: SourceStructures::new(),
            mode: options.mode,
            base_dir: options.base_dir.clone(),
            skip_import_expansion: options.skip_import_expansion,
            target_platform: options.target_platform.clone(),
            source_language: options.source_language.clone(),
            static_counter: 0,
            current_static_block: None,
            handler_counter: 0,
            code_block_counter: 0,
            scope: "global".to_string(),
            instance_counters: FxHashMap::default(),
            component_name: None,
            interner: Interner::new(),
        }
    }

    pub(crate) fn error_at(&mut self, span: crate::base::Span, message: impl Into<String>) {
        self.errors.error(
            Category::Conversion,
            span.start.line as u32,
            span.start.column as u32,
            message,
        );
    }

    pub(crate) fn warn_at(&mut self, span: crate::base::Span, message: impl Into<String>) {
        self.errors.warning(
            Category::Conversion,
            span.start.line as u32,
            span.start.column as u32,
            message,
        );
    }

    // =========================================================================
    // Module walking
    // =========================================================================

    /// Lower a whole module. Returns the IR root: the module's single root
    /// component, or a synthetic `Root` container when module-level
    /// constructs produce components of their own.
    pub fn lower_module(&mut self, ast: &Ast) -> Option<Component> {
        tracing::debug!(
            platform = %self.target_platform,
            mode = ?self.mode,
            items = ast.roots.len(),
            "lowering module"
        );
        let plain_components = ast
            .roots
            .iter()
            .filter(|n| matches!(n, AstNode::Component(c) if !c.is_component_definition))
            .count();
        let loose_producers = ast.roots.iter().any(|n| {
            matches!(
                n,
                AstNode::StaticBlock(_) | AstNode::ForLoop(_) | AstNode::IfElse(_)
            )
        });
        let needs_wrapper = plain_components != 1 || loose_producers;

        let mut wrapper = if needs_wrapper {
            let mut root = Component::new(ComponentType::Container, ir::context::alloc_component_id());
            root.tag = Some("Root".into());
            Some(root)
        } else {
            None
        };
        let mut direct_root: Option<Component> = None;

        for node in &ast.roots {
            match node {
                AstNode::Import(import) => self.lower_import(import),
                AstNode::VarDecl(decl) => self.lower_module_var(decl),
                AstNode::StyleBlock(style) => self.lower_style_block(style),
                AstNode::FunctionDecl(func) => self.lower_function_decl(func),
                AstNode::StructDecl(decl) => self.lower_struct_decl(decl),
                AstNode::CodeBlock(block) => self.lower_code_block(block),
                AstNode::ModuleReturn(ret) => self.lower_module_return(ret),
                AstNode::Component(node) if node.is_component_definition => {
                    self.register_definition(node, None);
                }
                AstNode::Component(node) => {
                    if let Some(component) = self.convert_component(node) {
                        match &mut wrapper {
                            Some(root) => root.add_child(component),
                            None => direct_root = Some(component),
                        }
                    }
                }
                AstNode::StaticBlock(block) => {
                    if let Some(root) = &mut wrapper {
                        self.lower_static_block(block, root);
                    }
                }
                AstNode::ForLoop(node) => {
                    if let Some(root) = &mut wrapper {
                        self.lower_for_loop(node, root);
                    }
                }
                AstNode::IfElse(node) => {
                    if let Some(root) = &mut wrapper {
                        self.lower_if_else(node, root);
                    }
                }
                other => {
                    self.warn_at(other.span(), "construct not allowed at module level; ignored");
                }
            }
        }
        wrapper.or(direct_root)
    }

    fn lower_module_var(&mut self, decl: &VarDeclNode) {
        let value = decl
            .value
            .clone()
            .or_else(|| KryValue::from_literal(&decl.value_text));
        match &value {
            Some(v) => {
                if !self.params.push(decl.name.clone(), v.clone()) {
                    self.warn_at(decl.span, "parameter table full; declaration not substitutable");
                }
            }
            None => {
                if !self.params.push_text(decl.name.clone(), decl.value_text.clone()) {
                    self.warn_at(decl.span, "parameter table full; declaration not substitutable");
                }
            }
        }
        if self.mode.preserves() {
            let json = value
                .as_ref()
                .map(KryValue::to_json)
                .unwrap_or_else(|| serde_json::Value::String(decl.value_text.clone()));
            self.sources
                .add_variable(decl.name.clone(), decl.kind, json, "module");
        }
        // Simple literals also enter the manifest so runtime can reference
        // them by name
        if let Some(v @ (KryValue::Bool(_) | KryValue::Int(_) | KryValue::Float(_) | KryValue::String(_))) =
            value
        {
            self.manifest.add_variable(decl.name.clone(), v, "global");
        }
    }

    fn lower_style_block(&mut self, style: &StyleBlockNode) {
        let props = properties::translate_style_properties(self, &style.properties);
        let selector = style.selector.clone();
        let applied =
            ir::context::with_current(|ctx| ctx.stylesheet.add_rule(selector.as_str(), props));
        if applied.is_none() {
            self.warn_at(style.span, "no IR context installed; style block dropped");
        }
    }

    fn lower_struct_decl(&mut self, decl: &StructDeclNode) {
        if !self.mode.preserves() {
            return;
        }
        self.sources.add_struct_type(crate::manifest::source::StructType {
            name: decl.name.clone(),
            fields: decl
                .fields
                .iter()
                .map(|f| crate::manifest::source::StructField {
                    name: f.name.clone(),
                    type_tag: f.type_tag.clone().unwrap_or_else(|| "any".to_string()),
                })
                .collect(),
        });
    }

    fn lower_module_return(&mut self, ret: &ModuleReturnNode) {
        for (name, value_text) in &ret.exports {
            let export = if self.logic.function(value_text).is_some() {
                ModuleExport {
                    name: name.clone(),
                    kind: ExportKind::Function,
                    value: None,
                    reference: Some(value_text.clone()),
                }
            } else if self
                .sources
                .struct_types
                .iter()
                .any(|s| &s.name == value_text)
            {
                ModuleExport {
                    name: name.clone(),
                    kind: ExportKind::StructRef,
                    value: None,
                    reference: Some(value_text.clone()),
                }
            } else {
                let value = self
                    .params
                    .lookup(value_text)
                    .and_then(|e| e.value.clone().or_else(|| KryValue::from_literal(&e.value_text)))
                    .or_else(|| KryValue::from_literal(value_text));
                ModuleExport {
                    name: name.clone(),
                    kind: ExportKind::Value,
                    value: Some(
                        value
                            .map(|v| v.to_json())
                            .unwrap_or_else(|| serde_json::Value::String(value_text.clone())),
                    ),
                    reference: None,
                }
            };
            self.sources.add_module_export(export);
        }
    }

    /// `@lang { ... }` becomes a logic function `_code_block_<N>` with one
    /// source alternate.
    pub(crate) fn lower_code_block(&mut self, block: &CodeBlockNode) {
        let name = format!("_code_block_{}", self.code_block_counter);
        self.code_block_counter += 1;
        let source = self.interner.intern(&block.source);
        let function = crate::manifest::LogicFunction::new(name)
            .with_source(block.language.clone(), source.into());
        self.logic.add_function(function);
    }
}

/// Compile `.kry` source to a KIR document.
///
/// The entry point installs a fresh IR context, resets the process-wide
/// import stack, and returns a best-effort document whenever no fatal error
/// occurred.
pub fn compile_source(source: &str, options: &CompileOptions) -> CompileResult {
    imports::reset_import_stack();

    let parse = parser::parse(source);
    let mut errors = parse.errors.clone();
    if errors.has_fatal() {
        return CompileResult {
            document: None,
            errors,
        };
    }

    let guard = ir::context::install(IrContext::new());
    let mut ctx = LowerContext::new(options);
    let root = ctx.lower_module(&parse.ast);
    let ir_context = guard.take();

    // Unresolved event bindings are diagnostics, not silent breakage
    for binding in ctx.logic.unresolved_bindings() {
        errors.warning(
            Category::Validation,
            0,
            0,
            format!(
                "event binding on component {} refers to unknown handler '{}'",
                binding.component_id, binding.handler
            ),
        );
    }
    errors.extend(ctx.errors);

    if errors.has_fatal() {
        return CompileResult {
            document: None,
            errors,
        };
    }

    let mut root = root.unwrap_or_else(|| Component::new(ComponentType::Container, 0));
    ir_context.stylesheet.resolve_tree(&mut root);

    let document = KirDocument {
        version: KirDocument::FORMAT_VERSION.to_string(),
        root,
        reactive_manifest: (&ctx.manifest).into(),
        logic_block: ctx.logic,
        source_metadata: SourceMetadata::current("kry"),
        source_structures: ctx.sources,
        stylesheet: (!ir_context.stylesheet.is_empty()).then_some(ir_context.stylesheet),
        metadata: (ir_context.metadata != Default::default()).then_some(ir_context.metadata),
    };
    CompileResult {
        document: Some(document),
        errors,
    }
}

/// The embedder-facing surface: source in, pretty KIR JSON out. Returns
/// `None` when the compile failed fatally; diagnostics go to the log.
pub fn compile_to_json(
    source: &str,
    base_dir: Option<PathBuf>,
    skip_import_expansion: bool,
) -> Option<String> {
    let options = CompileOptions {
        base_dir,
        skip_import_expansion,
        ..CompileOptions::default()
    };
    let result = compile_source(source, &options);
    if !result.errors.is_empty() {
        tracing::warn!("compile diagnostics:\n{}", result.errors.format_report());
    }
    result.document.and_then(|doc| doc.to_json().ok())
}
