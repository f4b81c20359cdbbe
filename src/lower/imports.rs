//! Module import resolution.
//!
//! `import Name from dotted.path` resolves to `dotted/path.kry` under the
//! base directory. A process-wide import stack tracks modules currently
//! being loaded; pushing the same path twice is a circular-dependency
//! error. The stack is reset at the top of every compile entry point, so a
//! prior aborted compile can never poison the next one.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::ir::KryValue;
use crate::parser::ast::*;
use crate::parser::errors::Category;
use crate::parser::{self};

use super::LowerContext;

thread_local! {
    static IMPORT_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Reset the import stack (top of every compile entry point).
pub fn reset_import_stack() {
    IMPORT_STACK.with(|stack| stack.borrow_mut().clear());
}

/// Push a module path; reports the cycle when it is already loading.
fn push_module(path: &str) -> Result<(), String> {
    IMPORT_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.iter().any(|p| p == path) {
            let mut cycle: Vec<String> = stack.clone();
            cycle.push(path.to_string());
            return Err(cycle.join(" -> "));
        }
        stack.push(path.to_string());
        Ok(())
    })
}

fn pop_module() {
    IMPORT_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

impl LowerContext {
    /// Resolve one `import` statement.
    pub(crate) fn lower_import(&mut self, node: &ImportNode) {
        if self.mode.preserves() {
            self.sources
                .add_import(node.local_name.clone(), node.module_path.clone());
        }
        // Multi-file codegen records the reference without inlining
        if self.skip_import_expansion {
            return;
        }

        let Some(base_dir) = self.base_dir.clone() else {
            self.warn_at(
                node.span,
                format!(
                    "no base directory; import '{}' not expanded",
                    node.module_path
                ),
            );
            return;
        };
        let path: PathBuf = base_dir
            .join(node.module_path.replace('.', "/"))
            .with_extension("kry");
        let path_key = path.to_string_lossy().to_string();

        if let Err(cycle) = push_module(&path_key) {
            self.errors.error(
                Category::Validation,
                node.span.start.line as u32,
                node.span.start.column as u32,
                format!("circular import: {cycle}"),
            );
            return;
        }

        let loaded = std::fs::read_to_string(&path);
        match loaded {
            Ok(source) => self.lower_imported_module(node, &source),
            Err(e) => {
                self.errors.error(
                    Category::Io,
                    node.span.start.line as u32,
                    node.span.start.column as u32,
                    format!("cannot read module '{}': {e}", path.display()),
                );
            }
        }
        pop_module();
    }

    /// Convert an imported module: its first component definition, its
    /// functions and styles, and the exports its `return { ... }` names.
    fn lower_imported_module(&mut self, import: &ImportNode, source: &str) {
        tracing::debug!(module = %import.module_path, "expanding import");
        let parse = parser::parse(source);
        for error in parse.errors.iter() {
            self.errors.push(
                error
                    .clone()
                    .with_context(format!("module '{}'", import.module_path)),
            );
        }
        if parse.errors.has_fatal() {
            return;
        }

        // Module constants feed the export resolver (and nested imports
        // see them through the shared param table)
        let mark = self.params.mark();
        for node in &parse.ast.roots {
            match node {
                AstNode::Import(nested) => self.lower_import(nested),
                AstNode::VarDecl(decl) => {
                    let value = decl
                        .value
                        .clone()
                        .or_else(|| KryValue::from_literal(&decl.value_text));
                    match value {
                        Some(v) => self.params.push(decl.name.clone(), v),
                        None => self
                            .params
                            .push_text(decl.name.clone(), decl.value_text.clone()),
                    };
                }
                AstNode::FunctionDecl(func) => self.lower_function_decl(func),
                AstNode::StructDecl(decl) => {
                    self.sources
                        .add_struct_type(crate::manifest::source::StructType {
                            name: decl.name.clone(),
                            fields: decl
                                .fields
                                .iter()
                                .map(|f| crate::manifest::source::StructField {
                                    name: f.name.clone(),
                                    type_tag: f
                                        .type_tag
                                        .clone()
                                        .unwrap_or_else(|| "any".to_string()),
                                })
                                .collect(),
                        });
                }
                AstNode::StyleBlock(style) => {
                    let props =
                        super::properties::translate_style_properties(self, &style.properties);
                    let selector = style.selector.clone();
                    crate::ir::context::with_current(|ctx| {
                        ctx.stylesheet.add_rule(selector.as_str(), props)
                    });
                }
                AstNode::CodeBlock(block) => self.lower_code_block(block),
                AstNode::ModuleReturn(ret) => self.lower_module_return(ret),
                _ => {}
            }
        }

        // The first component definition is what the import names
        match parse.ast.first_definition() {
            Some(definition) => {
                let mut renamed = definition.clone();
                if renamed.name != import.local_name {
                    tracing::debug!(
                        definition = %renamed.name,
                        local = %import.local_name,
                        "import renames definition"
                    );
                    renamed.name = import.local_name.clone();
                }
                self.register_definition(&renamed, Some(&import.module_path));
            }
            None => {
                // Pure-value modules are legal; only note the absence
                tracing::debug!(module = %import.module_path, "no component definition in module");
            }
        }

        // Exports stay visible to the importer's expression resolver; the
        // module's private constants do not
        let exported: Vec<(String, Option<KryValue>)> = parse
            .ast
            .roots
            .iter()
            .filter_map(|n| match n {
                AstNode::ModuleReturn(ret) => Some(ret),
                _ => None,
            })
            .flat_map(|ret| ret.exports.iter())
            .map(|(name, value_text)| {
                let value = self
                    .params
                    .lookup(value_text)
                    .and_then(|e| e.value.clone().or_else(|| KryValue::from_literal(&e.value_text)))
                    .or_else(|| KryValue::from_literal(value_text));
                (name.clone(), value)
            })
            .collect();
        self.params.truncate(mark);
        for (name, value) in exported {
            if let Some(value) = value {
                self.params.push(name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_reports_cycle() {
        reset_import_stack();
        push_module("a.kry").unwrap();
        push_module("b.kry").unwrap();
        let err = push_module("a.kry").unwrap_err();
        assert_eq!(err, "a.kry -> b.kry -> a.kry");
        pop_module();
        pop_module();
        reset_import_stack();
    }
}
