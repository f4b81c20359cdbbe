//! Function lowering: the recursive statement converter.
//!
//! Function declarations become logic functions with typed statement
//! bodies. Inline code blocks merge into the function's source alternates;
//! nested components are dropped.

use crate::ir::{Expr, Stmt};
use crate::manifest::{LogicFunction, Param};
use crate::parser::ast::*;
use crate::parser::expr::parse_expression;

use super::LowerContext;

impl LowerContext {
    /// Lower `function name(params) -> type { ... }`. Functions declared
    /// inside a component body are namespaced `<Component>:<name>`.
    pub(crate) fn lower_function_decl(&mut self, node: &FunctionDeclNode) {
        let name = match &self.component_name {
            Some(component) => format!("{component}:{}", node.name),
            None => node.name.clone(),
        };

        let mut function = LogicFunction::new(name);
        function.params = node
            .params
            .iter()
            .map(|p| Param {
                name: p.name.clone(),
                type_tag: p.type_tag.clone(),
            })
            .collect();
        function.return_type = node.return_type.clone();
        function.body = self.convert_statements(&node.body, &mut function.sources);

        if !self.logic.add_function(function) {
            self.warn_at(node.span, format!("function '{}' already defined", node.name));
        }
    }

    /// Convert a statement list. `sources` collects inline code blocks as
    /// per-language alternates of the enclosing function.
    pub(crate) fn convert_statements(
        &mut self,
        body: &[AstNode],
        sources: &mut crate::manifest::SourceAlternates,
    ) -> Vec<Stmt> {
        let mut statements = Vec::new();
        for item in body {
            match item {
                AstNode::Return(node) => {
                    let value = match &node.value {
                        Some(text) => self.parse_stmt_expr(text, node.span),
                        None => None,
                    };
                    statements.push(Stmt::Return { value });
                }
                AstNode::VarDecl(decl) => {
                    let value = self
                        .parse_stmt_expr(&decl.value_text, decl.span)
                        .unwrap_or(Expr::Null);
                    statements.push(Stmt::Assign {
                        name: decl.name.clone(),
                        value,
                    });
                }
                AstNode::Assign(node) => {
                    let value = self
                        .parse_stmt_expr(&node.value, node.span)
                        .unwrap_or(Expr::Null);
                    statements.push(Stmt::Assign {
                        name: node.target.clone(),
                        value,
                    });
                }
                AstNode::Delete(node) => {
                    if let Some(target) = self.parse_stmt_expr(&node.target, node.span) {
                        statements.push(Stmt::Delete { target });
                    }
                }
                AstNode::IfElse(node) => {
                    let Some(cond) = self.parse_stmt_expr(&node.cond, node.span) else {
                        continue;
                    };
                    let then_body = self.convert_statements(&node.then_body, sources);
                    let else_body = self.convert_statements(&node.else_body, sources);
                    statements.push(Stmt::If {
                        cond,
                        then_body,
                        else_body,
                    });
                }
                AstNode::ForLoop(node) => {
                    // Inside a function body every loop is a for-each over
                    // the iterable expression; `a..b` becomes range(a, b)
                    let iterable = match node.iterable_text.split_once("..") {
                        Some((lo, hi)) => {
                            let lo = self.parse_stmt_expr(lo, node.span);
                            let hi = self.parse_stmt_expr(hi, node.span);
                            match (lo, hi) {
                                (Some(lo), Some(hi)) => Some(Expr::Call {
                                    name: "range".to_string(),
                                    args: vec![lo, hi],
                                }),
                                _ => None,
                            }
                        }
                        None => self.parse_stmt_expr(&node.iterable_text, node.span),
                    };
                    let Some(iterable) = iterable else {
                        continue;
                    };
                    let body = self.convert_statements(&node.body, sources);
                    statements.push(Stmt::ForEach {
                        item: node.item.clone(),
                        iterable,
                        body,
                    });
                }
                AstNode::CodeBlock(block) => {
                    let source = self.interner.intern(&block.source);
                    sources.insert(block.language.clone(), source.into());
                }
                AstNode::Component(node) => {
                    // Components cannot be built from imperative code
                    self.warn_at(
                        node.span,
                        format!("component '{}' inside a function body is dropped", node.name),
                    );
                }
                other => {
                    self.warn_at(other.span(), "statement not supported in a function body");
                }
            }
        }
        statements
    }

    fn parse_stmt_expr(&mut self, text: &str, span: crate::base::Span) -> Option<Expr> {
        parse_expression(
            text,
            span.start.line as u32,
            span.start.column as u32,
            &mut self.errors,
        )
    }
}
