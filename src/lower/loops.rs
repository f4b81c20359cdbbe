//! Loop expansion, static blocks, and conditional rendering.

use crate::ir::{
    self, Component, ComponentType, ForEachBinding, ForEachDef, KryValue, LoopKind,
    VisibleCondition,
};
use crate::manifest::source::ForLoopRecord;
use crate::parser::ast::*;

use super::LowerContext;

impl LowerContext {
    /// `for item in expr { ... }` / `for each item in expr { ... }`.
    ///
    /// A concrete collection expands at compile time; anything else lowers
    /// to a runtime ForEach component.
    pub(crate) fn lower_for_loop(&mut self, node: &ForLoopNode, parent: &mut Component) {
        let concrete = node.iterable.clone().or_else(|| {
            self.params
                .lookup(node.iterable_text.trim())
                .and_then(|entry| entry.value.clone())
        });

        if !node.is_each {
            if let Some(collection) = concrete {
                self.expand_loop(node, parent, &collection);
                return;
            }
            // Ranges with non-literal bounds are runtime-only in UI
            // context and are skipped silently
            if node.iterable_text.contains("..") {
                tracing::debug!(
                    iterable = %node.iterable_text,
                    "range with non-literal bounds skipped in UI context"
                );
                return;
            }
        }
        self.emit_foreach(node, parent);
    }

    /// Compile-time expansion over a concrete array or range.
    fn expand_loop(&mut self, node: &ForLoopNode, parent: &mut Component, collection: &KryValue) {
        let elements: Vec<KryValue> = match collection {
            KryValue::Array(items) => items.clone(),
            KryValue::Range(a, b) => (*a..*b).map(KryValue::Int).collect(),
            other => {
                self.warn_at(
                    node.span,
                    format!("cannot iterate a {} at compile time", other.type_tag()),
                );
                return;
            }
        };

        // Inside a static block, HYBRID also preserves the pre-expansion
        // loop for code generation
        let record_loop = self.mode.preserves() && self.current_static_block.is_some();
        let template = record_loop.then(|| self.convert_loop_template(&node.body));
        let mut expanded_ids: Vec<u32> = Vec::new();

        for (index, element) in elements.iter().enumerate() {
            let mark = self.params.mark();
            if !self.params.push_element(&node.item, element) {
                self.warn_at(node.span, "parameter table full during loop expansion");
            }
            if let Some(index_name) = &node.index {
                self.params.push(index_name.clone(), KryValue::Int(index as i64));
            }

            let before = parent.children.len();
            self.lower_component_body(parent, &node.body);
            expanded_ids.extend(parent.children[before..].iter().map(|c| c.id));

            self.params.truncate(mark);
        }

        if let (Some(template), Some(scope_id)) = (template, self.current_static_block.clone()) {
            self.sources.add_for_loop(ForLoopRecord {
                scope_id,
                iterator: node.item.clone(),
                collection_ref: node.iterable_text.clone(),
                template,
                expanded_component_ids: expanded_ids,
            });
        }
    }

    /// Emit a runtime ForEach component: template as `children[0]`, data
    /// source by name, and the bindings inferred from the template.
    fn emit_foreach(&mut self, node: &ForLoopNode, parent: &mut Component) {
        let mut foreach =
            Component::new(ComponentType::ForEach, ir::context::alloc_component_id());

        let template = self.convert_loop_template(&node.body);
        let bindings = infer_bindings(&template, &node.item, node.index.as_deref());

        foreach.foreach_def = Some(Box::new(ForEachDef {
            item_name: node.item.clone(),
            index_name: node.index.clone(),
            loop_kind: if node.is_each {
                LoopKind::Explicit
            } else {
                LoopKind::Implicit
            },
            data_source: node.iterable_text.trim().to_string(),
            bindings,
        }));
        foreach.children.push(template);
        parent.add_child(foreach);
    }

    /// Convert a loop body with an empty parameter context into a single
    /// template component (a lone child stands alone; multiple wrap in a
    /// container).
    fn convert_loop_template(&mut self, body: &[AstNode]) -> Component {
        let saved = self.params.take();
        let mut container =
            Component::new(ComponentType::Container, ir::context::alloc_component_id());
        self.lower_component_body(&mut container, body);
        self.params.restore(saved);

        if container.children.len() == 1
            && container.style.is_none()
            && container.layout.is_none()
            && container.property_bindings.is_empty()
        {
            container.children.remove(0)
        } else {
            container
        }
    }

    // =========================================================================
    // Static blocks
    // =========================================================================

    /// `static { ... }`: children expand fully at compile time, and the
    /// pre-expansion constructs are preserved for code generation.
    pub(crate) fn lower_static_block(&mut self, block: &StaticBlockNode, parent: &mut Component) {
        let id = format!("static_{}", self.static_counter);
        self.static_counter += 1;
        if self.mode.preserves() {
            self.sources.add_static_block(id.clone(), Some(parent.id));
        }

        let previous = self.current_static_block.replace(id);
        self.lower_component_body(parent, &block.body);
        self.current_static_block = previous;
    }

    // =========================================================================
    // Conditional rendering
    // =========================================================================

    /// `if cond { ... } else { ... }` with a variable condition emits both
    /// branches, each marked with a visibility condition; other conditions
    /// emit unmarked children and leave evaluation to the runtime.
    pub(crate) fn lower_if_else(&mut self, node: &IfElseNode, parent: &mut Component) {
        let variable_cond = is_identifier(&node.cond);

        let before_then = parent.children.len();
        self.lower_component_body(parent, &node.then_body);
        if variable_cond {
            for child in &mut parent.children[before_then..] {
                child.visible_condition = Some(VisibleCondition {
                    expression: node.cond.clone(),
                    visible_when: true,
                });
            }
        }

        let before_else = parent.children.len();
        self.lower_component_body(parent, &node.else_body);
        if variable_cond {
            for child in &mut parent.children[before_else..] {
                child.visible_condition = Some(VisibleCondition {
                    expression: node.cond.clone(),
                    visible_when: false,
                });
            }
        } else if !node.cond.is_empty() {
            tracing::debug!(cond = %node.cond, "non-variable condition left to runtime");
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let text = text.trim();
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Collect the reactive bindings a template carries for the loop item and
/// index: every preserved expression rooted at one of them.
fn infer_bindings(template: &Component, item: &str, index: Option<&str>) -> Vec<ForEachBinding> {
    let mut bindings = Vec::new();
    let rooted_at_loop = |expr: &str| {
        let base = expr.split(['.', '[', ' ']).next().unwrap_or(expr);
        base == item || Some(base) == index
    };
    template.walk(&mut |component| {
        for binding in &component.property_bindings {
            if rooted_at_loop(&binding.expression) {
                bindings.push(ForEachBinding {
                    property: binding.property.clone(),
                    expression: binding.expression.clone(),
                    reactive: true,
                });
            }
        }
    });
    bindings
}
