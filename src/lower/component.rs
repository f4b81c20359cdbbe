//! Component conversion: built-in resolution, body lowering, custom
//! component definition/instantiation with inheritance.

use serde_json::json;

use crate::ir::{self, Component, ComponentType, KryValue};
use crate::manifest::{ComponentDef, PropDef, StateVarDef};
use crate::parser::ast::*;

use super::LowerContext;

impl LowerContext {
    /// Convert a component-instantiation node into an IR component.
    pub(crate) fn convert_component(&mut self, node: &ComponentNode) -> Option<Component> {
        if let Some(component_type) = ComponentType::from_source_name(&node.name) {
            let mut component =
                Component::new(component_type, ir::context::alloc_component_id());
            self.lower_component_body(&mut component, &node.body);
            return Some(component);
        }

        // Unknown name: a registered definition expands; anything else is
        // an error with recovery (an empty container keeps siblings alive)
        if self.manifest.definition(&node.name).is_some() {
            let mut chain = Vec::new();
            return self.instantiate_custom(node, &mut chain);
        }

        self.error_at(
            node.span,
            format!("unknown component '{}'", node.name),
        );
        None
    }

    /// Walk a component body in source order: properties mutate the
    /// component, children append, declarations fill the side tables.
    pub(crate) fn lower_component_body(&mut self, component: &mut Component, body: &[AstNode]) {
        for item in body {
            match item {
                AstNode::Property(prop) => {
                    self.apply_property(component, prop);
                }
                AstNode::Component(child) => {
                    if let Some(converted) = self.convert_component(child) {
                        component.add_child(converted);
                    }
                }
                AstNode::StateDecl(decl) => self.lower_state_decl(decl),
                AstNode::VarDecl(decl) => self.lower_body_var(decl),
                AstNode::ForLoop(node) => self.lower_for_loop(node, component),
                AstNode::IfElse(node) => self.lower_if_else(node, component),
                AstNode::StaticBlock(block) => self.lower_static_block(block, component),
                AstNode::CodeBlock(block) => self.lower_code_block(block),
                AstNode::FunctionDecl(func) => self.lower_function_decl(func),
                AstNode::StyleBlock(style) => {
                    let props = super::properties::translate_style_properties(self, &style.properties);
                    let selector = style.selector.clone();
                    ir::context::with_current(|ctx| {
                        ctx.stylesheet.add_rule(selector.as_str(), props)
                    });
                }
                other => {
                    self.warn_at(other.span(), "construct ignored inside component body");
                }
            }
        }
    }

    /// `state name: type = expr` adds a reactive variable in the current
    /// scope.
    fn lower_state_decl(&mut self, decl: &StateDeclNode) {
        let initial_text = self
            .params
            .substitute(&decl.initial)
            .map(str::to_string)
            .unwrap_or_else(|| decl.initial.clone());
        let value = match &decl.type_tag {
            Some(tag) => match KryValue::parse_typed(tag, &initial_text) {
                Some(v) => v,
                None => {
                    self.warn_at(
                        decl.span,
                        format!(
                            "initial value '{}' does not parse as {}; defaulting",
                            initial_text, tag
                        ),
                    );
                    default_for_type(tag)
                }
            },
            None => KryValue::from_literal(&initial_text).unwrap_or(KryValue::Null),
        };
        let scope = self.scope.clone();
        self.manifest.add_variable(decl.name.clone(), value, scope);
    }

    /// `const`/`let` inside a body: substitution entry, plus source
    /// preservation scoped to the enclosing static block when present.
    fn lower_body_var(&mut self, decl: &VarDeclNode) {
        let value = decl
            .value
            .clone()
            .or_else(|| KryValue::from_literal(&decl.value_text));
        let pushed = match &value {
            Some(v) => self.params.push(decl.name.clone(), v.clone()),
            None => self.params.push_text(decl.name.clone(), decl.value_text.clone()),
        };
        if !pushed {
            self.warn_at(decl.span, "parameter table full; declaration not substitutable");
        }
        if self.mode.preserves() {
            let scope = self
                .current_static_block
                .clone()
                .unwrap_or_else(|| "module".to_string());
            let json = value
                .as_ref()
                .map(KryValue::to_json)
                .unwrap_or_else(|| serde_json::Value::String(decl.value_text.clone()));
            self.sources
                .add_variable(decl.name.clone(), decl.kind, json, scope);
        }
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Register `component Name(props) extends Parent { ... }`.
    pub(crate) fn register_definition(&mut self, node: &ComponentNode, module_path: Option<&str>) {
        let props = parse_prop_list(node.arguments.as_deref().unwrap_or(""));

        let state_vars: Vec<StateVarDef> = node
            .body
            .iter()
            .filter_map(|item| match item {
                AstNode::StateDecl(decl) => Some(StateVarDef {
                    name: decl.name.clone(),
                    var_type: decl
                        .type_tag
                        .clone()
                        .unwrap_or_else(|| infer_type(&decl.initial).to_string()),
                    initial_expr: decl.initial.clone(),
                }),
                _ => None,
            })
            .collect();

        // The template converts once, in the current parameter context
        // (module constants bake in); state declarations were already
        // captured above
        let saved_component = self.component_name.replace(node.name.clone());
        let mut template =
            Component::new(ComponentType::Container, ir::context::alloc_component_id());
        let body_without_state: Vec<AstNode> = node
            .body
            .iter()
            .filter(|item| !matches!(item, AstNode::StateDecl(_)))
            .cloned()
            .collect();
        self.lower_component_body(&mut template, &body_without_state);
        self.component_name = saved_component;

        tracing::debug!(name = %node.name, props = props.len(), "register component definition");
        self.manifest.add_definition(ComponentDef {
            name: node.name.clone(),
            extends_parent: node.extends_parent.clone(),
            props,
            state_vars,
            template,
            module_path: module_path.map(str::to_string),
            source_module: None,
        });
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Expand a custom-component instantiation, or emit an unexpanded
    /// reference when this context is itself a template.
    pub(crate) fn instantiate_custom(
        &mut self,
        node: &ComponentNode,
        chain: &mut Vec<String>,
    ) -> Option<Component> {
        let args = node.arguments.as_deref().unwrap_or("");

        // Template context + variable-reference argument: the runtime
        // instantiates this one
        if self.params.is_empty() && is_variable_reference(args) {
            let mut reference =
                Component::new(ComponentType::Custom, ir::context::alloc_component_id());
            reference.tag = Some(node.name.as_str().into());
            reference.component_ref = Some(node.name.clone());
            reference.component_props = Some(json!({ "arg": args }));
            return Some(reference);
        }

        let instance = self.next_instance(&node.name);
        let scope = format!("{}#{}", node.name, instance);

        let mut root = self.expand_definition(&node.name, node.span, chain)?;
        root.scope = Some(scope.clone());

        // Bind arguments to state variables in the instance scope.
        // Positional arguments match the declared props, or fall back to
        // the state-var initial expressions when no props are declared.
        let def = self.manifest.definition(&node.name)?.clone();
        let positional: Vec<String> = if def.props.is_empty() {
            def.state_vars
                .iter()
                .filter(|sv| is_variable_reference(&sv.initial_expr))
                .map(|sv| sv.initial_expr.clone())
                .collect()
        } else {
            def.props.iter().map(|p| p.name.clone()).collect()
        };
        let arguments = parse_arguments(args, &positional);
        for state_var in &def.state_vars {
            let matching = arguments
                .iter()
                .find(|(name, _)| name == &state_var.initial_expr)
                .map(|(_, value)| value.clone());
            let value = match matching {
                Some(raw) => {
                    let substituted = self
                        .params
                        .substitute(&raw)
                        .map(str::to_string)
                        .unwrap_or(raw);
                    KryValue::parse_typed(&state_var.var_type, &substituted)
                        .or_else(|| KryValue::from_literal(&substituted))
                        .unwrap_or(KryValue::Null)
                }
                // No argument: the declared initial expression is the default
                None => KryValue::parse_typed(&state_var.var_type, &state_var.initial_expr)
                    .or_else(|| KryValue::from_literal(&state_var.initial_expr))
                    .unwrap_or(KryValue::Null),
            };
            self.manifest.add_variable(state_var.name.clone(), value, scope.clone());
        }

        // Children written at the call site append after the template's
        let saved_scope = std::mem::replace(&mut self.scope, scope);
        for item in &node.body {
            match item {
                AstNode::Component(child) => {
                    if let Some(converted) = self.convert_component(child) {
                        root.add_child(converted);
                    }
                }
                AstNode::Property(prop) => {
                    self.apply_property(&mut root, prop);
                }
                other => self.warn_at(
                    other.span(),
                    "only children and properties may follow a custom component instantiation",
                ),
            }
        }
        self.scope = saved_scope;
        Some(root)
    }

    /// Resolve a definition's inheritance chain into a concrete root with
    /// the template merged in. `chain` detects cycles.
    fn expand_definition(
        &mut self,
        name: &str,
        span: crate::base::Span,
        chain: &mut Vec<String>,
    ) -> Option<Component> {
        if chain.iter().any(|c| c == name) {
            let cycle = chain.join(" extends ");
            self.error_at(
                span,
                format!("circular component inheritance: {cycle} extends {name}"),
            );
            return None;
        }
        chain.push(name.to_string());

        let def = match self.manifest.definition(name) {
            Some(def) => def.clone(),
            None => {
                self.error_at(span, format!("unknown component extends target '{name}'"));
                chain.pop();
                return None;
            }
        };

        let mut root = match &def.extends_parent {
            Some(parent) => {
                if let Some(builtin) = ComponentType::from_source_name(parent) {
                    Component::new(builtin, ir::context::alloc_component_id())
                } else {
                    // A custom parent expands recursively
                    match self.expand_definition(parent, span, chain) {
                        Some(parent_root) => parent_root,
                        None => {
                            chain.pop();
                            return None;
                        }
                    }
                }
            }
            None => Component::new(ComponentType::Container, ir::context::alloc_component_id()),
        };

        merge_template(&mut root, &def.template);
        chain.pop();
        Some(root)
    }

    fn next_instance(&mut self, name: &str) -> u32 {
        let counter = self.instance_counters.entry(name.to_string()).or_insert(0);
        let instance = *counter;
        *counter += 1;
        instance
    }
}

fn assign_fresh_ids(component: &mut Component) {
    component.id = ir::context::alloc_component_id();
    for child in &mut component.children {
        assign_fresh_ids(child);
    }
}

/// Merge a definition's template into an expansion root. The child's
/// fields override the parent's; events append; children clone in with
/// fresh ids (scope stays on the instance root only, so codegen can locate
/// it).
fn merge_template(dest: &mut Component, template: &Component) {
    if let Some(style) = &template.style {
        dest.style_mut().merge_from(style);
    }
    if let Some(layout) = &template.layout {
        dest.layout_mut().merge_from(layout);
    }
    if template.text.is_some() {
        dest.text = template.text.clone();
        dest.text_expression = None;
    }
    if template.text_expression.is_some() {
        dest.text_expression = template.text_expression.clone();
        dest.text = None;
    }
    if template.custom_data.is_some() {
        dest.custom_data = template.custom_data.clone();
    }
    if template.class_name.is_some() {
        dest.class_name = template.class_name.clone();
    }
    if template.tag.is_some() {
        dest.tag = template.tag.clone();
    }
    if template.visible_condition.is_some() {
        dest.visible_condition = template.visible_condition.clone();
    }
    dest.events.extend(template.events.iter().cloned());
    dest.property_bindings
        .extend(template.property_bindings.iter().cloned());
    for child in &template.children {
        let mut clone = child.clone();
        assign_fresh_ids(&mut clone);
        dest.add_child(clone);
    }
}

fn default_for_type(type_tag: &str) -> KryValue {
    match type_tag {
        "int" => KryValue::Int(0),
        "float" => KryValue::Float(0.0),
        "bool" => KryValue::Bool(false),
        "string" => KryValue::String(String::new()),
        _ => KryValue::Null,
    }
}

fn infer_type(initial: &str) -> &'static str {
    match KryValue::from_literal(initial) {
        Some(KryValue::Int(_)) => "int",
        Some(KryValue::Float(_)) => "float",
        Some(KryValue::Bool(_)) => "bool",
        Some(KryValue::String(_)) => "string",
        _ => "any",
    }
}

/// True when an argument string is a single bare identifier.
fn is_variable_reference(args: &str) -> bool {
    let args = args.trim();
    if args.is_empty() || matches!(args, "true" | "false" | "null") {
        return false;
    }
    let mut chars = args.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a definition's declared prop list: `a, b = default`.
fn parse_prop_list(args: &str) -> Vec<PropDef> {
    split_top_level(args)
        .into_iter()
        .map(|piece| match piece.split_once('=') {
            Some((name, default)) => PropDef {
                name: name.trim().to_string(),
                type_tag: infer_type(default.trim()).to_string(),
                default: Some(default.trim().to_string()),
            },
            None => PropDef {
                name: piece.trim().to_string(),
                type_tag: "any".to_string(),
                default: None,
            },
        })
        .filter(|p| !p.name.is_empty())
        .collect()
}

/// Parse instantiation arguments: positional, or `name = value`.
/// The arguments string was captured raw and is parsed exactly once here.
pub(crate) fn parse_arguments(args: &str, positional: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (position, piece) in split_top_level(args).into_iter().enumerate() {
        match piece.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() && is_plain_name(name.trim()) => {
                out.push((name.trim().to_string(), value.trim().to_string()));
            }
            _ => {
                let name = positional
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{position}"));
                out.push((name, piece.trim().to_string()));
            }
        }
    }
    out
}

fn is_plain_name(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split on commas outside quotes, brackets, and parens.
fn split_top_level(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level_respects_nesting() {
        assert_eq!(split_top_level("a, b = [1, 2], \"x,y\""), vec![
            "a".to_string(),
            "b = [1, 2]".to_string(),
            "\"x,y\"".to_string(),
        ]);
    }

    #[test]
    fn test_variable_reference_detection() {
        assert!(is_variable_reference("habit"));
        assert!(is_variable_reference("_private"));
        assert!(!is_variable_reference("5"));
        assert!(!is_variable_reference("\"text\""));
        assert!(!is_variable_reference("a, b"));
        assert!(!is_variable_reference("true"));
        assert!(!is_variable_reference(""));
    }

    #[test]
    fn test_parse_arguments_positional_and_named() {
        let props = vec!["initialValue".to_string(), "label".to_string()];
        assert_eq!(
            parse_arguments("5", &props),
            vec![("initialValue".to_string(), "5".to_string())]
        );
        assert_eq!(
            parse_arguments("initialValue = 10", &props),
            vec![("initialValue".to_string(), "10".to_string())]
        );
        assert_eq!(
            parse_arguments("5, \"Steps\"", &props),
            vec![
                ("initialValue".to_string(), "5".to_string()),
                ("label".to_string(), "\"Steps\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_prop_list_defaults() {
        let props = parse_prop_list("title, count = 0");
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "title");
        assert_eq!(props[0].default, None);
        assert_eq!(props[1].name, "count");
        assert_eq!(props[1].type_tag, "int");
        assert_eq!(props[1].default.as_deref(), Some("0"));
    }
}
