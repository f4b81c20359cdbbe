//! End-to-end lowering scenarios.

use crate::ir::{Color, Component, ComponentType, KryValue, LoopKind};
use crate::kir::KirDocument;

use super::{compile_source, CompileMode, CompileOptions, CompileResult};

fn compile(source: &str) -> CompileResult {
    compile_source(source, &CompileOptions::default())
}

fn compile_ok(source: &str) -> KirDocument {
    let result = compile(source);
    assert!(
        !result.errors.has_errors(),
        "compile errors:\n{}",
        result.errors.format_report()
    );
    result.document.expect("no document")
}

fn collect<'a>(root: &'a Component, pred: &dyn Fn(&Component) -> bool) -> Vec<&'a Component> {
    let mut out = Vec::new();
    fn walk<'a>(
        node: &'a Component,
        pred: &dyn Fn(&Component) -> bool,
        out: &mut Vec<&'a Component>,
    ) {
        if pred(node) {
            out.push(node);
        }
        for child in &node.children {
            walk(child, pred, out);
        }
    }
    walk(root, pred, &mut out);
    out
}

const COUNTER_SOURCE: &str = r#"
component Counter {
  state value: int = initialValue
  Text { text: value }
}

App {
  Counter(5)
  Counter(initialValue = 10)
}
"#;

#[test]
fn test_counter_expansion() {
    let doc = compile_ok(COUNTER_SOURCE);

    // Two instances with per-name scopes
    let instances = collect(&doc.root, &|c| c.scope.is_some());
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].scope.as_deref(), Some("Counter#0"));
    assert_eq!(instances[1].scope.as_deref(), Some("Counter#1"));

    // Each instance has its own reactive variable with the argument value
    let variables = doc.reactive_manifest.variables;
    let first = variables
        .iter()
        .find(|v| v.scope == "Counter#0")
        .expect("Counter#0 variable");
    assert_eq!(first.name, "value");
    assert_eq!(first.type_tag, "int");
    assert_eq!(first.value, KryValue::Int(5));
    let second = variables
        .iter()
        .find(|v| v.scope == "Counter#1")
        .expect("Counter#1 variable");
    assert_eq!(second.value, KryValue::Int(10));

    // Both Text nodes carry the expression and its binding
    let texts = collect(&doc.root, &|c| {
        c.component_type == ComponentType::Text && c.scope.is_none()
    });
    let instance_texts: Vec<_> = texts
        .iter()
        .filter(|c| c.text_expression.is_some())
        .collect();
    assert_eq!(instance_texts.len(), 2);
    for text in instance_texts {
        assert_eq!(text.text_expression.as_deref(), Some("value"));
        assert!(text.text.is_none());
        assert!(text
            .property_bindings
            .iter()
            .any(|b| b.property == "text" && b.expression == "value"));
    }
}

#[test]
fn test_compile_time_for_loop() {
    let doc = compile_ok(
        "static {\n  const items = [1, 2, 3]\n  for x in items {\n    Text { text: x }\n  }\n}",
    );

    // Three fully expanded Text children on the synthetic root
    let expanded: Vec<_> = doc
        .root
        .children
        .iter()
        .filter(|c| c.component_type == ComponentType::Text)
        .collect();
    assert_eq!(expanded.len(), 3);
    let contents: Vec<_> = expanded.iter().map(|c| c.text.as_deref().unwrap()).collect();
    assert_eq!(contents, vec!["1", "2", "3"]);

    // The pre-expansion loop is preserved with exactly those ids
    assert_eq!(doc.source_structures.static_blocks.len(), 1);
    assert_eq!(doc.source_structures.static_blocks[0].id, "static_0");
    let record = &doc.source_structures.for_loops[0];
    assert_eq!(record.scope_id, "static_0");
    assert_eq!(record.iterator, "x");
    assert_eq!(record.collection_ref, "items");
    let expanded_ids: Vec<u32> = expanded.iter().map(|c| c.id).collect();
    assert_eq!(record.expanded_component_ids, expanded_ids);

    // The declaration itself is preserved under the block's scope
    let decl = &doc.source_structures.variables[0];
    assert_eq!(decl.name, "items");
    assert_eq!(decl.scope, "static_0");
}

#[test]
fn test_runtime_for_each() {
    let doc = compile_ok(
        "App {\n  for each item in userList {\n    Text { text: item.name }\n  }\n}",
    );

    let foreach = &doc.root.children[0];
    assert_eq!(foreach.component_type, ComponentType::ForEach);
    let def = foreach.foreach_def.as_ref().expect("foreach_def");
    assert_eq!(def.item_name, "item");
    assert_eq!(def.data_source, "userList");
    assert_eq!(def.loop_kind, LoopKind::Explicit);
    assert_eq!(def.bindings.len(), 1);
    assert_eq!(def.bindings[0].property, "text");
    assert_eq!(def.bindings[0].expression, "item.name");
    assert!(def.bindings[0].reactive);

    // The template is child[0]
    let template = &foreach.children[0];
    assert_eq!(template.component_type, ComponentType::Text);
    assert_eq!(template.text_expression.as_deref(), Some("item.name"));
}

#[test]
fn test_color_parsing_scenario() {
    let doc = compile_ok(
        "App {\n  backgroundColor: \"#FF8040\"\n  color: transparent\n  borderColor: \"#8F2\"\n}",
    );
    let style = doc.root.style.as_ref().expect("style");
    assert_eq!(style.background, Some(Color::rgba(255, 128, 64, 255)));
    assert_eq!(style.color, Some(Color::rgba(0, 0, 0, 0)));
    assert_eq!(style.border_color, Some(Color::rgba(136, 255, 34, 255)));
}

#[test]
fn test_custom_component_as_loop_variable() {
    let source = r#"
component HabitPanel {
  Text { text: habit.name }
}

App {
  for habit in habits {
    HabitPanel(habit)
  }
}
"#;
    let doc = compile_ok(source);

    let foreach = &doc.root.children[0];
    assert_eq!(foreach.component_type, ComponentType::ForEach);

    // The instantiation stays unexpanded for the runtime
    let reference = &foreach.children[0];
    assert_eq!(reference.component_type, ComponentType::Custom);
    assert_eq!(reference.component_ref.as_deref(), Some("HabitPanel"));
    assert_eq!(
        reference.component_props,
        Some(serde_json::json!({"arg": "habit"}))
    );
}

#[test]
fn test_component_inheritance_merge() {
    let source = r##"
component Base {
  backgroundColor: "#000000"
  Text { text: "base" }
}

component Panel extends Base {
  color: "#FFFFFF"
  Text { text: "panel" }
}

App {
  Panel()
}
"##;
    let doc = compile_ok(source);
    let panel = &doc.root.children[0];
    assert_eq!(panel.scope.as_deref(), Some("Panel#0"));
    let style = panel.style.as_ref().expect("merged style");
    // Parent's background survives, child's color lands on top
    assert_eq!(style.background, Some(Color::BLACK));
    assert_eq!(style.color, Some(Color::WHITE));
    // Parent children come first, child template's append after
    let texts: Vec<_> = panel
        .children
        .iter()
        .filter_map(|c| c.text.as_deref())
        .collect();
    assert_eq!(texts, vec!["base", "panel"]);
}

#[test]
fn test_circular_inheritance_rejected() {
    let source = r#"
component A extends B {
  Text { text: "a" }
}

component B extends A {
  Text { text: "b" }
}

App {
  A()
}
"#;
    let result = compile(source);
    assert!(result.errors.has_errors());
    let report = result.errors.format_report();
    assert!(report.contains("circular component inheritance"), "{report}");
    assert!(report.contains('A') && report.contains('B'), "{report}");
    // Not expanded: the instance is absent from the tree
    let doc = result.document.expect("best-effort document");
    assert!(doc.root.children.is_empty());
}

#[test]
fn test_empty_array_loop_boundary() {
    let doc = compile_ok(
        "static {\n  const items = []\n  for x in items {\n    Text { text: x }\n  }\n}",
    );
    // No children were produced
    assert!(doc
        .root
        .children
        .iter()
        .all(|c| c.component_type != ComponentType::Text));
    // The record exists with an empty expansion list
    let record = &doc.source_structures.for_loops[0];
    assert!(record.expanded_component_ids.is_empty());
}

#[test]
fn test_conditional_rendering_marks_both_branches() {
    let doc = compile_ok(
        "App {\n  if showDetails {\n    Text { text: \"on\" }\n  } else {\n    Text { text: \"off\" }\n  }\n}",
    );
    assert_eq!(doc.root.children.len(), 2);
    let on = &doc.root.children[0];
    let off = &doc.root.children[1];
    let on_cond = on.visible_condition.as_ref().expect("then condition");
    assert_eq!(on_cond.expression, "showDetails");
    assert!(on_cond.visible_when);
    let off_cond = off.visible_condition.as_ref().expect("else condition");
    assert!(!off_cond.visible_when);
}

#[test]
fn test_lambda_event_synthesis() {
    let doc = compile_ok(
        "App {\n  state count: int = 0\n  Button {\n    text: \"+\"\n    onClick: () => { count = count + 1 }\n  }\n}",
    );

    let buttons = collect(&doc.root, &|c| c.component_type == ComponentType::Button);
    let event = &buttons[0].events[0];
    assert_eq!(event.handler, "handler_0_click");
    assert_eq!(event.logic_id.as_deref(), Some("handler_0_click"));
    assert_eq!(
        event.handler_data.as_ref().map(|s| s.as_str()),
        Some("count = count + 1")
    );

    let function = doc
        .logic_block
        .function("handler_0_click")
        .expect("synthesized function");
    assert_eq!(
        function.sources.get("kry").map(|s| s.as_str()),
        Some("count = count + 1")
    );

    let binding = &doc.logic_block.event_bindings[0];
    assert_eq!(binding.handler, "handler_0_click");
    assert_eq!(binding.component_id, buttons[0].id);
}

#[test]
fn test_window_metadata() {
    let doc = compile_ok(
        "App {\n  windowTitle: \"Demo\"\n  windowWidth: 800\n  windowHeight: 600\n}",
    );
    let metadata = doc.metadata.expect("window metadata");
    assert_eq!(metadata.window_title.as_deref(), Some("Demo"));
    assert_eq!(metadata.window_width, Some(800));
    assert_eq!(metadata.window_height, Some(600));
}

#[test]
fn test_stylesheet_resolution() {
    let doc = compile_ok(
        "style panel {\n  background: #333333\n  gap: 8\n}\n\nApp {\n  class: \"panel\"\n}",
    );
    let stylesheet = doc.stylesheet.as_ref().expect("stylesheet");
    assert!(stylesheet.rule("panel").is_some());
    // The rule was merged into the matching component at resolve time
    let style = doc.root.style.as_ref().expect("resolved style");
    assert_eq!(style.background, Color::parse("#333333"));
    assert_eq!(doc.root.layout.as_ref().unwrap().gap, Some(8.0));
}

#[test]
fn test_unique_ids_and_binding_invariants() {
    let doc = compile_ok(COUNTER_SOURCE);

    // Every component id is unique across the unit (definition templates
    // included)
    let mut ids = Vec::new();
    doc.root.walk(&mut |c| ids.push(c.id));
    for def in &doc.reactive_manifest.component_definitions {
        def.template.walk(&mut |c| ids.push(c.id));
    }
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len(), "duplicate component ids: {ids:?}");

    // (name, scope) pairs are unique
    let variables = &doc.reactive_manifest.variables;
    for (i, a) in variables.iter().enumerate() {
        for b in &variables[i + 1..] {
            assert!(
                a.name != b.name || a.scope != b.scope,
                "duplicate variable ({}, {})",
                a.name,
                a.scope
            );
        }
    }

    // A text expression always has its matching binding, and never static
    // text next to it
    doc.root.walk(&mut |c| {
        if let Some(expr) = &c.text_expression {
            assert!(c.text.is_none());
            assert!(
                c.property_bindings
                    .iter()
                    .any(|b| b.property == "text" && &b.expression == expr),
                "component {} lacks a binding for its text expression",
                c.id
            );
        }
    });
}

#[test]
fn test_runtime_mode_rejects_unresolved() {
    let result = compile_source(
        "App {\n  Text { text: missingVar }\n}",
        &CompileOptions {
            mode: CompileMode::Runtime,
            ..CompileOptions::default()
        },
    );
    assert!(result.errors.has_errors());
    assert!(result
        .errors
        .format_report()
        .contains("cannot resolve expression 'missingVar'"));
}

#[test]
fn test_module_constants_substitute_and_register() {
    let doc = compile_ok("const W = 800\nconst title = \"Hi\"\nApp {\n  width: W\n  Text { text: title }\n}");
    assert_eq!(
        doc.root.layout.as_ref().unwrap().width,
        Some(crate::ir::Dimension::Px(800.0))
    );
    let texts = collect(&doc.root, &|c| c.component_type == ComponentType::Text);
    assert_eq!(texts[0].text.as_deref(), Some("Hi"));
    // Literals also enter the manifest for runtime reference
    assert!(doc
        .reactive_manifest
        .variables
        .iter()
        .any(|v| v.name == "W" && v.value == KryValue::Int(800) && v.scope == "global"));
}

#[test]
fn test_compiled_document_roundtrips_both_formats() {
    let doc = compile_ok(COUNTER_SOURCE);

    let json = doc.to_json().unwrap();
    let from_json = KirDocument::from_json(&json).unwrap();
    assert_eq!(from_json, doc);

    let bytes = doc.to_binary().unwrap();
    let from_binary = KirDocument::from_binary(&bytes).unwrap();
    assert_eq!(from_binary, doc);
}

#[test]
fn test_function_declaration_lowered() {
    let doc = compile_ok(
        "function add(a: int, b: int) -> int {\n  return a + b\n}\nApp {}",
    );
    let function = doc.logic_block.function("add").expect("function");
    assert_eq!(function.params.len(), 2);
    assert_eq!(function.return_type.as_deref(), Some("int"));
    assert_eq!(function.body.len(), 1);
}

#[test]
fn test_code_block_becomes_logic_function() {
    let doc = compile_ok("@lua {\n  print(\"hi\")\n}\nApp {}");
    let function = doc.logic_block.function("_code_block_0").expect("code block fn");
    assert!(function.sources.contains_key("lua"));
}

mod import_tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_import_expands_definition() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("widgets")).unwrap();
        fs::write(
            dir.path().join("widgets/card.kry"),
            "const radius = 8\ncomponent ProfileCard {\n  borderRadius: radius\n  Text { text: \"card\" }\n}\nreturn { radius }",
        )
        .unwrap();

        let result = compile_source(
            "import ProfileCard from widgets.card\nApp {\n  ProfileCard()\n}",
            &CompileOptions {
                base_dir: Some(dir.path().to_path_buf()),
                ..CompileOptions::default()
            },
        );
        assert!(
            !result.errors.has_errors(),
            "errors: {}",
            result.errors.format_report()
        );
        let doc = result.document.unwrap();
        let card = &doc.root.children[0];
        assert_eq!(card.scope.as_deref(), Some("ProfileCard#0"));
        assert_eq!(card.style.as_ref().unwrap().border_radius, Some(8.0));
        // The import is preserved for round-trip codegen
        assert_eq!(doc.source_structures.imports[0].local_name, "ProfileCard");
        assert_eq!(doc.source_structures.imports[0].module_path, "widgets.card");
    }

    #[test]
    fn test_skip_import_expansion_records_reference_only() {
        let dir = tempfile::tempdir().unwrap();
        let result = compile_source(
            "import ProfileCard from widgets.card\nApp {}",
            &CompileOptions {
                base_dir: Some(dir.path().to_path_buf()),
                skip_import_expansion: true,
                ..CompileOptions::default()
            },
        );
        // No file access happens, so a missing module is fine
        assert!(
            !result.errors.has_errors(),
            "errors: {}",
            result.errors.format_report()
        );
        let doc = result.document.unwrap();
        assert_eq!(doc.source_structures.imports.len(), 1);
        assert!(doc.reactive_manifest.component_definitions.is_empty());
    }

    #[test]
    fn test_circular_import_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.kry"),
            "import B from b\ncomponent A { Text { text: \"a\" } }",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.kry"),
            "import A from a\ncomponent B { Text { text: \"b\" } }",
        )
        .unwrap();

        let result = compile_source(
            "import A from a\nApp { A() }",
            &CompileOptions {
                base_dir: Some(dir.path().to_path_buf()),
                ..CompileOptions::default()
            },
        );
        assert!(result.errors.has_errors());
        let report = result.errors.format_report();
        assert!(report.contains("circular import"), "{report}");
        assert!(report.contains("a.kry"), "{report}");
    }

    #[test]
    fn test_missing_module_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compile_source(
            "import Ghost from missing.module\nApp {}",
            &CompileOptions {
                base_dir: Some(dir.path().to_path_buf()),
                ..CompileOptions::default()
            },
        );
        assert!(result.errors.has_errors());
        assert!(result.errors.format_report().contains("cannot read module"));
    }
}
