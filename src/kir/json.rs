//! KIR JSON.
//!
//! The serde derives on the IR types are the wire format; this module
//! holds the null-safe accessor helpers consumers use on raw documents and
//! the tests pinning the key names.

use serde_json::Value as JsonValue;

/// Null-safe string read: absent keys and JSON nulls are both `None`.
pub fn get_str<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

/// Null-safe unsigned read.
pub fn get_u32(value: &JsonValue, key: &str) -> Option<u32> {
    value.get(key)?.as_u64().and_then(|v| u32::try_from(v).ok())
}

/// Null-safe float read (accepts integer JSON numbers too).
pub fn get_f64(value: &JsonValue, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

/// Insert a string unless it is `None` (keeps documents free of noisy
/// nulls).
pub fn set_opt_str(object: &mut JsonValue, key: &str, value: Option<&str>) {
    if let (JsonValue::Object(map), Some(value)) = (object, value) {
        map.insert(key.to_string(), JsonValue::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        BindingKind, Component, ComponentType, Event, EventKind, ForEachBinding, ForEachDef,
        LoopKind, PropertyBinding, VisibleCondition,
    };
    use crate::kir::KirDocument;
    use serde_json::json;

    fn sample_component() -> Component {
        let mut text = Component::new(ComponentType::Text, 2);
        text.set_text_expression("item.name");
        text.property_bindings.push(PropertyBinding {
            property: "text".to_string(),
            expression: "item.name".to_string(),
            fallback: None,
            binding_kind: BindingKind::Runtime,
        });

        let mut foreach = Component::new(ComponentType::ForEach, 1);
        foreach.foreach_def = Some(Box::new(ForEachDef {
            item_name: "item".to_string(),
            index_name: None,
            loop_kind: LoopKind::Explicit,
            data_source: "userList".to_string(),
            bindings: vec![ForEachBinding {
                property: "text".to_string(),
                expression: "item.name".to_string(),
                reactive: true,
            }],
        }));
        foreach.add_child(text);

        let mut root = Component::new(ComponentType::Container, 0);
        root.class_name = Some("app".into());
        root.scope = Some("App#0".to_string());
        root.visible_condition = Some(VisibleCondition {
            expression: "ready".to_string(),
            visible_when: true,
        });
        root.events.push(Event::new(EventKind::Click, "onRootClick"));
        root.add_child(foreach);
        root
    }

    #[test]
    fn test_component_key_names() {
        let value = serde_json::to_value(sample_component()).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["type"], "Container");
        assert_eq!(value["className"], "app");
        assert_eq!(value["scope"], "App#0");
        assert_eq!(value["visible_condition"]["expression"], "ready");
        assert_eq!(value["visible_condition"]["visible_when"], true);
        assert_eq!(value["events"][0]["type"], "click");
        assert_eq!(value["events"][0]["handler"], "onRootClick");

        let foreach = &value["children"][0];
        assert_eq!(foreach["type"], "ForEach");
        assert_eq!(foreach["foreach_def"]["item_name"], "item");
        assert_eq!(foreach["foreach_def"]["data_source"], "userList");
        assert_eq!(foreach["foreach_def"]["loop_kind"], "explicit");

        let text = &foreach["children"][0];
        assert_eq!(text["text_expression"], "item.name");
        assert_eq!(text["property_bindings"][0]["property"], "text");
        assert_eq!(text["property_bindings"][0]["binding_kind"], "runtime");
        // Exactly one of text/text_expression is present
        assert!(text.get("text").is_none());
    }

    #[test]
    fn test_document_top_level_keys() {
        let doc = KirDocument::new(sample_component());
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("version").is_some());
        assert!(value.get("root").is_some());
        assert!(value.get("reactive_manifest").is_some());
        assert!(value.get("logic_block").is_some());
        assert!(value.get("source_metadata").is_some());
        // Empty side tables stay off the wire
        assert!(value.get("source_structures").is_none());
        assert!(value.get("stylesheet").is_none());
    }

    #[test]
    fn test_document_json_roundtrip() {
        let doc = KirDocument::new(sample_component());
        let json = doc.to_json().unwrap();
        let back = KirDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_missing_fields_mean_default() {
        let minimal = json!({
            "version": "1.0",
            "root": { "id": 0, "type": "Container" },
            "source_metadata": {
                "source_language": "kry",
                "compiler_version": "0.1.0",
                "timestamp": "0"
            }
        });
        let doc = KirDocument::from_json(&minimal.to_string()).unwrap();
        assert!(doc.logic_block.is_empty());
        assert!(doc.reactive_manifest.variables.is_empty());
        assert!(doc.root.children.is_empty());
    }

    #[test]
    fn test_null_safe_helpers() {
        let value = json!({"name": "x", "count": 3, "missing": null});
        assert_eq!(get_str(&value, "name"), Some("x"));
        assert_eq!(get_str(&value, "missing"), None);
        assert_eq!(get_str(&value, "absent"), None);
        assert_eq!(get_u32(&value, "count"), Some(3));
        assert_eq!(get_f64(&value, "count"), Some(3.0));

        let mut object = json!({});
        set_opt_str(&mut object, "a", Some("v"));
        set_opt_str(&mut object, "b", None);
        assert_eq!(object, json!({"a": "v"}));
    }

}
