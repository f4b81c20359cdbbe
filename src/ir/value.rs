//! Runtime value type for the compile-time evaluator.
//!
//! `KryValue` is the tagged union the lowerer uses for parameter
//! substitution, state initial values, and module-level constants. The
//! array/object/range sub-shapes exist so for-loop expansion can walk
//! concrete collections at compile time.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// A typed value in `.kry` source: literals, plus the collection shapes
/// for-loop expansion needs.
///
/// A string value owns its buffer; cloning duplicates, moves transfer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum KryValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Array(Vec<KryValue>),
    Object(IndexMap<String, KryValue>),
    /// A half-open integer range `a..b`.
    Range(i64, i64),
}

impl KryValue {
    /// The type tag used by the reactive manifest (`"int"`, `"float"`, ...).
    pub fn type_tag(&self) -> &'static str {
        match self {
            KryValue::Null => "null",
            KryValue::Int(_) => "int",
            KryValue::Float(_) => "float",
            KryValue::Bool(_) => "bool",
            KryValue::String(_) => "string",
            KryValue::Array(_) => "array",
            KryValue::Object(_) => "object",
            KryValue::Range(..) => "range",
        }
    }

    /// Parse a literal according to an explicit type annotation
    /// (`state count: int = 0`). Returns `None` when the text does not
    /// parse as the annotated type.
    pub fn parse_typed(type_tag: &str, text: &str) -> Option<KryValue> {
        let text = text.trim();
        match type_tag {
            "int" => text.parse::<i64>().ok().map(KryValue::Int),
            "float" => text.parse::<f64>().ok().map(KryValue::Float),
            "bool" => match text {
                "true" => Some(KryValue::Bool(true)),
                "false" => Some(KryValue::Bool(false)),
                _ => None,
            },
            "string" => Some(KryValue::String(strip_quotes(text).to_string())),
            _ => None,
        }
    }

    /// Infer a value from a bare literal (used by module-level `const`
    /// declarations, where the type comes from the literal itself).
    pub fn from_literal(text: &str) -> Option<KryValue> {
        let text = text.trim();
        match text {
            "true" => return Some(KryValue::Bool(true)),
            "false" => return Some(KryValue::Bool(false)),
            "null" => return Some(KryValue::Null),
            _ => {}
        }
        if text.starts_with('"') || text.starts_with('\'') {
            return Some(KryValue::String(strip_quotes(text).to_string()));
        }
        if let Ok(i) = text.parse::<i64>() {
            return Some(KryValue::Int(i));
        }
        if let Ok(f) = text.parse::<f64>() {
            return Some(KryValue::Float(f));
        }
        None
    }

    /// Render the value the way property substitution needs it: bare text,
    /// no quotes around strings.
    pub fn to_display_string(&self) -> String {
        match self {
            KryValue::Null => "null".to_string(),
            KryValue::Int(i) => i.to_string(),
            KryValue::Float(f) => f.to_string(),
            KryValue::Bool(b) => b.to_string(),
            KryValue::String(s) => s.clone(),
            KryValue::Array(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.to_source_string()).collect();
                format!("[{}]", inner.join(", "))
            }
            KryValue::Object(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_source_string()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            KryValue::Range(a, b) => format!("{}..{}", a, b),
        }
    }

    /// Render the value as it would appear in source (strings quoted).
    pub fn to_source_string(&self) -> String {
        match self {
            KryValue::String(s) => format!("\"{}\"", s),
            other => other.to_display_string(),
        }
    }

    /// Encode as JSON for the manifest's `initial_value` field.
    pub fn to_json(&self) -> JsonValue {
        match self {
            KryValue::Null => JsonValue::Null,
            KryValue::Int(i) => JsonValue::from(*i),
            KryValue::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
            KryValue::Bool(b) => JsonValue::Bool(*b),
            KryValue::String(s) => JsonValue::String(s.clone()),
            KryValue::Array(items) => JsonValue::Array(items.iter().map(KryValue::to_json).collect()),
            KryValue::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            KryValue::Range(a, b) => {
                JsonValue::Array(vec![JsonValue::from(*a), JsonValue::from(*b)])
            }
        }
    }

    /// Decode a manifest `initial_value` back into a value.
    pub fn from_json(json: &JsonValue) -> KryValue {
        match json {
            JsonValue::Null => KryValue::Null,
            JsonValue::Bool(b) => KryValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    KryValue::Int(i)
                } else {
                    KryValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => KryValue::String(s.clone()),
            JsonValue::Array(items) => {
                KryValue::Array(items.iter().map(KryValue::from_json).collect())
            }
            JsonValue::Object(fields) => KryValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), KryValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, KryValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            KryValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Strip matching single or double quotes from a literal.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typed() {
        assert_eq!(KryValue::parse_typed("int", "42"), Some(KryValue::Int(42)));
        assert_eq!(
            KryValue::parse_typed("float", "3.5"),
            Some(KryValue::Float(3.5))
        );
        assert_eq!(
            KryValue::parse_typed("bool", "true"),
            Some(KryValue::Bool(true))
        );
        assert_eq!(
            KryValue::parse_typed("string", "\"hi\""),
            Some(KryValue::String("hi".to_string()))
        );
        assert_eq!(KryValue::parse_typed("int", "abc"), None);
    }

    #[test]
    fn test_from_literal_inference() {
        assert_eq!(KryValue::from_literal("7"), Some(KryValue::Int(7)));
        assert_eq!(KryValue::from_literal("7.25"), Some(KryValue::Float(7.25)));
        assert_eq!(KryValue::from_literal("false"), Some(KryValue::Bool(false)));
        assert_eq!(
            KryValue::from_literal("\"dark\""),
            Some(KryValue::String("dark".to_string()))
        );
        assert_eq!(KryValue::from_literal("items"), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let value = KryValue::Object(
            [
                ("name".to_string(), KryValue::String("Run".to_string())),
                (
                    "colors".to_string(),
                    KryValue::Array(vec![KryValue::Int(1), KryValue::Int(2)]),
                ),
            ]
            .into_iter()
            .collect(),
        );
        let json = value.to_json();
        assert_eq!(KryValue::from_json(&json), value);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(KryValue::Int(3).to_display_string(), "3");
        assert_eq!(
            KryValue::String("plain".to_string()).to_display_string(),
            "plain"
        );
        assert_eq!(
            KryValue::Array(vec![KryValue::Int(1), KryValue::Int(2)]).to_display_string(),
            "[1, 2]"
        );
        assert_eq!(KryValue::Range(0, 4).to_display_string(), "0..4");
    }
}
