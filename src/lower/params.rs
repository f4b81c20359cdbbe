//! Parameter substitution table.
//!
//! Scalars hold their substituted string form; arrays/objects keep the
//! preserved value so nested accesses can be pre-registered. For a dotted
//! access like `item.colors[0]` inside a loop over objects, the loop
//! pre-populates entries keyed by the full access path, so substitution of
//! nested expressions is a linear scan over at most [`MAX_PARAMS`] entries.

use crate::ir::KryValue;

/// Fixed table capacity; entries past it are dropped with a warning by the
/// caller.
pub const MAX_PARAMS: usize = 64;

/// One substitution entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    /// Substituted string form (scalars) or rendered form (collections).
    pub value_text: String,
    /// Preserved value for arrays/objects/ranges.
    pub value: Option<KryValue>,
}

/// The substitution table threaded through lowering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    entries: Vec<ParamEntry>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry. Returns `false` when the table is full (the entry is
    /// dropped; the caller reports).
    pub fn push(&mut self, name: impl Into<String>, value: KryValue) -> bool {
        if self.entries.len() >= MAX_PARAMS {
            return false;
        }
        let name = name.into();
        let value_text = value.to_display_string();
        let preserved = match &value {
            KryValue::Array(_) | KryValue::Object(_) | KryValue::Range(..) => Some(value),
            _ => None,
        };
        self.entries.push(ParamEntry {
            name,
            value_text,
            value: preserved,
        });
        true
    }

    /// Add a raw string entry (prop arguments arrive as text).
    pub fn push_text(&mut self, name: impl Into<String>, value_text: impl Into<String>) -> bool {
        if self.entries.len() >= MAX_PARAMS {
            return false;
        }
        self.entries.push(ParamEntry {
            name: name.into(),
            value_text: value_text.into(),
            value: None,
        });
        true
    }

    /// Exact-name lookup, newest entry wins (loop shadowing).
    pub fn lookup(&self, name: &str) -> Option<&ParamEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    /// Substitute an expression string. Matches whole entries only; a
    /// dotted/indexed path hits the pre-registered path entries.
    pub fn substitute(&self, expr: &str) -> Option<&str> {
        self.lookup(expr.trim()).map(|e| e.value_text.as_str())
    }

    /// True when `expr` is a dotted/indexed access rooted at a registered
    /// base name (the access itself may still be unregistered, e.g. an
    /// out-of-range index).
    pub fn has_base(&self, expr: &str) -> bool {
        let base = expr
            .split(['.', '['])
            .next()
            .unwrap_or(expr)
            .trim();
        !base.is_empty() && self.lookup(base).is_some()
    }

    /// Register a loop element: the item itself plus, for objects, every
    /// property and array element under `item.<prop>` / `item.<prop>[<i>]`.
    /// Returns `false` if the table filled up along the way.
    pub fn push_element(&mut self, item: &str, element: &KryValue) -> bool {
        let mut ok = self.push(item, element.clone());
        if let KryValue::Object(fields) = element {
            for (prop, value) in fields {
                ok &= self.push(format!("{item}.{prop}"), value.clone());
                if let KryValue::Array(items) = value {
                    for (i, nested) in items.iter().enumerate() {
                        ok &= self.push(format!("{item}.{prop}[{i}]"), nested.clone());
                    }
                }
            }
        }
        ok
    }

    /// Current length, for scoped push/truncate around loop iterations.
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Drop entries added since `mark` (iteration end).
    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    /// Swap in an empty table (template conversion runs with an empty
    /// param context); restore with [`restore`](Self::restore).
    pub fn take(&mut self) -> ParamTable {
        std::mem::take(self)
    }

    pub fn restore(&mut self, saved: ParamTable) {
        *self = saved;
    }
}
