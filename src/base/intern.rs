//! String interner for efficient string storage and comparison.
//!
//! Uses `Rc<str>` for cheap cloning (reference count increment instead of
//! allocation). The interner deduplicates strings so identical strings share
//! the same allocation. Logic-function source alternates are interned so the
//! logic block and the legacy inline-event representation can share one
//! buffer.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An interned string - cheap to clone (just Rc increment)
pub type IStr = Rc<str>;

/// A reference-counted source buffer.
///
/// Lets a logic function's source alternate and the legacy inline-event
/// representation share one allocation. Compared by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharedSource(pub IStr);

impl SharedSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedSource {
    fn from(s: &str) -> Self {
        SharedSource(Rc::from(s))
    }
}

impl From<String> for SharedSource {
    fn from(s: String) -> Self {
        SharedSource(Rc::from(s.as_str()))
    }
}

impl From<IStr> for SharedSource {
    fn from(s: IStr) -> Self {
        SharedSource(s)
    }
}

impl fmt::Display for SharedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SharedSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SharedSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SharedSource(Rc::from(s.as_str())))
    }
}

/// String interner that deduplicates strings.
///
/// Interning a string returns an `Rc<str>` that can be cheaply cloned.
/// If the same string is interned multiple times, the same `Rc` is returned.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: HashSet<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    ///
    /// If the string was already interned, returns the existing `Rc`.
    /// Otherwise, creates a new `Rc` and stores it.
    pub fn intern(&mut self, s: &str) -> IStr {
        if let Some(existing) = self.strings.get(s) {
            Rc::clone(existing)
        } else {
            let rc: Rc<str> = Rc::from(s);
            self.strings.insert(Rc::clone(&rc));
            rc
        }
    }

    /// Intern an owned string, avoiding allocation if possible.
    pub fn intern_string(&mut self, s: String) -> IStr {
        if let Some(existing) = self.strings.get(s.as_str()) {
            Rc::clone(existing)
        } else {
            let rc: Rc<str> = Rc::from(s);
            self.strings.insert(Rc::clone(&rc));
            rc
        }
    }

    /// Get an interned string if it exists, without creating it.
    pub fn get(&self, s: &str) -> Option<IStr> {
        self.strings.get(s).cloned()
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Clear all interned strings.
    pub fn clear(&mut self) {
        self.strings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_rc() {
        let mut interner = Interner::new();
        let a = interner.intern("handler_0_click");
        let b = interner.intern("handler_0_click");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_intern_different_strings() {
        let mut interner = Interner::new();
        let a = interner.intern("increment");
        let b = interner.intern("decrement");
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(&*a, "increment");
        assert_eq!(&*b, "decrement");
    }

    #[test]
    fn test_get_existing() {
        let mut interner = Interner::new();
        interner.intern("exists");
        assert!(interner.get("exists").is_some());
        assert!(interner.get("missing").is_none());
    }
}
