//! The process-current IR context.
//!
//! Holds the component-id generator, global window metadata, and the global
//! stylesheet for one compilation unit. A compile installs its own context
//! as current for the duration; the guard restores the previous context on
//! drop, so nested compiles (module imports) stack correctly. The compiler
//! core is single-threaded; concurrent compiles require separate processes.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::style::Stylesheet;

/// Global window/document metadata written by `window*` properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "windowTitle", skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,

    #[serde(rename = "windowWidth", skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,

    #[serde(rename = "windowHeight", skip_serializing_if = "Option::is_none")]
    pub window_height: Option<u32>,
}

/// Per-compilation-unit shared state.
#[derive(Debug, Default)]
pub struct IrContext {
    next_component_id: u32,
    pub metadata: Metadata,
    pub stylesheet: Stylesheet,
}

impl IrContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next component id. Ids are unique across the unit and
    /// monotonic in AST traversal order.
    pub fn next_component_id(&mut self) -> u32 {
        let id = self.next_component_id;
        self.next_component_id += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn component_count(&self) -> u32 {
        self.next_component_id
    }
}

thread_local! {
    static CURRENT: RefCell<Vec<IrContext>> = const { RefCell::new(Vec::new()) };
}

/// Guard returned by [`install`]; restores the previous context on drop.
#[must_use = "dropping the guard immediately uninstalls the context"]
pub struct ContextGuard {
    _private: (),
}

/// Install `ctx` as the current IR context until the guard drops.
pub fn install(ctx: IrContext) -> ContextGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(ctx));
    ContextGuard { _private: () }
}

impl ContextGuard {
    /// Uninstall, returning the context (with everything the compile
    /// accumulated) and restoring the previously current one.
    pub fn take(self) -> IrContext {
        let ctx = CURRENT.with(|stack| stack.borrow_mut().pop());
        std::mem::forget(self);
        ctx.expect("context stack empty on take")
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with mutable access to the current context.
/// Returns `None` when no context is installed.
pub fn with_current<R>(f: impl FnOnce(&mut IrContext) -> R) -> Option<R> {
    CURRENT.with(|stack| stack.borrow_mut().last_mut().map(f))
}

/// Allocate a component id from the current context, or from a detached
/// counter starting at 0 when none is installed (unit tests).
pub fn alloc_component_id() -> u32 {
    with_current(|ctx| ctx.next_component_id()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_monotonic() {
        let mut ctx = IrContext::new();
        assert_eq!(ctx.next_component_id(), 0);
        assert_eq!(ctx.next_component_id(), 1);
        assert_eq!(ctx.next_component_id(), 2);
        assert_eq!(ctx.component_count(), 3);
    }

    #[test]
    fn test_install_restores_previous() {
        let outer = install(IrContext::new());
        with_current(|ctx| {
            ctx.next_component_id();
            ctx.next_component_id();
        });

        // A nested compile (module import) stacks its own context.
        let inner = install(IrContext::new());
        assert_eq!(with_current(|ctx| ctx.next_component_id()), Some(0));
        let inner_ctx = inner.take();
        assert_eq!(inner_ctx.component_count(), 1);

        // The outer context is current again, counter intact.
        assert_eq!(with_current(|ctx| ctx.next_component_id()), Some(2));
        drop(outer);
        assert_eq!(with_current(|ctx| ctx.next_component_id()), None);
    }

    #[test]
    fn test_metadata_default_omits_all() {
        let json = serde_json::to_string(&Metadata::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
