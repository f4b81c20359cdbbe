//! # kryon-core
//!
//! Compiler core and bytecode runtime for the Kryon declarative UI
//! language: `.kry` source in, a typed, serializable KIR tree out, plus a
//! stack VM that executes compiled event handlers against the reactive
//! state.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! kir        → KIR serializer/deserializer (JSON + binary TLV)
//!   ↓
//! lower      → AST→IR lowering: property dispatch, templates, loops, imports
//!   ↓
//! vm         → stack-based bytecode VM
//! capability → process-wide plugin registry and host API
//!   ↓
//! parser     → logos lexer, recursive-descent parser, Pratt expressions
//!   ↓
//! manifest   → reactive manifest, logic block, source structures
//! style      → global stylesheet (selector → typed property record)
//!   ↓
//! ir         → IR component tree, values, expressions, colors, dimensions
//!   ↓
//! base       → primitives (Position/Span, LineIndex, interning)
//! ```

// ============================================================================
// MODULES (dependency order: base → ir → ... → lower → kir)
// ============================================================================

/// Foundation types: Position/Span, LineIndex, string interning
pub mod base;

/// IR: component tree, values, expressions, colors, dimensions
pub mod ir;

/// Reactive manifest, logic block, and source-preservation structures
pub mod manifest;

/// Global stylesheet
pub mod style;

/// Parser: logos lexer, recursive-descent parser, expression parser
pub mod parser;

/// Bytecode virtual machine
pub mod vm;

/// Capability registry: plugins, property parsers, host API
pub mod capability;

/// AST→IR lowering and the compile entry points
pub mod lower;

/// KIR serialization (JSON and binary)
pub mod kir;

// Re-export the compile surface
pub use lower::{compile_source, compile_to_json, CompileMode, CompileOptions, CompileResult};

// Re-export commonly needed types
pub use base::{Interner, LineCol, LineIndex, Position, Span};
pub use ir::{Component, ComponentType, KryValue};
pub use kir::{KirDocument, KirError};
pub use manifest::{LogicBlock, ReactiveManifest};
pub use parser::{parse, ErrorList, Parse, ParseError, Severity};
pub use vm::{Vm, VmError, VmValue};
