//! Foundation types for the Kryon toolchain.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`Position`], [`Span`] - Line/column positions for AST nodes
//! - [`LineIndex`], [`LineCol`] - Byte offset to line/column conversion
//! - [`Interner`], [`IStr`] - String interning for shared logic sources
//!
//! This module has NO dependencies on other kryon modules.

mod intern;
mod line_index;
mod position;

pub use intern::{IStr, Interner, SharedSource};
pub use line_index::{LineCol, LineIndex};
pub use position::{Position, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
