//! Kryon Intermediate Representation.
//!
//! The typed, serializable component tree the compiler lowers `.kry` source
//! into, together with the value/expression/statement sum types shared by
//! the lowerer, the logic block, and the VM loader.
//!
//! Serde derives live directly on these types: the KIR JSON wire format
//! *is* this module's type definitions.

pub mod color;
pub mod component;
pub mod context;
pub mod dimension;
pub mod expr;
pub mod layout;
pub mod style;
pub mod value;

pub use color::Color;
pub use component::{
    BindingKind, Component, ComponentType, Event, EventKind, ForEachBinding, ForEachDef, LoopKind,
    PropertyBinding, VisibleCondition,
};
pub use context::IrContext;
pub use dimension::Dimension;
pub use expr::{BinaryOp, Expr, Stmt, UnaryOp};
pub use layout::{Alignment, FlexDirection, Layout, LayoutMode};
pub use style::{EdgeRect, FontFlags, PositionMode, Style};
pub use value::KryValue;
