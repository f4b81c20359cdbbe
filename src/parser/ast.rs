//! Typed AST for `.kry` source.
//!
//! Owned tree; the parser allocates it and the whole tree drops in one
//! step with the [`Parse`](super::Parse) that owns it. Every node carries
//! its source [`Span`]. Clients that need values past the parse copy them
//! out during lowering.

use crate::base::Span;
use crate::ir::KryValue;
use crate::manifest::source::VarKind;

/// A parsed compilation unit. Top-level items in source order; when the
/// source is a single root component that component is `roots[0]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ast {
    pub roots: Vec<AstNode>,
}

impl Ast {
    /// The first component marked as a component definition, if any.
    pub fn first_definition(&self) -> Option<&ComponentNode> {
        self.roots.iter().find_map(|node| match node {
            AstNode::Component(c) if c.is_component_definition => Some(c),
            _ => None,
        })
    }

    /// The first plain (non-definition) component, the UI root.
    pub fn root_component(&self) -> Option<&ComponentNode> {
        self.roots.iter().find_map(|node| match node {
            AstNode::Component(c) if !c.is_component_definition => Some(c),
            _ => None,
        })
    }
}

/// Any statement-level construct.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Component(ComponentNode),
    Property(PropertyNode),
    StateDecl(StateDeclNode),
    VarDecl(VarDeclNode),
    StaticBlock(StaticBlockNode),
    ForLoop(ForLoopNode),
    IfElse(IfElseNode),
    CodeBlock(CodeBlockNode),
    FunctionDecl(FunctionDeclNode),
    StructDecl(StructDeclNode),
    Return(ReturnNode),
    ModuleReturn(ModuleReturnNode),
    Import(ImportNode),
    StyleBlock(StyleBlockNode),
    Assign(AssignNode),
    Delete(DeleteNode),
}

impl AstNode {
    pub fn span(&self) -> Span {
        match self {
            AstNode::Component(n) => n.span,
            AstNode::Property(n) => n.span,
            AstNode::StateDecl(n) => n.span,
            AstNode::VarDecl(n) => n.span,
            AstNode::StaticBlock(n) => n.span,
            AstNode::ForLoop(n) => n.span,
            AstNode::IfElse(n) => n.span,
            AstNode::CodeBlock(n) => n.span,
            AstNode::FunctionDecl(n) => n.span,
            AstNode::StructDecl(n) => n.span,
            AstNode::Return(n) => n.span,
            AstNode::ModuleReturn(n) => n.span,
            AstNode::Import(n) => n.span,
            AstNode::StyleBlock(n) => n.span,
            AstNode::Assign(n) => n.span,
            AstNode::Delete(n) => n.span,
        }
    }
}

/// Component instantiation or definition:
/// `Name(args) { ... }` / `component Name(props) extends Parent { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub name: String,
    /// Raw argument text between the parentheses, unparsed until lowering.
    pub arguments: Option<String>,
    pub is_component_definition: bool,
    pub extends_parent: Option<String>,
    pub body: Vec<AstNode>,
    pub span: Span,
}

impl ComponentNode {
    /// Properties declared directly in the body.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyNode> {
        self.body.iter().filter_map(|node| match node {
            AstNode::Property(p) => Some(p),
            _ => None,
        })
    }
}

/// A property value as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Quoted string, unescaped.
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// `#RGB`-family literal, raw text including the `#`.
    Color(String),
    /// Literal array of values.
    Array(Vec<PropertyValue>),
    /// Anything else: identifier, member chain, arithmetic, ternary.
    /// Raw source text; parsed on demand during lowering.
    Expression(String),
    /// `(params) => body` inline handler; the body's raw source.
    Lambda(LambdaValue),
}

impl PropertyValue {
    /// The value as raw text, the way substitution sees it.
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Str(s) => s.clone(),
            PropertyValue::Int(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Null => "null".to_string(),
            PropertyValue::Color(c) => c.clone(),
            PropertyValue::Array(items) => {
                let inner: Vec<String> = items.iter().map(PropertyValue::as_text).collect();
                format!("[{}]", inner.join(", "))
            }
            PropertyValue::Expression(e) => e.clone(),
            PropertyValue::Lambda(l) => l.body.clone(),
        }
    }
}

/// An inline event handler.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaValue {
    pub params: Vec<String>,
    /// Raw body source (without the surrounding braces).
    pub body: String,
}

/// `name: value`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub name: String,
    pub value: PropertyValue,
    pub span: Span,
}

/// `state name: type = expr` inside a component body.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDeclNode {
    pub name: String,
    pub type_tag: Option<String>,
    /// Raw initial-value expression text.
    pub initial: String,
    pub span: Span,
}

/// `const`/`let`/`var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclNode {
    pub kind: VarKind,
    pub name: String,
    pub type_tag: Option<String>,
    /// Raw declared-value text.
    pub value_text: String,
    /// Concrete value when the text is a literal/array/object/range.
    pub value: Option<KryValue>,
    pub span: Span,
}

/// `static { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StaticBlockNode {
    pub body: Vec<AstNode>,
    pub span: Span,
}

/// `for item in expr { ... }` / `for each item in expr { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoopNode {
    pub item: String,
    /// Optional index binding (`for item, i in ...`).
    pub index: Option<String>,
    /// Raw iterable expression text.
    pub iterable_text: String,
    /// Concrete collection when the iterable is a literal array or range.
    pub iterable: Option<KryValue>,
    /// True for `for each` (runtime iteration requested explicitly).
    pub is_each: bool,
    pub body: Vec<AstNode>,
    pub span: Span,
}

/// `if cond { ... } else { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct IfElseNode {
    /// Raw condition text.
    pub cond: String,
    pub then_body: Vec<AstNode>,
    pub else_body: Vec<AstNode>,
    pub span: Span,
}

/// `@lua { ... }` / `@js { ... }` / `@universal { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlockNode {
    pub language: String,
    /// Raw embedded source between the braces.
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    pub name: String,
    pub type_tag: Option<String>,
}

/// `function name(params) -> type { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclNode {
    pub name: String,
    pub params: Vec<ParamNode>,
    pub return_type: Option<String>,
    pub body: Vec<AstNode>,
    pub span: Span,
}

/// `struct Name { field: type, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclNode {
    pub name: String,
    pub fields: Vec<ParamNode>,
    pub span: Span,
}

/// `return expr` inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnNode {
    pub value: Option<String>,
    pub span: Span,
}

/// `return { name, other: expr }` at module level: the export list.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleReturnNode {
    /// (exported name, raw value text). A bare name exports itself.
    pub exports: Vec<(String, String)>,
    pub span: Span,
}

/// `import Name from dotted.path`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub local_name: String,
    pub module_path: String,
    pub span: Span,
}

/// `style selector { props }`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBlockNode {
    pub selector: String,
    pub properties: Vec<PropertyNode>,
    pub span: Span,
}

/// `name = expr` inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignNode {
    pub target: String,
    pub value: String,
    pub span: Span,
}

/// `delete target`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNode {
    pub target: String,
    pub span: Span,
}
