//! Typed expression and statement trees.
//!
//! The expression parser produces these; the lowerer walks them for binding
//! extraction, and logic functions carry statement lists built from them.
//! A parent node exclusively owns its sub-expressions.

use serde::{Deserialize, Serialize};

/// Binary operators in precedence-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Int {
        value: i64,
    },
    Float {
        value: f64,
    },
    Str {
        value: String,
    },
    Bool {
        value: bool,
    },
    Null,
    /// A bare variable reference.
    Var {
        name: String,
    },
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// `object[key]`
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    /// `name(args...)`
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `receiver.method(args...)`
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `(inner)`
    Group {
        inner: Box<Expr>,
    },
}

impl Expr {
    /// True for literal leaves (no variable references anywhere).
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Int { .. } | Expr::Float { .. } | Expr::Str { .. } | Expr::Bool { .. } | Expr::Null
        )
    }

    /// The leftmost variable name of a `Var`/`Member`/`Index`/`MethodCall`
    /// chain, if the expression is rooted in one. `item.colors[0]` → `item`.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Expr::Var { name } => Some(name),
            Expr::Member { object, .. } => object.base_name(),
            Expr::Index { object, .. } => object.base_name(),
            Expr::MethodCall { receiver, .. } => receiver.base_name(),
            Expr::Group { inner } => inner.base_name(),
            _ => None,
        }
    }

    /// Collect every distinct variable base name referenced anywhere in the
    /// tree, in first-seen order. Used for reactive-binding extraction.
    pub fn referenced_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        fn push(out: &mut Vec<String>, name: &str) {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        }
        match self {
            Expr::Var { name } => push(out, name),
            Expr::Member { object, .. } | Expr::Index { object, .. } => {
                match self.base_name() {
                    Some(base) => push(out, base),
                    None => object.collect_names(out),
                }
                if let Expr::Index { key, .. } = self {
                    key.collect_names(out);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_names(out);
                }
            }
            Expr::MethodCall { receiver, args, .. } => {
                receiver.collect_names(out);
                for arg in args {
                    arg.collect_names(out);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.collect_names(out);
                right.collect_names(out);
            }
            Expr::Unary { operand, .. } => operand.collect_names(out),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_names(out);
                then.collect_names(out);
                otherwise.collect_names(out);
            }
            Expr::Group { inner } => inner.collect_names(out),
            _ => {}
        }
    }

    /// Regenerate canonical source text for the tree. Binding records and
    /// for-loop records store this exact text for runtime re-evaluation.
    pub fn to_source(&self) -> String {
        match self {
            Expr::Int { value } => value.to_string(),
            Expr::Float { value } => value.to_string(),
            Expr::Str { value } => format!("\"{}\"", escape_string(value)),
            Expr::Bool { value } => value.to_string(),
            Expr::Null => "null".to_string(),
            Expr::Var { name } => name.clone(),
            Expr::Member { object, property } => format!("{}.{}", object.to_source(), property),
            Expr::Index { object, key } => format!("{}[{}]", object.to_source(), key.to_source()),
            Expr::Call { name, args } => format!("{}({})", name, join_args(args)),
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => format!("{}.{}({})", receiver.to_source(), method, join_args(args)),
            Expr::Binary { op, left, right } => format!(
                "{} {} {}",
                left.to_source(),
                op.symbol(),
                right.to_source()
            ),
            Expr::Unary { op, operand } => format!("{}{}", op.symbol(), operand.to_source()),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                cond.to_source(),
                then.to_source(),
                otherwise.to_source()
            ),
            Expr::Group { inner } => format!("({})", inner.to_source()),
        }
    }
}

fn join_args(args: &[Expr]) -> String {
    args.iter()
        .map(Expr::to_source)
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// A statement in a logic function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Assign {
        name: String,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    Delete {
        target: Expr,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    ForEach {
        item: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Var {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_base_name_of_chain() {
        let expr = Expr::Index {
            object: Box::new(Expr::Member {
                object: Box::new(var("item")),
                property: "colors".to_string(),
            }),
            key: Box::new(Expr::Int { value: 0 }),
        };
        assert_eq!(expr.base_name(), Some("item"));
        assert_eq!(expr.to_source(), "item.colors[0]");
    }

    #[test]
    fn test_to_source_ternary() {
        let expr = Expr::Ternary {
            cond: Box::new(Expr::Binary {
                op: BinaryOp::Gt,
                left: Box::new(var("count")),
                right: Box::new(Expr::Int { value: 0 }),
            }),
            then: Box::new(Expr::Str {
                value: "some".to_string(),
            }),
            otherwise: Box::new(Expr::Str {
                value: "none".to_string(),
            }),
        };
        assert_eq!(expr.to_source(), "count > 0 ? \"some\" : \"none\"");
    }

    #[test]
    fn test_referenced_names_dedup() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(var("a")),
            right: Box::new(Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(var("b")),
                right: Box::new(var("a")),
            }),
        };
        assert_eq!(expr.referenced_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_string_escaping() {
        let expr = Expr::Str {
            value: "a\"b\nc".to_string(),
        };
        assert_eq!(expr.to_source(), "\"a\\\"b\\nc\"");
    }
}
