//! Precedence-climbing expression parser.
//!
//! Parses operand expressions (property values, conditions, binding
//! sources) into the typed [`Expr`] tree. Fixed precedence table, lowest
//! first: `? :`, `||`, `&&`, `== !=`, `< > <= >=`, `+ -`, `* / %`, unary
//! `! -`, postfix `.` `[]` `()`.
//!
//! Contract: a parse error appends to the caller's error list and returns
//! `None`; the caller decides whether to continue.

use crate::ir::{BinaryOp, Expr, UnaryOp};

use super::errors::{Category, ErrorList};
use super::lexer::{self, Token, TokenKind};

/// Parse an expression snippet. Errors are reported at `line`/`column`
/// (the snippet's position in the enclosing source).
pub fn parse_expression(
    text: &str,
    line: u32,
    column: u32,
    errors: &mut ErrorList,
) -> Option<Expr> {
    let tokens: Vec<Token<'_>> = lexer::tokenize(text)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    if tokens.is_empty() {
        errors.error(Category::Syntax, line, column, "empty expression");
        return None;
    }
    let mut parser = ExprParser {
        tokens: &tokens,
        pos: 0,
        line,
        column,
        errors,
    };
    let expr = parser.parse_ternary()?;
    if !parser.at_end() {
        let trailing = parser.current_text().to_string();
        parser.error(format!("unexpected '{trailing}' after expression"));
        return None;
    }
    Some(expr)
}

struct ExprParser<'a, 'e> {
    tokens: &'a [Token<'a>],
    pos: usize,
    line: u32,
    column: u32,
    errors: &'e mut ErrorList,
}

impl<'a> ExprParser<'a, '_> {
    fn current(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn current_text(&self) -> &str {
        self.current().map(|t| t.text).unwrap_or("end of expression")
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<()> {
        if self.eat(kind) {
            Some(())
        } else {
            self.error(format!("expected {}, found '{}'", what, self.current_text()));
            None
        }
    }

    fn error(&mut self, message: String) {
        self.errors
            .error(Category::Syntax, self.line, self.column, message);
    }

    // Precedence levels, lowest binding first

    fn parse_ternary(&mut self) -> Option<Expr> {
        let cond = self.parse_or()?;
        if !self.eat(TokenKind::Question) {
            return Some(cond);
        }
        let then = self.parse_ternary()?;
        self.expect(TokenKind::Colon, "':' in ternary")?;
        let otherwise = self.parse_ternary()?;
        Some(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Some(left)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::BangEq) => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::LtEq) => BinaryOp::Le,
                Some(TokenKind::GtEq) => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.current_kind() {
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            return Some(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    /// Postfix chains: `.member`, `.method(args)`, `[key]`, and the
    /// call form `name(args)` on a bare identifier.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current_kind() {
                Some(TokenKind::Dot) => {
                    self.bump();
                    let name = self.expect_name()?;
                    if self.at(TokenKind::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr::MethodCall {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                        };
                    } else {
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property: name,
                        };
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.bump();
                    let key = self.parse_ternary()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        key: Box::new(key),
                    };
                }
                Some(TokenKind::LParen) => {
                    // Only a bare name is callable
                    let Expr::Var { name } = expr else {
                        self.error("only named functions can be called".to_string());
                        return None;
                    };
                    let args = self.parse_args()?;
                    expr = Expr::Call { name, args };
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_args(&mut self) -> Option<Vec<Expr>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Some(args);
        }
        loop {
            args.push(self.parse_ternary()?);
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')'")?;
            break;
        }
        Some(args)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = match self.current() {
            Some(t) => *t,
            None => {
                self.error("unexpected end of expression".to_string());
                return None;
            }
        };
        match token.kind {
            TokenKind::Integer => {
                self.bump();
                match token.text.parse::<i64>() {
                    Ok(value) => Some(Expr::Int { value }),
                    Err(_) => {
                        self.error(format!("integer literal '{}' out of range", token.text));
                        None
                    }
                }
            }
            TokenKind::Float => {
                self.bump();
                match token.text.parse::<f64>() {
                    Ok(value) => Some(Expr::Float { value }),
                    Err(_) => {
                        self.error(format!("bad float literal '{}'", token.text));
                        None
                    }
                }
            }
            TokenKind::String => {
                self.bump();
                Some(Expr::Str {
                    value: lexer::unescape_string(token.text),
                })
            }
            TokenKind::TrueKw => {
                self.bump();
                Some(Expr::Bool { value: true })
            }
            TokenKind::FalseKw => {
                self.bump();
                Some(Expr::Bool { value: false })
            }
            TokenKind::NullKw => {
                self.bump();
                Some(Expr::Null)
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_ternary()?;
                self.expect(TokenKind::RParen, "')'")?;
                Some(Expr::Group {
                    inner: Box::new(inner),
                })
            }
            kind if kind.is_name_token() => {
                self.bump();
                Some(Expr::Var {
                    name: token.text.to_string(),
                })
            }
            _ => {
                self.error(format!("unexpected '{}' in expression", token.text));
                None
            }
        }
    }

    fn expect_name(&mut self) -> Option<String> {
        match self.current() {
            Some(t) if t.kind.is_name_token() => {
                let name = t.text.to_string();
                self.bump();
                Some(name)
            }
            _ => {
                self.error(format!(
                    "expected member name, found '{}'",
                    self.current_text()
                ));
                None
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Expr {
        let mut errors = ErrorList::new();
        let expr = parse_expression(text, 0, 0, &mut errors);
        assert!(errors.is_empty(), "errors for '{text}': {}", errors.format_report());
        expr.unwrap()
    }

    fn parse_err(text: &str) -> ErrorList {
        let mut errors = ErrorList::new();
        assert!(parse_expression(text, 0, 0, &mut errors).is_none());
        assert!(!errors.is_empty());
        errors
    }

    #[test]
    fn test_precedence_mul_over_add() {
        assert_eq!(parse_ok("1 + 2 * 3").to_source(), "1 + 2 * 3");
        // The tree shape matters, not just the text
        let Expr::Binary { op: BinaryOp::Add, right, .. } = parse_ok("1 + 2 * 3") else {
            panic!("expected add at root");
        };
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_comparison_over_logic() {
        let Expr::Binary { op: BinaryOp::And, left, .. } = parse_ok("a > 1 && b < 2") else {
            panic!("expected && at root");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_ternary_is_lowest() {
        let expr = parse_ok("a || b ? \"yes\" : \"no\"");
        assert!(matches!(expr, Expr::Ternary { .. }));
    }

    #[test]
    fn test_member_index_call_chain() {
        let expr = parse_ok("item.colors[0]");
        assert_eq!(expr.base_name(), Some("item"));
        assert_eq!(expr.to_source(), "item.colors[0]");

        let expr = parse_ok("list.filter(active).length");
        assert_eq!(expr.to_source(), "list.filter(active).length");
    }

    #[test]
    fn test_function_call() {
        let Expr::Call { name, args } = parse_ok("max(a, b + 1)") else {
            panic!("expected call");
        };
        assert_eq!(name, "max");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_unary_nesting() {
        assert_eq!(parse_ok("!!done").to_source(), "!!done");
        assert_eq!(parse_ok("--x").to_source(), "--x");
    }

    #[test]
    fn test_group() {
        let expr = parse_ok("(1 + 2) * 3");
        assert_eq!(expr.to_source(), "(1 + 2) * 3");
    }

    #[test]
    fn test_string_escapes() {
        let Expr::Str { value } = parse_ok(r#""line\nbreak""#) else {
            panic!("expected string");
        };
        assert_eq!(value, "line\nbreak");
    }

    #[test]
    fn test_error_returns_none_and_reports() {
        parse_err("1 +");
        parse_err("a ? b");
        parse_err("foo(");
        parse_err("");
        parse_err("a b");
    }
}
