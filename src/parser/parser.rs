//! Recursive descent parser for `.kry`
//!
//! Builds a typed AST from tokens. Supports error recovery: on a syntax
//! error the parser emits a diagnostic, synchronizes to the next statement
//! boundary, and continues, so one invocation surfaces as many problems as
//! possible. Only a fatal error (resource limits) stops parsing.

use text_size::TextSize;

use crate::base::{LineIndex, Position, Span};
use crate::ir::KryValue;
use crate::manifest::source::VarKind;

use super::ast::*;
use super::errors::{Category, ErrorList};
use super::lexer::{self, Token, TokenKind};

/// Nesting guard; exceeding it is a fatal resource error.
const MAX_DEPTH: usize = 256;

/// Parse result containing the AST and any errors
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
    pub ast: Ast,
    pub errors: ErrorList,
}

impl Parse {
    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        !self.errors.has_errors()
    }
}

/// Parse `.kry` source into an AST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = lexer::tokenize(input);
    let mut parser = Parser::new(&tokens, input);
    let roots = parser.parse_module();
    Parse {
        ast: Ast { roots },
        errors: parser.errors,
    }
}

/// Convert a TokenKind to a human-readable name for error messages
pub fn kind_to_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Whitespace => "whitespace",
        TokenKind::LineComment | TokenKind::BlockComment => "comment",
        TokenKind::Ident => "identifier",
        TokenKind::Integer => "integer",
        TokenKind::Float => "number",
        TokenKind::String => "string",
        TokenKind::HexColor => "color",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::Semicolon => "';'",
        TokenKind::Colon => "':'",
        TokenKind::Comma => "','",
        TokenKind::Dot => "'.'",
        TokenKind::DotDot => "'..'",
        TokenKind::Question => "'?'",
        TokenKind::At => "'@'",
        TokenKind::Eq => "'='",
        TokenKind::EqEq => "'=='",
        TokenKind::BangEq => "'!='",
        TokenKind::Lt => "'<'",
        TokenKind::Gt => "'>'",
        TokenKind::LtEq => "'<='",
        TokenKind::GtEq => "'>='",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Star => "'*'",
        TokenKind::Slash => "'/'",
        TokenKind::Percent => "'%'",
        TokenKind::Bang => "'!'",
        TokenKind::AmpAmp => "'&&'",
        TokenKind::PipePipe => "'||'",
        TokenKind::Arrow => "'->'",
        TokenKind::FatArrow => "'=>'",
        TokenKind::StateKw => "'state'",
        TokenKind::VarKw => "'var'",
        TokenKind::LetKw => "'let'",
        TokenKind::ConstKw => "'const'",
        TokenKind::StaticKw => "'static'",
        TokenKind::ForKw => "'for'",
        TokenKind::EachKw => "'each'",
        TokenKind::InKw => "'in'",
        TokenKind::IfKw => "'if'",
        TokenKind::ElseKw => "'else'",
        TokenKind::FunctionKw => "'function'",
        TokenKind::ReturnKw => "'return'",
        TokenKind::StructKw => "'struct'",
        TokenKind::StyleKw => "'style'",
        TokenKind::ImportKw => "'import'",
        TokenKind::FromKw => "'from'",
        TokenKind::ComponentKw => "'component'",
        TokenKind::ExtendsKw => "'extends'",
        TokenKind::DeleteKw => "'delete'",
        TokenKind::TrueKw => "'true'",
        TokenKind::FalseKw => "'false'",
        TokenKind::NullKw => "'null'",
        TokenKind::Error => "unrecognized token",
    }
}

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    errors: ErrorList,
    source: &'a str,
    line_index: LineIndex,
    depth: usize,
    /// True inside a function body (changes `return` parsing).
    in_function: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], source: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: ErrorList::new(),
            source,
            line_index: LineIndex::new(source),
            depth: 0,
            in_function: false,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn current_text(&self) -> &'a str {
        self.current().map(|t| t.text).unwrap_or("")
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Kind of the n-th non-trivia token from the current position.
    fn nth(&self, n: usize) -> Option<TokenKind> {
        let mut idx = self.pos;
        let mut count = 0;
        while idx < self.tokens.len() {
            if !self.tokens[idx].kind.is_trivia() {
                if count == n {
                    return Some(self.tokens[idx].kind);
                }
                count += 1;
            }
            idx += 1;
        }
        None
    }

    fn current_offset(&self) -> TextSize {
        self.current()
            .map(|t| t.offset)
            .unwrap_or_else(|| TextSize::of(self.source))
    }

    fn prev_end_offset(&self) -> TextSize {
        self.tokens[..self.pos]
            .last()
            .map(|t| t.end_offset())
            .unwrap_or_else(|| TextSize::new(0))
    }

    fn position_at(&self, offset: TextSize) -> Position {
        let lc = self.line_index.line_col(offset);
        Position::new(lc.line as usize, lc.col as usize)
    }

    fn span_from(&self, start: TextSize) -> Span {
        Span::new(self.position_at(start), self.position_at(self.prev_end_offset()))
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        self.skip_trivia();
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            let expected = kind_to_name(kind);
            let found = self
                .current()
                .map(|t| kind_to_name(t.kind))
                .unwrap_or("end of file");
            self.error(format!("expected {}, found {}", expected, found));
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self.current().map(|t| t.kind.is_trivia()).unwrap_or(false) {
            self.bump();
        }
    }

    /// Expect an identifier (or contextual keyword) and return its text.
    fn expect_name(&mut self) -> Option<String> {
        self.skip_trivia();
        match self.current() {
            Some(t) if t.kind.is_name_token() => {
                let name = t.text.to_string();
                self.bump();
                Some(name)
            }
            _ => {
                let found = self
                    .current()
                    .map(|t| kind_to_name(t.kind))
                    .unwrap_or("end of file");
                self.error(format!("expected identifier, found {}", found));
                None
            }
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let pos = self.position_at(self.current_offset());
        self.errors.error(
            Category::Syntax,
            pos.line as u32,
            pos.column as u32,
            message,
        );
    }

    fn fatal(&mut self, message: impl Into<String>) {
        let pos = self.position_at(self.current_offset());
        self.errors.fatal(
            Category::Resource,
            pos.line as u32,
            pos.column as u32,
            message,
        );
    }

    /// Report and synchronize to the next statement boundary: past a `;`,
    /// up to (not past) a `}`, or past a line break at bracket depth 0.
    /// Always consumes at least one token to guarantee progress.
    fn error_recover(&mut self, message: impl Into<String>) {
        self.error(message);
        let mut depth = 0usize;
        let mut consumed = false;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBrace if depth == 0 => break,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Whitespace if depth == 0 && token.text.contains('\n') && consumed => {
                    self.bump();
                    return;
                }
                _ => {}
            }
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
    }

    // =========================================================================
    // Module level
    // =========================================================================

    fn parse_module(&mut self) -> Vec<AstNode> {
        let mut roots = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_eof() || self.errors.has_fatal() {
                break;
            }
            match self.parse_module_item() {
                Some(node) => roots.push(node),
                None => {
                    if self.at_eof() {
                        break;
                    }
                }
            }
        }
        roots
    }

    fn parse_module_item(&mut self) -> Option<AstNode> {
        self.skip_trivia();
        match self.current_kind()? {
            TokenKind::ImportKw => self.parse_import().map(AstNode::Import),
            TokenKind::StyleKw => self.parse_style_block().map(AstNode::StyleBlock),
            TokenKind::ConstKw | TokenKind::LetKw | TokenKind::VarKw => {
                self.parse_var_decl().map(AstNode::VarDecl)
            }
            TokenKind::FunctionKw => self.parse_function().map(AstNode::FunctionDecl),
            TokenKind::StructKw => self.parse_struct().map(AstNode::StructDecl),
            TokenKind::ComponentKw => self.parse_component_definition().map(AstNode::Component),
            TokenKind::StaticKw => self.parse_static_block().map(AstNode::StaticBlock),
            TokenKind::ReturnKw => self.parse_module_return().map(AstNode::ModuleReturn),
            TokenKind::At => self.parse_code_block().map(AstNode::CodeBlock),
            TokenKind::Ident => self.parse_component().map(AstNode::Component),
            _ => {
                let found = kind_to_name(self.current_kind()?);
                self.error_recover(format!("unexpected {} at module level", found));
                None
            }
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    fn parse_component(&mut self) -> Option<ComponentNode> {
        let start = self.current_offset();
        let name = self.expect_name()?;
        let arguments = if self.at_after_trivia(TokenKind::LParen) {
            Some(self.capture_paren_args()?)
        } else {
            None
        };
        let body = if self.at_after_trivia(TokenKind::LBrace) {
            self.parse_body()?
        } else {
            Vec::new()
        };
        Some(ComponentNode {
            name,
            arguments,
            is_component_definition: false,
            extends_parent: None,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_component_definition(&mut self) -> Option<ComponentNode> {
        let start = self.current_offset();
        self.expect(TokenKind::ComponentKw);
        let name = self.expect_name()?;
        let arguments = if self.at_after_trivia(TokenKind::LParen) {
            Some(self.capture_paren_args()?)
        } else {
            None
        };
        let extends_parent = if self.eat(TokenKind::ExtendsKw) {
            self.expect_name()
        } else {
            None
        };
        let body = self.parse_body()?;
        Some(ComponentNode {
            name,
            arguments,
            is_component_definition: true,
            extends_parent,
            body,
            span: self.span_from(start),
        })
    }

    fn at_after_trivia(&mut self, kind: TokenKind) -> bool {
        self.skip_trivia();
        self.at(kind)
    }

    /// Capture the raw text between balanced parentheses, leaving the
    /// arguments unparsed until lowering.
    fn capture_paren_args(&mut self) -> Option<String> {
        self.expect(TokenKind::LParen);
        let start = self.current_offset();
        let mut depth = 0usize;
        loop {
            let Some(token) = self.current() else {
                self.error("unterminated argument list");
                return None;
            };
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen if depth == 0 => {
                    let end = token.offset;
                    self.bump();
                    let text: &str = &self.source[usize::from(start)..usize::from(end)];
                    return Some(text.trim().to_string());
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }

    /// `{ body items }` shared by components, loops, branches, functions.
    fn parse_body(&mut self) -> Option<Vec<AstNode>> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.fatal("nesting too deep");
            self.depth -= 1;
            return None;
        }
        let result = self.parse_body_inner();
        self.depth -= 1;
        result
    }

    fn parse_body_inner(&mut self) -> Option<Vec<AstNode>> {
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.errors.has_fatal() {
                return Some(items);
            }
            if self.at(TokenKind::RBrace) {
                self.bump();
                return Some(items);
            }
            if self.at_eof() {
                self.error("expected '}', found end of file");
                return Some(items);
            }
            if let Some(item) = self.parse_body_item() {
                items.push(item);
            }
        }
    }

    fn parse_body_item(&mut self) -> Option<AstNode> {
        // Consume stray separators quietly
        if self.eat(TokenKind::Semicolon) || self.eat(TokenKind::Comma) {
            return None;
        }
        match self.current_kind()? {
            TokenKind::StateKw => self.parse_state_decl().map(AstNode::StateDecl),
            TokenKind::ConstKw | TokenKind::LetKw => self.parse_var_decl().map(AstNode::VarDecl),
            TokenKind::VarKw => {
                // `var` in a component body declares state; elsewhere a variable
                if self.in_function {
                    self.parse_var_decl().map(AstNode::VarDecl)
                } else {
                    self.parse_state_decl().map(AstNode::StateDecl)
                }
            }
            TokenKind::StaticKw => self.parse_static_block().map(AstNode::StaticBlock),
            TokenKind::ForKw => self.parse_for_loop().map(AstNode::ForLoop),
            TokenKind::IfKw => self.parse_if_else().map(AstNode::IfElse),
            TokenKind::At => self.parse_code_block().map(AstNode::CodeBlock),
            TokenKind::FunctionKw => self.parse_function().map(AstNode::FunctionDecl),
            TokenKind::StyleKw => self.parse_style_block().map(AstNode::StyleBlock),
            TokenKind::ReturnKw if self.in_function => self.parse_return().map(AstNode::Return),
            TokenKind::DeleteKw => self.parse_delete().map(AstNode::Delete),
            kind if kind.is_name_token() => {
                // identifier: property, assignment, or child component
                match self.nth(1) {
                    Some(TokenKind::Colon) => self.parse_property().map(AstNode::Property),
                    Some(TokenKind::Eq) if self.in_function => {
                        self.parse_assign().map(AstNode::Assign)
                    }
                    Some(TokenKind::LParen) | Some(TokenKind::LBrace) => {
                        self.parse_component().map(AstNode::Component)
                    }
                    _ => {
                        let text = self.current_text().to_string();
                        self.error_recover(format!(
                            "expected ':', '(' or '{{' after '{}'",
                            text
                        ));
                        None
                    }
                }
            }
            TokenKind::Error => {
                let text = self.current_text().to_string();
                let pos = self.position_at(self.current_offset());
                self.errors.error(
                    Category::Lexical,
                    pos.line as u32,
                    pos.column as u32,
                    format!("unrecognized token '{text}'"),
                );
                self.bump();
                None
            }
            kind => {
                self.error_recover(format!("unexpected {} in body", kind_to_name(kind)));
                None
            }
        }
    }

    // =========================================================================
    // Properties and values
    // =========================================================================

    fn parse_property(&mut self) -> Option<PropertyNode> {
        let start = self.current_offset();
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon);
        let value = self.parse_property_value()?;
        // Optional trailing separator
        self.eat(TokenKind::Semicolon);
        Some(PropertyNode {
            name,
            value,
            span: self.span_from(start),
        })
    }

    /// Scan the token range of one value: everything up to a `;`, a `}` at
    /// depth 0, or a line break at depth 0.
    fn scan_value_range(&mut self) -> (usize, usize) {
        self.skip_trivia();
        let start = self.pos;
        let mut depth = 0usize;
        let mut end = self.pos;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => break,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::Whitespace if depth == 0 && token.text.contains('\n') => break,
                _ => {}
            }
            self.bump();
            end = self.pos;
        }
        (start, end)
    }

    fn range_text(&self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        let from = self.tokens[start].offset;
        let to = self.tokens[end - 1].end_offset();
        self.source[usize::from(from)..usize::from(to)].trim().to_string()
    }

    fn parse_property_value(&mut self) -> Option<PropertyValue> {
        let (start, end) = self.scan_value_range();
        if start == end {
            self.error("expected a property value");
            return None;
        }
        let tokens: Vec<Token<'a>> = self.tokens[start..end]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .copied()
            .collect();
        let raw = self.range_text(start, end);

        // Single-token literals
        if tokens.len() == 1 {
            let t = tokens[0];
            let value = match t.kind {
                TokenKind::String => PropertyValue::Str(lexer::unescape_string(t.text)),
                TokenKind::Integer => match t.text.parse() {
                    Ok(v) => PropertyValue::Int(v),
                    Err(_) => PropertyValue::Expression(raw),
                },
                TokenKind::Float => match t.text.parse() {
                    Ok(v) => PropertyValue::Float(v),
                    Err(_) => PropertyValue::Expression(raw),
                },
                TokenKind::TrueKw => PropertyValue::Bool(true),
                TokenKind::FalseKw => PropertyValue::Bool(false),
                TokenKind::NullKw => PropertyValue::Null,
                TokenKind::HexColor => PropertyValue::Color(t.text.to_string()),
                _ => PropertyValue::Expression(raw),
            };
            return Some(value);
        }

        // Lambda: `(params) => body`
        if tokens.first().map(|t| t.kind) == Some(TokenKind::LParen) {
            if let Some(lambda) = lambda_from_tokens(&tokens, self.source) {
                return Some(PropertyValue::Lambda(lambda));
            }
        }

        // Literal array
        if tokens.first().map(|t| t.kind) == Some(TokenKind::LBracket) {
            if let Some(KryValue::Array(items)) = kry_value_from_tokens(&tokens) {
                return Some(PropertyValue::Array(
                    items.iter().map(property_value_from_kry).collect(),
                ));
            }
        }

        Some(PropertyValue::Expression(raw))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_state_decl(&mut self) -> Option<StateDeclNode> {
        let start = self.current_offset();
        // `state` or `var` both declare component state
        self.bump();
        let name = self.expect_name()?;
        let type_tag = if self.eat(TokenKind::Colon) {
            self.expect_name()
        } else {
            None
        };
        self.expect(TokenKind::Eq);
        let (vstart, vend) = self.scan_value_range();
        let initial = self.range_text(vstart, vend);
        self.eat(TokenKind::Semicolon);
        Some(StateDeclNode {
            name,
            type_tag,
            initial,
            span: self.span_from(start),
        })
    }

    fn parse_var_decl(&mut self) -> Option<VarDeclNode> {
        let start = self.current_offset();
        let kind = match self.current_kind()? {
            TokenKind::ConstKw => VarKind::Const,
            TokenKind::LetKw => VarKind::Let,
            _ => VarKind::Var,
        };
        self.bump();
        let name = self.expect_name()?;
        let type_tag = if self.eat(TokenKind::Colon) {
            self.expect_name()
        } else {
            None
        };
        self.expect(TokenKind::Eq);
        let (vstart, vend) = self.scan_value_range();
        let value_text = self.range_text(vstart, vend);
        let value_tokens: Vec<Token<'a>> = self.tokens[vstart..vend]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .copied()
            .collect();
        let value = kry_value_from_tokens(&value_tokens);
        self.eat(TokenKind::Semicolon);
        Some(VarDeclNode {
            kind,
            name,
            type_tag,
            value_text,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_static_block(&mut self) -> Option<StaticBlockNode> {
        let start = self.current_offset();
        self.expect(TokenKind::StaticKw);
        let body = self.parse_body()?;
        Some(StaticBlockNode {
            body,
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    fn parse_for_loop(&mut self) -> Option<ForLoopNode> {
        let start = self.current_offset();
        self.expect(TokenKind::ForKw);
        let is_each = self.eat(TokenKind::EachKw);
        let item = self.expect_name()?;
        let index = if self.eat(TokenKind::Comma) {
            self.expect_name()
        } else {
            None
        };
        self.expect(TokenKind::InKw);

        // The iterable runs up to the opening brace
        self.skip_trivia();
        let iter_start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::LBrace if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let iterable_text = self.range_text(iter_start, self.pos);
        let iter_tokens: Vec<Token<'a>> = self.tokens[iter_start..self.pos]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .copied()
            .collect();
        let iterable = kry_value_from_tokens(&iter_tokens);

        let body = self.parse_body()?;
        Some(ForLoopNode {
            item,
            index,
            iterable_text,
            iterable,
            is_each,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_if_else(&mut self) -> Option<IfElseNode> {
        let start = self.current_offset();
        self.expect(TokenKind::IfKw);

        // Condition runs up to the opening brace
        self.skip_trivia();
        let cond_start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::LBrace if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let cond = self.range_text(cond_start, self.pos);
        if cond.is_empty() {
            self.error("expected a condition after 'if'");
        }

        let then_body = self.parse_body()?;
        let else_body = if self.eat(TokenKind::ElseKw) {
            self.skip_trivia();
            if self.at(TokenKind::IfKw) {
                // else-if chains nest in the else branch
                vec![AstNode::IfElse(self.parse_if_else()?)]
            } else {
                self.parse_body()?
            }
        } else {
            Vec::new()
        };
        Some(IfElseNode {
            cond,
            then_body,
            else_body,
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // Embedded code, functions, structs
    // =========================================================================

    fn parse_code_block(&mut self) -> Option<CodeBlockNode> {
        let start = self.current_offset();
        self.expect(TokenKind::At);
        let language = self.expect_name()?;
        if !matches!(language.as_str(), "lua" | "js" | "universal") {
            self.error(format!("unknown code block language '@{language}'"));
        }
        self.skip_trivia();
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        // Raw capture to the matching brace. String tokens keep embedded
        // braces from miscounting.
        let body_start = self.current_offset();
        let mut depth = 0usize;
        let body_end;
        loop {
            let Some(token) = self.current() else {
                self.error("unterminated code block");
                return None;
            };
            match token.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth == 0 {
                        body_end = token.offset;
                        self.bump();
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.bump();
        }
        let source = self.source[usize::from(body_start)..usize::from(body_end)]
            .trim()
            .to_string();
        Some(CodeBlockNode {
            language,
            source,
            span: self.span_from(start),
        })
    }

    fn parse_function(&mut self) -> Option<FunctionDeclNode> {
        let start = self.current_offset();
        self.expect(TokenKind::FunctionKw);
        let name = self.expect_name()?;
        self.expect(TokenKind::LParen);
        let mut params = Vec::new();
        loop {
            self.skip_trivia();
            if self.at(TokenKind::RParen) {
                self.bump();
                break;
            }
            if self.at_eof() {
                self.error("unterminated parameter list");
                return None;
            }
            let name = self.expect_name()?;
            let type_tag = if self.eat(TokenKind::Colon) {
                self.expect_name()
            } else {
                None
            };
            params.push(ParamNode { name, type_tag });
            self.eat(TokenKind::Comma);
        }
        let return_type = if self.eat(TokenKind::Arrow) {
            self.expect_name()
        } else {
            None
        };
        let was_in_function = self.in_function;
        self.in_function = true;
        let body = self.parse_body();
        self.in_function = was_in_function;
        Some(FunctionDeclNode {
            name,
            params,
            return_type,
            body: body?,
            span: self.span_from(start),
        })
    }

    fn parse_struct(&mut self) -> Option<StructDeclNode> {
        let start = self.current_offset();
        self.expect(TokenKind::StructKw);
        let name = self.expect_name()?;
        self.expect(TokenKind::LBrace);
        let mut fields = Vec::new();
        loop {
            self.skip_trivia();
            if self.at(TokenKind::RBrace) {
                self.bump();
                break;
            }
            if self.at_eof() {
                self.error("unterminated struct declaration");
                break;
            }
            let field_name = match self.expect_name() {
                Some(n) => n,
                None => {
                    self.error_recover("expected a field name");
                    continue;
                }
            };
            self.expect(TokenKind::Colon);
            let type_tag = self.expect_name();
            fields.push(ParamNode {
                name: field_name,
                type_tag,
            });
            self.eat(TokenKind::Comma);
            self.eat(TokenKind::Semicolon);
        }
        Some(StructDeclNode {
            name,
            fields,
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // Statements inside functions
    // =========================================================================

    fn parse_return(&mut self) -> Option<ReturnNode> {
        let start = self.current_offset();
        self.expect(TokenKind::ReturnKw);
        let (vstart, vend) = self.scan_value_range();
        let value = if vstart == vend {
            None
        } else {
            Some(self.range_text(vstart, vend))
        };
        self.eat(TokenKind::Semicolon);
        Some(ReturnNode {
            value,
            span: self.span_from(start),
        })
    }

    fn parse_assign(&mut self) -> Option<AssignNode> {
        let start = self.current_offset();
        let target = self.expect_name()?;
        self.expect(TokenKind::Eq);
        let (vstart, vend) = self.scan_value_range();
        let value = self.range_text(vstart, vend);
        self.eat(TokenKind::Semicolon);
        Some(AssignNode {
            target,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_delete(&mut self) -> Option<DeleteNode> {
        let start = self.current_offset();
        self.expect(TokenKind::DeleteKw);
        let (vstart, vend) = self.scan_value_range();
        let target = self.range_text(vstart, vend);
        self.eat(TokenKind::Semicolon);
        Some(DeleteNode {
            target,
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // Modules: imports, exports, style blocks
    // =========================================================================

    fn parse_import(&mut self) -> Option<ImportNode> {
        let start = self.current_offset();
        self.expect(TokenKind::ImportKw);
        let local_name = self.expect_name()?;
        self.expect(TokenKind::FromKw);
        // dotted.path segments
        let mut path = self.expect_name()?;
        while self.eat(TokenKind::Dot) {
            match self.expect_name() {
                Some(seg) => {
                    path.push('.');
                    path.push_str(&seg);
                }
                None => break,
            }
        }
        self.eat(TokenKind::Semicolon);
        Some(ImportNode {
            local_name,
            module_path: path,
            span: self.span_from(start),
        })
    }

    /// Module-level `return { a, b: expr }`: the export list.
    fn parse_module_return(&mut self) -> Option<ModuleReturnNode> {
        let start = self.current_offset();
        self.expect(TokenKind::ReturnKw);
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        let mut exports = Vec::new();
        loop {
            self.skip_trivia();
            if self.at(TokenKind::RBrace) {
                self.bump();
                break;
            }
            if self.at_eof() {
                self.error("unterminated module return");
                break;
            }
            let name = match self.expect_name() {
                Some(n) => n,
                None => {
                    self.error_recover("expected an export name");
                    continue;
                }
            };
            let value = if self.eat(TokenKind::Colon) {
                let (vstart, vend) = self.scan_value_range();
                self.range_text(vstart, vend)
            } else {
                name.clone()
            };
            exports.push((name, value));
            self.eat(TokenKind::Comma);
        }
        Some(ModuleReturnNode {
            exports,
            span: self.span_from(start),
        })
    }

    fn parse_style_block(&mut self) -> Option<StyleBlockNode> {
        let start = self.current_offset();
        self.expect(TokenKind::StyleKw);
        // Selector: raw text up to the opening brace (quoted or bare)
        self.skip_trivia();
        let selector = if self.at(TokenKind::String) {
            let text = lexer::unescape_string(self.current_text());
            self.bump();
            text
        } else {
            let sel_start = self.pos;
            while let Some(token) = self.current() {
                if token.kind == TokenKind::LBrace {
                    break;
                }
                self.bump();
            }
            self.range_text(sel_start, self.pos)
        };
        if selector.is_empty() {
            self.error("expected a selector after 'style'");
        }
        self.expect(TokenKind::LBrace);
        let mut properties = Vec::new();
        loop {
            self.skip_trivia();
            if self.at(TokenKind::RBrace) {
                self.bump();
                break;
            }
            if self.at_eof() {
                self.error("unterminated style block");
                break;
            }
            if self.eat(TokenKind::Semicolon) || self.eat(TokenKind::Comma) {
                continue;
            }
            match self.parse_property() {
                Some(p) => properties.push(p),
                None => self.error_recover("expected 'name: value' in style block"),
            }
        }
        Some(StyleBlockNode {
            selector,
            properties,
            span: self.span_from(start),
        })
    }
}

// =============================================================================
// Literal value parsing (shared with var decls and loop iterables)
// =============================================================================

/// Parse a literal value from a trivia-free token slice. Returns `None`
/// when the tokens are anything but a self-contained literal (then the raw
/// text is kept as an expression instead).
pub(crate) fn kry_value_from_tokens(tokens: &[Token<'_>]) -> Option<KryValue> {
    let mut cursor = 0usize;
    let value = parse_value_at(tokens, &mut cursor)?;
    if cursor == tokens.len() {
        Some(value)
    } else if cursor + 2 == tokens.len() && tokens[cursor].kind == TokenKind::DotDot {
        // `a..b` range with literal bounds
        let KryValue::Int(lo) = value else { return None };
        let mut end_cursor = cursor + 1;
        let KryValue::Int(hi) = parse_value_at(tokens, &mut end_cursor)? else {
            return None;
        };
        Some(KryValue::Range(lo, hi))
    } else {
        None
    }
}

fn parse_value_at(tokens: &[Token<'_>], cursor: &mut usize) -> Option<KryValue> {
    let token = tokens.get(*cursor)?;
    match token.kind {
        TokenKind::Integer => {
            *cursor += 1;
            token.text.parse().ok().map(KryValue::Int)
        }
        TokenKind::Float => {
            *cursor += 1;
            token.text.parse().ok().map(KryValue::Float)
        }
        TokenKind::Minus => {
            *cursor += 1;
            match parse_value_at(tokens, cursor)? {
                KryValue::Int(i) => Some(KryValue::Int(-i)),
                KryValue::Float(f) => Some(KryValue::Float(-f)),
                _ => None,
            }
        }
        TokenKind::String => {
            *cursor += 1;
            Some(KryValue::String(lexer::unescape_string(token.text)))
        }
        TokenKind::TrueKw => {
            *cursor += 1;
            Some(KryValue::Bool(true))
        }
        TokenKind::FalseKw => {
            *cursor += 1;
            Some(KryValue::Bool(false))
        }
        TokenKind::NullKw => {
            *cursor += 1;
            Some(KryValue::Null)
        }
        TokenKind::LBracket => {
            *cursor += 1;
            let mut items = Vec::new();
            loop {
                if tokens.get(*cursor)?.kind == TokenKind::RBracket {
                    *cursor += 1;
                    return Some(KryValue::Array(items));
                }
                items.push(parse_value_at(tokens, cursor)?);
                if tokens.get(*cursor)?.kind == TokenKind::Comma {
                    *cursor += 1;
                }
            }
        }
        TokenKind::LBrace => {
            *cursor += 1;
            let mut fields = indexmap::IndexMap::new();
            loop {
                let token = tokens.get(*cursor)?;
                if token.kind == TokenKind::RBrace {
                    *cursor += 1;
                    return Some(KryValue::Object(fields));
                }
                if !token.kind.is_name_token() && token.kind != TokenKind::String {
                    return None;
                }
                let key = if token.kind == TokenKind::String {
                    lexer::unescape_string(token.text)
                } else {
                    token.text.to_string()
                };
                *cursor += 1;
                if tokens.get(*cursor)?.kind != TokenKind::Colon {
                    return None;
                }
                *cursor += 1;
                let value = parse_value_at(tokens, cursor)?;
                fields.insert(key, value);
                if tokens.get(*cursor).map(|t| t.kind) == Some(TokenKind::Comma) {
                    *cursor += 1;
                }
            }
        }
        _ => None,
    }
}

fn property_value_from_kry(value: &KryValue) -> PropertyValue {
    match value {
        KryValue::Int(i) => PropertyValue::Int(*i),
        KryValue::Float(f) => PropertyValue::Float(*f),
        KryValue::Bool(b) => PropertyValue::Bool(*b),
        KryValue::String(s) => PropertyValue::Str(s.clone()),
        KryValue::Null => PropertyValue::Null,
        other => PropertyValue::Expression(other.to_display_string()),
    }
}

/// Recognize `(params) => { body }` / `(params) => expr` token shapes.
fn lambda_from_tokens(tokens: &[Token<'_>], source: &str) -> Option<LambdaValue> {
    let mut cursor = 0usize;
    if tokens.get(cursor)?.kind != TokenKind::LParen {
        return None;
    }
    cursor += 1;
    let mut params = Vec::new();
    loop {
        let token = tokens.get(cursor)?;
        match token.kind {
            TokenKind::RParen => {
                cursor += 1;
                break;
            }
            TokenKind::Comma => cursor += 1,
            kind if kind.is_name_token() => {
                params.push(token.text.to_string());
                cursor += 1;
            }
            _ => return None,
        }
    }
    if tokens.get(cursor)?.kind != TokenKind::FatArrow {
        return None;
    }
    cursor += 1;
    let body_tokens = &tokens[cursor..];
    let first = body_tokens.first()?;
    let body = if first.kind == TokenKind::LBrace {
        let last = body_tokens.last()?;
        if last.kind != TokenKind::RBrace {
            return None;
        }
        let from = usize::from(first.end_offset());
        let to = usize::from(last.offset);
        source[from..to].trim().to_string()
    } else {
        let last = body_tokens.last()?;
        let from = usize::from(first.offset);
        let to = usize::from(last.end_offset());
        source[from..to].trim().to_string()
    };
    Some(LambdaValue { params, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert!(result.ok());
        assert!(result.ast.roots.is_empty());
    }

    #[test]
    fn test_parse_simple_component() {
        let result = parse("App {\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        assert_eq!(root.name, "App");
        assert!(root.body.is_empty());
    }

    #[test]
    fn test_parse_component_with_properties() {
        let result = parse("Button {\n  text: \"Go\"\n  width: 100px\n  disabled: false\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let props: Vec<_> = root.properties().collect();
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].name, "text");
        assert_eq!(props[0].value, PropertyValue::Str("Go".to_string()));
        assert_eq!(props[1].value, PropertyValue::Expression("100px".to_string()));
        assert_eq!(props[2].value, PropertyValue::Bool(false));
    }

    #[test]
    fn test_parse_nested_components() {
        let result = parse("App {\n  Row {\n    Text { text: \"a\" }\n    Text { text: \"b\" }\n  }\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        assert_eq!(root.body.len(), 1);
        let AstNode::Component(row) = &root.body[0] else {
            panic!("expected child component");
        };
        assert_eq!(row.name, "Row");
        assert_eq!(row.body.len(), 2);
    }

    #[test]
    fn test_parse_state_declaration() {
        let result = parse("Counter {\n  state value: int = 5\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let AstNode::StateDecl(state) = &root.body[0] else {
            panic!("expected state decl");
        };
        assert_eq!(state.name, "value");
        assert_eq!(state.type_tag.as_deref(), Some("int"));
        assert_eq!(state.initial, "5");
    }

    #[test]
    fn test_parse_component_definition() {
        let result = parse("component Card(title) extends Container {\n  Text { text: title }\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let def = result.ast.first_definition().unwrap();
        assert_eq!(def.name, "Card");
        assert_eq!(def.arguments.as_deref(), Some("title"));
        assert_eq!(def.extends_parent.as_deref(), Some("Container"));
    }

    #[test]
    fn test_parse_instantiation_arguments_raw() {
        let result = parse("App {\n  Counter(initialValue = 10)\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let AstNode::Component(counter) = &root.body[0] else {
            panic!("expected child");
        };
        assert_eq!(counter.arguments.as_deref(), Some("initialValue = 10"));
    }

    #[test]
    fn test_parse_static_for_loop() {
        let source = "static {\n  const items = [1, 2, 3]\n  for x in items {\n    Text { text: x }\n  }\n}";
        let result = parse(source);
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::StaticBlock(block) = &result.ast.roots[0] else {
            panic!("expected static block");
        };
        let AstNode::VarDecl(decl) = &block.body[0] else {
            panic!("expected var decl");
        };
        assert_eq!(
            decl.value,
            Some(KryValue::Array(vec![
                KryValue::Int(1),
                KryValue::Int(2),
                KryValue::Int(3)
            ]))
        );
        let AstNode::ForLoop(lp) = &block.body[1] else {
            panic!("expected for loop");
        };
        assert_eq!(lp.item, "x");
        assert_eq!(lp.iterable_text, "items");
        assert!(lp.iterable.is_none());
        assert!(!lp.is_each);
    }

    #[test]
    fn test_parse_for_each() {
        let result = parse("App {\n  for each item in userList {\n    Text { text: item.name }\n  }\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let AstNode::ForLoop(lp) = &root.body[0] else {
            panic!("expected for loop");
        };
        assert!(lp.is_each);
        assert_eq!(lp.iterable_text, "userList");
    }

    #[test]
    fn test_parse_range_loop() {
        let result = parse("App {\n  for i in 0..3 {\n    Text { text: i }\n  }\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let AstNode::ForLoop(lp) = &root.body[0] else {
            panic!("expected for loop");
        };
        assert_eq!(lp.iterable, Some(KryValue::Range(0, 3)));
    }

    #[test]
    fn test_parse_if_else() {
        let result = parse(
            "App {\n  if showDetails {\n    Text { text: \"on\" }\n  } else {\n    Text { text: \"off\" }\n  }\n}",
        );
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let AstNode::IfElse(branch) = &root.body[0] else {
            panic!("expected if/else");
        };
        assert_eq!(branch.cond, "showDetails");
        assert_eq!(branch.then_body.len(), 1);
        assert_eq!(branch.else_body.len(), 1);
    }

    #[test]
    fn test_parse_lambda_event() {
        let result = parse("Button {\n  onClick: () => { count = count + 1 }\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let root = result.ast.root_component().unwrap();
        let props: Vec<_> = root.properties().collect();
        let PropertyValue::Lambda(lambda) = &props[0].value else {
            panic!("expected lambda, got {:?}", props[0].value);
        };
        assert!(lambda.params.is_empty());
        assert_eq!(lambda.body, "count = count + 1");
    }

    #[test]
    fn test_parse_code_block() {
        let result = parse("@lua {\n  function helper()\n    return 1\n  end\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::CodeBlock(block) = &result.ast.roots[0] else {
            panic!("expected code block");
        };
        assert_eq!(block.language, "lua");
        assert!(block.source.contains("function helper()"));
    }

    #[test]
    fn test_parse_function_decl() {
        let source = "function add(a: int, b: int) -> int {\n  return a + b\n}";
        let result = parse(source);
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::FunctionDecl(func) = &result.ast.roots[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.return_type.as_deref(), Some("int"));
        let AstNode::Return(ret) = &func.body[0] else {
            panic!("expected return");
        };
        assert_eq!(ret.value.as_deref(), Some("a + b"));
    }

    #[test]
    fn test_parse_import() {
        let result = parse("import Card from ui.widgets.card\nApp {}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::Import(import) = &result.ast.roots[0] else {
            panic!("expected import");
        };
        assert_eq!(import.local_name, "Card");
        assert_eq!(import.module_path, "ui.widgets.card");
    }

    #[test]
    fn test_parse_style_block() {
        let result = parse("style panel {\n  background: #333333\n  gap: 8\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::StyleBlock(style) = &result.ast.roots[0] else {
            panic!("expected style block");
        };
        assert_eq!(style.selector, "panel");
        assert_eq!(style.properties.len(), 2);
        assert_eq!(
            style.properties[0].value,
            PropertyValue::Color("#333333".to_string())
        );
    }

    #[test]
    fn test_parse_module_return() {
        let result = parse("const PI = 3.14\nreturn { PI, double: doubleIt }");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::ModuleReturn(ret) = &result.ast.roots[1] else {
            panic!("expected module return");
        };
        assert_eq!(ret.exports.len(), 2);
        assert_eq!(ret.exports[0], ("PI".to_string(), "PI".to_string()));
        assert_eq!(ret.exports[1], ("double".to_string(), "doubleIt".to_string()));
    }

    #[test]
    fn test_parse_struct() {
        let result = parse("struct Habit {\n  name: string,\n  streak: int\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        let AstNode::StructDecl(decl) = &result.ast.roots[0] else {
            panic!("expected struct");
        };
        assert_eq!(decl.name, "Habit");
        assert_eq!(decl.fields.len(), 2);
    }

    #[test]
    fn test_error_recovery_continues() {
        // The bad property line must not prevent the next property from parsing
        let result = parse("App {\n  ???\n  text: \"ok\"\n}");
        assert!(!result.ok());
        let root = result.ast.root_component().unwrap();
        assert!(root.properties().any(|p| p.name == "text"));
    }

    #[test]
    fn test_unrecognized_token_is_lexical_error() {
        let result = parse("App {\n  $\n  text: \"ok\"\n}");
        assert!(!result.ok());
        let error = result.errors.iter().next().unwrap();
        assert_eq!(error.category, Category::Lexical);
        assert!(error.message.contains('$'));
        // Recovery keeps the rest of the body alive
        let root = result.ast.root_component().unwrap();
        assert!(root.properties().any(|p| p.name == "text"));
    }

    #[test]
    fn test_errors_have_locations() {
        let result = parse("App {\n  width 100\n}");
        assert!(!result.ok());
        let error = result.errors.iter().next().unwrap();
        assert_eq!(error.line, 1);
    }

    #[test]
    fn test_root_component_last_after_module_items() {
        let result = parse("const W = 800\nApp {\n  width: W\n}");
        assert!(result.ok(), "errors: {}", result.errors.format_report());
        assert_eq!(result.ast.roots.len(), 2);
        assert_eq!(result.ast.root_component().unwrap().name, "App");
    }

    #[test]
    fn test_spans_are_recorded() {
        let result = parse("App {\n  text: \"x\"\n}");
        let root = result.ast.root_component().unwrap();
        assert_eq!(root.span.start.line, 0);
        assert_eq!(root.span.end.line, 2);
        let prop = root.properties().next().unwrap();
        assert_eq!(prop.span.start.line, 1);
    }
}
