//! Logos-based lexer for `.kry`
//!
//! Fast tokenization using the logos crate. Trivia (whitespace, comments)
//! are real tokens; the parser skips them explicitly so raw source slices
//! (argument strings, embedded code blocks) stay reconstructible.

use logos::Logos;
use text_size::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    /// Byte offset one past the token's last byte.
    pub fn end_offset(&self) -> TextSize {
        self.offset + TextSize::of(self.text)
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => TokenKind::Error,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Token classification used by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Trivia
    Whitespace,
    LineComment,
    BlockComment,

    // Literals
    Ident,
    Integer,
    Float,
    String,
    HexColor,

    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semicolon,
    Colon,
    Comma,
    Dot,
    DotDot,
    Question,
    At,
    Eq,
    EqEq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AmpAmp,
    PipePipe,
    Arrow,
    FatArrow,

    // Keywords
    StateKw,
    VarKw,
    LetKw,
    ConstKw,
    StaticKw,
    ForKw,
    EachKw,
    InKw,
    IfKw,
    ElseKw,
    FunctionKw,
    ReturnKw,
    StructKw,
    StyleKw,
    ImportKw,
    FromKw,
    ComponentKw,
    ExtendsKw,
    DeleteKw,
    TrueKw,
    FalseKw,
    NullKw,

    Error,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Keywords double as identifiers in name position (`state`, `style`
    /// make fine property names in other languages' sources).
    pub fn is_name_token(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::EachKw
                | TokenKind::FromKw
                | TokenKind::StyleKw
                | TokenKind::ComponentKw
        )
    }
}

/// Logos token enum - maps to TokenKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"")] // Don't skip anything, we want all tokens
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]*\.[0-9]+")]
    Float,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    String,

    // #RGB, #RGBA, #RRGGBB, #RRGGBBAA
    #[regex(r"#[0-9a-fA-F]+")]
    HexColor,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("..")]
    DotDot,

    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("->")]
    Arrow,

    #[token("=>")]
    FatArrow,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("state")]
    StateKw,
    #[token("var")]
    VarKw,
    #[token("let")]
    LetKw,
    #[token("const")]
    ConstKw,
    #[token("static")]
    StaticKw,
    #[token("for")]
    ForKw,
    #[token("each")]
    EachKw,
    #[token("in")]
    InKw,
    #[token("if")]
    IfKw,
    #[token("else")]
    ElseKw,
    #[token("function")]
    FunctionKw,
    #[token("return")]
    ReturnKw,
    #[token("struct")]
    StructKw,
    #[token("style")]
    StyleKw,
    #[token("import")]
    ImportKw,
    #[token("from")]
    FromKw,
    #[token("component")]
    ComponentKw,
    #[token("extends")]
    ExtendsKw,
    #[token("delete")]
    DeleteKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,
    #[token("null")]
    NullKw,
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            // Trivia
            Whitespace => TokenKind::Whitespace,
            LineComment => TokenKind::LineComment,
            BlockComment => TokenKind::BlockComment,

            // Literals
            Ident => TokenKind::Ident,
            Integer => TokenKind::Integer,
            Float => TokenKind::Float,
            String => TokenKind::String,
            HexColor => TokenKind::HexColor,

            // Multi-char punctuation
            DotDot => TokenKind::DotDot,
            EqEq => TokenKind::EqEq,
            BangEq => TokenKind::BangEq,
            LtEq => TokenKind::LtEq,
            GtEq => TokenKind::GtEq,
            AmpAmp => TokenKind::AmpAmp,
            PipePipe => TokenKind::PipePipe,
            Arrow => TokenKind::Arrow,
            FatArrow => TokenKind::FatArrow,

            // Single-char punctuation
            LBrace => TokenKind::LBrace,
            RBrace => TokenKind::RBrace,
            LBracket => TokenKind::LBracket,
            RBracket => TokenKind::RBracket,
            LParen => TokenKind::LParen,
            RParen => TokenKind::RParen,
            Semicolon => TokenKind::Semicolon,
            Colon => TokenKind::Colon,
            Comma => TokenKind::Comma,
            Dot => TokenKind::Dot,
            Question => TokenKind::Question,
            At => TokenKind::At,
            Eq => TokenKind::Eq,
            Lt => TokenKind::Lt,
            Gt => TokenKind::Gt,
            Plus => TokenKind::Plus,
            Minus => TokenKind::Minus,
            Star => TokenKind::Star,
            Slash => TokenKind::Slash,
            Percent => TokenKind::Percent,
            Bang => TokenKind::Bang,

            // Keywords
            StateKw => TokenKind::StateKw,
            VarKw => TokenKind::VarKw,
            LetKw => TokenKind::LetKw,
            ConstKw => TokenKind::ConstKw,
            StaticKw => TokenKind::StaticKw,
            ForKw => TokenKind::ForKw,
            EachKw => TokenKind::EachKw,
            InKw => TokenKind::InKw,
            IfKw => TokenKind::IfKw,
            ElseKw => TokenKind::ElseKw,
            FunctionKw => TokenKind::FunctionKw,
            ReturnKw => TokenKind::ReturnKw,
            StructKw => TokenKind::StructKw,
            StyleKw => TokenKind::StyleKw,
            ImportKw => TokenKind::ImportKw,
            FromKw => TokenKind::FromKw,
            ComponentKw => TokenKind::ComponentKw,
            ExtendsKw => TokenKind::ExtendsKw,
            DeleteKw => TokenKind::DeleteKw,
            TrueKw => TokenKind::TrueKw,
            FalseKw => TokenKind::FalseKw,
            NullKw => TokenKind::NullKw,
        }
    }
}

/// Unescape a quoted string literal (`\n \t \r \\ \" \'`).
pub fn unescape_string(raw: &str) -> String {
    let inner = if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { raw };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                // Unknown escape: keep it verbatim
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_component_header() {
        let tokens: Vec<_> = Lexer::new("Button {").collect();
        assert_eq!(tokens.len(), 3); // Button, whitespace, {
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
        assert_eq!(tokens[2].kind, TokenKind::LBrace);
    }

    #[test]
    fn test_lex_state_decl() {
        let kinds: Vec<_> = Lexer::new("state count: int = 0")
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StateKw,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Integer,
            ]
        );
    }

    #[test]
    fn test_lex_hex_color() {
        let tokens: Vec<_> = Lexer::new("#FF8040").collect();
        assert_eq!(tokens[0].kind, TokenKind::HexColor);
        assert_eq!(tokens[0].text, "#FF8040");
    }

    #[test]
    fn test_lex_range() {
        let kinds: Vec<_> = Lexer::new("0..10")
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Integer, TokenKind::DotDot, TokenKind::Integer]
        );
    }

    #[test]
    fn test_lex_float_vs_member() {
        let kinds: Vec<_> = Lexer::new("item.name").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident]
        );
        let kinds: Vec<_> = Lexer::new("1.5").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Float]);
    }

    #[test]
    fn test_lex_code_block_marker() {
        let kinds: Vec<_> = Lexer::new("@lua {")
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds, vec![TokenKind::At, TokenKind::Ident, TokenKind::LBrace]);
    }

    #[test]
    fn test_lex_lambda_arrow() {
        let kinds: Vec<_> = Lexer::new("() => {}")
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::FatArrow,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_token_offsets() {
        let tokens = tokenize("ab cd");
        assert_eq!(tokens[0].offset, TextSize::new(0));
        assert_eq!(tokens[0].end_offset(), TextSize::new(2));
        assert_eq!(tokens[2].offset, TextSize::new(3));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_string("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_string("\"say \\\"hi\\\"\""), "say \"hi\"");
        assert_eq!(unescape_string("'it\\'s'"), "it's");
        assert_eq!(unescape_string("\"tab\\there\""), "tab\there");
    }
}
