//! Diagnostic accumulation.
//!
//! The parser and the lowerer both append to an ordered [`ErrorList`] so a
//! single invocation surfaces as many problems as possible. Only a fatal
//! error stops work; a compile with non-fatal errors still returns a
//! best-effort KIR.

use std::fmt;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
    /// Stops the current stage immediately.
    Fatal,
}

impl Severity {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

/// What stage/kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Io,
    Lexical,
    Syntax,
    Validation,
    Conversion,
    Resource,
    Runtime,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Validation => "validation",
            Self::Conversion => "conversion",
            Self::Resource => "resource",
            Self::Runtime => "runtime",
        }
    }
}

/// A single diagnostic with location and optional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub severity: Severity,
    pub category: Category,
    /// 0-indexed line.
    pub line: u32,
    /// 0-indexed column.
    pub column: u32,
    pub message: String,
    /// Optional source context (the construct being parsed).
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(
        severity: Severity,
        category: Category,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            line,
            column,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Human-facing lines and columns are 1-indexed
        write!(
            f,
            "{} at line {}:{}: {}",
            self.severity.as_str(),
            self.line + 1,
            self.column + 1,
            self.message
        )?;
        if let Some(context) = &self.context {
            write!(f, " (in {context})")?;
        }
        Ok(())
    }
}

/// Ordered accumulator of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<ParseError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn info(&mut self, category: Category, line: u32, column: u32, message: impl Into<String>) {
        self.push(ParseError::new(Severity::Info, category, line, column, message));
    }

    pub fn warning(
        &mut self,
        category: Category,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) {
        self.push(ParseError::new(
            Severity::Warning,
            category,
            line,
            column,
            message,
        ));
    }

    pub fn error(&mut self, category: Category, line: u32, column: u32, message: impl Into<String>) {
        self.push(ParseError::new(Severity::Error, category, line, column, message));
    }

    pub fn fatal(&mut self, category: Category, line: u32, column: u32, message: impl Into<String>) {
        self.push(ParseError::new(Severity::Fatal, category, line, column, message));
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity >= Severity::Error)
    }

    pub fn has_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.severity.is_fatal())
    }

    /// The multi-line report: `<severity> at line <L>:<C>: <message>`.
    pub fn format_report(&self) -> String {
        self.errors
            .iter()
            .map(ParseError::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl IntoIterator for ErrorList {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
