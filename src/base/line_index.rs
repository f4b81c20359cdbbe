//! Byte-offset to line/column conversion.
//!
//! The lexer works in byte offsets ([`TextSize`]); diagnostics and AST
//! spans carry line/column pairs. A `LineIndex` is built once per source
//! text and answers lookups with a binary search over line starts.

use text_size::TextSize;

/// A 0-indexed line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Precomputed line-start table for a source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line. Always contains 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a line/column pair.
    ///
    /// Offsets past the end of the text clamp to the last line.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset: u32 = offset.into();
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        LineCol {
            line: line as u32,
            col: offset - self.line_starts[line],
        }
    }

    /// Number of lines in the indexed text.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("hello");
        assert_eq!(index.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::new(3)), LineCol { line: 0, col: 3 });
    }

    #[test]
    fn test_multi_line() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::new(3)), LineCol { line: 1, col: 0 });
        assert_eq!(index.line_col(TextSize::new(4)), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(TextSize::new(6)), LineCol { line: 2, col: 0 });
    }

    #[test]
    fn test_offset_at_newline() {
        let index = LineIndex::new("a\nb");
        // The newline itself belongs to the line it terminates
        assert_eq!(index.line_col(TextSize::new(1)), LineCol { line: 0, col: 1 });
    }

    #[test]
    fn test_line_count() {
        assert_eq!(LineIndex::new("").line_count(), 1);
        assert_eq!(LineIndex::new("a\nb\nc").line_count(), 3);
    }
}
