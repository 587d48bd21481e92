//! Line splitter feeding the block classifier.
//!
//! Lines borrow from the input and carry their 1-based line number so
//! diagnostics can point back at the source. Newline scanning uses `memchr`.

use memchr::memchr;

/// A single source line without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text (no trailing `\n` or `\r\n`).
    pub text: &'a str,
    /// 1-based line number.
    pub number: usize,
}

impl<'a> Line<'a> {
    /// Check if this line contains only whitespace.
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        self.text.bytes().all(|b| b == b' ' || b == b'\t')
    }

    /// Get the line text with leading/trailing whitespace removed.
    #[inline(always)]
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    /// Width of the leading indentation, tabs counted as four columns.
    pub fn indent(&self) -> usize {
        self.text
            .bytes()
            .take_while(|&b| b == b' ' || b == b'\t')
            .map(|b| if b == b'\t' { 4 } else { 1 })
            .sum()
    }
}

/// Iterator over the lines of an input.
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    number: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            number: 0,
        }
    }

    /// Check if all input has been consumed.
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.is_eof() {
            return None;
        }

        let bytes = self.input.as_bytes();
        let start = self.offset;
        let end = match memchr(b'\n', &bytes[start..]) {
            Some(pos) => start + pos,
            None => bytes.len(),
        };

        // CRLF: drop the carriage return as well
        let text_end = if end > start && bytes[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };

        self.offset = if end < bytes.len() { end + 1 } else { end };
        self.number += 1;

        // `\n` and `\r` are ASCII, so both offsets sit on char boundaries.
        Some(Line {
            text: &self.input[start..text_end],
            number: self.number,
        })
    }
}
