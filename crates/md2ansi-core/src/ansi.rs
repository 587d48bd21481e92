//! Escape sequences, the color scheme, and visible-width measurement.
//!
//! Every styled string produced by the renderer is built from the
//! [`ColorScheme`] constants below. [`ColorScheme::PLAIN`] maps every element
//! to the empty string, so plain mode emits no escape sequences at all.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

/// Fixed mapping from semantic element to escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub reset: &'static str,
    pub bold: &'static str,
    pub dim: &'static str,
    pub italic: &'static str,
    pub underline: &'static str,
    pub strikethrough: &'static str,
    /// Heading colors, H1 first.
    pub headings: [&'static str; 6],
    pub text: &'static str,
    pub blockquote: &'static str,
    pub code: &'static str,
    pub inline_code: &'static str,
    pub list_marker: &'static str,
    pub horizontal_rule: &'static str,
    pub table_border: &'static str,
    pub link: &'static str,
    // syntax token classes
    pub keyword: &'static str,
    pub string: &'static str,
    pub number: &'static str,
    pub comment: &'static str,
    pub function: &'static str,
    pub type_name: &'static str,
    pub builtin: &'static str,
}

impl ColorScheme {
    /// 256-color terminal palette.
    pub const ANSI: ColorScheme = ColorScheme {
        reset: "\x1b[0m",
        bold: "\x1b[1m",
        dim: "\x1b[2m",
        italic: "\x1b[3m",
        underline: "\x1b[4m",
        strikethrough: "\x1b[9m",
        headings: [
            "\x1b[38;5;226m",
            "\x1b[38;5;214m",
            "\x1b[38;5;118m",
            "\x1b[38;5;21m",
            "\x1b[38;5;93m",
            "\x1b[38;5;239m",
        ],
        text: "\x1b[38;5;7m",
        blockquote: "\x1b[48;5;236m",
        code: "\x1b[90m",
        inline_code: "\x1b[90m",
        list_marker: "\x1b[36m",
        horizontal_rule: "\x1b[36m",
        table_border: "\x1b[90m",
        link: "\x1b[38;5;45m",
        keyword: "\x1b[38;5;204m",
        string: "\x1b[38;5;114m",
        number: "\x1b[38;5;220m",
        comment: "\x1b[38;5;245m",
        function: "\x1b[38;5;81m",
        type_name: "\x1b[38;5;214m",
        builtin: "\x1b[38;5;147m",
    };

    /// No escapes at all.
    pub const PLAIN: ColorScheme = ColorScheme {
        reset: "",
        bold: "",
        dim: "",
        italic: "",
        underline: "",
        strikethrough: "",
        headings: ["", "", "", "", "", ""],
        text: "",
        blockquote: "",
        code: "",
        inline_code: "",
        list_marker: "",
        horizontal_rule: "",
        table_border: "",
        link: "",
        keyword: "",
        string: "",
        number: "",
        comment: "",
        function: "",
        type_name: "",
        builtin: "",
    };

    /// Color for a heading level; levels outside 1-6 clamp to the nearest.
    #[inline]
    pub fn heading(&self, level: u8) -> &'static str {
        let idx = (level.clamp(1, 6) - 1) as usize;
        self.headings[idx]
    }

    /// Whether this scheme emits anything.
    #[inline]
    pub fn is_plain(&self) -> bool {
        self.reset.is_empty()
    }
}

/// A piece of styled text: either an escape sequence or one visible char.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Escape(&'a str),
    Char(char),
}

/// Splits a string into escape sequences and characters.
///
/// Recognizes CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-byte escapes. A truncated sequence runs to the end of the input.
pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Segments<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn escape_end(&self) -> usize {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        match bytes.get(start + 1) {
            Some(b'[') => {
                let mut i = start + 2;
                while i < bytes.len() {
                    if (0x40..=0x7e).contains(&bytes[i]) {
                        return i + 1;
                    }
                    i += 1;
                }
                bytes.len()
            }
            Some(b']') => {
                let mut i = start + 2;
                while i < bytes.len() {
                    if bytes[i] == 0x07 {
                        return i + 1;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        return i + 2;
                    }
                    i += 1;
                }
                bytes.len()
            }
            Some(&b) if b.is_ascii() => start + 2,
            _ => start + 1,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let rest = self.text.get(self.pos..)?;
        let c = rest.chars().next()?;
        if c == '\x1b' {
            // Every byte in an escape is ASCII, so `end` is a char boundary.
            let end = self.escape_end();
            let seq = &self.text[self.pos..end];
            self.pos = end;
            Some(Segment::Escape(seq))
        } else {
            self.pos += c.len_utf8();
            Some(Segment::Char(c))
        }
    }
}

/// Check whether an escape sequence is a Select Graphic Rendition code.
#[inline]
pub fn is_sgr(seq: &str) -> bool {
    seq.starts_with("\x1b[") && seq.ends_with('m')
}

/// Check whether an escape sequence resets all attributes.
#[inline]
pub fn is_reset(seq: &str) -> bool {
    seq == "\x1b[0m" || seq == "\x1b[m"
}

/// Remove every escape sequence from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for seg in Segments::new(text) {
        if let Segment::Char(c) = seg {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Terminal columns occupied by `text`, ignoring escape sequences.
pub fn visible_width(text: &str) -> usize {
    Segments::new(text)
        .map(|seg| match seg {
            Segment::Char(c) => char_width(c),
            Segment::Escape(_) => 0,
        })
        .sum()
}

/// Columns occupied by a single char; control chars count zero.
#[inline]
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Make untrusted text safe to embed between our own escapes.
///
/// Removes escape sequences and every other control character except tab.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| c.is_control() && c != '\t') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for seg in Segments::new(text) {
        if let Segment::Char(c) = seg {
            if !c.is_control() || c == '\t' {
                out.push(c);
            }
        }
    }
    Cow::Owned(out)
}
