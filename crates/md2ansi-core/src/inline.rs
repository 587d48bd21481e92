//! Inline formatting: emphasis, code spans, links, images and citations.
//!
//! [`colorize`] scans a line once, left to right, and builds a
//! [`StyleSpan`] tree by recursive descent over the text between matched
//! markers. [`InlineFormatter`] turns that tree into styled text.
//! Unmatched markers are kept as literal text.

use std::borrow::Cow;
use std::collections::HashMap;

use memchr::{memchr, memchr3};
use serde::Serialize;

use crate::ansi::{sanitize, ColorScheme};
use crate::footnote::FootnoteRegistry;
use crate::options::RenderOptions;

/// Deepest nesting of container spans; anything deeper stays literal.
pub const MAX_NESTING: usize = 16;

/// A styled run of inline text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum StyleSpan {
    Plain(String),
    Bold(Vec<StyleSpan>),
    Italic(Vec<StyleSpan>),
    BoldItalic(Vec<StyleSpan>),
    Strikethrough(Vec<StyleSpan>),
    /// `ticks` is the length of the backtick run that delimited it.
    InlineCode { ticks: usize, code: String },
    Link { label: Vec<StyleSpan>, url: String },
    Image { alt: String, url: String },
    FootnoteRef { id: String },
}

impl StyleSpan {
    /// The visible text of this span as plain-mode output would show it,
    /// with citations left as `[^id]`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            StyleSpan::Plain(t) => out.push_str(t),
            StyleSpan::Bold(c)
            | StyleSpan::Italic(c)
            | StyleSpan::BoldItalic(c)
            | StyleSpan::Strikethrough(c) => c.iter().for_each(|s| s.push_plain_text(out)),
            StyleSpan::InlineCode { ticks, code } => {
                push_ticks(*ticks, out);
                out.push_str(code);
                push_ticks(*ticks, out);
            }
            StyleSpan::Link { label, .. } => label.iter().for_each(|s| s.push_plain_text(out)),
            StyleSpan::Image { alt, .. } => {
                out.push_str("[IMG: ");
                out.push_str(alt);
                out.push(']');
            }
            StyleSpan::FootnoteRef { id } => {
                out.push_str("[^");
                out.push_str(id);
                out.push(']');
            }
        }
    }
}

fn push_ticks(n: usize, out: &mut String) {
    out.push_str(&"`".repeat(n));
}

/// Parse `text` into style spans.
///
/// Links, images and citations are only recognized when the matching
/// option is on.
pub fn colorize(text: &str, options: &RenderOptions) -> Vec<StyleSpan> {
    if text.is_empty() {
        return Vec::new();
    }
    InlineParser::new(text, options, 0).parse()
}

// Indexes into `InlineParser::failed`.
const STAR_1: usize = 0;
const UNDERSCORE_1: usize = 3;
const TILDE_2: usize = 6;
const CLOSE_BRACKET: usize = 7;
const PAREN: usize = 8;
const MARKER_KINDS: usize = 9;

struct InlineParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    options: &'a RenderOptions,
    /// Marker kinds whose closer search already ran to the end of the text.
    failed: [bool; MARKER_KINDS],
    /// Backtick run lengths (below 64) with no closing run.
    failed_code: u64,
    /// `[` offset to its matching `]`, built on first use.
    brackets: Option<HashMap<usize, usize>>,
    spans: Vec<StyleSpan>,
    text_start: usize,
    pending: String,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str, options: &'a RenderOptions, depth: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            depth,
            options,
            failed: [false; MARKER_KINDS],
            failed_code: 0,
            brackets: None,
            spans: Vec::with_capacity(4),
            text_start: 0,
            pending: String::new(),
        }
    }

    fn parse(mut self) -> Vec<StyleSpan> {
        if self.depth >= MAX_NESTING {
            return vec![StyleSpan::Plain(self.text.to_string())];
        }

        while self.pos < self.bytes.len() {
            let next = self.find_next_special();
            if next >= self.bytes.len() {
                break;
            }
            self.pos = next;

            let parsed = match self.bytes[self.pos] {
                b'\\' => self.try_parse_escape(),
                b'`' => self.try_parse_code_span(),
                b'!' => self.try_parse_image(),
                b'[' => self.try_parse_bracket(),
                b'*' | b'_' => self.try_parse_emphasis(),
                b'~' => self.try_parse_strikethrough(),
                _ => false,
            };

            if !parsed {
                self.pos += 1;
            }
        }

        self.pos = self.bytes.len();
        self.flush_text();
        self.flush_pending();
        self.spans
    }

    #[inline(always)]
    fn find_next_special(&self) -> usize {
        let remaining = &self.bytes[self.pos..];
        let a = memchr3(b'*', b'_', b'`', remaining);
        let b = memchr3(b'[', b'\\', b'~', remaining);
        let c = memchr(b'!', remaining);
        [a, b, c]
            .into_iter()
            .flatten()
            .min()
            .map_or(self.bytes.len(), |off| self.pos + off)
    }

    /// Move `text[text_start..pos]` into the pending plain run.
    #[inline]
    fn flush_text(&mut self) {
        if self.text_start < self.pos {
            self.pending.push_str(&self.text[self.text_start..self.pos]);
        }
        self.text_start = self.pos;
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.spans
                .push(StyleSpan::Plain(std::mem::take(&mut self.pending)));
        }
    }

    /// Emit `span`, consuming input up to `end`.
    fn push_span(&mut self, span: StyleSpan, end: usize) {
        self.flush_text();
        self.flush_pending();
        self.spans.push(span);
        self.pos = end;
        self.text_start = end;
    }

    fn inner(&self, start: usize, end: usize) -> Vec<StyleSpan> {
        InlineParser::new(&self.text[start..end], self.options, self.depth + 1).parse()
    }

    fn prev_char(&self, at: usize) -> Option<char> {
        self.text[..at].chars().next_back()
    }

    fn char_at(&self, at: usize) -> Option<char> {
        self.text.get(at..).and_then(|s| s.chars().next())
    }

    fn try_parse_escape(&mut self) -> bool {
        match self.bytes.get(self.pos + 1) {
            Some(b) if b.is_ascii_punctuation() => {
                self.flush_text();
                // Drop the backslash; the escaped byte starts the next text run.
                self.text_start = self.pos + 1;
                self.pos += 2;
                true
            }
            _ => false,
        }
    }

    fn run_length(&self, at: usize, byte: u8) -> usize {
        self.bytes[at..].iter().take_while(|&&b| b == byte).count()
    }

    fn try_parse_code_span(&mut self) -> bool {
        let start = self.pos;
        let n = self.run_length(start, b'`');
        if n < 64 && self.failed_code & (1 << n) != 0 {
            self.pos += n;
            return true;
        }

        let mut search = start + n;
        while let Some(off) = memchr(b'`', &self.bytes[search..]) {
            let run_start = search + off;
            let run = self.run_length(run_start, b'`');
            if run == n {
                let mut content = &self.text[start + n..run_start];
                if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.trim().is_empty()
                {
                    content = &content[1..content.len() - 1];
                }
                let span = StyleSpan::InlineCode {
                    ticks: n,
                    code: content.to_string(),
                };
                self.push_span(span, run_start + n);
                return true;
            }
            search = run_start + run;
        }

        if n < 64 {
            self.failed_code |= 1 << n;
        }
        // The whole run is literal; skip it so no part of it reopens.
        self.pos += n;
        true
    }

    /// Find the `]` matching the `[` at `open`, honoring nesting and escapes.
    fn matching_bracket(&mut self, open: usize) -> Option<usize> {
        let bytes = self.bytes;
        let pairs = self.brackets.get_or_insert_with(|| {
            let mut pairs = HashMap::new();
            let mut stack = Vec::new();
            let mut i = 0;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 1,
                    b'[' => stack.push(i),
                    b']' => {
                        if let Some(o) = stack.pop() {
                            pairs.insert(o, i);
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            pairs
        });
        pairs.get(&open).copied()
    }

    /// Parse `(url)` directly at `at`; returns the url and the end offset.
    fn link_target(&mut self, at: usize) -> Option<(&'a str, usize)> {
        if self.failed[PAREN] || self.bytes.get(at) != Some(&b'(') {
            return None;
        }
        let Some(off) = memchr(b')', &self.bytes[at + 1..]) else {
            self.failed[PAREN] = true;
            return None;
        };
        let close = at + 1 + off;
        let text = self.text;
        let url = text[at + 1..close].trim();
        if url.is_empty() {
            return None;
        }
        Some((url, close + 1))
    }

    fn try_parse_image(&mut self) -> bool {
        if !self.options.images || self.bytes.get(self.pos + 1) != Some(&b'[') {
            return false;
        }
        let open = self.pos + 1;
        let Some(close) = self.matching_bracket(open) else {
            return false;
        };
        let text = self.text;
        let alt = &text[open + 1..close];
        if alt.is_empty() {
            return false;
        }
        match self.link_target(close + 1) {
            Some((url, end)) => {
                let span = StyleSpan::Image {
                    alt: alt.to_string(),
                    url: url.to_string(),
                };
                self.push_span(span, end);
                true
            }
            None => false,
        }
    }

    fn try_parse_bracket(&mut self) -> bool {
        if self.bytes.get(self.pos + 1) == Some(&b'^') && self.try_parse_footnote_ref() {
            return true;
        }
        self.try_parse_link()
    }

    fn try_parse_footnote_ref(&mut self) -> bool {
        if !self.options.footnotes || self.failed[CLOSE_BRACKET] {
            return false;
        }
        let label_start = self.pos + 2;
        let Some(off) = memchr(b']', &self.bytes[label_start..]) else {
            self.failed[CLOSE_BRACKET] = true;
            return false;
        };
        let close = label_start + off;
        let id = &self.text[label_start..close];
        if id.is_empty() || id.contains('[') {
            return false;
        }
        self.push_span(StyleSpan::FootnoteRef { id: id.to_string() }, close + 1);
        true
    }

    fn try_parse_link(&mut self) -> bool {
        if !self.options.links {
            return false;
        }
        let open = self.pos;
        let Some(close) = self.matching_bracket(open) else {
            return false;
        };
        if close == open + 1 {
            return false;
        }
        match self.link_target(close + 1) {
            Some((url, end)) => {
                let label = self.inner(open + 1, close);
                let span = StyleSpan::Link {
                    label,
                    url: url.to_string(),
                };
                self.push_span(span, end);
                true
            }
            None => false,
        }
    }

    fn try_parse_emphasis(&mut self) -> bool {
        let marker = self.bytes[self.pos];
        let run = self.run_length(self.pos, marker);

        if marker == b'_' {
            // `_` never opens inside a word.
            if self.prev_char(self.pos).is_some_and(char::is_alphanumeric) {
                self.pos += run;
                return true;
            }
        }

        for k in (1..=run.min(3)).rev() {
            if self.try_parse_delimited(marker, k) {
                return true;
            }
        }

        // No closer for any length: the run is literal.
        self.pos += run;
        true
    }

    fn try_parse_strikethrough(&mut self) -> bool {
        if self.bytes.get(self.pos + 1) != Some(&b'~') {
            return false;
        }
        if self.try_parse_delimited(b'~', 2) {
            return true;
        }
        self.pos += self.run_length(self.pos, b'~');
        true
    }

    /// Try a `k`-long `marker` opener at `pos` with a matching closer.
    fn try_parse_delimited(&mut self, marker: u8, k: usize) -> bool {
        let kind = match marker {
            b'*' => STAR_1 + k - 1,
            b'_' => UNDERSCORE_1 + k - 1,
            _ => TILDE_2,
        };
        if self.failed[kind] {
            return false;
        }

        let start = self.pos;
        let content_start = start + k;
        match self.char_at(content_start) {
            Some(c) if !c.is_whitespace() => {}
            _ => return false,
        }

        let Some(close) = self.find_closer(marker, k, content_start) else {
            self.failed[kind] = true;
            return false;
        };

        let inner = self.inner(content_start, close);
        let span = match (marker, k) {
            (b'~', _) => StyleSpan::Strikethrough(inner),
            (_, 3) => StyleSpan::BoldItalic(inner),
            (_, 2) => StyleSpan::Bold(inner),
            _ => StyleSpan::Italic(inner),
        };
        self.push_span(span, close + k);
        true
    }

    /// First valid `k`-long closer for `marker` after `content_start`.
    ///
    /// A run of three can close a single or double opener with its last
    /// markers, leaving the rest for the inner text.
    fn find_closer(&self, marker: u8, k: usize, content_start: usize) -> Option<usize> {
        let mut search = content_start;
        while let Some(off) = memchr(marker, &self.bytes[search..]) {
            let at = search + off;
            let run = self.run_length(at, marker);
            let close = match (marker, k, run) {
                (b'~', _, r) if r >= 2 => Some(at),
                (b'~', _, _) => None,
                (_, 3, r) if r >= 3 => Some(at),
                (_, 2, 2) | (_, 2, 3) => Some(at + run - 2),
                (_, 1, 1) | (_, 1, 3) => Some(at + run - 1),
                _ => None,
            };
            if let Some(close) = close {
                let preceded = at > content_start
                    && self.bytes[at - 1] != b'\\'
                    && self.prev_char(at).is_some_and(|c| !c.is_whitespace());
                let intraword =
                    marker == b'_' && self.char_at(close + k).is_some_and(char::is_alphanumeric);
                if preceded && !intraword {
                    return Some(close);
                }
            }
            search = at + run;
        }
        None
    }
}

/// Serializes style spans into escape-sequence text.
///
/// Citations are numbered through the registry as they are met, so the
/// order in which lines are formatted decides footnote numbers.
pub struct InlineFormatter<'a> {
    options: RenderOptions,
    scheme: &'static ColorScheme,
    footnotes: &'a mut FootnoteRegistry,
    undefined: Vec<String>,
}

impl<'a> InlineFormatter<'a> {
    pub fn new(options: RenderOptions, footnotes: &'a mut FootnoteRegistry) -> Self {
        Self {
            options,
            scheme: options.scheme(),
            footnotes,
            undefined: Vec::new(),
        }
    }

    /// Format footnote definition text: citations inside it stay literal.
    pub fn without_citations(mut self) -> Self {
        self.options.footnotes = false;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Sanitize, parse and serialize one line of text on top of `base`.
    ///
    /// The result starts with `base` and leaves it active; the caller
    /// closes the line.
    pub fn format(&mut self, text: &str, base: &str) -> String {
        let clean = sanitize(text);
        let clean: Cow<'_, str> = if clean.contains('\t') {
            clean.replace('\t', "    ").into()
        } else {
            clean
        };
        let spans = colorize(&clean, &self.options);
        self.serialize(&spans, base)
    }

    /// Serialize spans on top of `base`.
    pub fn serialize(&mut self, spans: &[StyleSpan], base: &str) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(base);
        let mut stack: Vec<&'static str> = Vec::new();
        self.write_spans(spans, base, &mut stack, &mut out);
        out
    }

    /// Ids cited without a definition since the last call.
    pub fn take_undefined(&mut self) -> Vec<String> {
        std::mem::take(&mut self.undefined)
    }

    fn write_spans(
        &mut self,
        spans: &[StyleSpan],
        base: &str,
        stack: &mut Vec<&'static str>,
        out: &mut String,
    ) {
        for span in spans {
            self.write_span(span, base, stack, out);
        }
    }

    fn write_span(
        &mut self,
        span: &StyleSpan,
        base: &str,
        stack: &mut Vec<&'static str>,
        out: &mut String,
    ) {
        let s = self.scheme;
        match span {
            StyleSpan::Plain(text) => out.push_str(text),
            StyleSpan::Bold(children) => self.write_styled(&[s.bold], children, base, stack, out),
            StyleSpan::Italic(children) => {
                self.write_styled(&[s.italic], children, base, stack, out)
            }
            StyleSpan::BoldItalic(children) => {
                self.write_styled(&[s.bold, s.italic], children, base, stack, out)
            }
            StyleSpan::Strikethrough(children) => {
                self.write_styled(&[s.strikethrough], children, base, stack, out)
            }
            StyleSpan::Link { label, .. } => {
                self.write_styled(&[s.link, s.underline], label, base, stack, out)
            }
            StyleSpan::InlineCode { ticks, code } => {
                out.push_str(s.inline_code);
                push_ticks(*ticks, out);
                out.push_str(code);
                push_ticks(*ticks, out);
                restore(s, base, stack, out);
            }
            StyleSpan::Image { alt, .. } => {
                out.push_str(s.bold);
                out.push_str("[IMG: ");
                out.push_str(alt);
                out.push(']');
                restore(s, base, stack, out);
            }
            StyleSpan::FootnoteRef { id } => {
                match self.footnotes.cite(id) {
                    Some(n) => {
                        out.push('[');
                        out.push_str(s.bold);
                        out.push_str(s.dim);
                        out.push('^');
                        out.push_str(&n.to_string());
                        restore(s, base, stack, out);
                        out.push(']');
                    }
                    None => {
                        self.undefined.push(id.clone());
                        out.push_str("[^");
                        out.push_str(id);
                        out.push(']');
                    }
                }
            }
        }
    }

    fn write_styled(
        &mut self,
        codes: &[&'static str],
        children: &[StyleSpan],
        base: &str,
        stack: &mut Vec<&'static str>,
        out: &mut String,
    ) {
        for &code in codes {
            out.push_str(code);
            stack.push(code);
        }
        self.write_spans(children, base, stack, out);
        stack.truncate(stack.len() - codes.len());
        restore(self.scheme, base, stack, out);
    }
}

/// Close everything, then reopen the base color and the outer styles.
fn restore(scheme: &ColorScheme, base: &str, stack: &[&str], out: &mut String) {
    if scheme.is_plain() {
        return;
    }
    out.push_str(scheme.reset);
    out.push_str(base);
    for code in stack {
        out.push_str(code);
    }
}
