//! Visible-width line wrapping for styled text.
//!
//! Widths are measured in terminal columns with escape sequences counted
//! as zero. Every output line is self-contained: styles active at a break
//! are closed with a reset and reopened on the next line.

use crate::ansi::{char_width, is_reset, is_sgr, Segment, Segments};

const RESET: &str = "\x1b[0m";

/// Wrap one styled line to `width` columns.
///
/// Breaks at whitespace; a word wider than `width` is cut. Whitespace at a
/// break is dropped, leading whitespace of the first line is kept. Input
/// without escape sequences yields output without escape sequences.
pub fn wrap(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut w = Wrapper::new(width);
    let segments: Vec<Segment<'_>> = Segments::new(line).collect();

    let mut i = 0;
    while i < segments.len() {
        let mut spaces = String::new();
        let mut spaces_width = 0;
        while let Some(Segment::Char(c)) = segments.get(i) {
            if !c.is_whitespace() {
                break;
            }
            spaces.push(*c);
            spaces_width += char_width(*c).max(1);
            i += 1;
        }

        let word_start = i;
        let mut word_width = 0;
        while let Some(seg) = segments.get(i) {
            match seg {
                Segment::Char(c) if c.is_whitespace() => break,
                Segment::Char(c) => word_width += char_width(*c),
                Segment::Escape(_) => {}
            }
            i += 1;
        }
        let word = &segments[word_start..i];

        w.place(&spaces, spaces_width, word, word_width);
    }

    w.finish()
}

struct Wrapper<'a> {
    width: usize,
    lines: Vec<String>,
    current: String,
    current_width: usize,
    /// SGR sequences in effect at the end of `current`.
    active: Vec<&'a str>,
}

impl<'a> Wrapper<'a> {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: String::new(),
            current_width: 0,
            active: Vec::new(),
        }
    }

    fn place(&mut self, spaces: &str, spaces_width: usize, word: &[Segment<'a>], word_width: usize) {
        let at_start = self.current_width == 0;
        let keep_spaces = !at_start || self.lines.is_empty();

        if self.current_width + spaces_width + word_width <= self.width {
            if keep_spaces {
                self.current.push_str(spaces);
                self.current_width += spaces_width;
            }
            self.push_word(word);
            return;
        }

        // Trailing whitespace that does not fit is dropped, not broken onto
        // a line of its own. The word may still carry escapes.
        if word_width == 0 {
            self.push_word(word);
            return;
        }

        if word_width <= self.width {
            if !at_start {
                self.break_line();
            }
            self.push_word(word);
            return;
        }

        // Longer than a whole line: start fresh, then cut.
        if !at_start {
            self.break_line();
        }
        for seg in word {
            match *seg {
                Segment::Escape(seq) => self.push_escape(seq),
                Segment::Char(c) => {
                    let cw = char_width(c);
                    if self.current_width > 0 && self.current_width + cw > self.width {
                        self.break_line();
                    }
                    self.current.push(c);
                    self.current_width += cw;
                }
            }
        }
    }

    fn push_word(&mut self, word: &[Segment<'a>]) {
        for seg in word {
            match *seg {
                Segment::Escape(seq) => self.push_escape(seq),
                Segment::Char(c) => {
                    self.current.push(c);
                    self.current_width += char_width(c);
                }
            }
        }
    }

    fn push_escape(&mut self, seq: &'a str) {
        self.current.push_str(seq);
        if is_reset(seq) {
            self.active.clear();
        } else if is_sgr(seq) {
            self.active.push(seq);
        }
    }

    fn break_line(&mut self) {
        let mut done = std::mem::take(&mut self.current);
        if !self.active.is_empty() {
            done.push_str(RESET);
        }
        self.lines.push(done);
        for seq in &self.active {
            self.current.push_str(seq);
        }
        self.current_width = 0;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.active.is_empty() {
            self.current.push_str(RESET);
        }
        self.lines.push(self.current);
        self.lines
    }
}
