//! Line-by-line block classification.
//!
//! The classifier is a state machine over [`ParseState`]. Each line either
//! extends the open code block or table, or is classified on its own.
//! Completed blocks are pushed to the caller's buffer in source order.
//! Footnote definitions never produce output; their text goes straight into
//! the [`FootnoteRegistry`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Diagnostic, Diagnostics};
use crate::footnote::FootnoteRegistry;
use crate::lexer::{Lexer, Line};
use crate::options::RenderOptions;
use crate::pattern::Evaluator;
use crate::table::TableModel;

static FENCE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(`{3,}|~{3,})[ \t]*(.*)$").expect("Invalid fence regex")
});
static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|").expect("Invalid table row regex"));
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3,}|={3,}|_{3,})\s*$").expect("Invalid rule regex"));
static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>").expect("Invalid blockquote regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("Invalid heading regex"));
static TASK_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)[-*+]\s+\[([ xX])\]\s+(.*)$").expect("Invalid task item regex")
});
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("Invalid list item regex"));
static ORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(\d{1,9})[.)][ \t]+(.*)$").expect("Invalid ordered item regex")
});
static FOOTNOTE_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\^([^\]]+)\]:\s+(.+)$").expect("Invalid footnote definition regex")
});

/// Code fence marker family and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fence {
    pub marker: char,
    pub len: usize,
}

impl Fence {
    fn from_run(run: &str) -> Self {
        Self {
            marker: run.chars().next().unwrap_or('`'),
            len: run.chars().count(),
        }
    }

    /// The fence as written, e.g. "```".
    pub fn as_string(&self) -> String {
        std::iter::repeat(self.marker).take(self.len).collect()
    }

    /// Whether `line` closes a block opened with this fence: same marker,
    /// a run at least as long, nothing but whitespace after it.
    pub fn closes(&self, line: &str) -> bool {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 3 {
            return false;
        }
        let rest = &line[indent..];
        let run = rest.chars().take_while(|&c| c == self.marker).count();
        run >= self.len && rest[run * self.marker.len_utf8()..].trim().is_empty()
    }
}

/// Kind of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Ordered { number: u64 },
    Unordered,
}

/// A classified block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    CodeBlock {
        fence: Fence,
        language: Option<String>,
        lines: Vec<String>,
        terminated: bool,
    },
    Table(TableModel),
    Blockquote {
        depth: usize,
        text: String,
    },
    ListItem {
        kind: ListKind,
        depth: usize,
        text: String,
    },
    TaskItem {
        checked: bool,
        depth: usize,
        text: String,
    },
    HorizontalRule,
    FootnoteDefinition {
        id: String,
    },
    Blank,
}

impl Block {
    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::CodeBlock { .. } => "code_block",
            Block::Table(_) => "table",
            Block::Blockquote { .. } => "blockquote",
            Block::ListItem { .. } => "list_item",
            Block::TaskItem { .. } => "task_item",
            Block::HorizontalRule => "horizontal_rule",
            Block::FootnoteDefinition { .. } => "footnote_definition",
            Block::Blank => "blank",
        }
    }
}

/// A block with the source line it starts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classified {
    pub line: usize,
    #[serde(flatten)]
    pub block: Block,
}

/// Which multi-line construct is open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Scanning,
    InCodeBlock {
        fence: Fence,
        language: Option<String>,
        lines: Vec<String>,
        opened_at: usize,
    },
    InTable {
        rows: Vec<String>,
        opened_at: usize,
    },
}

/// Everything phase one produces for a document.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub blocks: Vec<Classified>,
    pub footnotes: FootnoteRegistry,
    pub diagnostics: Diagnostics,
}

/// Classify a whole document.
pub fn classify(text: &str, options: &RenderOptions, evaluator: &Evaluator) -> Classification {
    let mut classifier = Classifier::new(*options, evaluator);
    let mut blocks = Vec::new();
    for line in Lexer::new(text) {
        classifier.feed(line, &mut blocks);
    }
    classifier.finish(&mut blocks);
    let (footnotes, diagnostics) = classifier.into_parts();
    Classification {
        blocks,
        footnotes,
        diagnostics,
    }
}

/// Streaming block classifier.
pub struct Classifier<'e> {
    options: RenderOptions,
    evaluator: &'e Evaluator,
    state: ParseState,
    /// Indentation of each open list level, outermost first.
    list_stack: Vec<usize>,
    quote_depth: usize,
    footnotes: FootnoteRegistry,
    diagnostics: Diagnostics,
    last_line: usize,
}

impl<'e> Classifier<'e> {
    pub fn new(options: RenderOptions, evaluator: &'e Evaluator) -> Self {
        Self {
            options,
            evaluator,
            state: ParseState::Scanning,
            list_stack: Vec::new(),
            quote_depth: 0,
            footnotes: FootnoteRegistry::new(),
            diagnostics: Diagnostics::new(),
            last_line: 0,
        }
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Consume one line, pushing any blocks it completes.
    pub fn feed(&mut self, line: Line<'_>, out: &mut Vec<Classified>) {
        self.last_line = line.number;
        match &mut self.state {
            ParseState::InCodeBlock { fence, lines, .. } => {
                if fence.closes(line.text) {
                    self.close_code_block(true, out);
                } else {
                    lines.push(line.text.to_string());
                }
                self.collect_bypasses(line.number);
                return;
            }
            ParseState::InTable { rows, .. } => {
                if self.options.tables
                    && !line.is_blank()
                    && self.evaluator.is_match(&TABLE_ROW, line.text)
                {
                    rows.push(line.text.to_string());
                    self.collect_bypasses(line.number);
                    return;
                }
                self.close_table(out);
            }
            ParseState::Scanning => {}
        }

        self.classify_line(line, out);
        self.collect_bypasses(line.number);
    }

    /// Flush whatever is still open at end of input.
    pub fn finish(&mut self, out: &mut Vec<Classified>) {
        match self.state {
            ParseState::InCodeBlock { .. } => self.close_code_block(false, out),
            ParseState::InTable { .. } => self.close_table(out),
            ParseState::Scanning => {}
        }
        self.collect_bypasses(self.last_line);
    }

    /// The footnote registry and the diagnostics gathered so far.
    pub fn into_parts(self) -> (FootnoteRegistry, Diagnostics) {
        (self.footnotes, self.diagnostics)
    }

    fn classify_line(&mut self, line: Line<'_>, out: &mut Vec<Classified>) {
        let text = line.text;
        let ev = self.evaluator;

        if let Some(caps) = ev.captures(&FENCE_OPEN, text) {
            let fence = Fence::from_run(&caps[1]);
            let info = caps[2].trim();
            // A backtick in a backtick fence's info string makes it inline code.
            if !(fence.marker == '`' && info.contains('`')) {
                let language = info.split_whitespace().next().map(str::to_string);
                if self.options.debug {
                    tracing::debug!(line = line.number, fence = %fence.as_string(), ?language, "code block opened");
                }
                self.reset_context();
                self.state = ParseState::InCodeBlock {
                    fence,
                    language,
                    lines: Vec::new(),
                    opened_at: line.number,
                };
                return;
            }
        }

        if self.options.tables && ev.is_match(&TABLE_ROW, text) {
            self.reset_context();
            self.state = ParseState::InTable {
                rows: vec![text.to_string()],
                opened_at: line.number,
            };
            return;
        }

        if ev.is_match(&HORIZONTAL_RULE, text) {
            self.reset_context();
            emit(out, line.number, Block::HorizontalRule);
            return;
        }

        if ev.is_match(&BLOCKQUOTE, text) {
            let (depth, content) = split_quote(text);
            if self.options.debug && depth != self.quote_depth {
                tracing::debug!(line = line.number, from = self.quote_depth, to = depth, "blockquote depth");
            }
            self.list_stack.clear();
            self.quote_depth = depth;
            emit(
                out,
                line.number,
                Block::Blockquote {
                    depth,
                    text: content.to_string(),
                },
            );
            return;
        }

        if let Some(caps) = ev.captures(&HEADING, text) {
            self.reset_context();
            emit(
                out,
                line.number,
                Block::Heading {
                    level: caps[1].len() as u8,
                    text: caps[2].trim_end().to_string(),
                },
            );
            return;
        }

        if let Some(caps) = ev.captures(&TASK_ITEM, text) {
            let depth = self.list_depth(&caps[1]);
            let checked = !caps[2].eq_ignore_ascii_case(" ");
            let block = if self.options.task_lists {
                Block::TaskItem {
                    checked,
                    depth,
                    text: caps[3].trim_end().to_string(),
                }
            } else {
                Block::ListItem {
                    kind: ListKind::Unordered,
                    depth,
                    text: format!("[{}] {}", &caps[2], caps[3].trim_end()),
                }
            };
            self.quote_depth = 0;
            emit(out, line.number, block);
            return;
        }

        if let Some(caps) = ev.captures(&UNORDERED_ITEM, text) {
            let depth = self.list_depth(&caps[1]);
            self.quote_depth = 0;
            emit(
                out,
                line.number,
                Block::ListItem {
                    kind: ListKind::Unordered,
                    depth,
                    text: caps[2].trim_end().to_string(),
                },
            );
            return;
        }

        if let Some(caps) = ev.captures(&ORDERED_ITEM, text) {
            let depth = self.list_depth(&caps[1]);
            let number = caps[2].parse().unwrap_or(0);
            self.quote_depth = 0;
            emit(
                out,
                line.number,
                Block::ListItem {
                    kind: ListKind::Ordered { number },
                    depth,
                    text: caps[3].trim_end().to_string(),
                },
            );
            return;
        }

        if self.options.footnotes {
            if let Some(caps) = ev.captures(&FOOTNOTE_DEF, text) {
                let id = &caps[1];
                if !self.footnotes.define(id, caps[2].trim_end()) {
                    self.diagnostics
                        .push(Diagnostic::duplicate_footnote(id, line.number));
                }
                self.reset_context();
                emit(
                    out,
                    line.number,
                    Block::FootnoteDefinition { id: id.to_string() },
                );
                return;
            }
        }

        if line.is_blank() {
            // Lists may continue across blank lines.
            self.quote_depth = 0;
            emit(out, line.number, Block::Blank);
            return;
        }

        self.reset_context();
        emit(
            out,
            line.number,
            Block::Paragraph {
                text: text.trim().to_string(),
            },
        );
    }

    /// Nesting depth for a list item indented by `indent`.
    fn list_depth(&mut self, indent: &str) -> usize {
        let width = Line {
            text: indent,
            number: 0,
        }
        .indent();
        while let Some(&top) = self.list_stack.last() {
            if top > width {
                self.list_stack.pop();
            } else {
                break;
            }
        }
        if self.list_stack.last() != Some(&width) {
            self.list_stack.push(width);
        }
        self.list_stack.len() - 1
    }

    fn reset_context(&mut self) {
        self.list_stack.clear();
        self.quote_depth = 0;
    }

    fn close_code_block(&mut self, terminated: bool, out: &mut Vec<Classified>) {
        if let ParseState::InCodeBlock {
            fence,
            language,
            lines,
            opened_at,
        } = std::mem::take(&mut self.state)
        {
            if !terminated {
                self.diagnostics
                    .push(Diagnostic::unterminated_fence(&fence.as_string(), opened_at));
            }
            if self.options.debug {
                tracing::debug!(line = opened_at, terminated, lines = lines.len(), "code block closed");
            }
            emit(
                out,
                opened_at,
                Block::CodeBlock {
                    fence,
                    language,
                    lines,
                    terminated,
                },
            );
        }
    }

    fn close_table(&mut self, out: &mut Vec<Classified>) {
        if let ParseState::InTable { rows, opened_at } = std::mem::take(&mut self.state) {
            let model = TableModel::parse(&rows, self.evaluator);
            if !model.has_header() && rows.len() >= 2 {
                self.diagnostics
                    .push(Diagnostic::missing_table_separator(opened_at));
            }
            if self.options.debug {
                tracing::debug!(line = opened_at, rows = rows.len(), columns = model.columns(), "table closed");
            }
            emit(out, opened_at, Block::Table(model));
        }
    }

    fn collect_bypasses(&mut self, line: usize) {
        for bypass in self.evaluator.take_bypasses() {
            self.diagnostics
                .push(Diagnostic::pattern_bypassed(bypass, Some(line)));
        }
    }
}

fn emit(out: &mut Vec<Classified>, line: usize, block: Block) {
    out.push(Classified { line, block });
}

/// Count the `>` markers (spaces allowed between them) and return the
/// content after one optional space.
fn split_quote(text: &str) -> (usize, &str) {
    let mut rest = text.trim_start();
    let mut depth = 0;
    while let Some(after) = rest.strip_prefix('>') {
        depth += 1;
        rest = after;
        let skipped = rest.trim_start_matches(' ');
        if skipped.starts_with('>') {
            rest = skipped;
        } else {
            break;
        }
    }
    (depth, rest.strip_prefix(' ').unwrap_or(rest))
}
