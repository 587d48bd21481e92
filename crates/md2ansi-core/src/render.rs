//! The rendering pipeline.
//!
//! Rendering runs in two phases. Phase one classifies every line, which
//! also registers every footnote definition. Phase two renders the blocks in
//! order, numbering citations as they are met, so a definition placed after
//! its citation still resolves. The footnotes section comes last.

use crate::ansi::{sanitize, ColorScheme};
use crate::classifier::{classify, Block, Classification, Classified, Fence, ListKind};
use crate::error::{Diagnostic, Diagnostics};
use crate::footnote::FootnoteRegistry;
use crate::highlight;
use crate::inline::InlineFormatter;
use crate::input::Document;
use crate::options::RenderOptions;
use crate::pattern::{Budget, Evaluator};
use crate::terminal;
use crate::wrap::wrap;

/// Rendered lines plus every degradation met on the way.
#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    /// Output lines, without terminators.
    pub lines: Vec<String>,
    /// Recovered problems; rendering still completed.
    pub diagnostics: Diagnostics,
}

impl RenderResult {
    /// Check if rendering met no degradation.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Renders documents with one fixed set of options.
#[derive(Debug)]
pub struct Renderer {
    options: RenderOptions,
    width: usize,
    evaluator: Evaluator,
}

impl Renderer {
    /// Create a renderer; the output width is resolved once, here.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            width: terminal::width_for(options.width),
            evaluator: Evaluator::new(Budget::default()).with_debug(options.debug),
        }
    }

    /// Replace the pattern budget.
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.evaluator = Evaluator::new(budget).with_debug(self.options.debug);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Resolved output width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Phase one only: the classified blocks of `text`.
    pub fn classify(&self, text: &str) -> Classification {
        classify(text, &self.options, &self.evaluator)
    }

    /// Render a loaded document.
    pub fn render(&self, document: &Document) -> RenderResult {
        let result = self.render_str(document.text());
        if self.options.debug {
            tracing::debug!(
                document = document.name(),
                lines = result.lines.len(),
                diagnostics = result.diagnostics.len(),
                "document rendered"
            );
        }
        result
    }

    /// Render Markdown text.
    pub fn render_str(&self, text: &str) -> RenderResult {
        let Classification {
            blocks,
            mut footnotes,
            mut diagnostics,
        } = self.classify(text);

        let scheme = self.options.scheme();
        let mut lines = Vec::with_capacity(blocks.len());
        {
            let mut formatter = InlineFormatter::new(self.options, &mut footnotes);
            for classified in &blocks {
                if self.options.debug {
                    tracing::debug!(line = classified.line, block = classified.block.name(), "rendering block");
                }
                self.render_block(classified, scheme, &mut formatter, &mut lines);
                for id in formatter.take_undefined() {
                    diagnostics.push(Diagnostic::undefined_footnote(&id, Some(classified.line)));
                }
            }
        }

        if self.options.footnotes {
            lines.extend(self.render_footnotes(&footnotes, scheme));
        }

        RenderResult { lines, diagnostics }
    }

    fn render_block(
        &self,
        classified: &Classified,
        scheme: &ColorScheme,
        fmt: &mut InlineFormatter<'_>,
        out: &mut Vec<String>,
    ) {
        match &classified.block {
            Block::Heading { level, text } => {
                let styled = fmt.format(text, scheme.heading(*level));
                out.extend(wrap(&styled, self.width));
            }
            Block::Paragraph { text } => {
                let styled = fmt.format(text, scheme.text);
                out.extend(wrap(&styled, self.width));
            }
            Block::Blockquote { depth, text } => {
                let prefix = format!("  {}", "> ".repeat(*depth));
                let styled = fmt.format(text, scheme.blockquote);
                let avail = self.width.saturating_sub(prefix.chars().count());
                for segment in wrap(&styled, avail) {
                    out.push(close_line(
                        format!("{}{}{}", scheme.text, prefix, segment),
                        scheme,
                    ));
                }
            }
            Block::ListItem { kind, depth, text } => {
                let marker = match kind {
                    ListKind::Unordered => "* ".to_string(),
                    ListKind::Ordered { number } => format!("{}. ", number),
                };
                let styled_marker = format!("{}{}", scheme.list_marker, marker);
                let styled = fmt.format(text, scheme.text);
                self.push_item(*depth, &styled_marker, marker.chars().count(), &styled, scheme, out);
            }
            Block::TaskItem {
                checked,
                depth,
                text,
            } => {
                let mark = if *checked {
                    format!("{}x{}{}", scheme.bold, scheme.reset, scheme.list_marker)
                } else {
                    " ".to_string()
                };
                let styled_marker = format!("{}* [{}] ", scheme.list_marker, mark);
                let styled = fmt.format(text, scheme.text);
                self.push_item(*depth, &styled_marker, 6, &styled, scheme, out);
            }
            Block::HorizontalRule => {
                out.push(format!(
                    "{}{}{}",
                    scheme.horizontal_rule,
                    "─".repeat(self.width),
                    scheme.reset
                ));
            }
            Block::CodeBlock {
                fence,
                language,
                lines,
                terminated,
            } => self.render_code(fence, language.as_deref(), lines, *terminated, scheme, out),
            Block::Table(model) => {
                out.extend(model.render(scheme, |cell| fmt.format(cell, scheme.text)));
            }
            Block::Blank => out.push(String::new()),
            Block::FootnoteDefinition { .. } => {}
        }
    }

    /// A list or task item with a hanging indent under its marker.
    fn push_item(
        &self,
        depth: usize,
        styled_marker: &str,
        marker_width: usize,
        styled: &str,
        scheme: &ColorScheme,
        out: &mut Vec<String>,
    ) {
        let indent = "  ".repeat(depth);
        let hanging = " ".repeat(indent.len() + marker_width);
        let avail = self.width.saturating_sub(hanging.len());
        for (i, segment) in wrap(styled, avail).into_iter().enumerate() {
            let line = if i == 0 {
                format!("{}{}{}", indent, styled_marker, segment)
            } else {
                format!("{}{}", hanging, segment)
            };
            out.push(close_line(line, scheme));
        }
    }

    fn render_code(
        &self,
        fence: &Fence,
        language: Option<&str>,
        lines: &[String],
        terminated: bool,
        scheme: &ColorScheme,
        out: &mut Vec<String>,
    ) {
        let fence_text = fence.as_string();
        let mut opener = format!("{}{}", scheme.code, fence_text);
        if let Some(lang) = language {
            opener.push(' ');
            opener.push_str(&sanitize(lang));
        }
        opener.push_str(scheme.reset);
        out.push(opener);

        let highlighted = match language {
            Some(lang) if self.options.syntax_highlight => highlight::highlight(lines, lang),
            _ => None,
        };
        match highlighted {
            Some(tokens) => {
                for line in tokens {
                    out.push(format!(
                        "{}{}",
                        highlight::render_line(&line, scheme),
                        scheme.reset
                    ));
                }
            }
            None => {
                for line in lines {
                    out.push(format!("{}{}{}", scheme.code, sanitize(line), scheme.reset));
                }
            }
        }

        if terminated {
            out.push(format!("{}{}{}", scheme.code, fence_text, scheme.reset));
        }
    }

    fn render_footnotes(&self, footnotes: &FootnoteRegistry, scheme: &ColorScheme) -> Vec<String> {
        // Citations inside definitions stay literal; nothing is cited here.
        let mut unused = FootnoteRegistry::new();
        let mut fmt = InlineFormatter::new(self.options, &mut unused).without_citations();
        footnotes
            .render_definitions(
                scheme,
                self.options.uncited_footnotes,
                self.options.missing_footnotes,
                |text| fmt.format(text, scheme.text),
            )
            .into_iter()
            .flat_map(|line| wrap(&line, self.width))
            .collect()
    }
}

/// Terminate a composed line with a reset unless it already ends in one
/// or carries no escapes at all.
fn close_line(mut line: String, scheme: &ColorScheme) -> String {
    if !scheme.is_plain() && line.contains('\x1b') && !line.ends_with(scheme.reset) {
        line.push_str(scheme.reset);
    }
    line
}

/// Render `document` to styled text.
pub fn render(document: &Document, options: &RenderOptions) -> String {
    Renderer::new(*options).render(document).text()
}
