//! # md2ansi core
//!
//! Renders Markdown into text styled with ANSI escape sequences for display
//! in a terminal.
//!
//! Every pattern run against document text goes through a bounded
//! evaluator, so hostile input degrades to plain text instead of hanging.
//!
//! ## Quick Start
//!
//! ```rust
//! use md2ansi_core::{render, Document, RenderOptions, Width};
//!
//! let doc = Document::from_text("example.md", "# Hello\n\nSome **bold** text.");
//! let options = RenderOptions::default().with_width(Width::Fixed(60));
//! let styled = render(&doc, &options);
//!
//! assert!(styled.contains("\x1b["));
//! ```
//!
//! ## Diagnostics
//!
//! Malformed constructs never fail a render. They are collected instead:
//!
//! ```rust
//! use md2ansi_core::{DiagnosticKind, RenderOptions, Renderer, Width};
//!
//! let renderer = Renderer::new(RenderOptions::plain().with_width(Width::Fixed(40)));
//! let result = renderer.render_str("```rust\nfn main() {}\n");
//!
//! assert!(result.diagnostics.has_kind(DiagnosticKind::UnterminatedFence));
//! assert_eq!(result.lines[1], "fn main() {}");
//! ```
//!
//! ## Plain mode
//!
//! [`RenderOptions::plain`] switches every feature off and emits no escape
//! sequences at all.

pub mod ansi;
pub mod classifier;
pub mod error;
pub mod footnote;
pub mod highlight;
pub mod inline;
pub mod input;
pub mod lexer;
pub mod options;
pub mod pattern;
pub mod render;
pub mod table;
pub mod terminal;
pub mod wrap;

pub use ansi::{strip_ansi, visible_width, ColorScheme};
pub use classifier::{Block, Classification, Classified, ParseState};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, Md2AnsiError};
pub use footnote::FootnoteRegistry;
pub use inline::{colorize, InlineFormatter, StyleSpan};
pub use input::{Document, Source, MAX_INPUT_BYTES};
pub use options::{RenderOptions, Width};
pub use pattern::{Budget, Evaluator};
pub use render::{render, RenderResult, Renderer};
pub use table::{Alignment, TableModel};
pub use terminal::detect_terminal_width;
pub use wrap::wrap;
