//! md2ansi - render Markdown as ANSI-styled text in the terminal
//!
//! Usage:
//!   md2ansi [OPTIONS] [FILE]...
//!
//! With no FILE, or when FILE is `-`, reads standard input.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::error::ErrorKind;
use clap::Parser;
use md2ansi_core::{
    Classified, ColorScheme, Document, Md2AnsiError, RenderOptions, Renderer, Source, Width,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "MD2ANSI_LOG";

/// Exit code for a user interrupt.
const EXIT_INTERRUPTED: i32 = 130;

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// True while `write_document` holds standard output.
static WRITING: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Parser)]
#[command(
    name = "md2ansi",
    version,
    about = "Render Markdown as ANSI-colored text in the terminal",
    after_help = "EXAMPLES:\n    md2ansi README.md\n    md2ansi --width 100 docs/*.md\n    cat notes.md | md2ansi --plain\n    md2ansi --dump-blocks README.md"
)]
struct Cli {
    /// Markdown files to render; none, or `-`, reads standard input
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Wrap output at N columns instead of the terminal width
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    width: Option<u64>,

    /// Log every rendering stage to stderr
    #[arg(short = 'D', long)]
    debug: bool,

    /// Plain text: no colors, no formatting features
    #[arg(long)]
    plain: bool,

    /// Leave footnote citations and definitions as written
    #[arg(long)]
    no_footnotes: bool,

    /// Show code blocks in a single color
    #[arg(long)]
    no_syntax_highlight: bool,

    /// Leave pipe tables as written
    #[arg(long)]
    no_tables: bool,

    /// Render task items as ordinary list items
    #[arg(long)]
    no_task_lists: bool,

    /// Leave image syntax as written
    #[arg(long)]
    no_images: bool,

    /// Leave link syntax as written
    #[arg(long)]
    no_links: bool,

    /// Omit footnote definitions that are never cited
    #[arg(long)]
    no_uncited_footnotes: bool,

    /// List cited footnotes that have no definition
    #[arg(long)]
    missing_footnotes: bool,

    /// Print the classified blocks as JSON instead of rendering
    #[arg(long)]
    dump_blocks: bool,
}

impl Cli {
    fn render_options(&self) -> RenderOptions {
        let width = self
            .width
            .map_or(Width::Auto, |n| Width::Fixed(usize::try_from(n).unwrap_or(usize::MAX)));

        RenderOptions::default()
            .with_width(width)
            .with_footnotes(!self.no_footnotes)
            .with_syntax_highlight(!self.no_syntax_highlight)
            .with_tables(!self.no_tables)
            .with_task_lists(!self.no_task_lists)
            .with_images(!self.no_images)
            .with_links(!self.no_links)
            .with_uncited_footnotes(!self.no_uncited_footnotes)
            .with_missing_footnotes(self.missing_footnotes)
            .with_debug(self.debug)
            .with_plain(self.plain)
    }

    /// Inputs in argument order; `None` is standard input.
    fn inputs(&self) -> Vec<Option<PathBuf>> {
        if self.files.is_empty() {
            return vec![None];
        }
        self.files
            .iter()
            .map(|p| (p.as_os_str() != "-").then(|| p.clone()))
            .collect()
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                return ExitCode::SUCCESS;
            }
            _ => {
                eprintln!("error: {}", invalid_option(&err));
                eprintln!("Try 'md2ansi --help' for more information.");
                return ExitCode::from(1);
            }
        },
    };

    setup_logging(cli.debug);
    install_interrupt_handler(cli.plain);

    run(&cli)
}

/// First line of clap's message, without its own `error:` prefix.
fn invalid_option(err: &clap::Error) -> Md2AnsiError {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    let message = first.strip_prefix("error: ").unwrap_or(first).trim();
    Md2AnsiError::InvalidOption(message.to_string())
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Ctrl-C: leave the terminal with default attributes and exit 130.
///
/// While a document is being written, the writer stops between two lines
/// and exits instead.
fn install_interrupt_handler(plain: bool) {
    let _ = ctrlc::set_handler(move || {
        INTERRUPTED.store(true, Ordering::SeqCst);
        if !WRITING.load(Ordering::SeqCst) {
            exit_interrupted(plain);
        }
    });
}

fn exit_interrupted(plain: bool) -> ! {
    if !plain {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{}", ColorScheme::ANSI.reset).and_then(|()| out.flush());
    }
    eprintln!("\nInterrupted by user.");
    std::process::exit(EXIT_INTERRUPTED);
}

fn run(cli: &Cli) -> ExitCode {
    let options = cli.render_options();
    let renderer = Renderer::new(options);
    let scheme = options.scheme();
    tracing::debug!(width = renderer.width(), plain = options.plain, "renderer ready");

    let mut failed = false;
    let mut written = 0usize;

    for input in cli.inputs() {
        let document = match load(input) {
            Ok(doc) => doc,
            Err(err) => {
                eprintln!("error: {}", err);
                failed = true;
                continue;
            }
        };

        let lines = if cli.dump_blocks {
            match dump_blocks(&renderer, &document) {
                Ok(json) => vec![json],
                Err(err) => {
                    eprintln!("error: {}: {}", document.name(), err);
                    failed = true;
                    continue;
                }
            }
        } else {
            let result = renderer.render(&document);
            for diagnostic in result.diagnostics.iter() {
                tracing::info!(document = document.name(), "{}", diagnostic);
            }
            result.lines
        };

        match write_document(&lines, written > 0, scheme.is_plain()) {
            Ok(()) => written += 1,
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return exit_code(failed),
            Err(err) => {
                eprintln!("error: failed to write output: {}", err);
                return ExitCode::from(1);
            }
        }
    }

    if written > 0 && !scheme.is_plain() && !cli.dump_blocks {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{}", scheme.reset).and_then(|()| out.flush());
    }

    exit_code(failed)
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn load(input: Option<PathBuf>) -> Result<Document, Md2AnsiError> {
    match input {
        Some(path) => Document::load(Source::path(path)),
        None => Document::load(Source::stdin()),
    }
}

fn write_document(lines: &[String], separate: bool, plain: bool) -> io::Result<()> {
    WRITING.store(true, Ordering::SeqCst);
    let result = write_lines(lines, separate);
    WRITING.store(false, Ordering::SeqCst);
    if INTERRUPTED.load(Ordering::SeqCst) {
        exit_interrupted(plain);
    }
    result
}

/// Write until done or interrupted; either way the buffer is flushed.
fn write_lines(lines: &[String], separate: bool) -> io::Result<()> {
    let mut out = io::BufWriter::new(io::stdout().lock());
    if separate {
        writeln!(out)?;
    }
    for line in lines {
        if INTERRUPTED.load(Ordering::SeqCst) {
            break;
        }
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

// =============================================================================
// Block dump
// =============================================================================

#[derive(Serialize)]
struct JsonDump<'a> {
    document: &'a str,
    blocks: &'a [Classified],
    footnotes: usize,
    diagnostics: Vec<String>,
}

fn dump_blocks(renderer: &Renderer, document: &Document) -> serde_json::Result<String> {
    let classification = renderer.classify(document.text());
    let dump = JsonDump {
        document: document.name(),
        blocks: &classification.blocks,
        footnotes: classification.footnotes.definition_count(),
        diagnostics: classification
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect(),
    };
    serde_json::to_string_pretty(&dump)
}
