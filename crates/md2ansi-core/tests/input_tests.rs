//! Tests for document loading, options, footnotes and table models

use std::io::{self, Read, Write};

use md2ansi_core::input::load_with_limit;
use md2ansi_core::pattern::Evaluator;
use md2ansi_core::table::split_row;
use md2ansi_core::{
    Alignment, ColorScheme, Document, FootnoteRegistry, Md2AnsiError, RenderOptions, Source,
    TableModel, MAX_INPUT_BYTES,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "# Hi\r\nthere\n").unwrap();

    let doc = Document::load(Source::path(file.path())).unwrap();
    assert_eq!(doc.text(), "# Hi\r\nthere\n");
    assert_eq!(doc.size(), 12);
    assert_eq!(doc.lines().count(), 2);
    assert_eq!(doc.name(), file.path().display().to_string());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.md");
    let err = Document::load(Source::path(&path)).unwrap_err();
    assert!(matches!(err, Md2AnsiError::InputNotFound(ref p) if *p == path));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = Document::load(Source::path(dir.path())).unwrap_err();
    assert!(matches!(err, Md2AnsiError::Io { .. }));
}

#[test]
fn test_oversized_file_is_rejected_before_reading() {
    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len(MAX_INPUT_BYTES + 1).unwrap();

    let err = Document::load(Source::path(file.path())).unwrap_err();
    match err {
        Md2AnsiError::InputTooLarge { size, limit, .. } => {
            assert_eq!(size, MAX_INPUT_BYTES + 1);
            assert_eq!(limit, MAX_INPUT_BYTES);
        }
        other => panic!("expected InputTooLarge, got {:?}", other),
    }
}

#[test]
fn test_file_at_limit_is_accepted() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"12345678").unwrap();
    let doc = load_with_limit(Source::path(file.path()), 8).unwrap();
    assert_eq!(doc.text(), "12345678");
}

#[test]
fn test_oversized_stream_is_rejected() {
    let data = vec![b'a'; 100];
    let err = load_with_limit(Source::stream("stdin", &data[..]), 64).unwrap_err();
    assert!(matches!(err, Md2AnsiError::InputTooLarge { limit: 64, .. }));
    assert!(err.to_string().starts_with("stdin is too large"));
}

#[test]
fn test_invalid_utf8() {
    let data: &[u8] = &[0x66, 0xff, 0xfe];
    let err = Document::load(Source::stream("bin", data)).unwrap_err();
    assert!(matches!(err, Md2AnsiError::NotUtf8(ref name) if name == "bin"));
}

/// Fails once with `Interrupted`, then yields its data.
struct Flaky {
    interrupted: bool,
    data: &'static [u8],
}

impl Read for Flaky {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        self.data.read(buf)
    }
}

#[test]
fn test_interrupted_read_is_retried() {
    let reader = Flaky {
        interrupted: false,
        data: b"ok",
    };
    let doc = Document::load(Source::stream("flaky", reader)).unwrap();
    assert_eq!(doc.text(), "ok");
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_plain_forces_features_off() {
    let options = RenderOptions::plain().with_tables(true).with_links(true);
    assert!(!options.tables);
    assert!(!options.links);
    assert!(!options.footnotes);
    assert_eq!(options.scheme(), &ColorScheme::PLAIN);
}

#[test]
fn test_default_options() {
    let options = RenderOptions::default();
    assert!(options.footnotes && options.tables && options.task_lists);
    assert!(options.uncited_footnotes);
    assert!(!options.plain && !options.debug);
    assert_eq!(options.scheme(), &ColorScheme::ANSI);
}

// ============================================================================
// Footnote Registry
// ============================================================================

#[test]
fn test_registry_numbering() {
    let mut reg = FootnoteRegistry::new();
    assert!(reg.define("a", "A"));
    assert!(reg.define("b", "B"));
    assert!(!reg.define("a", "again"));

    assert_eq!(reg.cite("b"), Some(1));
    assert_eq!(reg.cite("a"), Some(2));
    assert_eq!(reg.cite("b"), Some(1));
    assert_eq!(reg.cite("zzz"), None);
    assert_eq!(reg.citation_count(), 2);

    let entries = reg.entries(false);
    let ids: Vec<(usize, &str, &str)> = entries.iter().map(|e| (e.number, e.id, e.text)).collect();
    assert_eq!(ids, vec![(1, "b", "B"), (2, "a", "A")]);
}

#[test]
fn test_render_definitions_plain() {
    let mut reg = FootnoteRegistry::new();
    reg.define("x", "Note **x**");
    reg.cite("x");
    let lines = reg.render_definitions(&ColorScheme::PLAIN, true, false, |t| t.to_uppercase());
    assert_eq!(lines, vec!["", "Footnotes:", "", "[^1]: NOTE **X**"]);
}

#[test]
fn test_render_definitions_lists_missing_ids() {
    let mut reg = FootnoteRegistry::new();
    reg.define("a", "Cited.");
    reg.define("b", "Uncited.");
    assert_eq!(reg.cite("gone"), None);
    assert_eq!(reg.cite("a"), Some(1));
    assert_eq!(reg.cite("gone"), None);
    assert_eq!(reg.missing().collect::<Vec<_>>(), vec!["gone"]);

    let lines = reg.render_definitions(&ColorScheme::PLAIN, true, true, str::to_string);
    assert_eq!(
        lines,
        vec![
            "",
            "Footnotes:",
            "",
            "[^1]: Cited.",
            "[^gone]: Missing footnote definition",
            "[^2]: Uncited.",
        ]
    );

    let lines = reg.render_definitions(&ColorScheme::PLAIN, true, false, str::to_string);
    assert_eq!(lines, vec!["", "Footnotes:", "", "[^1]: Cited.", "[^2]: Uncited."]);
}

#[test]
fn test_render_definitions_empty() {
    let reg = FootnoteRegistry::new();
    assert!(reg
        .render_definitions(&ColorScheme::ANSI, true, true, str::to_string)
        .is_empty());
}

// ============================================================================
// Table Model
// ============================================================================

#[test]
fn test_split_row() {
    assert_eq!(split_row("| a | b |"), vec!["a", "b"]);
    assert_eq!(split_row("|a|b"), vec!["a", "b"]);
    assert_eq!(split_row(r"| a \| b | c |"), vec![r"a \| b", "c"]);
    assert_eq!(split_row("| | x |"), vec!["", "x"]);
}

#[test]
fn test_parse_normalizes_column_count() {
    let ev = Evaluator::default();
    let model = TableModel::parse(&["| a | b |", "|---|--:|", "| 1 |", "| 1 | 2 | 3 |"], &ev);
    assert_eq!(model.columns(), 2);
    assert_eq!(model.alignments, vec![Alignment::Left, Alignment::Right]);
    assert_eq!(
        model.rows,
        vec![
            vec!["1".to_string(), String::new()],
            vec!["1".to_string(), "2".to_string()],
        ]
    );
}

#[test]
fn test_invalid_separator_keeps_rows() {
    let ev = Evaluator::default();
    let model = TableModel::parse(&["| a |", "| -x- |"], &ev);
    assert!(!model.has_header());
    assert_eq!(model.rows.len(), 2);
}

#[test]
fn test_render_plain_grid() {
    let ev = Evaluator::default();
    let model = TableModel::parse(&["| h |", "|:-:|", "| long |"], &ev);
    let lines = model.render(&ColorScheme::PLAIN, str::to_string);
    assert_eq!(
        lines,
        vec!["+------+", "|  h   |", "+------+", "| long |", "+------+"]
    );
}
