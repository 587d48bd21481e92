//! Integration tests for inline formatting

use md2ansi_core::{colorize, FootnoteRegistry, InlineFormatter, RenderOptions, StyleSpan};
use pretty_assertions::assert_eq;

const TEXT: &str = "\x1b[38;5;7m";

fn spans(input: &str) -> Vec<StyleSpan> {
    colorize(input, &RenderOptions::default())
}

fn plain(text: &str) -> StyleSpan {
    StyleSpan::Plain(text.to_string())
}

fn code(ticks: usize, text: &str) -> StyleSpan {
    StyleSpan::InlineCode {
        ticks,
        code: text.to_string(),
    }
}

// ============================================================================
// Emphasis
// ============================================================================

#[test]
fn test_italic_and_bold_italic() {
    assert_eq!(
        spans("*it* and ***both***"),
        vec![
            StyleSpan::Italic(vec![plain("it")]),
            plain(" and "),
            StyleSpan::BoldItalic(vec![plain("both")]),
        ]
    );
}

#[test]
fn test_bold_with_nested_italic() {
    assert_eq!(
        spans("**a *b* c**"),
        vec![StyleSpan::Bold(vec![
            plain("a "),
            StyleSpan::Italic(vec![plain("b")]),
            plain(" c"),
        ])]
    );
}

#[test]
fn test_underscore_emphasis() {
    assert_eq!(
        spans("__strong__ and _soft_"),
        vec![
            StyleSpan::Bold(vec![plain("strong")]),
            plain(" and "),
            StyleSpan::Italic(vec![plain("soft")]),
        ]
    );
}

#[test]
fn test_unclosed_marker_is_literal() {
    assert_eq!(spans("**bold"), vec![plain("**bold")]);
    assert_eq!(spans("a * b"), vec![plain("a * b")]);
}

#[test]
fn test_intraword_underscore_is_literal() {
    assert_eq!(spans("snake_case_name"), vec![plain("snake_case_name")]);
}

#[test]
fn test_strikethrough() {
    assert_eq!(
        spans("~~gone~~ here"),
        vec![
            StyleSpan::Strikethrough(vec![plain("gone")]),
            plain(" here"),
        ]
    );
    assert_eq!(spans("~single~"), vec![plain("~single~")]);
}

// ============================================================================
// Code Spans and Escapes
// ============================================================================

#[test]
fn test_code_span_content_is_literal() {
    assert_eq!(
        spans("run `**not bold**` now"),
        vec![
            plain("run "),
            code(1, "**not bold**"),
            plain(" now"),
        ]
    );
}

#[test]
fn test_double_backtick_code_span() {
    assert_eq!(spans("``a`b``"), vec![code(2, "a`b")]);
}

#[test]
fn test_code_span_keeps_its_delimiter_length() {
    assert_eq!(spans("`a``b`"), vec![code(1, "a``b")]);

    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::default(), &mut registry);
    let line = fmt.format("`a``b` and ``c`d``", TEXT);
    assert_eq!(md2ansi_core::strip_ansi(&line), "`a``b` and ``c`d``");
}

#[test]
fn test_unmatched_backtick_is_literal() {
    assert_eq!(spans("a `b"), vec![plain("a `b")]);
}

#[test]
fn test_backslash_escape() {
    assert_eq!(spans(r"\*not\*"), vec![plain("*not*")]);
    assert_eq!(spans(r"a\b"), vec![plain(r"a\b")]);
}

// ============================================================================
// Links, Images and Citations
// ============================================================================

#[test]
fn test_link() {
    assert_eq!(
        spans("see [the *docs*](https://example.com) now"),
        vec![
            plain("see "),
            StyleSpan::Link {
                label: vec![plain("the "), StyleSpan::Italic(vec![plain("docs")])],
                url: "https://example.com".to_string(),
            },
            plain(" now"),
        ]
    );
}

#[test]
fn test_link_inside_extra_bracket() {
    assert_eq!(
        spans("[[a](u)"),
        vec![
            plain("["),
            StyleSpan::Link {
                label: vec![plain("a")],
                url: "u".to_string(),
            },
        ]
    );
}

#[test]
fn test_bracket_without_target_is_literal() {
    assert_eq!(spans("[just brackets]"), vec![plain("[just brackets]")]);
    assert_eq!(spans("[](empty)"), vec![plain("[](empty)")]);
}

#[test]
fn test_image() {
    assert_eq!(
        spans("![logo](img.png)"),
        vec![StyleSpan::Image {
            alt: "logo".to_string(),
            url: "img.png".to_string(),
        }]
    );
}

#[test]
fn test_images_disabled_falls_back_to_link() {
    let options = RenderOptions::default().with_images(false);
    assert_eq!(
        colorize("![alt](img.png)", &options),
        vec![
            plain("!"),
            StyleSpan::Link {
                label: vec![plain("alt")],
                url: "img.png".to_string(),
            },
        ]
    );
}

#[test]
fn test_links_disabled() {
    let options = RenderOptions::default().with_links(false);
    assert_eq!(colorize("[a](b)", &options), vec![plain("[a](b)")]);
}

#[test]
fn test_footnote_reference() {
    assert_eq!(
        spans("text[^note]"),
        vec![
            plain("text"),
            StyleSpan::FootnoteRef {
                id: "note".to_string()
            },
        ]
    );
}

#[test]
fn test_plain_text_of_spans() {
    let result = spans("**a** `b` ![c](d) [^e]");
    let text: String = result.iter().map(StyleSpan::plain_text).collect();
    assert_eq!(text, "a `b` [IMG: c] [^e]");
}

#[test]
fn test_deep_nesting_does_not_overflow() {
    let input = format!("{}x{}", "[".repeat(5000), "](u)".repeat(5000));
    let result = spans(&input);
    assert!(!result.is_empty());
}

// ============================================================================
// Formatter
// ============================================================================

#[test]
fn test_format_restores_base_color() {
    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::default(), &mut registry);
    assert_eq!(
        fmt.format("**b**", TEXT),
        "\x1b[38;5;7m\x1b[1mb\x1b[0m\x1b[38;5;7m"
    );
}

#[test]
fn test_format_plain_mode_has_no_escapes() {
    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::plain(), &mut registry);
    assert_eq!(fmt.format("**b** `c`", ""), "b `c`");
}

#[test]
fn test_format_strips_embedded_escapes() {
    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::plain(), &mut registry);
    assert_eq!(fmt.format("a\x1b[31mred\x1b[0m\x07b", ""), "aredb");
}

#[test]
fn test_format_expands_tabs() {
    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::plain(), &mut registry);
    assert_eq!(fmt.format("a\tb", ""), "a    b");
}

#[test]
fn test_citations_numbered_in_order() {
    let mut registry = FootnoteRegistry::new();
    registry.define("a", "first");
    registry.define("b", "second");
    let options = RenderOptions::default();
    let out = {
        let mut fmt = InlineFormatter::new(options, &mut registry);
        let line = fmt.format("[^b] then [^a] then [^b]", "");
        md2ansi_core::strip_ansi(&line).into_owned()
    };
    assert_eq!(out, "[^1] then [^2] then [^1]");
    assert_eq!(registry.number_of("b"), Some(1));
    assert_eq!(registry.number_of("a"), Some(2));
}

#[test]
fn test_undefined_citation_is_literal_and_recorded() {
    let mut registry = FootnoteRegistry::new();
    let mut fmt = InlineFormatter::new(RenderOptions::default(), &mut registry);
    let line = fmt.format("x[^missing]", "");
    assert_eq!(md2ansi_core::strip_ansi(&line), "x[^missing]");
    assert_eq!(fmt.take_undefined(), vec!["missing".to_string()]);
    assert!(fmt.take_undefined().is_empty());
}
