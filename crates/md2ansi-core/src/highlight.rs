//! Syntax highlighting for fenced code blocks.
//!
//! A small hand-written tokenizer per language family: keywords, builtins,
//! strings, comments, numbers, and the name following a defining keyword.
//! String and block-comment state carries from one line to the next.

use serde::Serialize;

use crate::ansi::{sanitize, ColorScheme};

/// Class of a code token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Plain,
    Keyword,
    Builtin,
    String,
    Comment,
    Number,
    Function,
    TypeName,
}

impl TokenClass {
    /// Escape sequence for this class.
    pub fn color(self, scheme: &ColorScheme) -> &'static str {
        match self {
            TokenClass::Plain => scheme.code,
            TokenClass::Keyword => scheme.keyword,
            TokenClass::Builtin => scheme.builtin,
            TokenClass::String => scheme.string,
            TokenClass::Comment => scheme.comment,
            TokenClass::Number => scheme.number,
            TokenClass::Function => scheme.function,
            TokenClass::TypeName => scheme.type_name,
        }
    }
}

/// A classified run of code text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeToken {
    pub class: TokenClass,
    pub text: String,
}

impl CodeToken {
    fn new(class: TokenClass, text: &str) -> Self {
        Self {
            class,
            text: text.to_string(),
        }
    }
}

/// Languages with highlighting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Bash,
    Rust,
}

impl Language {
    /// Map a fence tag (any case, common aliases) to a language.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lang = match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "jsx" | "ts" | "typescript" | "node" | "mjs" => {
                Language::JavaScript
            }
            "bash" | "sh" | "shell" | "zsh" | "console" => Language::Bash,
            "rust" | "rs" => Language::Rust,
            _ => return None,
        };
        Some(lang)
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Bash => "bash",
            Language::Rust => "rust",
        }
    }

    fn rules(self) -> &'static Rules {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::Bash => &BASH,
            Language::Rust => &RUST,
        }
    }
}

struct Rules {
    keywords: &'static [&'static str],
    builtins: &'static [&'static str],
    line_comment: Option<&'static str>,
    /// `#` only starts a comment at the start of a word.
    comment_at_word_start: bool,
    block_comment: Option<(&'static str, &'static str)>,
    /// String delimiters, longest first. Multi-line ones carry state.
    strings: &'static [Delimiter],
    /// `'x'` char literals; a lone `'` is plain (lifetimes).
    char_literals: bool,
    function_definers: &'static [&'static str],
    type_definers: &'static [&'static str],
}

struct Delimiter {
    open: &'static str,
    multiline: bool,
}

const fn delim(open: &'static str, multiline: bool) -> Delimiter {
    Delimiter { open, multiline }
}

static PYTHON: Rules = Rules {
    keywords: &[
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "False", "finally", "for", "from", "global", "if", "import",
        "in", "is", "lambda", "None", "nonlocal", "not", "or", "pass", "raise", "return",
        "True", "try", "while", "with", "yield",
    ],
    builtins: &[
        "abs", "all", "any", "bin", "bool", "bytearray", "bytes", "callable", "chr",
        "classmethod", "compile", "complex", "delattr", "dict", "dir", "divmod", "enumerate",
        "eval", "exec", "filter", "float", "format", "frozenset", "getattr", "globals",
        "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass",
        "iter", "len", "list", "locals", "map", "max", "min", "next", "object", "oct", "open",
        "ord", "pow", "print", "property", "range", "repr", "reversed", "round", "set",
        "setattr", "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type",
        "vars", "zip",
    ],
    line_comment: Some("#"),
    comment_at_word_start: false,
    block_comment: None,
    strings: &[
        delim("\"\"\"", true),
        delim("'''", true),
        delim("\"", false),
        delim("'", false),
    ],
    char_literals: false,
    function_definers: &["def"],
    type_definers: &["class"],
};

static JAVASCRIPT: Rules = Rules {
    keywords: &[
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "export", "extends", "false", "finally", "for", "function",
        "if", "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this",
        "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield", "let",
        "static", "await", "async", "interface", "type", "enum", "undefined", "of",
    ],
    builtins: &[
        "Array", "Boolean", "Date", "Error", "Function", "JSON", "Math", "Number", "Object",
        "RegExp", "String", "console", "document", "window", "fetch", "setTimeout",
        "setInterval", "Promise", "Map", "Set", "Symbol",
    ],
    line_comment: Some("//"),
    comment_at_word_start: false,
    block_comment: Some(("/*", "*/")),
    strings: &[delim("`", true), delim("\"", false), delim("'", false)],
    char_literals: false,
    function_definers: &["function"],
    type_definers: &["class", "interface", "type", "enum"],
};

static BASH: Rules = Rules {
    keywords: &[
        "if", "then", "else", "elif", "fi", "case", "esac", "for", "while", "until", "do",
        "done", "in", "function", "time", "select", "break", "continue", "return", "declare",
        "readonly", "local", "export", "set", "unset", "shift", "exit", "trap",
    ],
    builtins: &[
        "echo", "printf", "read", "cd", "pwd", "pushd", "popd", "mkdir", "rmdir", "rm", "cp",
        "mv", "ln", "ls", "cat", "grep", "sed", "awk", "find", "test", "source", "eval",
        "exec", "ulimit", "umask", "wait", "kill", "sleep",
    ],
    line_comment: Some("#"),
    comment_at_word_start: true,
    block_comment: None,
    strings: &[delim("\"", true), delim("'", true)],
    char_literals: false,
    function_definers: &["function"],
    type_definers: &[],
};

static RUST: Rules = Rules {
    keywords: &[
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
        "trait", "true", "type", "unsafe", "use", "where", "while",
    ],
    builtins: &[
        "Option", "Some", "None", "Result", "Ok", "Err", "Vec", "String", "Box", "Rc", "Arc",
        "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32",
        "i64", "i128", "isize", "f32", "f64", "println", "print", "eprintln", "format",
        "vec", "panic", "assert", "assert_eq",
    ],
    line_comment: Some("//"),
    comment_at_word_start: false,
    block_comment: Some(("/*", "*/")),
    strings: &[delim("\"", true)],
    char_literals: true,
    function_definers: &["fn"],
    type_definers: &["struct", "enum", "trait", "type", "union"],
};

/// State carried from one line of a block to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Continuation {
    #[default]
    None,
    InString(&'static str),
    InBlockComment(&'static str),
}

/// Tokenize the lines of one code block.
///
/// Returns `None` when `language` has no rules. Escape sequences and
/// control characters are stripped from the code first.
pub fn highlight<S: AsRef<str>>(lines: &[S], language: &str) -> Option<Vec<Vec<CodeToken>>> {
    let rules = Language::from_tag(language)?.rules();
    let mut state = Continuation::None;
    let highlighted = lines
        .iter()
        .map(|line| {
            let clean = sanitize(line.as_ref());
            let mut tokenizer = Tokenizer::new(&clean, rules, state);
            let tokens = tokenizer.run();
            state = tokenizer.state;
            tokens
        })
        .collect();
    Some(highlighted)
}

/// Styled text for one highlighted line, in code color throughout.
pub fn render_line(tokens: &[CodeToken], scheme: &ColorScheme) -> String {
    let mut out = String::from(scheme.code);
    for token in tokens {
        if token.class == TokenClass::Plain {
            out.push_str(&token.text);
        } else {
            out.push_str(token.class.color(scheme));
            out.push_str(&token.text);
            out.push_str(scheme.code);
        }
    }
    out
}

struct Tokenizer<'a> {
    line: &'a str,
    pos: usize,
    rules: &'static Rules,
    state: Continuation,
    tokens: Vec<CodeToken>,
    /// Class for the next identifier, set by a defining keyword.
    pending_definition: Option<TokenClass>,
}

impl<'a> Tokenizer<'a> {
    fn new(line: &'a str, rules: &'static Rules, state: Continuation) -> Self {
        Self {
            line,
            pos: 0,
            rules,
            state,
            tokens: Vec::new(),
            pending_definition: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn push(&mut self, class: TokenClass, end: usize) {
        let text = &self.line[self.pos..end];
        self.pos = end;
        if text.is_empty() {
            return;
        }
        match self.tokens.last_mut() {
            Some(last) if last.class == class => last.text.push_str(text),
            _ => self.tokens.push(CodeToken::new(class, text)),
        }
    }

    fn run(&mut self) -> Vec<CodeToken> {
        match self.state {
            Continuation::InString(close) => self.finish_string(close),
            Continuation::InBlockComment(close) => self.finish_block_comment(close),
            Continuation::None => {}
        }

        while self.pos < self.line.len() {
            self.step();
        }
        std::mem::take(&mut self.tokens)
    }

    fn step(&mut self) {
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return;
        };

        if c.is_whitespace() {
            let len = rest.find(|ch: char| !ch.is_whitespace()).unwrap_or(rest.len());
            self.push(TokenClass::Plain, self.pos + len);
            return;
        }

        if let Some(marker) = self.rules.line_comment {
            if rest.starts_with(marker) && self.comment_allowed() {
                self.push(TokenClass::Comment, self.line.len());
                return;
            }
        }

        if let Some((open, close)) = self.rules.block_comment {
            if rest.starts_with(open) {
                let body = self.pos + open.len();
                match self.line[body..].find(close) {
                    Some(off) => self.push(TokenClass::Comment, body + off + close.len()),
                    None => {
                        self.push(TokenClass::Comment, self.line.len());
                        self.state = Continuation::InBlockComment(close);
                    }
                }
                return;
            }
        }

        for d in self.rules.strings {
            if rest.starts_with(d.open) {
                self.start_string(d);
                return;
            }
        }

        if c == '\'' && self.rules.char_literals {
            if let Some(len) = char_literal_len(rest) {
                self.push(TokenClass::String, self.pos + len);
                return;
            }
        }

        if c.is_ascii_digit() {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'))
                .unwrap_or(rest.len());
            self.push(TokenClass::Number, self.pos + len);
            return;
        }

        if is_ident_start(c) {
            let len = rest
                .find(|ch: char| !is_ident_continue(ch))
                .unwrap_or(rest.len());
            let word = &rest[..len];
            let class = self.classify_word(word);
            self.push(class, self.pos + len);
            return;
        }

        self.push(TokenClass::Plain, self.pos + c.len_utf8());
    }

    fn comment_allowed(&self) -> bool {
        if !self.rules.comment_at_word_start {
            return true;
        }
        self.line[..self.pos]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace)
    }

    fn classify_word(&mut self, word: &str) -> TokenClass {
        if let Some(class) = self.pending_definition.take() {
            return class;
        }
        if self.rules.keywords.contains(&word) {
            if self.rules.function_definers.contains(&word) {
                self.pending_definition = Some(TokenClass::Function);
            } else if self.rules.type_definers.contains(&word) {
                self.pending_definition = Some(TokenClass::TypeName);
            }
            return TokenClass::Keyword;
        }
        if self.rules.builtins.contains(&word) {
            return TokenClass::Builtin;
        }
        TokenClass::Plain
    }

    fn start_string(&mut self, d: &'static Delimiter) {
        let body = self.pos + d.open.len();
        match find_unescaped(&self.line[body..], d.open) {
            Some(off) => self.push(TokenClass::String, body + off + d.open.len()),
            None => {
                self.push(TokenClass::String, self.line.len());
                if d.multiline {
                    self.state = Continuation::InString(d.open);
                }
            }
        }
    }

    fn finish_string(&mut self, close: &'static str) {
        match find_unescaped(self.line, close) {
            Some(off) => {
                self.push(TokenClass::String, off + close.len());
                self.state = Continuation::None;
            }
            None => self.push(TokenClass::String, self.line.len()),
        }
    }

    fn finish_block_comment(&mut self, close: &'static str) {
        match self.line.find(close) {
            Some(off) => {
                self.push(TokenClass::Comment, off + close.len());
                self.state = Continuation::None;
            }
            None => self.push(TokenClass::Comment, self.line.len()),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Offset of the first `needle` in `haystack` not preceded by a backslash.
fn find_unescaped(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1;
            i += haystack[i..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if haystack[i..].starts_with(needle) {
            return Some(i);
        }
        i += haystack[i..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Length of a `'x'` or `'\n'` literal at the start of `text`.
fn char_literal_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().skip(1);
    let (_, first) = chars.next()?;
    if first == '\\' {
        let close = text[2..].find('\'')?;
        return (close <= 10).then_some(close + 3);
    }
    match chars.next() {
        Some((i, '\'')) => Some(i + 1),
        _ => None,
    }
}
