use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::pattern::Bypass;

/// Fatal errors that stop processing of a single input.
#[derive(Debug, Error)]
pub enum Md2AnsiError {
    /// The named file does not exist.
    #[error("file '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    /// The input exceeds the size ceiling.
    #[error("{source_name} is too large ({size} bytes); maximum allowed size is {limit} bytes")]
    InputTooLarge {
        source_name: String,
        size: u64,
        limit: u64,
    },

    /// The input is not valid UTF-8 text.
    #[error("{0} is not a valid UTF-8 text file")]
    NotUtf8(String),

    /// An unrecognized flag or a malformed flag value.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Any other I/O failure (permission denied, directory, broken pipe).
    #[error("failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
}

impl Md2AnsiError {
    pub(crate) fn io(source_name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            source_name: source_name.into(),
            source,
        }
    }
}

/// Categories of recoverable degradations met while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A code fence was never closed; the rest of the document became code.
    UnterminatedFence,
    /// A multi-row table had no valid separator row.
    MissingTableSeparator,
    /// A citation named a footnote that is never defined.
    UndefinedFootnote,
    /// A footnote id was defined more than once; the first definition wins.
    DuplicateFootnote,
    /// A pattern evaluation was skipped for size or ran out of time.
    PatternBypassed,
}

/// A degradation with the source line it was found on.
///
/// Diagnostics never stop rendering: the offending construct is emitted
/// as literal or best-effort text instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message
    pub message: String,
    /// 1-based source line, when known
    pub line: Option<usize>,
    /// Category
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
            kind,
        }
    }

    /// An unterminated code fence opened at `line`.
    pub fn unterminated_fence(fence: &str, line: usize) -> Self {
        Self::new(
            DiagnosticKind::UnterminatedFence,
            format!("unclosed code fence {}", fence),
            Some(line),
        )
    }

    /// A table starting at `line` without a separator row.
    pub fn missing_table_separator(line: usize) -> Self {
        Self::new(
            DiagnosticKind::MissingTableSeparator,
            "table has no separator row",
            Some(line),
        )
    }

    /// A citation of an id that has no definition.
    pub fn undefined_footnote(id: &str, line: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::UndefinedFootnote,
            format!("footnote [^{}] has no definition", id),
            line,
        )
    }

    /// A repeated definition of `id`.
    pub fn duplicate_footnote(id: &str, line: usize) -> Self {
        Self::new(
            DiagnosticKind::DuplicateFootnote,
            format!("footnote [^{}] defined more than once", id),
            Some(line),
        )
    }

    /// A pattern evaluation that was skipped or discarded.
    pub fn pattern_bypassed(bypass: Bypass, line: Option<usize>) -> Self {
        let message = match bypass {
            Bypass::TooLarge { len } => {
                format!("pattern skipped on {} byte subject; text left as is", len)
            }
            Bypass::TimedOut { elapsed } => {
                format!("pattern timed out after {:?}; text left as is", elapsed)
            }
        };
        Self::new(DiagnosticKind::PatternBypassed, message, line)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }
        Ok(())
    }
}

/// Diagnostics collected while rendering one document.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Check if nothing degraded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate over the diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Check if any diagnostic has the given kind.
    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
