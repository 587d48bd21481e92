//! Input guard: loads documents under a hard size ceiling.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::Md2AnsiError;
use crate::lexer::Lexer;

/// Largest accepted input, in bytes (10 MiB).
pub const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

const CHUNK_SIZE: usize = 8192;

/// Where a document comes from.
pub enum Source<'r> {
    /// A file on disk.
    Path(PathBuf),
    /// Any byte stream, typically standard input.
    Stream {
        name: String,
        reader: Box<dyn Read + 'r>,
    },
}

impl<'r> Source<'r> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn stream(name: impl Into<String>, reader: impl Read + 'r) -> Self {
        Source::Stream {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// Standard input.
    pub fn stdin() -> Source<'static> {
        Source::stream("stdin", io::stdin())
    }

    /// Name used in messages.
    pub fn name(&self) -> String {
        match self {
            Source::Path(p) => p.display().to_string(),
            Source::Stream { name, .. } => name.clone(),
        }
    }
}

impl std::fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Source::Stream { name, .. } => f.debug_struct("Stream").field("name", name).finish_non_exhaustive(),
        }
    }
}

/// A loaded Markdown document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    text: String,
}

impl Document {
    /// Wrap already-loaded text. No size check is applied.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Load a document, rejecting anything over [`MAX_INPUT_BYTES`].
    pub fn load(source: Source<'_>) -> Result<Self, Md2AnsiError> {
        load_with_limit(source, MAX_INPUT_BYTES)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source size in bytes.
    pub fn size(&self) -> u64 {
        self.text.len() as u64
    }

    /// The document's lines, in order.
    pub fn lines(&self) -> Lexer<'_> {
        Lexer::new(&self.text)
    }
}

/// [`Document::load`] with a caller-chosen ceiling.
pub fn load_with_limit(source: Source<'_>, limit: u64) -> Result<Document, Md2AnsiError> {
    let name = source.name();
    let bytes = match source {
        Source::Path(path) => read_file(&path, &name, limit)?,
        Source::Stream { reader, .. } => read_stream(reader, &name, limit)?,
    };
    let text = String::from_utf8(bytes).map_err(|_| Md2AnsiError::NotUtf8(name.clone()))?;
    Ok(Document { name, text })
}

fn read_file(path: &Path, name: &str, limit: u64) -> Result<Vec<u8>, Md2AnsiError> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Md2AnsiError::InputNotFound(path.to_path_buf()),
        _ => Md2AnsiError::io(name, e),
    })?;

    if meta.is_dir() {
        return Err(Md2AnsiError::io(
            name,
            io::Error::new(io::ErrorKind::Other, "is a directory, not a file"),
        ));
    }
    if meta.len() > limit {
        return Err(Md2AnsiError::InputTooLarge {
            source_name: name.to_string(),
            size: meta.len(),
            limit,
        });
    }

    // The file may grow between the metadata call and the read.
    let file = fs::File::open(path).map_err(|e| Md2AnsiError::io(name, e))?;
    read_stream(Box::new(file), name, limit)
}

fn read_stream(mut reader: Box<dyn Read + '_>, name: &str, limit: u64) -> Result<Vec<u8>, Md2AnsiError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Md2AnsiError::io(name, e)),
        };
        if (buf.len() + n) as u64 > limit {
            return Err(Md2AnsiError::InputTooLarge {
                source_name: name.to_string(),
                size: (buf.len() + n) as u64,
                limit,
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}
