//! Render configuration.

use crate::ansi::ColorScheme;

/// Target output width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Width {
    /// Ask the terminal (see [`crate::terminal::detect_terminal_width`]).
    #[default]
    Auto,
    /// Fixed column count; clamped to the sane range when resolved.
    Fixed(usize),
}

/// Immutable feature switches for one rendering run.
///
/// Built once from startup arguments. Use [`RenderOptions::plain`] or
/// [`RenderOptions::with_plain`] for plain mode: it turns every feature off
/// and selects [`ColorScheme::PLAIN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: Width,
    pub footnotes: bool,
    pub syntax_highlight: bool,
    pub tables: bool,
    pub task_lists: bool,
    pub images: bool,
    pub links: bool,
    /// Render definitions nobody cites after the cited ones.
    pub uncited_footnotes: bool,
    /// List ids cited without a definition in the footnotes section.
    pub missing_footnotes: bool,
    pub plain: bool,
    /// Emit `tracing` debug events from every stage.
    pub debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: Width::Auto,
            footnotes: true,
            syntax_highlight: true,
            tables: true,
            task_lists: true,
            images: true,
            links: true,
            uncited_footnotes: true,
            missing_footnotes: false,
            plain: false,
            debug: false,
        }
    }
}

impl RenderOptions {
    /// Plain mode: no features, no color.
    pub fn plain() -> Self {
        Self::default().with_plain(true)
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    /// Switch plain mode on or off. Turning it on forces all features off.
    pub fn with_plain(mut self, plain: bool) -> Self {
        self.plain = plain;
        if plain {
            self.footnotes = false;
            self.syntax_highlight = false;
            self.tables = false;
            self.task_lists = false;
            self.images = false;
            self.links = false;
        }
        self
    }

    pub fn with_footnotes(mut self, on: bool) -> Self {
        self.footnotes = on && !self.plain;
        self
    }

    pub fn with_syntax_highlight(mut self, on: bool) -> Self {
        self.syntax_highlight = on && !self.plain;
        self
    }

    pub fn with_tables(mut self, on: bool) -> Self {
        self.tables = on && !self.plain;
        self
    }

    pub fn with_task_lists(mut self, on: bool) -> Self {
        self.task_lists = on && !self.plain;
        self
    }

    pub fn with_images(mut self, on: bool) -> Self {
        self.images = on && !self.plain;
        self
    }

    pub fn with_links(mut self, on: bool) -> Self {
        self.links = on && !self.plain;
        self
    }

    pub fn with_uncited_footnotes(mut self, on: bool) -> Self {
        self.uncited_footnotes = on;
        self
    }

    pub fn with_missing_footnotes(mut self, on: bool) -> Self {
        self.missing_footnotes = on;
        self
    }

    pub fn with_debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    /// The color scheme these options select.
    pub fn scheme(&self) -> &'static ColorScheme {
        if self.plain {
            &ColorScheme::PLAIN
        } else {
            &ColorScheme::ANSI
        }
    }
}
