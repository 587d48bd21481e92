//! Footnote definitions and citation numbering.

use indexmap::{IndexMap, IndexSet};

use crate::ansi::ColorScheme;

/// Footnote definitions plus the numbers handed out to citations.
///
/// Numbers are assigned on first citation, starting at 1. Definitions
/// keep the text of the first definition seen for an id.
#[derive(Debug, Clone, Default)]
pub struct FootnoteRegistry {
    definitions: IndexMap<String, String>,
    citations: IndexMap<String, usize>,
    /// Cited ids with no definition, in order of first citation.
    missing: IndexSet<String>,
}

/// One line of the footnotes section, before styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteEntry<'a> {
    pub number: usize,
    pub id: &'a str,
    pub text: &'a str,
}

impl FootnoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition. Returns `false` if `id` was already defined,
    /// in which case the earlier text is kept.
    pub fn define(&mut self, id: &str, text: &str) -> bool {
        if self.definitions.contains_key(id) {
            return false;
        }
        self.definitions.insert(id.to_string(), text.to_string());
        true
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Cite `id`, returning its number. `None` if it has no definition;
    /// the id is then remembered as missing.
    pub fn cite(&mut self, id: &str) -> Option<usize> {
        if !self.definitions.contains_key(id) {
            if !self.missing.contains(id) {
                self.missing.insert(id.to_string());
            }
            return None;
        }
        if let Some(&n) = self.citations.get(id) {
            return Some(n);
        }
        let n = self.citations.len() + 1;
        self.citations.insert(id.to_string(), n);
        Some(n)
    }

    /// The number already given to `id`, without citing it.
    pub fn number_of(&self, id: &str) -> Option<usize> {
        self.citations.get(id).copied()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn citation_count(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids cited without a definition, in order of first citation.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(String::as_str)
    }

    /// Entries for the footnotes section: cited definitions in citation
    /// order, then (if `include_uncited`) the rest in definition order.
    pub fn entries(&self, include_uncited: bool) -> Vec<FootnoteEntry<'_>> {
        let mut out: Vec<FootnoteEntry<'_>> = self
            .citations
            .iter()
            .filter_map(|(id, &number)| {
                self.definitions.get(id).map(|text| FootnoteEntry {
                    number,
                    id,
                    text,
                })
            })
            .collect();

        if include_uncited {
            let mut next = self.citations.len();
            for (id, text) in &self.definitions {
                if self.citations.contains_key(id) {
                    continue;
                }
                next += 1;
                out.push(FootnoteEntry {
                    number: next,
                    id,
                    text,
                });
            }
        }
        out
    }

    /// Render the footnotes section.
    ///
    /// `format` turns definition text into styled text. Cited entries come
    /// first, then (if `include_missing`) a placeholder for every id cited
    /// without a definition, then the uncited entries. Returns nothing when
    /// the document defines no footnote or there is no line to show.
    pub fn render_definitions<F>(
        &self,
        scheme: &ColorScheme,
        include_uncited: bool,
        include_missing: bool,
        mut format: F,
    ) -> Vec<String>
    where
        F: FnMut(&str) -> String,
    {
        if self.definitions.is_empty() {
            return Vec::new();
        }
        let entries = self.entries(include_uncited);
        let missing: Vec<&str> = if include_missing {
            self.missing().collect()
        } else {
            Vec::new()
        };
        if entries.is_empty() && missing.is_empty() {
            return Vec::new();
        }

        let marker = |label: &str| {
            format!(
                "{}[{}{}^{}{}{}]: ",
                scheme.text, scheme.bold, scheme.dim, label, scheme.reset, scheme.text
            )
        };

        let cited = entries.iter().filter(|e| e.number <= self.citations.len()).count();
        let mut lines = Vec::with_capacity(entries.len() + missing.len() + 3);
        lines.push(String::new());
        lines.push(format!("{}Footnotes:{}", scheme.heading(2), scheme.reset));
        lines.push(String::new());
        for entry in &entries[..cited] {
            lines.push(marker(&entry.number.to_string()) + &format(entry.text));
        }
        for id in missing {
            lines.push(marker(id) + "Missing footnote definition");
        }
        for entry in &entries[cited..] {
            lines.push(marker(&entry.number.to_string()) + &format(entry.text));
        }
        lines
    }
}
