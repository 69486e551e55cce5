//! Immutable-per-version document text with a line index.

use crate::error::Result;
use crate::state::changes::ChangeSet;
use crate::string_utils::safe_slice;

/// A line of the document, without its trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 0-based line number
    pub number: usize,
    /// Byte offset of the first character
    pub from: usize,
    /// Byte offset just past the last character (before the newline)
    pub to: usize,
    pub text: &'a str,
}

impl Line<'_> {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The document text at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    /// Byte offset of the start of every line
    line_starts: Vec<usize>,
    version: u64,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_version(text.into(), 0)
    }

    fn with_version(text: String, version: u64) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            text,
            line_starts,
            version,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Monotonic version, bumped by every applied change set.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The 0-based line `number`, or `None` past the end.
    pub fn line(&self, number: usize) -> Option<Line<'_>> {
        let from = *self.line_starts.get(number)?;
        let to = self
            .line_starts
            .get(number + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let to = if to > from && self.text.as_bytes()[to - 1] == b'\r' {
            to - 1
        } else {
            to
        };
        Some(Line {
            number,
            from,
            to,
            text: &self.text[from..to],
        })
    }

    /// The line containing `pos` (clamped to the document).
    pub fn line_at(&self, pos: usize) -> Line<'_> {
        let pos = pos.min(self.text.len());
        let number = match self.line_starts.binary_search(&pos) {
            Ok(n) => n,
            Err(n) => n - 1,
        };
        // line_starts is never empty and number < line_starts.len()
        self.line(number).unwrap_or(Line {
            number: 0,
            from: 0,
            to: 0,
            text: "",
        })
    }

    /// UTF-8 safe slice of `from..to`.
    pub fn slice(&self, from: usize, to: usize) -> &str {
        safe_slice(&self.text, from, to)
    }

    pub fn lines(&self) -> impl Iterator<Item = Line<'_>> {
        (0..self.line_count()).filter_map(move |n| self.line(n))
    }

    /// Apply `changes`, producing the next version.
    pub fn apply(&self, changes: &ChangeSet) -> Result<Document> {
        let text = changes.apply(&self.text)?;
        Ok(Self::with_version(text, self.version + 1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let doc = Document::new("one\ntwo\n\nfour");
        assert_eq!(doc.line_count(), 4);
        let line = doc.line(1).unwrap();
        assert_eq!((line.from, line.to, line.text), (4, 7, "two"));
        assert!(doc.line(2).unwrap().is_empty());
        assert_eq!(doc.line(3).unwrap().text, "four");
        assert!(doc.line(4).is_none());
    }

    #[test]
    fn test_line_at_boundaries() {
        let doc = Document::new("ab\ncd");
        assert_eq!(doc.line_at(0).number, 0);
        assert_eq!(doc.line_at(2).number, 0);
        assert_eq!(doc.line_at(3).number, 1);
        assert_eq!(doc.line_at(99).number, 1);
    }

    #[test]
    fn test_trailing_newline_makes_empty_last_line() {
        let doc = Document::new("ab\n");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.line(1).unwrap().text, "");
    }

    #[test]
    fn test_crlf_excluded_from_line_text() {
        let doc = Document::new("ab\r\ncd");
        assert_eq!(doc.line(0).unwrap().text, "ab");
    }

    #[test]
    fn test_apply_bumps_version() {
        let doc = Document::new("hello");
        let changes = ChangeSet::insert(5, 5, "\nworld").unwrap();
        let next = doc.apply(&changes).unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(next.line(1).unwrap().text, "world");
    }
}
