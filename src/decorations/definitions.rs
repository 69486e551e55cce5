//! Footnote and link definition pre-scan
//!
//! Definition lines are found by a line scan rather than the tree walk, as
//! the parser consumes link definitions without leaving nodes for them. The
//! tree walk skips every node that starts on a claimed line.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::decorations::Decoration;
use crate::state::{Document, Selection};
use crate::widgets::{InlineWidget, WidgetKind};

/// `[^label]: …`
const FOOTNOTE_DEFINITION: &str = r"^\[\^([^\]]+)\]:\s*";
/// `[label]: target`
const LINK_DEFINITION: &str = r"^\[([^\]]+)\]:\s*(\S+)";

static FOOTNOTE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Footnote,
    Link,
}

/// A line claimed by a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLine {
    /// 0-based line number
    pub number: usize,
    pub from: usize,
    pub to: usize,
    /// End of the `[label]:` prefix and the whitespace after it
    pub prefix_end: usize,
    pub kind: DefinitionKind,
    pub label: String,
    /// Link target, for link definitions
    pub target: Option<String>,
}

/// Result of the pre-scan.
#[derive(Debug, Clone, Default)]
pub struct DefinitionScan {
    pub lines: Vec<DefinitionLine>,
    claimed: HashSet<usize>,
}

impl DefinitionScan {
    /// Whether line `number` is a definition line.
    pub fn is_claimed(&self, number: usize) -> bool {
        self.claimed.contains(&number)
    }

    /// Compact widgets for every definition line the selection does not touch.
    ///
    /// A footnote keeps its text and only the `[^label]:` prefix is replaced;
    /// a link definition is replaced whole.
    pub fn decorations(
        &self,
        doc: &Document,
        selection: &Selection,
        hide_markers: bool,
    ) -> Vec<Decoration> {
        if !hide_markers {
            return Vec::new();
        }
        self.lines
            .iter()
            .filter(|line| !selection.overlaps(line.from, line.to))
            .map(|line| {
                let widget = InlineWidget::new(
                    WidgetKind::Definition {
                        label: line.label.clone(),
                        target: line.target.clone(),
                        footnote: line.kind == DefinitionKind::Footnote,
                    },
                    line.label.clone(),
                    doc.slice(line.from, line.to),
                    line.from,
                );
                let end = match line.kind {
                    DefinitionKind::Footnote => line.prefix_end,
                    DefinitionKind::Link => line.to,
                };
                Decoration::replace(line.from, end, widget)
            })
            .collect()
    }
}

/// Scan every line once. The footnote pattern is tried first, so a footnote
/// definition is never also taken as a link definition.
pub fn scan_definitions(doc: &Document) -> DefinitionScan {
    let (Some(footnote), Some(link)) = (
        compiled(&FOOTNOTE_RE, FOOTNOTE_DEFINITION),
        compiled(&LINK_RE, LINK_DEFINITION),
    ) else {
        return DefinitionScan::default();
    };

    let mut scan = DefinitionScan::default();
    for line in doc.lines() {
        let found = if let Some(caps) = footnote.captures(line.text) {
            caps.get(1).map(|label| DefinitionLine {
                number: line.number,
                from: line.from,
                to: line.to,
                prefix_end: line.from + caps.get(0).map_or(0, |m| m.end()),
                kind: DefinitionKind::Footnote,
                label: label.as_str().to_string(),
                target: None,
            })
        } else if let Some(caps) = link.captures(line.text) {
            caps.get(1).map(|label| DefinitionLine {
                number: line.number,
                from: line.from,
                to: line.to,
                prefix_end: line.from + caps.get(2).map_or(0, |m| m.start()),
                kind: DefinitionKind::Link,
                label: label.as_str().to_string(),
                target: caps.get(2).map(|m| m.as_str().to_string()),
            })
        } else {
            None
        };

        if let Some(definition) = found {
            scan.claimed.insert(definition.number);
            scan.lines.push(definition);
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footnote_precedence() {
        let doc = Document::new("[^note]: text");
        let scan = scan_definitions(&doc);
        assert_eq!(scan.lines.len(), 1);
        assert_eq!(scan.lines[0].kind, DefinitionKind::Footnote);
        assert_eq!(scan.lines[0].label, "note");
        assert_eq!(scan.lines[0].target, None);
    }

    #[test]
    fn test_link_definition() {
        let doc = Document::new("intro\n\n[docs]: https://example.com \"Title\"");
        let scan = scan_definitions(&doc);
        assert!(scan.is_claimed(2));
        assert!(!scan.is_claimed(0));
        let line = &scan.lines[0];
        assert_eq!(line.kind, DefinitionKind::Link);
        assert_eq!(line.target.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_link_definition_needs_target() {
        let doc = Document::new("[docs]:   \n[x]: y");
        let scan = scan_definitions(&doc);
        assert!(!scan.is_claimed(0));
        assert!(scan.is_claimed(1));
    }

    #[test]
    fn test_footnote_prefix_replaced() {
        let doc = Document::new("body\n[^n]: A note.");
        let scan = scan_definitions(&doc);
        let decorations = scan.decorations(&doc, &Selection::cursor(0), true);
        assert_eq!(decorations.len(), 1);
        assert_eq!((decorations[0].from, decorations[0].to), (5, 11));
    }

    #[test]
    fn test_caret_on_line_reveals() {
        let doc = Document::new("body\n[d]: url");
        let scan = scan_definitions(&doc);
        assert!(scan.decorations(&doc, &Selection::cursor(8), true).is_empty());
        assert!(scan.decorations(&doc, &Selection::cursor(0), false).is_empty());
        assert_eq!(scan.decorations(&doc, &Selection::cursor(0), true).len(), 1);
    }
}
