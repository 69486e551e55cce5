//! Custom inline delimiter extensions
//!
//! Three small grammar extensions add inline constructs that CommonMark does
//! not have:
//!
//! | Construct       | Delimiter | Node            | Marker node           |
//! |-----------------|-----------|-----------------|-----------------------|
//! | Mark/highlight  | `==`      | `Mark`          | `MarkMarker`          |
//! | Strikethrough   | `~~`      | `Strikethrough` | `StrikethroughMarker` |
//! | Underline       | `~`       | `Underline`     | `UnderlineMarker`     |
//!
//! Each extension only recognises delimiter runs; every run is flagged as
//! both an opener and a closer candidate, and [`DelimiterRegistry::resolve`]
//! pairs them into spans.
//!
//! # Precedence
//!
//! Strikethrough and underline share the `~` character. Extensions are tried
//! longest delimiter first, so `~~` is always claimed by strikethrough before
//! the underline scan sees it. On top of that a single-character delimiter
//! never fires next to another copy of its own character.

use crate::syntax::tree::{NodeKind, SyntaxNode};

// ─────────────────────────────────────────────────────────────────────────────
// Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// A delimiter-based inline grammar extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterExtension {
    pub name: &'static str,
    pub delimiter: &'static str,
    pub node: NodeKind,
    pub marker: NodeKind,
}

/// A delimiter run found in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRun {
    /// Index of the extension in its registry
    pub extension: usize,
    pub from: usize,
    pub to: usize,
    pub can_open: bool,
    pub can_close: bool,
}

impl DelimiterExtension {
    /// `==highlight==`
    pub fn mark() -> Self {
        Self {
            name: "mark",
            delimiter: "==",
            node: NodeKind::Mark,
            marker: NodeKind::MarkMarker,
        }
    }

    /// `~~strikethrough~~`
    pub fn strikethrough() -> Self {
        Self {
            name: "strikethrough",
            delimiter: "~~",
            node: NodeKind::Strikethrough,
            marker: NodeKind::StrikethroughMarker,
        }
    }

    /// `~underline~`
    pub fn underline() -> Self {
        Self {
            name: "underline",
            delimiter: "~",
            node: NodeKind::Underline,
            marker: NodeKind::UnderlineMarker,
        }
    }

    /// Try to recognise this extension's delimiter at `pos`.
    ///
    /// Returns the run `(from, to)` spanning the marker characters.
    pub fn scan(&self, text: &str, pos: usize) -> Option<(usize, usize)> {
        let rest = text.get(pos..)?;
        if !rest.starts_with(self.delimiter) || is_escaped(text, pos) {
            return None;
        }
        let end = pos + self.delimiter.len();

        if self.delimiter.len() == 1 {
            let ch = self.delimiter.as_bytes()[0];
            let before = pos.checked_sub(1).map(|i| text.as_bytes()[i]);
            let after = text.as_bytes().get(end).copied();
            if before == Some(ch) || after == Some(ch) {
                return None;
            }
        }

        Some((pos, end))
    }
}

/// Whether the byte at `pos` is preceded by an odd number of backslashes.
fn is_escaped(text: &str, pos: usize) -> bool {
    let backslashes = text.as_bytes()[..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered set of delimiter extensions.
#[derive(Debug, Clone, Default)]
pub struct DelimiterRegistry {
    extensions: Vec<DelimiterExtension>,
}

impl DelimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark, strikethrough and underline.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DelimiterExtension::underline());
        registry.register(DelimiterExtension::mark());
        registry.register(DelimiterExtension::strikethrough());
        registry
    }

    /// Add an extension. Registration order does not matter: longer
    /// delimiters always take precedence over shorter ones.
    pub fn register(&mut self, extension: DelimiterExtension) {
        let at = self
            .extensions
            .iter()
            .position(|e| e.delimiter.len() < extension.delimiter.len())
            .unwrap_or(self.extensions.len());
        self.extensions.insert(at, extension);
    }

    pub fn extensions(&self) -> &[DelimiterExtension] {
        &self.extensions
    }

    /// Collect delimiter runs in `from..to`, skipping the `excluded` ranges
    /// (code spans, raw HTML, link destinations).
    pub fn scan_runs(
        &self,
        text: &str,
        from: usize,
        to: usize,
        excluded: &[(usize, usize)],
    ) -> Vec<DelimiterRun> {
        let to = to.min(text.len());
        let mut runs = Vec::new();
        let mut pos = from;

        'outer: while pos < to {
            if let Some(&(_, end)) = excluded.iter().find(|(s, e)| *s <= pos && pos < *e) {
                pos = end;
                continue;
            }

            for (index, extension) in self.extensions.iter().enumerate() {
                if let Some((start, end)) = extension.scan(text, pos) {
                    let enters_excluded = excluded.iter().any(|(s, e)| start < *e && *s < end);
                    if end <= to && !enters_excluded {
                        runs.push(DelimiterRun {
                            extension: index,
                            from: start,
                            to: end,
                            can_open: true,
                            can_close: true,
                        });
                        pos = end;
                        continue 'outer;
                    }
                }
            }

            pos += text[pos..].chars().next().map_or(1, char::len_utf8);
        }

        runs
    }

    /// Pair delimiter runs into span nodes (with their marker children).
    ///
    /// A closer pairs with the nearest open run of the same extension; any
    /// openers between them are discarded so spans never cross. Empty spans
    /// are never formed.
    pub fn resolve(&self, runs: &[DelimiterRun]) -> Vec<SyntaxNode> {
        let mut openers: Vec<DelimiterRun> = Vec::new();
        let mut nodes = Vec::new();

        for run in runs {
            if run.can_close {
                let opener = openers
                    .iter()
                    .rposition(|o| o.extension == run.extension && o.to < run.from);
                if let Some(index) = opener {
                    let open = openers[index];
                    openers.truncate(index);
                    let extension = &self.extensions[run.extension];
                    nodes.push(
                        SyntaxNode::new(extension.node, open.from, run.to).with_children(vec![
                            SyntaxNode::new(extension.marker, open.from, open.to),
                            SyntaxNode::new(extension.marker, run.from, run.to),
                        ]),
                    );
                    continue;
                }
            }
            if run.can_open {
                openers.push(*run);
            }
        }

        nodes.sort_by_key(|n| (n.from, std::cmp::Reverse(n.to)));
        nodes
    }

    /// Scan and resolve in one step.
    pub fn parse_inline(
        &self,
        text: &str,
        from: usize,
        to: usize,
        excluded: &[(usize, usize)],
    ) -> Vec<SyntaxNode> {
        self.resolve(&self.scan_runs(text, from, to, excluded))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<SyntaxNode> {
        DelimiterRegistry::with_defaults().parse_inline(text, 0, text.len(), &[])
    }

    #[test]
    fn test_longest_delimiter_first_regardless_of_registration() {
        let registry = DelimiterRegistry::with_defaults();
        let order: Vec<_> = registry.extensions().iter().map(|e| e.name).collect();
        assert_eq!(order, vec!["mark", "strikethrough", "underline"]);
    }

    #[test]
    fn test_double_tilde_is_one_strikethrough() {
        let nodes = parse("~~x~~");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Strikethrough);
        assert_eq!((nodes[0].from, nodes[0].to), (0, 5));
        let markers: Vec<_> = nodes[0].markers().map(|m| (m.from, m.to)).collect();
        assert_eq!(markers, vec![(0, 2), (3, 5)]);
    }

    #[test]
    fn test_single_tilde_is_underline() {
        let nodes = parse("a ~word~ b");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Underline);
        assert_eq!((nodes[0].from, nodes[0].to), (2, 8));
    }

    #[test]
    fn test_mark() {
        let nodes = parse("some ==hot== text");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Mark);
        assert_eq!((nodes[0].from, nodes[0].to), (5, 12));
    }

    #[test]
    fn test_underline_inside_strikethrough() {
        let nodes = parse("~~a ~b~ c~~");
        let kinds: Vec<_> = nodes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Strikethrough, NodeKind::Underline]);
    }

    #[test]
    fn test_empty_span_not_formed() {
        assert!(parse("====").is_empty());
    }

    #[test]
    fn test_escaped_delimiter_ignored() {
        assert!(parse(r"\==no== ").iter().all(|n| n.from != 0));
        assert!(parse(r"\~a~").is_empty());
    }

    #[test]
    fn test_unmatched_inner_opener_discarded() {
        let nodes = parse("==a ~~b== c~~");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Mark);
    }

    #[test]
    fn test_excluded_ranges_skipped() {
        let text = "==a `==` b==";
        let registry = DelimiterRegistry::with_defaults();
        let nodes = registry.parse_inline(text, 0, text.len(), &[(4, 8)]);
        assert_eq!(nodes.len(), 1);
        assert_eq!((nodes[0].from, nodes[0].to), (0, 12));
    }
}
