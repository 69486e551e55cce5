//! Syntax provider backed by comrak
//!
//! This module wraps comrak's parser and converts its AST into the
//! offset-based [`SyntaxTree`] the decoration engine consumes:
//!
//! - comrak's 1-based line/column source positions become byte offsets
//! - delimiter runs (`#`, `*`, `` ` ``, list bullets) become marker children
//! - every range is validated against the source; nodes whose range does not
//!   fit are dropped and their children lifted to the parent
//! - the custom delimiter extensions (mark, strikethrough, underline) run over
//!   the inline text of each leaf block
//!
//! comrak's own strikethrough extension is disabled so that `~~` and `~` are
//! left to the delimiter extensions.

use std::time::Instant;

use comrak::{
    nodes::{AstNode, ListType as ComrakListType, NodeValue},
    parse_document, Arena, Options,
};
use log::debug;

use crate::syntax::delimiters::DelimiterRegistry;
use crate::syntax::tree::{NodeKind, SyntaxNode, SyntaxTree};

// ─────────────────────────────────────────────────────────────────────────────
// Provider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Produces a syntax tree for a document. This is the seam for the host's
/// (possibly incremental) parser.
pub trait SyntaxProvider: Send + Sync {
    fn parse(&self, text: &str) -> SyntaxTree;
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration options for markdown parsing.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable footnotes
    pub footnotes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
        }
    }
}

impl MarkdownOptions {
    /// Convert to comrak Options.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        options.extension.strikethrough = false;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.footnotes = self.footnotes;

        options
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Comrak Provider
// ─────────────────────────────────────────────────────────────────────────────

/// The bundled syntax provider.
#[derive(Debug, Clone)]
pub struct ComrakSyntax {
    options: MarkdownOptions,
    delimiters: DelimiterRegistry,
}

impl Default for ComrakSyntax {
    fn default() -> Self {
        Self {
            options: MarkdownOptions::default(),
            delimiters: DelimiterRegistry::with_defaults(),
        }
    }
}

impl ComrakSyntax {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_delimiters(mut self, delimiters: DelimiterRegistry) -> Self {
        self.delimiters = delimiters;
        self
    }
}

impl SyntaxProvider for ComrakSyntax {
    fn parse(&self, text: &str) -> SyntaxTree {
        let started = Instant::now();
        let arena = Arena::new();
        let root = parse_document(&arena, text, &self.options.to_comrak_options());
        let index = LineIndex::new(text);

        let children = root
            .children()
            .flat_map(|child| convert_node(child, text, &index))
            .collect();
        let mut document = SyntaxNode::new(NodeKind::Document, 0, text.len()).with_children(children);
        apply_delimiters(&mut document, text, &self.delimiters);

        debug!(
            "Parsed {} bytes into {} top-level nodes in {:?}",
            text.len(),
            document.children.len(),
            started.elapsed()
        );
        SyntaxTree::new(document)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Source Positions
// ─────────────────────────────────────────────────────────────────────────────

/// Converts comrak's 1-based line/column positions into byte offsets.
struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            starts,
            len: text.len(),
        }
    }

    fn offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let offset = self.starts.get(line - 1)? + column - 1;
        (offset <= self.len).then_some(offset)
    }

    /// Exclusive end offset for an inclusive end position.
    ///
    /// A block closed by a blank line ends at column 0 of a later line; that
    /// position stands for the newline before the line.
    fn end_offset(&self, line: usize, column: usize) -> Option<usize> {
        if column == 0 {
            let start = *self.starts.get(line.checked_sub(1)?)?;
            return Some(start.saturating_sub(1));
        }
        Some((self.offset(line, column)? + 1).min(self.len))
    }

    /// End of the line containing `pos`, before its newline.
    fn line_end(&self, text: &str, pos: usize) -> usize {
        let end = text[pos..].find('\n').map_or(self.len, |i| pos + i);
        if end > pos && text.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        }
    }

    /// Half-open byte range for an inclusive start/end position pair, with
    /// trailing line breaks trimmed.
    fn range(
        &self,
        text: &str,
        start: (usize, usize),
        end: (usize, usize),
    ) -> Option<(usize, usize)> {
        let from = self.offset(start.0, start.1)?;
        let mut to = self.end_offset(end.0, end.1)?;
        if from >= self.len {
            return None;
        }
        while to > from && matches!(text.as_bytes()[to - 1], b'\n' | b'\r') {
            to -= 1;
        }
        if to <= from {
            to = self.line_end(text, from);
        }
        (from < to).then_some((from, to))
    }
}

/// Widen a code span's content range over its backtick fences.
fn widen_code_span(text: &str, from: usize, to: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut left = from;
    if left >= 2 && bytes[left - 1] == b' ' && bytes[left - 2] == b'`' {
        left -= 1;
    }
    let mut right = to;
    if bytes.get(right) == Some(&b' ') && bytes.get(right + 1) == Some(&b'`') {
        right += 1;
    }
    let open = bytes[..left].iter().rev().take_while(|&&b| b == b'`').count();
    let close = bytes[right..].iter().take_while(|&&b| b == b'`').count();
    if open > 0 && open == close {
        (left - open, right + close)
    } else {
        (from, to)
    }
}

/// Extend a one-line setext heading range over its underline.
fn extend_setext(text: &str, from: usize, to: usize) -> usize {
    if text[from..to].contains('\n') || !text[to..].starts_with('\n') {
        return to;
    }
    let next = &text[to + 1..];
    let line = next.split('\n').next().unwrap_or_default().trim_end();
    let body = line.trim_start();
    if !body.is_empty() && body.bytes().all(|b| b == b'=' || b == b'-') {
        to + 1 + line.len()
    } else {
        to
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Map a comrak node value to a node kind. Text-like leaves map to `None`.
fn node_kind(value: &NodeValue) -> Option<NodeKind> {
    let kind = match value {
        NodeValue::Document => NodeKind::Document,
        NodeValue::BlockQuote => NodeKind::Blockquote,
        NodeValue::List(list) => match list.list_type {
            ComrakListType::Bullet => NodeKind::BulletList,
            ComrakListType::Ordered => NodeKind::OrderedList,
        },
        NodeValue::Item(_) | NodeValue::TaskItem(_) => NodeKind::ListItem,
        NodeValue::CodeBlock(code) => {
            if code.fenced {
                NodeKind::FencedCode
            } else {
                NodeKind::CodeBlock
            }
        }
        NodeValue::HtmlBlock(_) => NodeKind::HtmlBlock,
        NodeValue::Paragraph => NodeKind::Paragraph,
        NodeValue::Heading(heading) => {
            if heading.setext {
                NodeKind::SetextHeading(heading.level)
            } else {
                NodeKind::AtxHeading(heading.level)
            }
        }
        NodeValue::ThematicBreak => NodeKind::HorizontalRule,
        NodeValue::Table(..) => NodeKind::Table,
        NodeValue::TableCell => NodeKind::TableCell,
        NodeValue::Code(_) => NodeKind::InlineCode,
        NodeValue::HtmlInline(_) => NodeKind::HtmlInline,
        NodeValue::Emph => NodeKind::Emphasis,
        NodeValue::Strong => NodeKind::StrongEmphasis,
        NodeValue::Link(_) => NodeKind::Link,
        NodeValue::Image(_) => NodeKind::Image,
        NodeValue::FootnoteReference(..) => NodeKind::FootnoteReference,
        NodeValue::FootnoteDefinition(..) => NodeKind::FootnoteDefinition,
        NodeValue::Text(_) | NodeValue::SoftBreak | NodeValue::LineBreak => return None,
        _ => NodeKind::Other,
    };
    Some(kind)
}

/// Convert a comrak node. Returns the node itself, or its converted
/// children when the node has no kind or no usable source range.
fn convert_node<'a>(node: &'a AstNode<'a>, text: &str, index: &LineIndex) -> Vec<SyntaxNode> {
    let ast = node.data.borrow();
    let children: Vec<SyntaxNode> = node
        .children()
        .flat_map(|child| convert_node(child, text, index))
        .collect();

    let Some(kind) = node_kind(&ast.value) else {
        return children;
    };

    let sourcepos = ast.sourcepos;
    let range = index
        .range(
            text,
            (sourcepos.start.line, sourcepos.start.column),
            (sourcepos.end.line, sourcepos.end.column),
        )
        .map(|(from, to)| match kind {
            NodeKind::InlineCode => widen_code_span(text, from, to),
            NodeKind::SetextHeading(_) => (from, extend_setext(text, from, to)),
            _ => (from, to),
        })
        .filter(|&(from, to)| text.is_char_boundary(from) && text.is_char_boundary(to));

    let Some((from, to)) = range else {
        return children;
    };

    let mut converted = SyntaxNode::new(kind, from, to).with_children(children);
    attach_markers(&mut converted, text);
    vec![converted]
}

/// Add marker children for the delimiter runs of `node`.
///
/// Nodes whose source does not have the expected shape get no markers; the
/// decoration handlers treat a construct without markers as malformed.
fn attach_markers(node: &mut SyntaxNode, text: &str) {
    let slice = &text[node.from..node.to];
    let bytes = slice.as_bytes();
    let mut markers = Vec::new();

    match node.kind {
        NodeKind::AtxHeading(level) => {
            let lead = leading_spaces(slice);
            let hashes = bytes[lead..].iter().take_while(|&&b| b == b'#').count();
            if hashes == level as usize {
                markers.push((NodeKind::HeaderMark, lead, lead + hashes));
            }
            let trimmed = slice.trim_end();
            let closing = trimmed.bytes().rev().take_while(|&b| b == b'#').count();
            let closing_start = trimmed.len() - closing;
            if closing > 0
                && closing_start > lead + hashes
                && trimmed.as_bytes()[closing_start - 1] == b' '
            {
                markers.push((NodeKind::HeaderMark, closing_start, trimmed.len()));
            }
        }
        NodeKind::SetextHeading(_) => {
            if let Some(newline) = slice.rfind('\n') {
                let underline = &slice[newline + 1..];
                let lead = leading_spaces(underline);
                let body = underline.trim();
                if !body.is_empty() && body.bytes().all(|b| b == b'=' || b == b'-') {
                    let start = newline + 1 + lead;
                    markers.push((NodeKind::HeaderMark, start, start + body.len()));
                }
            }
        }
        NodeKind::Emphasis | NodeKind::StrongEmphasis => {
            let n = if node.kind == NodeKind::Emphasis { 1 } else { 2 };
            if bytes.len() > 2 * n {
                let c = bytes[0];
                let open = bytes[..n].iter().all(|&b| b == c);
                let close = bytes[bytes.len() - n..].iter().all(|&b| b == c);
                if (c == b'*' || c == b'_') && open && close {
                    markers.push((NodeKind::EmphasisMark, 0, n));
                    markers.push((NodeKind::EmphasisMark, bytes.len() - n, bytes.len()));
                }
            }
        }
        NodeKind::InlineCode => {
            let open = bytes.iter().take_while(|&&b| b == b'`').count();
            let close = bytes.iter().rev().take_while(|&&b| b == b'`').count();
            if open > 0 && open == close && bytes.len() > 2 * open {
                markers.push((NodeKind::CodeMark, 0, open));
                markers.push((NodeKind::CodeMark, bytes.len() - open, bytes.len()));
            }
        }
        NodeKind::ListItem => {
            let lead = leading_spaces(slice);
            let rest = &bytes[lead..];
            match rest.first() {
                Some(b'-' | b'*' | b'+') => markers.push((NodeKind::ListMark, lead, lead + 1)),
                Some(b) if b.is_ascii_digit() => {
                    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
                    if matches!(rest.get(digits), Some(b'.' | b')')) {
                        markers.push((NodeKind::ListMark, lead, lead + digits + 1));
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }

    for (kind, start, end) in markers {
        node.children
            .push(SyntaxNode::new(kind, node.from + start, node.from + end));
    }
    node.children
        .sort_by_key(|c| (c.from, std::cmp::Reverse(c.to)));
}

fn leading_spaces(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b' ').count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Custom Delimiters
// ─────────────────────────────────────────────────────────────────────────────

fn is_inline_container(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph
            | NodeKind::AtxHeading(_)
            | NodeKind::SetextHeading(_)
            | NodeKind::TableCell
    )
}

/// Run the delimiter extensions over every leaf block's inline text.
fn apply_delimiters(node: &mut SyntaxNode, text: &str, registry: &DelimiterRegistry) {
    if !is_inline_container(node.kind) {
        for child in &mut node.children {
            apply_delimiters(child, text, registry);
        }
        return;
    }

    let excluded = excluded_ranges(node, text);
    for span in registry.parse_inline(text, node.from, node.to, &excluded) {
        node.insert(span);
    }
}

/// Ranges inside a leaf block where delimiters are not recognised.
fn excluded_ranges(block: &SyntaxNode, text: &str) -> Vec<(usize, usize)> {
    let mut excluded = Vec::new();
    for node in block.descendants() {
        match node.kind {
            NodeKind::InlineCode
            | NodeKind::HtmlInline
            | NodeKind::Image
            | NodeKind::HeaderMark => excluded.push((node.from, node.to)),
            NodeKind::Link => {
                let slice = &text[node.from..node.to];
                let destination = slice.find("](").or_else(|| slice.find("]["));
                match destination {
                    Some(at) if slice.starts_with('[') => {
                        excluded.push((node.from + at + 1, node.to));
                    }
                    Some(_) => {}
                    None if slice.starts_with('[') => {}
                    None => excluded.push((node.from, node.to)),
                }
            }
            _ => {}
        }
    }
    excluded.sort_unstable();
    excluded
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SyntaxTree {
        ComrakSyntax::new().parse(text)
    }

    #[test]
    fn test_parse_empty_document() {
        let tree = parse("");
        assert_eq!(tree.root.kind, NodeKind::Document);
        assert!(tree.root.children.is_empty());
    }

    #[test]
    fn test_heading_range_and_marker() {
        let tree = parse("# Title\n\nbody");
        let heading = &tree.find_all(NodeKind::AtxHeading(1))[0];
        assert_eq!((heading.from, heading.to), (0, 7));
        let marks: Vec<_> = heading.markers().map(|m| (m.from, m.to)).collect();
        assert_eq!(marks, vec![(0, 1)]);
    }

    #[test]
    fn test_strong_markers() {
        let tree = parse("**bold** text");
        let strong = tree.find_all(NodeKind::StrongEmphasis);
        assert_eq!(strong.len(), 1);
        assert_eq!((strong[0].from, strong[0].to), (0, 8));
        let marks: Vec<_> = strong[0].markers().map(|m| (m.from, m.to)).collect();
        assert_eq!(marks, vec![(0, 2), (6, 8)]);
    }

    #[test]
    fn test_inline_code_markers() {
        let tree = parse("use `x` here");
        let code = tree.find_all(NodeKind::InlineCode);
        assert_eq!(code.len(), 1);
        assert_eq!((code[0].from, code[0].to), (4, 7));
        assert_eq!(code[0].markers().count(), 2);
    }

    #[test]
    fn test_fenced_code_block() {
        let tree = parse("```rust\nfn main() {}\n```\n");
        assert_eq!(tree.find_all(NodeKind::FencedCode).len(), 1);
    }

    #[test]
    fn test_strikethrough_from_extension() {
        let tree = parse("a ~~x~~ b");
        let strike = tree.find_all(NodeKind::Strikethrough);
        assert_eq!(strike.len(), 1);
        assert_eq!((strike[0].from, strike[0].to), (2, 7));
        assert!(tree.find_all(NodeKind::Underline).is_empty());
    }

    #[test]
    fn test_mark_and_underline_from_extensions() {
        let tree = parse("==hot== and ~low~");
        assert_eq!(tree.find_all(NodeKind::Mark).len(), 1);
        assert_eq!(tree.find_all(NodeKind::Underline).len(), 1);
    }

    #[test]
    fn test_delimiters_ignored_inside_code() {
        let tree = parse("`==x==`");
        assert!(tree.find_all(NodeKind::Mark).is_empty());
    }

    #[test]
    fn test_setext_underline_not_a_mark() {
        let tree = parse("Title\n=====\n");
        assert_eq!(tree.find_all(NodeKind::SetextHeading(1)).len(), 1);
        assert!(tree.find_all(NodeKind::Mark).is_empty());
    }

    #[test]
    fn test_bullet_list_marks() {
        let tree = parse("- one\n- two\n");
        let marks = tree.find_all(NodeKind::ListMark);
        assert_eq!(marks.len(), 2);
        assert_eq!((marks[0].from, marks[0].to), (0, 1));
        assert_eq!((marks[1].from, marks[1].to), (6, 7));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocks closed by a blank line
    // ─────────────────────────────────────────────────────────────────────────

    const BLOCKS: &str = "> quote\n\n- item\n\n---\n\nTitle\n=====\n\nuse `x` here\n\nend";

    #[test]
    fn test_list_before_blank_line() {
        let tree = parse(BLOCKS);
        let list = tree.find_all(NodeKind::BulletList);
        assert_eq!(list.len(), 1);
        assert_eq!((list[0].from, list[0].to), (9, 15));
        let item = &tree.find_all(NodeKind::ListItem)[0];
        assert_eq!((item.from, item.to), (9, 15));
        let marks: Vec<_> = item.markers().map(|m| (m.from, m.to)).collect();
        assert_eq!(marks, vec![(9, 10)]);
    }

    #[test]
    fn test_rule_before_blank_line() {
        let tree = parse(BLOCKS);
        let rule = tree.find_all(NodeKind::HorizontalRule);
        assert_eq!(rule.len(), 1);
        assert_eq!(&BLOCKS[rule[0].from..rule[0].to], "---");
    }

    #[test]
    fn test_setext_before_blank_line() {
        let tree = parse(BLOCKS);
        let heading = tree.find_all(NodeKind::SetextHeading(1));
        assert_eq!(heading.len(), 1);
        assert_eq!(&BLOCKS[heading[0].from..heading[0].to], "Title\n=====");
        assert_eq!(heading[0].markers().count(), 1);
    }

    #[test]
    fn test_blockquote_before_blank_line() {
        let tree = parse(BLOCKS);
        let quote = &tree.find_all(NodeKind::Blockquote)[0];
        assert_eq!((quote.from, quote.to), (0, 7));
    }

    #[test]
    fn test_code_span_includes_fences() {
        let tree = parse(BLOCKS);
        let code = &tree.find_all(NodeKind::InlineCode)[0];
        assert_eq!(&BLOCKS[code.from..code.to], "`x`");
        let double = parse("a ``b`c`` d");
        let code = &double.find_all(NodeKind::InlineCode)[0];
        assert_eq!((code.from, code.to), (2, 9));
        assert_eq!(code.markers().count(), 2);
    }

    #[test]
    fn test_nested_blockquote() {
        let tree = parse("> a\n> > b\n");
        assert_eq!(tree.find_all(NodeKind::Blockquote).len(), 2);
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let inputs = [
            "# Unclosed heading",
            "```\nunclosed code block",
            "| broken | table",
            "[unclosed link(",
            "![broken image",
            "***nested emphasis**",
            "~~~",
            "==",
            "é~ü~ö",
        ];
        for input in inputs {
            let tree = parse(input);
            for node in tree.root.descendants() {
                assert!(node.from <= node.to && node.to <= input.len(), "{}", input);
            }
        }
    }
}
