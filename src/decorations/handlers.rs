//! Per-node decoration handlers
//!
//! A handler maps one syntax node plus its context to zero or more
//! decorations. Handlers are plain functions: identical inputs give
//! structurally identical output, and a node whose shape is not what the
//! handler expects (missing markers, empty content) produces nothing.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::decorations::{Decoration, LineStyle, QuoteTone};
use crate::state::{Document, Selection};
use crate::syntax::{NodeKind, SyntaxNode};
use crate::widgets::{InlineWidget, WidgetKind, QUOTE_TONES};

/// Bullet glyphs, cycled by list nesting depth.
pub const BULLET_GLYPHS: [char; 4] = ['•', '◦', '▪', '▫'];

/// Rule glyphs, picked by the list depth the rule sits at.
pub const RULE_GLYPHS: [char; 3] = ['─', '┄', '╌'];

// ─────────────────────────────────────────────────────────────────────────────
// Context & Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a handler may look at besides the node itself.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub doc: &'a Document,
    pub selection: &'a Selection,
    /// Global hide toggle
    pub hide_markers: bool,
    /// The node's own range
    pub from: usize,
    pub to: usize,
    /// Number of enclosing lists
    pub list_depth: usize,
}

impl HandlerContext<'_> {
    /// Whether the node should render raw: hiding is off or the selection
    /// touches the node.
    pub fn reveals(&self) -> bool {
        !self.hide_markers || self.selection.overlaps(self.from, self.to)
    }

    fn text(&self) -> &str {
        self.doc.slice(self.from, self.to)
    }
}

/// A decoration handler for one node type.
pub type NodeHandler = fn(&HandlerContext<'_>, &SyntaxNode) -> Vec<Decoration>;

/// Node type name to handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, NodeHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with handlers for every construct the surface decorates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for level in 1..=6 {
            registry.register(NodeKind::AtxHeading(level).name(), atx_heading);
        }
        for level in 1..=2 {
            registry.register(NodeKind::SetextHeading(level).name(), setext_heading);
        }
        registry.register(NodeKind::Emphasis.name(), delimited);
        registry.register(NodeKind::StrongEmphasis.name(), delimited);
        registry.register(NodeKind::InlineCode.name(), delimited);
        registry.register(NodeKind::Strikethrough.name(), delimited);
        registry.register(NodeKind::Mark.name(), delimited);
        registry.register(NodeKind::Underline.name(), delimited);
        registry.register(NodeKind::FencedCode.name(), code_block);
        registry.register(NodeKind::CodeBlock.name(), code_block);
        registry.register(NodeKind::Blockquote.name(), blockquote);
        registry.register(NodeKind::HorizontalRule.name(), horizontal_rule);
        registry.register(NodeKind::ListMark.name(), list_mark);
        registry.register(NodeKind::Link.name(), link);
        registry.register(NodeKind::Image.name(), image);
        registry.register(NodeKind::FootnoteReference.name(), footnote_reference);
        registry
    }

    /// Register (or replace) the handler for a node type name.
    pub fn register(&mut self, name: &'static str, handler: NodeHandler) {
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<NodeHandler> {
        self.handlers.get(name).copied()
    }

    /// Run the handler for `node`, if one is registered.
    pub fn decorate(&self, ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
        match self.get(node.name()) {
            Some(handler) => handler(ctx, node),
            None => Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Text of `from..to` with the marker runs of every nested construct removed.
fn display_text(doc: &Document, node: &SyntaxNode, from: usize, to: usize) -> String {
    let mut markers: Vec<(usize, usize)> = node
        .descendants()
        .into_iter()
        .filter(|n| n.kind.is_marker() && n.from >= from && n.to <= to)
        .map(|n| (n.from, n.to))
        .collect();
    markers.sort_unstable();

    let mut out = String::new();
    let mut pos = from;
    for (start, end) in markers {
        if start < pos {
            continue;
        }
        out.push_str(doc.slice(pos, start));
        pos = end;
    }
    out.push_str(doc.slice(pos, to));
    out
}

fn widget_kind_for(kind: NodeKind) -> Option<WidgetKind> {
    let kind = match kind {
        NodeKind::Emphasis => WidgetKind::Emphasis,
        NodeKind::StrongEmphasis => WidgetKind::Strong,
        NodeKind::InlineCode => WidgetKind::InlineCode,
        NodeKind::Strikethrough => WidgetKind::Strikethrough,
        NodeKind::Mark => WidgetKind::Highlight,
        NodeKind::Underline => WidgetKind::Underline,
        _ => return None,
    };
    Some(kind)
}

fn marker_kind_for(kind: NodeKind) -> Option<NodeKind> {
    let marker = match kind {
        NodeKind::Emphasis | NodeKind::StrongEmphasis => NodeKind::EmphasisMark,
        NodeKind::InlineCode => NodeKind::CodeMark,
        NodeKind::Strikethrough => NodeKind::StrikethroughMarker,
        NodeKind::Mark => NodeKind::MarkMarker,
        NodeKind::Underline => NodeKind::UnderlineMarker,
        _ => return None,
    };
    Some(marker)
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Constructs
// ─────────────────────────────────────────────────────────────────────────────

/// Emphasis, strong, inline code, strikethrough, mark and underline: hide
/// both delimiter runs and replace the content with a styled widget.
fn delimited(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let (Some(kind), Some(marker)) = (widget_kind_for(node.kind), marker_kind_for(node.kind))
    else {
        return Vec::new();
    };

    let markers: Vec<&SyntaxNode> = node.children_of(marker).collect();
    let (Some(open), Some(close)) = (markers.first(), markers.last()) else {
        return Vec::new();
    };
    if markers.len() < 2 || open.from != node.from || close.to != node.to || open.to >= close.from
    {
        return Vec::new();
    }

    let content = if node.kind == NodeKind::InlineCode {
        ctx.doc.slice(open.to, close.from).to_string()
    } else {
        display_text(ctx.doc, node, open.to, close.from)
    };
    let widget = InlineWidget::new(kind, content, ctx.text(), node.from);

    vec![
        Decoration::hide(open.from, open.to),
        Decoration::replace(open.to, close.from, widget),
        Decoration::hide(close.from, close.to),
    ]
}

/// `# Title`: hide the `#` run (and the space after it, plus any closing
/// run) and replace the title with a heading widget.
fn atx_heading(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    let NodeKind::AtxHeading(level) = node.kind else {
        return Vec::new();
    };
    if ctx.reveals() {
        return Vec::new();
    }

    let marks: Vec<&SyntaxNode> = node
        .children_of(NodeKind::HeaderMark)
        .filter(|m| node.contains_range(m.from, m.to))
        .collect();
    let Some(open) = marks.first() else {
        return Vec::new();
    };
    let closing = marks.get(1).filter(|m| m.from > open.to);

    let spaces = ctx
        .doc
        .slice(open.to, node.to)
        .bytes()
        .take_while(|&b| b == b' ' || b == b'\t')
        .count();
    let content_from = open.to + spaces;
    let content_to = match closing {
        Some(mark) => mark.from,
        None => node.to,
    };
    let trimmed = ctx.doc.slice(content_from, content_to).trim_end();
    let content_to = content_from + trimmed.len();
    if content_from >= content_to {
        return Vec::new();
    }

    let content = display_text(ctx.doc, node, content_from, content_to);
    let widget = InlineWidget::new(WidgetKind::Heading(level), content, ctx.text(), node.from);

    let mut decorations = vec![
        Decoration::hide(open.from, content_from),
        Decoration::replace(content_from, content_to, widget),
    ];
    if content_to < node.to {
        decorations.push(Decoration::hide(content_to, node.to));
    }
    decorations
}

/// Underlined heading: replace the title lines with a heading widget and hide
/// the underline (with the line break before it).
fn setext_heading(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    let NodeKind::SetextHeading(level) = node.kind else {
        return Vec::new();
    };
    if ctx.reveals() {
        return Vec::new();
    }
    let Some(underline) = node
        .children_of(NodeKind::HeaderMark)
        .filter(|m| node.contains_range(m.from, m.to))
        .last()
    else {
        return Vec::new();
    };

    let title = ctx.doc.slice(node.from, underline.from);
    let content_to = node.from + title.trim_end().len();
    if node.from >= content_to {
        return Vec::new();
    }

    let content = display_text(ctx.doc, node, node.from, content_to);
    let widget = InlineWidget::new(WidgetKind::Heading(level), content, ctx.text(), node.from);
    vec![
        Decoration::replace(node.from, content_to, widget),
        Decoration::hide(content_to, node.to),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Links, Images & Footnotes
// ─────────────────────────────────────────────────────────────────────────────

const INLINE_LINK: &str = r#"^\[(?s)(.*)\]\(\s*<?([^\s>)]*)>?(?:\s+"[^"]*")?\s*\)$"#;
const REFERENCE_LINK: &str = r"^\[(?s)(.*)\]\[([^\]]*)\]$";
const SHORTCUT_LINK: &str = r"^\[(?s)(.*)\]$";
const IMAGE: &str = r#"^!\[(?s)(.*)\]\(\s*<?([^\s>)]*)>?(?:\s+"[^"]*")?\s*\)$"#;
const FOOTNOTE: &str = r"^\[\^([^\]\s]+)\]$";

static INLINE_LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static REFERENCE_LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static SHORTCUT_LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static IMAGE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static FOOTNOTE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Match `source` against a lazily compiled pattern.
fn captures<'t>(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
    source: &'t str,
) -> Option<regex::Captures<'t>> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()?
        .captures(source)
}

/// Links become a clickable label. Reference links navigate to their
/// definition when pressed.
fn link(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let source = ctx.text();

    let (label_len, url, reference) = if let Some(caps) = captures(&INLINE_LINK_RE, INLINE_LINK, source) {
        let label = caps.get(1).map_or(0, |m| m.len());
        let url = caps.get(2).map(|m| m.as_str().to_string());
        (label, url, None)
    } else if let Some(caps) = captures(&REFERENCE_LINK_RE, REFERENCE_LINK, source) {
        let label = caps.get(1).map_or("", |m| m.as_str());
        let id = caps.get(2).map_or("", |m| m.as_str());
        let id = if id.is_empty() { label } else { id };
        (label.len(), None, Some(id.to_string()))
    } else if let Some(caps) = captures(&SHORTCUT_LINK_RE, SHORTCUT_LINK, source) {
        let label = caps.get(1).map_or("", |m| m.as_str());
        (label.len(), None, Some(label.to_string()))
    } else {
        // Autolink: `<https://…>` or a bare URL.
        let url = source.trim_start_matches('<').trim_end_matches('>');
        if url.is_empty() {
            return Vec::new();
        }
        let widget = InlineWidget::new(
            WidgetKind::Link {
                url: Some(url.to_string()),
                reference: None,
            },
            url,
            source,
            node.from,
        );
        return vec![Decoration::replace(node.from, node.to, widget)];
    };

    if label_len == 0 {
        return Vec::new();
    }
    let content = display_text(ctx.doc, node, node.from + 1, node.from + 1 + label_len);
    let widget = InlineWidget::new(WidgetKind::Link { url, reference }, content, source, node.from);
    vec![Decoration::replace(node.from, node.to, widget)]
}

fn image(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let source = ctx.text();
    let Some(caps) = captures(&IMAGE_RE, IMAGE, source) else {
        return Vec::new();
    };
    let alt = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let src = caps.get(2).map_or("", |m| m.as_str()).to_string();
    let widget = InlineWidget::new(WidgetKind::Image { alt: alt.clone(), src }, alt, source, node.from);
    vec![Decoration::replace(node.from, node.to, widget)]
}

fn footnote_reference(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let source = ctx.text();
    let Some(label) = captures(&FOOTNOTE_RE, FOOTNOTE, source).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let label = label.as_str().to_string();
    let widget = InlineWidget::new(
        WidgetKind::Footnote {
            label: label.clone(),
        },
        label,
        source,
        node.from,
    );
    vec![Decoration::replace(node.from, node.to, widget)]
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Constructs
// ─────────────────────────────────────────────────────────────────────────────

/// Line background over every line of a code block. Never hidden.
fn code_block(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    let first = ctx.doc.line_at(node.from).number;
    let last = ctx.doc.line_at(node.to.saturating_sub(1).max(node.from)).number;
    (first..=last)
        .filter_map(|n| ctx.doc.line(n))
        .map(|line| Decoration::line(line.from, LineStyle::CodeBlock))
        .collect()
}

/// One bar decoration per line, its depth the number of blockquotes that
/// cover the line. Nested blockquotes are accounted for here; the caller
/// must not run this handler for them again.
fn blockquote(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    let nested: Vec<&SyntaxNode> = node
        .descendants()
        .into_iter()
        .skip(1)
        .filter(|n| n.kind == NodeKind::Blockquote)
        .collect();

    let first = ctx.doc.line_at(node.from).number;
    let last = ctx.doc.line_at(node.to.saturating_sub(1).max(node.from)).number;
    (first..=last)
        .filter_map(|n| ctx.doc.line(n))
        .map(|line| {
            let depth = 1 + nested
                .iter()
                .filter(|q| q.from <= line.to && line.from < q.to)
                .count();
            let tone = if depth <= QUOTE_TONES {
                QuoteTone::Level((depth - 1) as u8)
            } else {
                QuoteTone::Deep
            };
            Decoration::line(line.from, LineStyle::Blockquote { depth, tone })
        })
        .collect()
}

fn horizontal_rule(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let source = ctx.text().trim_end();
    if source.is_empty() {
        return Vec::new();
    }
    let glyph = RULE_GLYPHS[ctx.list_depth % RULE_GLYPHS.len()];
    let widget = InlineWidget::new(WidgetKind::Rule, glyph.to_string(), source, node.from);
    vec![Decoration::replace(node.from, node.from + source.len(), widget)]
}

/// Bullet markers become a glyph picked by nesting depth. Ordered list
/// numbers stay as written.
fn list_mark(ctx: &HandlerContext<'_>, node: &SyntaxNode) -> Vec<Decoration> {
    if ctx.reveals() {
        return Vec::new();
    }
    let source = ctx.text();
    if !matches!(source, "-" | "*" | "+") {
        return Vec::new();
    }
    let depth = ctx.list_depth.max(1);
    let glyph = BULLET_GLYPHS[(depth - 1) % BULLET_GLYPHS.len()];
    let widget = InlineWidget::new(WidgetKind::Bullet(glyph), glyph.to_string(), source, node.from);
    vec![Decoration::replace(node.from, node.to, widget)]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
