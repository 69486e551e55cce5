//! Syntax tree model
//!
//! The tree is plain data: every node carries its type, its byte range in
//! the source and its children in source order. Decoration handlers read it,
//! they never mutate it.

// ─────────────────────────────────────────────────────────────────────────────
// Node Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The type of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Paragraph,
    /// `#`-style heading, level 1-6
    AtxHeading(u8),
    /// Underlined heading, level 1-2
    SetextHeading(u8),
    HeaderMark,
    Emphasis,
    StrongEmphasis,
    EmphasisMark,
    InlineCode,
    CodeMark,
    Strikethrough,
    StrikethroughMarker,
    Mark,
    MarkMarker,
    Underline,
    UnderlineMarker,
    FencedCode,
    CodeBlock,
    Blockquote,
    HorizontalRule,
    BulletList,
    OrderedList,
    ListItem,
    ListMark,
    Link,
    Image,
    FootnoteReference,
    FootnoteDefinition,
    Table,
    TableCell,
    HtmlBlock,
    HtmlInline,
    Other,
}

impl NodeKind {
    /// The node type name, as exposed to handler registrations.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Paragraph => "Paragraph",
            NodeKind::AtxHeading(level) => match level {
                1 => "ATXHeading1",
                2 => "ATXHeading2",
                3 => "ATXHeading3",
                4 => "ATXHeading4",
                5 => "ATXHeading5",
                _ => "ATXHeading6",
            },
            NodeKind::SetextHeading(level) => {
                if *level == 1 {
                    "SetextHeading1"
                } else {
                    "SetextHeading2"
                }
            }
            NodeKind::HeaderMark => "HeaderMark",
            NodeKind::Emphasis => "Emphasis",
            NodeKind::StrongEmphasis => "StrongEmphasis",
            NodeKind::EmphasisMark => "EmphasisMark",
            NodeKind::InlineCode => "InlineCode",
            NodeKind::CodeMark => "CodeMark",
            NodeKind::Strikethrough => "Strikethrough",
            NodeKind::StrikethroughMarker => "StrikethroughMarker",
            NodeKind::Mark => "Mark",
            NodeKind::MarkMarker => "MarkMarker",
            NodeKind::Underline => "Underline",
            NodeKind::UnderlineMarker => "UnderlineMarker",
            NodeKind::FencedCode => "FencedCode",
            NodeKind::CodeBlock => "CodeBlock",
            NodeKind::Blockquote => "Blockquote",
            NodeKind::HorizontalRule => "HorizontalRule",
            NodeKind::BulletList => "BulletList",
            NodeKind::OrderedList => "OrderedList",
            NodeKind::ListItem => "ListItem",
            NodeKind::ListMark => "ListMark",
            NodeKind::Link => "Link",
            NodeKind::Image => "Image",
            NodeKind::FootnoteReference => "FootnoteReference",
            NodeKind::FootnoteDefinition => "FootnoteDefinition",
            NodeKind::Table => "Table",
            NodeKind::TableCell => "TableCell",
            NodeKind::HtmlBlock => "HTMLBlock",
            NodeKind::HtmlInline => "HTMLTag",
            NodeKind::Other => "Other",
        }
    }

    /// Marker node kinds: delimiter runs that belong to their parent construct.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            NodeKind::HeaderMark
                | NodeKind::EmphasisMark
                | NodeKind::CodeMark
                | NodeKind::StrikethroughMarker
                | NodeKind::MarkMarker
                | NodeKind::UnderlineMarker
                | NodeKind::ListMark
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// A node of the syntax tree, covering `from..to` of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub from: usize,
    pub to: usize,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, from: usize, to: usize) -> Self {
        Self {
            kind,
            from,
            to,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self.children.sort_by_key(|c| (c.from, std::cmp::Reverse(c.to)));
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn contains_range(&self, from: usize, to: usize) -> bool {
        self.from <= from && to <= self.to
    }

    /// Children of a given kind.
    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Marker children in source order.
    pub fn markers(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| c.kind.is_marker())
    }

    /// Nest `node` at the deepest node that fully contains it, adopting any
    /// existing children that fall entirely inside it.
    ///
    /// Returns `false` (and drops the node) if it crosses an existing node
    /// boundary or lies outside this node.
    pub fn insert(&mut self, mut node: SyntaxNode) -> bool {
        if !self.contains_range(node.from, node.to) {
            return false;
        }

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|c| c.contains_range(node.from, node.to) && !node.contains_range(c.from, c.to))
        {
            return child.insert(node);
        }

        let crosses = self.children.iter().any(|c| {
            c.from < node.to && node.from < c.to && !node.contains_range(c.from, c.to)
        });
        if crosses {
            return false;
        }

        let (inside, outside): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| node.contains_range(c.from, c.to));
        node.children.extend(inside);
        node.children.sort_by_key(|c| (c.from, std::cmp::Reverse(c.to)));

        self.children = outside;
        self.children.push(node);
        self.children.sort_by_key(|c| (c.from, std::cmp::Reverse(c.to)));
        true
    }

    /// Pre-order traversal of this node and its descendants.
    pub fn descendants(&self) -> Vec<&SyntaxNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
}

impl SyntaxTree {
    pub fn new(root: SyntaxNode) -> Self {
        Self { root }
    }

    /// An empty tree for a document of length `len`.
    pub fn empty(len: usize) -> Self {
        Self::new(SyntaxNode::new(NodeKind::Document, 0, len))
    }

    /// All nodes of `kind`, in document order.
    pub fn find_all(&self, kind: NodeKind) -> Vec<&SyntaxNode> {
        self.root
            .descendants()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
