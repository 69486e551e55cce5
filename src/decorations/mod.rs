//! Decoration computation
//!
//! A decoration is a declarative instruction to the rendering layer: hide a
//! range, restyle it, replace it with an inline widget, or attach an
//! attribute to a whole line. This module turns a document, its syntax tree
//! and the current selection into an ordered [`DecorationSet`].
//!
//! # Pipeline
//! 1. [`definitions`] scans lines for footnote/link definitions and records
//!    the claimed lines.
//! 2. [`compute`] walks the syntax tree, asking the [`handlers`] registry for
//!    decorations per node and skipping subtrees on claimed lines.
//! 3. Conflicting replacements are dropped (outer constructs win) and the
//!    result is sorted by `(from, to, start_side)`.

pub mod compute;
pub mod definitions;
pub mod handlers;

pub use compute::{compute_decorations, DecorationInput};
pub use definitions::{scan_definitions, DefinitionKind, DefinitionLine, DefinitionScan};
pub use handlers::{HandlerContext, HandlerRegistry, NodeHandler};

use crate::widgets::InlineWidget;

// ─────────────────────────────────────────────────────────────────────────────
// Decoration Types
// ─────────────────────────────────────────────────────────────────────────────

/// Inline restyling classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkStyle {
    /// Temporary highlight after jumping to a definition
    ReferenceHighlight,
    /// Text freshly inserted by the ghost writer
    NewText,
}

/// Colour slot of a blockquote bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteTone {
    /// One of the distinct per-level colours
    Level(u8),
    /// Shared colour for every level past the palette
    Deep,
}

/// Whole-line attribute classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineStyle {
    /// Line inside a fenced or indented code block
    CodeBlock,
    /// Line inside a blockquote, with one bar per nesting level
    Blockquote { depth: usize, tone: QuoteTone },
    /// Where a dragged image would be dropped
    DropPlaceholder,
}

/// What a decoration does to its range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    /// Hide the range entirely
    Hide,
    /// Restyle the range
    Mark(MarkStyle),
    /// Replace the range with an inline widget
    Replace(InlineWidget),
    /// Attach an attribute to the line starting at `from`
    Line(LineStyle),
}

/// A single decoration over `from..to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub kind: DecorationKind,
}

/// Start-side ordering for decorations at the same position: line attributes
/// first, then replacements, then marks.
const LINE_START_SIDE: i32 = -200;
const REPLACE_START_SIDE: i32 = -100;
const MARK_START_SIDE: i32 = 0;

impl Decoration {
    pub fn hide(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            kind: DecorationKind::Hide,
        }
    }

    pub fn mark(from: usize, to: usize, style: MarkStyle) -> Self {
        Self {
            from,
            to,
            kind: DecorationKind::Mark(style),
        }
    }

    pub fn replace(from: usize, to: usize, widget: InlineWidget) -> Self {
        Self {
            from,
            to,
            kind: DecorationKind::Replace(widget),
        }
    }

    /// A line attribute for the line starting at `line_start`.
    pub fn line(line_start: usize, style: LineStyle) -> Self {
        Self {
            from: line_start,
            to: line_start,
            kind: DecorationKind::Line(style),
        }
    }

    /// Hide and replace decorations both take the text out of the flow.
    pub fn is_replace(&self) -> bool {
        matches!(self.kind, DecorationKind::Hide | DecorationKind::Replace(_))
    }

    pub fn start_side(&self) -> i32 {
        match self.kind {
            DecorationKind::Line(_) => LINE_START_SIDE,
            DecorationKind::Hide | DecorationKind::Replace(_) => REPLACE_START_SIDE,
            DecorationKind::Mark(_) => MARK_START_SIDE,
        }
    }

    pub fn widget(&self) -> Option<&InlineWidget> {
        match &self.kind {
            DecorationKind::Replace(widget) => Some(widget),
            _ => None,
        }
    }

    fn overlaps(&self, other: &Decoration) -> bool {
        self.from < other.to && other.from < self.to
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoration Set
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered, conflict-free list of decorations.
///
/// Invariants: items are sorted by `(from, to, start_side)` and no two
/// replacing decorations (hide or widget) overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DecorationSet {
    items: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from decorations in priority order.
    ///
    /// A replacing decoration that overlaps an earlier-accepted replacing
    /// decoration is dropped, as is an empty hide. The survivors are then
    /// stably sorted.
    pub fn from_prioritized(decorations: impl IntoIterator<Item = Decoration>) -> Self {
        let mut accepted: Vec<Decoration> = Vec::new();
        let mut claimed: Vec<(usize, usize)> = Vec::new();

        for decoration in decorations {
            if decoration.is_replace() {
                // Widgets may sit at a point; hiding nothing is meaningless.
                let empty = match decoration.kind {
                    DecorationKind::Hide => decoration.from >= decoration.to,
                    _ => decoration.from > decoration.to,
                };
                if empty {
                    continue;
                }
                let conflict = claimed
                    .iter()
                    .any(|&(from, to)| decoration.from < to && from < decoration.to);
                if conflict {
                    continue;
                }
                claimed.push((decoration.from, decoration.to));
            }
            accepted.push(decoration);
        }

        let mut set = Self { items: accepted };
        set.sort();
        set
    }

    /// Merge another set in; `self` keeps priority on replacement conflicts.
    pub fn merge(self, other: DecorationSet) -> Self {
        Self::from_prioritized(self.items.into_iter().chain(other.items))
    }

    fn sort(&mut self) {
        self.items
            .sort_by_key(|d| (d.from, d.to, d.start_side()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Decoration] {
        &self.items
    }

    /// Widgets in document order.
    pub fn widgets(&self) -> impl Iterator<Item = &InlineWidget> {
        self.items.iter().filter_map(Decoration::widget)
    }

    /// Whether any two replacing decorations overlap.
    pub fn has_replace_overlap(&self) -> bool {
        let replaces: Vec<_> = self.items.iter().filter(|d| d.is_replace()).collect();
        replaces
            .iter()
            .enumerate()
            .any(|(i, a)| replaces[i + 1..].iter().any(|b| a.overlaps(b)))
    }
}

impl IntoIterator for DecorationSet {
    type Item = Decoration;
    type IntoIter = std::vec::IntoIter<Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
