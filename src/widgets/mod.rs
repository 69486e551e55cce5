//! Inline widgets
//!
//! Widgets are interactive replacements for a range of source text: a bold
//! run rendered bold, a link rendered as a clickable label, an image rendered
//! as a draggable chip. They are a closed set of kinds carried by one value
//! type, [`InlineWidget`], so identity is plain structural equality: two
//! widgets are equal iff kind, content, full source text and start offset
//! are all equal, which lets the host skip re-rendering unchanged widgets.
//!
//! Interaction follows one base policy: a primary press is intercepted by
//! the widget (the host must not also place a caret inside it) and turned
//! into a [`WidgetAction`]. By default that action selects the widget's full
//! source range; links and footnotes navigate to their definition instead,
//! and images start the reposition state machine in [`crate::images`].

pub mod link;
mod render;

pub use render::{DragVisual, SurfacePalette, WidgetResponse, QUOTE_TONES};

use egui::Pos2;

// ─────────────────────────────────────────────────────────────────────────────
// Widget Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of widget kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Heading content, level 1-6
    Heading(u8),
    Emphasis,
    Strong,
    InlineCode,
    Strikethrough,
    /// `==mark==` content
    Highlight,
    Underline,
    /// Inline link, or reference link when `reference` is set
    Link {
        url: Option<String>,
        reference: Option<String>,
    },
    Image {
        alt: String,
        src: String,
    },
    /// Footnote reference `[^label]`
    Footnote { label: String },
    /// Compact rendering of a footnote or link definition line
    Definition {
        label: String,
        target: Option<String>,
        footnote: bool,
    },
    /// List bullet glyph
    Bullet(char),
    /// Horizontal rule
    Rule,
    /// Ghost-writer "thinking" indicator
    Thinking,
}

/// What the surface should do after a widget interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetAction {
    None,
    /// Replace the selection with `from..to`
    Select { from: usize, to: usize },
    /// Jump to the definition of `reference`, or select `from..to` if missing
    Navigate {
        reference: String,
        from: usize,
        to: usize,
    },
    /// Arm the image reposition controller
    ImagePress { from: usize, to: usize, pointer: Pos2 },
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Widget
// ─────────────────────────────────────────────────────────────────────────────

/// An inline widget bound to the source range `start..start + full_text.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InlineWidget {
    pub kind: WidgetKind,
    /// Text shown by the widget
    pub content: String,
    /// The complete source text the widget stands for, markers included
    pub full_text: String,
    /// Offset of `full_text` in the document
    pub start: usize,
}

impl InlineWidget {
    pub fn new(
        kind: WidgetKind,
        content: impl Into<String>,
        full_text: impl Into<String>,
        start: usize,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            full_text: full_text.into(),
            start,
        }
    }

    /// The full source range this widget stands for.
    pub fn source_range(&self) -> (usize, usize) {
        (self.start, self.start + self.full_text.len())
    }

    /// The definition label this widget links to, if any.
    pub fn reference(&self) -> Option<String> {
        match &self.kind {
            WidgetKind::Link {
                reference: Some(reference),
                ..
            } => Some(reference.clone()),
            WidgetKind::Footnote { label } => Some(format!("^{}", label)),
            _ => None,
        }
    }

    /// Whether a press is handled by the widget instead of letting the host
    /// place the caret.
    pub fn handles_press(&self) -> bool {
        !matches!(self.kind, WidgetKind::Thinking)
    }

    /// Tooltip shown while hovering the widget.
    pub fn hover_text(&self) -> Option<&str> {
        match &self.kind {
            WidgetKind::Image { src, .. } => Some(src),
            WidgetKind::Link { url: Some(url), .. } => Some(url),
            _ => None,
        }
    }

    /// Translate a primary-button press into an action.
    pub fn press(&self, pointer: Pos2) -> WidgetAction {
        let (from, to) = self.source_range();
        match &self.kind {
            WidgetKind::Thinking => WidgetAction::None,
            WidgetKind::Image { .. } => WidgetAction::ImagePress { from, to, pointer },
            _ => match self.reference() {
                Some(reference) => WidgetAction::Navigate {
                    reference,
                    from,
                    to,
                },
                None => WidgetAction::Select { from, to },
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
