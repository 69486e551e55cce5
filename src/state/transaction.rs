//! Transactions: atomic bundles of text changes, a selection and effects.

use crate::state::changes::ChangeSet;
use crate::state::selection::Selection;

/// Side effects carried by a transaction, interpreted by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Install the single reference highlight over `from..to` (new-document offsets).
    AddHighlight { from: usize, to: usize },
    /// Show or clear the image drop placeholder on the line starting at the offset.
    SetDropPlaceholder(Option<usize>),
}

/// An atomic update of the editor state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub changes: Option<ChangeSet>,
    /// Selection in new-document offsets; `None` maps the old selection
    pub selection: Option<Selection>,
    pub effects: Vec<Effect>,
    pub scroll_into_view: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_changes(mut self, changes: ChangeSet) -> Self {
        self.changes = Some(changes);
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn scroll_into_view(mut self) -> Self {
        self.scroll_into_view = true;
        self
    }
}
