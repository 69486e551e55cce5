//! Editor state model
//!
//! This module holds the document/selection/transaction model the decoration
//! engine works against: an immutable-per-version [`Document`], a
//! [`Selection`], [`ChangeSet`]s with explicit position mapping, and
//! [`Transaction`]s that bundle them with effects.

mod changes;
mod document;
mod selection;
mod transaction;

pub use changes::{Bias, ChangeSet, Edit, Operation};
pub use document::{Document, Line};
pub use selection::{Selection, SelectionRange};
pub use transaction::{Effect, Transaction};

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::syntax::{SyntaxProvider, SyntaxTree};

/// One version of the editor: document, selection and syntax tree.
#[derive(Debug, Clone)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    tree: Arc<SyntaxTree>,
}

impl EditorState {
    /// Create a state with the caret at the start of the document.
    pub fn new(text: impl Into<String>, syntax: &dyn SyntaxProvider) -> Self {
        let doc = Document::new(text);
        let tree = Arc::new(syntax.parse(doc.text()));
        Self {
            doc,
            selection: Selection::default(),
            tree,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Apply a transaction, producing the next state.
    ///
    /// The syntax tree is rebuilt only when the text changes.
    pub fn apply(&self, tr: &Transaction, syntax: &dyn SyntaxProvider) -> Result<EditorState> {
        let (doc, tree, mapped) = match &tr.changes {
            Some(changes) if !changes.is_empty() => {
                if changes.len() != self.doc.len() {
                    return Err(Error::InvalidRange {
                        from: 0,
                        to: changes.len(),
                        len: self.doc.len(),
                    });
                }
                let doc = self.doc.apply(changes)?;
                let tree = Arc::new(syntax.parse(doc.text()));
                (doc, tree, self.selection.map(changes))
            }
            _ => (self.doc.clone(), Arc::clone(&self.tree), self.selection.clone()),
        };

        let selection = tr.selection.clone().unwrap_or(mapped);
        if selection.max_pos() > doc.len() {
            return Err(Error::InvalidRange {
                from: selection.primary().from(),
                to: selection.max_pos(),
                len: doc.len(),
            });
        }

        Ok(EditorState {
            doc,
            selection,
            tree,
        })
    }
}
