//! livemark - live-preview decorations for Markdown editing surfaces
//!
//! Given a document, its syntax tree and the selection, the decoration
//! engine decides which Markdown markers to hide, which ranges to replace
//! with interactive inline widgets and which lines to restyle. Markers of a
//! construct reappear while the caret touches it.
//!
//! Around that core sit three interactive features: jump-to-definition with
//! a decaying reference highlight, click-vs-drag image repositioning, and an
//! AI ghost writer that streams a completion into the document at the caret.
//! [`MarkdownSurface`] ties them to one editor instance.
//!
//! The crate never installs a logger; it logs through the `log` facade.

pub mod config;
pub mod decorations;
pub mod error;
pub mod ghost;
pub mod highlight;
pub mod images;
pub mod state;
pub mod string_utils;
pub mod surface;
pub mod syntax;
pub mod widgets;

pub use config::{SurfaceSettings, Theme, Translations};
pub use decorations::{
    compute_decorations, Decoration, DecorationInput, DecorationKind, DecorationSet,
    HandlerRegistry,
};
pub use error::{Error, Result};
pub use ghost::{CompletionBackend, GhostEvent, SessionHandle, StreamOutcome};
pub use state::{ChangeSet, Document, EditorState, Selection, Transaction};
pub use surface::{MarkdownSurface, ScrollRequest};
pub use syntax::{ComrakSyntax, SyntaxProvider, SyntaxTree};
pub use widgets::{InlineWidget, WidgetAction, WidgetKind};
