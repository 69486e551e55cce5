//! Syntax tree, parser adapter and inline delimiter extensions
//!
//! The decoration engine consumes an offset-based [`SyntaxTree`]. Where that
//! tree comes from is behind the [`SyntaxProvider`] trait; [`ComrakSyntax`]
//! is the bundled provider, extended with the `==mark==`, `~~strike~~` and
//! `~underline~` delimiter extensions.

pub mod delimiters;
mod parser;
mod tree;

pub use delimiters::{DelimiterExtension, DelimiterRegistry, DelimiterRun};
pub use parser::{ComrakSyntax, MarkdownOptions, SyntaxProvider};
pub use tree::{NodeKind, SyntaxNode, SyntaxTree};
