//! Jump-to-definition for reference links and footnotes.
//!
//! Resolution is purely textual: the target is the first line that starts
//! with `[label]:`. A hit moves the caret to the end of that line, scrolls it
//! into view and installs the temporary reference highlight over the line; a
//! miss falls back to selecting the link's own source.

use log::debug;

use crate::state::{Document, Effect, Line, Selection, Transaction};

/// Find the definition line for `reference` (`"docs"` or `"^note"`).
pub fn find_definition<'a>(doc: &'a Document, reference: &str) -> Option<Line<'a>> {
    let prefix = format!("[{}]:", reference);
    doc.lines().find(|line| line.text.starts_with(&prefix))
}

/// Build the transaction for pressing a link bound to `reference`.
///
/// `fallback` is the link's own source range, selected when the definition
/// does not exist.
pub fn navigation_transaction(
    doc: &Document,
    reference: &str,
    fallback: (usize, usize),
) -> Transaction {
    match find_definition(doc, reference) {
        Some(line) => Transaction::new()
            .with_selection(Selection::cursor(line.to))
            .with_effect(Effect::AddHighlight {
                from: line.from,
                to: line.to,
            })
            .scroll_into_view(),
        None => {
            debug!(
                "No definition for reference '{}', selecting link source",
                reference
            );
            let (from, to) = fallback;
            Transaction::new().with_selection(Selection::single(from, to))
        }
    }
}
