//! The decoration pass
//!
//! Walks the syntax tree in pre-order and collects handler output. Order of
//! collection is priority order: definition widgets first, then outer nodes
//! before the nodes nested in them, so an outer replacement always beats an
//! inner one when the two overlap.

use std::collections::HashSet;

use log::debug;

use crate::decorations::definitions::{scan_definitions, DefinitionScan};
use crate::decorations::handlers::{HandlerContext, HandlerRegistry};
use crate::decorations::{Decoration, DecorationSet};
use crate::state::{Document, Selection};
use crate::syntax::{NodeKind, SyntaxNode, SyntaxTree};

/// Everything the pass depends on. Nothing else is read.
#[derive(Debug, Clone, Copy)]
pub struct DecorationInput<'a> {
    pub doc: &'a Document,
    pub tree: &'a SyntaxTree,
    pub selection: &'a Selection,
    pub hide_markers: bool,
}

struct Walk<'a> {
    input: DecorationInput<'a>,
    registry: &'a HandlerRegistry,
    definitions: DefinitionScan,
    /// Blockquotes already decorated, keyed `"{from}-{to}"`
    processed_quotes: HashSet<String>,
    out: Vec<Decoration>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &SyntaxNode, list_depth: usize) {
        if node.kind != NodeKind::Document {
            let line = self.input.doc.line_at(node.from).number;
            if self.definitions.is_claimed(line) {
                return;
            }
        }

        let run_handler = if node.kind == NodeKind::Blockquote {
            let fresh = self.processed_quotes.insert(quote_key(node));
            if fresh {
                for nested in node.descendants().into_iter().skip(1) {
                    if nested.kind == NodeKind::Blockquote {
                        self.processed_quotes.insert(quote_key(nested));
                    }
                }
            }
            fresh
        } else {
            true
        };

        if run_handler {
            let ctx = HandlerContext {
                doc: self.input.doc,
                selection: self.input.selection,
                hide_markers: self.input.hide_markers,
                from: node.from,
                to: node.to,
                list_depth,
            };
            self.out.extend(self.registry.decorate(&ctx, node));
        }

        let child_depth = match node.kind {
            NodeKind::BulletList | NodeKind::OrderedList => list_depth + 1,
            _ => list_depth,
        };
        for child in &node.children {
            self.visit(child, child_depth);
        }
    }
}

fn quote_key(node: &SyntaxNode) -> String {
    format!("{}-{}", node.from, node.to)
}

/// Compute the syntax decorations for one document state.
///
/// The result depends only on `input`, so the same input always yields an
/// identical set.
pub fn compute_decorations(input: DecorationInput<'_>, registry: &HandlerRegistry) -> DecorationSet {
    let definitions = scan_definitions(input.doc);
    let prescanned = definitions.decorations(input.doc, input.selection, input.hide_markers);

    let mut walk = Walk {
        input,
        registry,
        definitions,
        processed_quotes: HashSet::new(),
        out: prescanned,
    };
    walk.visit(&input.tree.root, 0);

    let collected = walk.out.len();
    let set = DecorationSet::from_prioritized(walk.out);
    debug!(
        "Computed {} decorations ({} dropped) for version {}",
        set.len(),
        collected - set.len(),
        input.doc.version()
    );
    set
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
