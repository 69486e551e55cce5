//! Editor selection: one or more ranges with a primary one.

use crate::state::changes::{Bias, ChangeSet};

/// A single selection range. `anchor == head` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub anchor: usize,
    pub head: usize,
}

impl SelectionRange {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Touching counts: a caret at either edge of `from..to` overlaps it.
    pub fn overlaps(&self, from: usize, to: usize) -> bool {
        self.from() <= to && self.to() >= from
    }

    fn map(&self, changes: &ChangeSet) -> Self {
        if self.is_empty() {
            let pos = changes.map_pos(self.head, Bias::Right);
            return Self::new(pos, pos);
        }
        Self::new(
            changes.map_pos(self.anchor, Bias::Left),
            changes.map_pos(self.head, Bias::Left),
        )
    }
}

/// The full selection state of an editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    primary: usize,
}

impl Selection {
    /// A single caret at `pos`.
    pub fn cursor(pos: usize) -> Self {
        Self::single(pos, pos)
    }

    pub fn single(anchor: usize, head: usize) -> Self {
        Self {
            ranges: vec![SelectionRange::new(anchor, head)],
            primary: 0,
        }
    }

    /// Several ranges; an empty list becomes a caret at 0.
    pub fn multi(ranges: Vec<SelectionRange>, primary: usize) -> Self {
        if ranges.is_empty() {
            return Self::cursor(0);
        }
        let primary = primary.min(ranges.len() - 1);
        Self { ranges, primary }
    }

    pub fn primary(&self) -> SelectionRange {
        self.ranges[self.primary]
    }

    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// Whether the primary range overlaps `from..to`.
    pub fn overlaps(&self, from: usize, to: usize) -> bool {
        self.primary().overlaps(from, to)
    }

    /// The largest offset referenced by any range.
    pub fn max_pos(&self) -> usize {
        self.ranges.iter().map(SelectionRange::to).max().unwrap_or(0)
    }

    pub fn map(&self, changes: &ChangeSet) -> Self {
        Self {
            ranges: self.ranges.iter().map(|r| r.map(changes)).collect(),
            primary: self.primary,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(0)
    }
}
