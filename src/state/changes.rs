//! Change sets and position mapping
//!
//! A [`ChangeSet`] describes one atomic edit of the document as a sequence of
//! retain/delete/insert operations over byte offsets. Anything that stores a
//! document offset across a transaction (highlight records, ghost-writer
//! cursors, drag sessions) must push it through [`ChangeSet::map_pos`] or
//! [`ChangeSet::map_range`] before trusting it again.

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Position stays before insertions at the same location.
    Left,
    /// Position moves after insertions at the same location.
    Right,
}

/// A single operation of a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Retain(usize),
    Delete(usize),
    Insert(String),
}

/// A replacement of `from..to` (old document offsets) with `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl Edit {
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }
}

/// An atomic set of non-overlapping edits over a document of length `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    ops: Vec<Operation>,
    len: usize,
    len_after: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

impl ChangeSet {
    /// Build a change set from edits expressed in old-document offsets.
    ///
    /// Edits may be given in any order but must not overlap.
    pub fn from_edits(len: usize, edits: impl IntoIterator<Item = Edit>) -> Result<Self> {
        let mut edits: Vec<Edit> = edits.into_iter().collect();
        edits.sort_by_key(|e| (e.from, e.to));

        let mut ops = Vec::with_capacity(edits.len() * 3 + 1);
        let mut pos = 0;
        let mut len_after = 0;

        for edit in edits {
            if edit.from > edit.to || edit.to > len || edit.from < pos {
                return Err(Error::InvalidRange {
                    from: edit.from,
                    to: edit.to,
                    len,
                });
            }
            if edit.from > pos {
                ops.push(Operation::Retain(edit.from - pos));
                len_after += edit.from - pos;
            }
            if edit.to > edit.from {
                ops.push(Operation::Delete(edit.to - edit.from));
            }
            if !edit.insert.is_empty() {
                len_after += edit.insert.len();
                ops.push(Operation::Insert(edit.insert));
            }
            pos = edit.to;
        }

        if len > pos {
            ops.push(Operation::Retain(len - pos));
            len_after += len - pos;
        }

        Ok(Self {
            ops,
            len,
            len_after,
        })
    }

    /// Insert `text` at `pos`.
    pub fn insert(len: usize, pos: usize, text: impl Into<String>) -> Result<Self> {
        Self::from_edits(len, [Edit::new(pos, pos, text)])
    }

    /// Delete `from..to`.
    pub fn delete(len: usize, from: usize, to: usize) -> Result<Self> {
        Self::from_edits(len, [Edit::new(from, to, "")])
    }

    /// Replace `from..to` with `text`.
    pub fn replace(len: usize, from: usize, to: usize, text: impl Into<String>) -> Result<Self> {
        Self::from_edits(len, [Edit::new(from, to, text)])
    }

    /// Length of the document this change set applies to.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Length of the document after applying this change set.
    pub fn len_after(&self) -> usize {
        self.len_after
    }

    /// True if applying this change set leaves the text untouched.
    pub fn is_empty(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Operation::Retain(_)))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application and Mapping
// ─────────────────────────────────────────────────────────────────────────────

impl ChangeSet {
    /// Apply the change set to `text`, producing the new text.
    ///
    /// Fails if the text length does not match or an operation would split
    /// a UTF-8 character.
    pub fn apply(&self, text: &str) -> Result<String> {
        if text.len() != self.len {
            return Err(Error::InvalidRange {
                from: 0,
                to: self.len,
                len: text.len(),
            });
        }

        let mut out = String::with_capacity(self.len_after);
        let mut pos = 0;
        for op in &self.ops {
            match op {
                Operation::Retain(n) => {
                    let kept = text.get(pos..pos + n).ok_or(Error::InvalidRange {
                        from: pos,
                        to: pos + n,
                        len: text.len(),
                    })?;
                    out.push_str(kept);
                    pos += n;
                }
                Operation::Delete(n) => {
                    if text.get(pos..pos + n).is_none() {
                        return Err(Error::InvalidRange {
                            from: pos,
                            to: pos + n,
                            len: text.len(),
                        });
                    }
                    pos += n;
                }
                Operation::Insert(s) => out.push_str(s),
            }
        }
        Ok(out)
    }

    /// Map a position in the old document to the new document.
    ///
    /// Positions inside a deleted range collapse to the deletion point.
    pub fn map_pos(&self, pos: usize, bias: Bias) -> usize {
        let mut old_pos = 0;
        let mut new_pos = 0;

        for op in &self.ops {
            if old_pos > pos {
                break;
            }

            match op {
                Operation::Retain(n) => {
                    if old_pos + n > pos {
                        return new_pos + (pos - old_pos);
                    }
                    old_pos += n;
                    new_pos += n;
                }
                Operation::Delete(n) => {
                    if old_pos + n > pos {
                        return new_pos;
                    }
                    old_pos += n;
                }
                Operation::Insert(s) => {
                    if !(old_pos == pos && bias == Bias::Left) {
                        new_pos += s.len();
                    }
                }
            }
        }

        (new_pos + pos.saturating_sub(old_pos)).min(self.len_after)
    }

    /// Map a stored `from..to` range, keeping it from growing over text
    /// inserted at either edge.
    ///
    /// Returns `None` if the range was deleted entirely.
    pub fn map_range(&self, from: usize, to: usize) -> Option<(usize, usize)> {
        let new_from = self.map_pos(from, Bias::Right);
        let new_to = self.map_pos(to, Bias::Left);
        if from < to && new_from >= new_to {
            return None;
        }
        Some((new_from, new_to.max(new_from)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
