//! Temporary highlight after jumping to a definition.
//!
//! At most one record is active; adding a new one replaces the old. A record
//! renders while it is younger than [`DECAY_MS`] and renders nothing after,
//! whether or not it has been evicted yet. Callers pass `now` explicitly so
//! the decay is deterministic.

use std::time::{Duration, Instant};

use crate::decorations::{Decoration, MarkStyle};
use crate::state::ChangeSet;

/// Lifetime of a highlight record.
pub const DECAY_MS: u64 = 2000;

pub const DECAY: Duration = Duration::from_millis(DECAY_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRecord {
    pub from: usize,
    pub to: usize,
    pub created: Instant,
}

impl HighlightRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= DECAY
    }
}

/// The single active highlight slot of an editor instance.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    active: Option<HighlightRecord>,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a highlight over `from..to`, superseding any active one.
    pub fn add(&mut self, from: usize, to: usize, now: Instant) {
        self.active = Some(HighlightRecord {
            from,
            to,
            created: now,
        });
    }

    pub fn active(&self) -> Option<&HighlightRecord> {
        self.active.as_ref()
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Re-derive the stored range through a document change. A range that
    /// collapses drops the record.
    pub fn map_through(&mut self, changes: &ChangeSet) {
        if let Some(record) = self.active {
            self.active = changes
                .map_range(record.from, record.to)
                .map(|(from, to)| HighlightRecord { from, to, ..record });
        }
    }

    /// The decoration to render at `now`, if the record is still live.
    pub fn decoration(&self, now: Instant) -> Option<Decoration> {
        self.active
            .filter(|record| !record.is_expired(now))
            .map(|record| Decoration::mark(record.from, record.to, MarkStyle::ReferenceHighlight))
    }

    /// Drop an expired record. Returns whether one was dropped.
    pub fn evict_expired(&mut self, now: Instant) -> bool {
        match self.active {
            Some(record) if record.is_expired(now) => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// How long until the active record expires, so the host can schedule a
    /// repaint that makes it disappear without further input.
    pub fn repaint_after(&self, now: Instant) -> Option<Duration> {
        self.active.map(|record| {
            (record.created + DECAY).saturating_duration_since(now)
        })
    }
}
