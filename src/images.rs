//! Drag-to-reposition for image widgets
//!
//! A press arms the controller and starts a short hold window. Releasing
//! inside the window is a click and selects the image source. Once the window
//! has passed (observed by [`ImageRepositioner::tick`]) the controller is
//! dragging: pointer moves update the drop placeholder line, and a release
//! moves the image token to the end of the line under the pointer.
//!
//! ```text
//! Idle --press--> Armed --tick past deadline--> Dragging
//!   ^               |                              |
//!   +---release-----+ (click)                      |
//!   +------------------------release (drop)--------+
//! ```

use std::time::{Duration, Instant};

use egui::{Pos2, Vec2};
use log::{debug, warn};

use crate::error::Result;
use crate::state::{Bias, ChangeSet, Document, Edit, Effect, Selection, Transaction};
use crate::widgets::DragVisual;

/// Opacity of an image widget while it is being dragged.
const DRAG_OPACITY: f32 = 0.5;

/// Maps a pointer position to a document offset. Supplied by the host view.
pub trait PosAtCoords {
    fn pos_at_coords(&self, pointer: Pos2) -> Option<usize>;
}

/// Pointer events routed to the active drag session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move(Pos2),
    Release(Pos2),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Armed { deadline: Instant },
    Dragging,
}

#[derive(Debug, Clone, PartialEq)]
struct DragSession {
    /// Source range of the image token
    from: usize,
    to: usize,
    start: Pos2,
    current: Pos2,
    phase: DragPhase,
    /// Start of the line the placeholder is shown on
    placeholder: Option<usize>,
}

impl DragSession {
    fn offset(&self) -> Vec2 {
        self.current - self.start
    }
}

/// The click-vs-drag state machine for image widgets.
///
/// One session at a time; pressing another image replaces the session.
#[derive(Debug, Clone)]
pub struct ImageRepositioner {
    hold: Duration,
    session: Option<DragSession>,
}

impl ImageRepositioner {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            session: None,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.session
            .as_ref()
            .map_or(DragPhase::Idle, |session| session.phase)
    }

    /// Source range of the image being pressed or dragged.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.session.as_ref().map(|s| (s.from, s.to))
    }

    pub fn placeholder(&self) -> Option<usize> {
        self.session.as_ref().and_then(|s| s.placeholder)
    }

    /// Press on the image spanning `from..to`.
    ///
    /// Replaces any running session and returns the transaction clearing its
    /// placeholder, if it had one.
    pub fn press(
        &mut self,
        from: usize,
        to: usize,
        pointer: Pos2,
        now: Instant,
    ) -> Option<Transaction> {
        debug!("Image press at {:?}, source {}..{}", pointer, from, to);
        let cleanup = self.destroy();
        self.session = Some(DragSession {
            from,
            to,
            start: pointer,
            current: pointer,
            phase: DragPhase::Armed {
                deadline: now + self.hold,
            },
            placeholder: None,
        });
        cleanup
    }

    /// Promote an armed session to dragging once its hold window has passed.
    /// Returns whether the phase changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &mut self.session {
            Some(session) => match session.phase {
                DragPhase::Armed { deadline } if now >= deadline => {
                    debug!("Image drag started for {}..{}", session.from, session.to);
                    session.phase = DragPhase::Dragging;
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Time left in the hold window, for scheduling the next tick.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        match self.phase() {
            DragPhase::Armed { deadline } => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Track a pointer move. While dragging, returns a transaction moving the
    /// placeholder when the line under the pointer changes.
    pub fn pointer_move(
        &mut self,
        pointer: Pos2,
        doc: &Document,
        coords: &dyn PosAtCoords,
    ) -> Option<Transaction> {
        let session = self.session.as_mut()?;
        session.current = pointer;
        if session.phase != DragPhase::Dragging {
            return None;
        }

        let line_start = coords
            .pos_at_coords(pointer)
            .map(|pos| doc.line_at(pos).from);
        if line_start == session.placeholder {
            return None;
        }
        session.placeholder = line_start;
        Some(Transaction::new().with_effect(Effect::SetDropPlaceholder(line_start)))
    }

    /// Finish the interaction.
    ///
    /// An armed session becomes a click that selects the image source; a
    /// dragging session drops the image on the line under the pointer. The
    /// session is cleared either way.
    pub fn release(
        &mut self,
        pointer: Pos2,
        now: Instant,
        doc: &Document,
        coords: &dyn PosAtCoords,
    ) -> Option<Transaction> {
        self.tick(now);
        let session = self.session.take()?;

        match session.phase {
            DragPhase::Idle => None,
            DragPhase::Armed { .. } => {
                Some(Transaction::new().with_selection(Selection::single(session.from, session.to)))
            }
            DragPhase::Dragging => {
                let clear = Transaction::new().with_effect(Effect::SetDropPlaceholder(None));
                let Some(target) = coords.pos_at_coords(pointer) else {
                    debug!("Image dropped outside the document");
                    return Some(clear);
                };
                match drop_transaction(doc, session.from, session.to, target) {
                    Ok(Some(tr)) => Some(tr.with_effect(Effect::SetDropPlaceholder(None))),
                    Ok(None) => Some(clear),
                    Err(e) => {
                        warn!("Failed to move image: {}", e);
                        Some(clear)
                    }
                }
            }
        }
    }

    /// Tear down the session, e.g. when the widget goes away. Returns a
    /// transaction clearing the placeholder if one was shown.
    pub fn destroy(&mut self) -> Option<Transaction> {
        let session = self.session.take()?;
        session
            .placeholder
            .map(|_| Transaction::new().with_effect(Effect::SetDropPlaceholder(None)))
    }

    /// Point the session at a new source range without resetting its phase.
    pub fn update_position(&mut self, from: usize, to: usize) {
        if let Some(session) = &mut self.session {
            session.from = from;
            session.to = to;
        }
    }

    /// Re-derive stored offsets through a document change. The session ends
    /// if its image was deleted.
    pub fn map_through(&mut self, changes: &ChangeSet) {
        let Some(session) = &mut self.session else {
            return;
        };
        match changes.map_range(session.from, session.to) {
            Some((from, to)) => {
                session.from = from;
                session.to = to;
                session.placeholder = session
                    .placeholder
                    .map(|pos| changes.map_pos(pos, Bias::Left));
            }
            None => {
                debug!("Dragged image was removed by an edit");
                self.session = None;
            }
        }
    }

    /// Visual state for the dragged widget at `from`.
    pub fn drag_visual(&self, from: usize) -> Option<DragVisual> {
        let session = self.session.as_ref()?;
        (session.phase == DragPhase::Dragging && session.from == from).then(|| DragVisual {
            offset: session.offset(),
            opacity: DRAG_OPACITY,
        })
    }
}

impl Default for ImageRepositioner {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

/// Move the image token `from..to` onto the line containing `target`.
///
/// The token goes to the end of a non-empty line, after a space, or to the
/// start of an empty one. Returns `None` when the target is the image's own
/// line.
pub fn drop_transaction(
    doc: &Document,
    from: usize,
    to: usize,
    target: usize,
) -> Result<Option<Transaction>> {
    let token = doc.slice(from, to).to_string();
    let source_line = doc.line_at(from);
    let target_line = doc.line_at(target);
    if source_line.number == target_line.number || token.is_empty() {
        return Ok(None);
    }

    let (at, insert) = if target_line.is_empty() {
        (target_line.from, token)
    } else {
        (target_line.to, format!(" {}", token))
    };

    let mut edits = vec![Edit::new(from, to, ""), Edit::new(at, at, insert)];
    edits.sort_by_key(|e| e.from);
    let changes = ChangeSet::from_edits(doc.len(), edits)?;
    let caret = changes.map_pos(at, Bias::Right);

    Ok(Some(
        Transaction::new()
            .with_changes(changes)
            .with_selection(Selection::cursor(caret)),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// One line per 20px of `y`.
    struct LineCoords<'a>(&'a Document);

    impl PosAtCoords for LineCoords<'_> {
        fn pos_at_coords(&self, pointer: Pos2) -> Option<usize> {
            if pointer.y < 0.0 {
                return None;
            }
            let line = (pointer.y / 20.0) as usize;
            self.0.line(line).map(|l| l.from)
        }
    }

    fn doc() -> Document {
        Document::new("zero\none\ntwo\nthree ![alt](src.png) end\nfour\nfive\nsix\nseven\neight")
    }

    fn image_range(doc: &Document) -> (usize, usize) {
        let from = doc.text().find("![alt]").unwrap();
        (from, from + "![alt](src.png)".len())
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_quick_release_is_click() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::new(Duration::from_millis(200));
        images.press(from, to, Pos2::new(10.0, 65.0), t0);
        assert!(matches!(images.phase(), DragPhase::Armed { .. }));

        let tr = images
            .release(Pos2::new(10.0, 65.0), at(t0, 50), &doc, &LineCoords(&doc))
            .unwrap();
        assert_eq!(tr.selection, Some(Selection::single(from, to)));
        assert!(tr.changes.is_none());
        assert_eq!(images.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_moves_before_hold_do_not_drag() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::default();
        images.press(from, to, Pos2::new(10.0, 65.0), t0);
        assert!(images
            .pointer_move(Pos2::new(10.0, 145.0), &doc, &LineCoords(&doc))
            .is_none());
        assert!(images.drag_visual(from).is_none());
    }

    #[test]
    fn test_drag_image_from_line_3_to_line_7() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let coords = LineCoords(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::new(Duration::from_millis(200));

        images.press(from, to, Pos2::new(10.0, 65.0), t0);
        assert!(images.tick(at(t0, 250)));
        assert_eq!(images.phase(), DragPhase::Dragging);

        let tr = images
            .pointer_move(Pos2::new(12.0, 145.0), &doc, &coords)
            .unwrap();
        let line7 = doc.line(7).unwrap().from;
        assert_eq!(tr.effects, vec![Effect::SetDropPlaceholder(Some(line7))]);
        assert_eq!(images.placeholder(), Some(line7));
        let visual = images.drag_visual(from).unwrap();
        assert_eq!(visual.offset, Vec2::new(2.0, 80.0));

        let tr = images
            .release(Pos2::new(12.0, 145.0), at(t0, 400), &doc, &coords)
            .unwrap();
        assert!(tr.effects.contains(&Effect::SetDropPlaceholder(None)));
        let text = tr.changes.as_ref().unwrap().apply(doc.text()).unwrap();

        let before: Vec<_> = doc.text().lines().collect();
        let after: Vec<_> = text.lines().collect();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[3], "three  end");
        assert_eq!(after[7], "seven ![alt](src.png)");
        for (n, (a, b)) in before.iter().zip(&after).enumerate() {
            if n != 3 && n != 7 {
                assert_eq!(a, b);
            }
        }
        assert_eq!(images.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_drop_on_empty_line_inserts_at_start() {
        let doc = Document::new("![i](a.png)\n\nend");
        let tr = drop_transaction(&doc, 0, 11, 12).unwrap().unwrap();
        let text = tr.changes.unwrap().apply(doc.text()).unwrap();
        assert_eq!(text, "\n![i](a.png)\nend");
    }

    #[test]
    fn test_drop_on_own_line_is_noop() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        assert!(drop_transaction(&doc, from, to, from + 2).unwrap().is_none());
    }

    #[test]
    fn test_drop_outside_document_only_clears_placeholder() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::default();
        images.press(from, to, Pos2::new(0.0, 65.0), t0);
        images.tick(at(t0, 300));
        let tr = images
            .release(Pos2::new(0.0, -5.0), at(t0, 350), &doc, &LineCoords(&doc))
            .unwrap();
        assert!(tr.changes.is_none());
        assert_eq!(tr.effects, vec![Effect::SetDropPlaceholder(None)]);
    }

    #[test]
    fn test_session_follows_edits() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let mut images = ImageRepositioner::default();
        images.press(from, to, Pos2::ZERO, Instant::now());
        images.map_through(&ChangeSet::insert(doc.len(), 0, "# ").unwrap());
        assert_eq!(images.range(), Some((from + 2, to + 2)));

        images.map_through(&ChangeSet::delete(doc.len() + 2, from + 2, to + 2).unwrap());
        assert_eq!(images.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_press_during_drag_clears_old_placeholder() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::default();
        assert!(images.press(from, to, Pos2::ZERO, t0).is_none());
        images.tick(at(t0, 300));
        images.pointer_move(Pos2::new(0.0, 5.0), &doc, &LineCoords(&doc));
        assert!(images.placeholder().is_some());

        let tr = images.press(from, to, Pos2::ZERO, at(t0, 400)).unwrap();
        assert_eq!(tr.effects, vec![Effect::SetDropPlaceholder(None)]);
        assert!(images.placeholder().is_none());
        assert!(matches!(images.phase(), DragPhase::Armed { .. }));
    }

    #[test]
    fn test_destroy_clears_placeholder() {
        let doc = doc();
        let (from, to) = image_range(&doc);
        let t0 = Instant::now();
        let mut images = ImageRepositioner::default();
        images.press(from, to, Pos2::ZERO, t0);
        images.tick(at(t0, 300));
        images.pointer_move(Pos2::new(0.0, 5.0), &doc, &LineCoords(&doc));
        let tr = images.destroy().unwrap();
        assert_eq!(tr.effects, vec![Effect::SetDropPlaceholder(None)]);
        assert!(images.destroy().is_none());
    }
}
