//! The editor instance
//!
//! `MarkdownSurface` owns one editor's state and every "at most one" slot:
//! the reference highlight, the image drag session and the ghost-writer
//! session. All document writes, user edits and streamed chunks alike, go
//! through [`MarkdownSurface::dispatch`], which re-derives every stored
//! offset through the transaction's change set before anything reads it
//! again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{SurfaceSettings, Translations};
use crate::decorations::{
    compute_decorations, Decoration, DecorationInput, DecorationSet, HandlerRegistry, LineStyle,
};
use crate::error::Result;
use crate::ghost::{CompletionBackend, GhostConfig, GhostEvent, GhostWriter, SessionHandle};
use crate::highlight::HighlightState;
use crate::images::{ImageRepositioner, PointerEvent, PosAtCoords};
use crate::state::{Bias, Document, EditorState, Effect, Selection, Transaction};
use crate::syntax::{ComrakSyntax, SyntaxProvider};
use crate::widgets::link::{find_definition, navigation_transaction};
use crate::widgets::{DragVisual, InlineWidget, SurfacePalette, WidgetAction, WidgetKind};

/// What the memoized syntax decorations were computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    version: u64,
    selection: Selection,
    hide_markers: bool,
}

/// A position the host should scroll into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub pos: usize,
    /// Lines to keep visible above and below `pos`
    pub margin_lines: usize,
}

/// One embeddable Markdown editing surface.
pub struct MarkdownSurface {
    state: EditorState,
    settings: SurfaceSettings,
    translations: Translations,
    syntax: Box<dyn SyntaxProvider>,
    handlers: HandlerRegistry,
    highlight: HighlightState,
    images: ImageRepositioner,
    ghost: GhostWriter,
    /// Start of the line showing the image drop placeholder
    drop_placeholder: Option<usize>,
    cache: Option<(CacheKey, DecorationSet)>,
    scroll_request: Option<usize>,
}

impl MarkdownSurface {
    pub fn new(text: impl Into<String>, settings: SurfaceSettings) -> Self {
        Self::with_syntax(text, settings, Box::new(ComrakSyntax::new()))
    }

    /// Create a surface over a custom syntax provider.
    pub fn with_syntax(
        text: impl Into<String>,
        settings: SurfaceSettings,
        syntax: Box<dyn SyntaxProvider>,
    ) -> Self {
        let translations = Translations::default();
        let state = EditorState::new(text, syntax.as_ref());
        Self {
            state,
            images: ImageRepositioner::new(settings.drag_hold()),
            ghost: GhostWriter::new(ghost_config(&settings, &translations)),
            settings,
            translations,
            syntax,
            handlers: HandlerRegistry::with_defaults(),
            highlight: HighlightState::new(),
            drop_placeholder: None,
            cache: None,
            scroll_request: None,
        }
    }

    #[must_use]
    pub fn with_translations(mut self, translations: Translations) -> Self {
        self.translations = translations;
        self.ghost
            .set_config(ghost_config(&self.settings, &self.translations));
        self
    }

    /// Replace the handler registry, e.g. to add a handler for a new node type.
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self.cache = None;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        self.state.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn settings(&self) -> &SurfaceSettings {
        &self.settings
    }

    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    pub fn set_settings(&mut self, settings: SurfaceSettings) {
        if let Some(tr) = self.images.destroy() {
            if let Err(e) = self.dispatch(tr) {
                warn!("Failed to clear drop placeholder: {}", e);
            }
        }
        self.images = ImageRepositioner::new(settings.drag_hold());
        self.ghost.set_config(ghost_config(&settings, &self.translations));
        self.settings = settings;
        self.cache = None;
    }

    pub fn palette(&self, visuals: &egui::Visuals) -> SurfacePalette {
        SurfacePalette::from_theme(self.settings.theme, visuals)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a transaction now.
    pub fn dispatch(&mut self, tr: Transaction) -> Result<()> {
        self.dispatch_at(tr, Instant::now())
    }

    /// Apply a transaction, timestamping any highlight it installs with `now`.
    ///
    /// On error the surface is left unchanged.
    pub fn dispatch_at(&mut self, tr: Transaction, now: Instant) -> Result<()> {
        let next = self.state.apply(&tr, self.syntax.as_ref())?;

        if let Some(changes) = tr.changes.as_ref().filter(|c| !c.is_empty()) {
            self.highlight.map_through(changes);
            self.images.map_through(changes);
            self.ghost.map_through(changes);
            self.drop_placeholder = self
                .drop_placeholder
                .map(|pos| changes.map_pos(pos, Bias::Left));
            self.scroll_request = self
                .scroll_request
                .map(|pos| changes.map_pos(pos, Bias::Right));
        }

        for effect in &tr.effects {
            match *effect {
                Effect::AddHighlight { from, to } => self.highlight.add(from, to, now),
                Effect::SetDropPlaceholder(pos) => self.drop_placeholder = pos,
            }
        }

        if tr.scroll_into_view {
            self.scroll_request = Some(next.selection().primary().head);
        }
        self.state = next;
        Ok(())
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
        self.dispatch(Transaction::new().with_selection(selection))
    }

    pub fn set_hide_markers(&mut self, hide: bool) {
        self.settings.hide_markers = hide;
    }

    /// The position the host should scroll into view, once.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        let pos = self.scroll_request.take()?;
        Some(ScrollRequest {
            pos,
            margin_lines: self.settings.scroll_margin_lines,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decorations
    // ─────────────────────────────────────────────────────────────────────────

    /// All decorations to render at `now`.
    ///
    /// The syntax decorations are memoized per document version, selection
    /// and hide flag. Highlight, ghost-writer and placeholder decorations are
    /// time dependent and added on every call; on conflict the syntax
    /// decorations win.
    pub fn decorations(&mut self, now: Instant) -> DecorationSet {
        let key = CacheKey {
            version: self.state.doc().version(),
            selection: self.state.selection().clone(),
            hide_markers: self.settings.hide_markers,
        };

        let syntax = match &self.cache {
            Some((cached, set)) if *cached == key => set.clone(),
            _ => {
                let set = compute_decorations(
                    DecorationInput {
                        doc: self.state.doc(),
                        tree: self.state.tree(),
                        selection: self.state.selection(),
                        hide_markers: self.settings.hide_markers,
                    },
                    &self.handlers,
                );
                self.cache = Some((key, set.clone()));
                set
            }
        };

        let mut overlay: Vec<Decoration> = Vec::new();
        overlay.extend(self.highlight.decoration(now));
        overlay.extend(self.ghost.decorations());
        if let Some(pos) = self.drop_placeholder {
            let line = self.state.doc().line_at(pos);
            overlay.push(Decoration::line(line.from, LineStyle::DropPlaceholder));
        }

        syntax.merge(DecorationSet::from_prioritized(overlay))
    }

    pub fn drop_placeholder_label(&self) -> &str {
        self.translations.drop_here()
    }

    pub fn continue_writing_label(&self) -> &str {
        self.translations.continue_writing()
    }

    /// Tooltip for a footnote widget whose definition is missing.
    pub fn missing_footnote_label(&self, widget: &InlineWidget) -> Option<&str> {
        if !matches!(widget.kind, WidgetKind::Footnote { .. }) {
            return None;
        }
        let reference = widget.reference()?;
        find_definition(self.state.doc(), &reference)
            .is_none()
            .then_some(self.translations.footnote_missing())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Widget & Pointer Interaction
    // ─────────────────────────────────────────────────────────────────────────

    /// Render `widget` in the surface's palette and font size, and react to
    /// a press on it.
    pub fn show_widget(
        &mut self,
        ui: &mut egui::Ui,
        widget: &InlineWidget,
        now: Instant,
    ) -> Result<egui::Response> {
        let palette = self.palette(ui.visuals());
        let drag = match widget.kind {
            WidgetKind::Image { .. } => self.images.drag_visual(widget.start),
            _ => None,
        };
        let shown = widget.show(ui, &palette, self.settings.font_size, drag);
        let mut response = shown.response;
        if let Some(label) = self.missing_footnote_label(widget) {
            response = response.on_hover_text(label);
        }
        self.handle_widget_action(shown.action, now)?;
        Ok(response)
    }

    /// React to a widget press.
    pub fn handle_widget_action(&mut self, action: WidgetAction, now: Instant) -> Result<()> {
        match action {
            WidgetAction::None => Ok(()),
            WidgetAction::Select { from, to } => {
                self.dispatch_at(Transaction::new().with_selection(Selection::single(from, to)), now)
            }
            WidgetAction::Navigate {
                reference,
                from,
                to,
            } => {
                let tr = navigation_transaction(self.state.doc(), &reference, (from, to));
                self.dispatch_at(tr, now)
            }
            WidgetAction::ImagePress { from, to, pointer } => {
                match self.images.press(from, to, pointer, now) {
                    Some(tr) => self.dispatch_at(tr, now),
                    None => Ok(()),
                }
            }
        }
    }

    /// Route a pointer move or release to the image drag session.
    pub fn pointer(
        &mut self,
        event: PointerEvent,
        now: Instant,
        coords: &dyn PosAtCoords,
    ) -> Result<()> {
        self.images.tick(now);
        let tr = match event {
            PointerEvent::Move(pos) => self.images.pointer_move(pos, self.state.doc(), coords),
            PointerEvent::Release(pos) => {
                self.images.release(pos, now, self.state.doc(), coords)
            }
        };
        match tr {
            Some(tr) => self.dispatch_at(tr, now),
            None => Ok(()),
        }
    }

    /// Drop the image drag session, e.g. when its widget is destroyed.
    pub fn cancel_image_drag(&mut self) -> Result<()> {
        match self.images.destroy() {
            Some(tr) => self.dispatch(tr),
            None => Ok(()),
        }
    }

    /// Keep an image session pointing at its widget after upstream edits.
    pub fn update_image_position(&mut self, from: usize, to: usize) {
        self.images.update_position(from, to);
    }

    pub fn drag_visual(&self, from: usize) -> Option<DragVisual> {
        self.images.drag_visual(from)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────────

    /// Advance timers. Returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let dragging = self.images.tick(now);
        let evicted = self.highlight.evict_expired(now);
        dragging || evicted
    }

    /// How long until the next timer fires.
    pub fn repaint_after(&self, now: Instant) -> Option<Duration> {
        match (
            self.highlight.repaint_after(now),
            self.images.next_deadline(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Schedule the next repaint so timers fire without further input.
    pub fn request_repaint(&self, ctx: &egui::Context, now: Instant) {
        if let Some(delay) = self.repaint_after(now) {
            ctx.request_repaint_after(delay);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ghost Writer
    // ─────────────────────────────────────────────────────────────────────────

    /// Start continuing the document at the caret, cancelling any running
    /// session first.
    pub fn continue_writing(
        &mut self,
        backend: Option<Arc<dyn CompletionBackend>>,
    ) -> Result<SessionHandle> {
        let pos = self.state.selection().primary().head;
        self.ghost.start(self.state.doc(), pos, backend).map_err(|e| {
            warn!("Cannot continue writing: {}", e);
            e
        })
    }

    pub fn cancel_writing(&mut self) {
        self.ghost.cancel_active();
    }

    pub fn is_writing(&self) -> bool {
        self.ghost.is_active()
    }

    /// Ghost-writer events that have already arrived.
    pub fn poll_ghost_events(&mut self) -> Vec<GhostEvent> {
        self.ghost.poll_events()
    }

    /// Wait for the next ghost-writer event.
    pub async fn next_ghost_event(&mut self) -> Option<GhostEvent> {
        self.ghost.next_event().await
    }

    /// Dispatch whatever a ghost-writer event asks for.
    pub fn apply_ghost_event(&mut self, event: GhostEvent) -> Result<()> {
        match self.ghost.apply_event(event, self.state.doc()) {
            Some(tr) => self.dispatch(tr),
            None => Ok(()),
        }
    }

    /// Apply every event that has arrived. Returns how many were applied.
    pub fn pump_ghost_events(&mut self) -> usize {
        let events = self.poll_ghost_events();
        let count = events.len();
        for event in events {
            if let Err(e) = self.apply_ghost_event(event) {
                warn!("Failed to apply ghost writer event: {}", e);
            }
        }
        if count > 0 {
            debug!("Applied {} ghost writer events", count);
        }
        count
    }
}

fn ghost_config(settings: &SurfaceSettings, translations: &Translations) -> GhostConfig {
    GhostConfig {
        fade: settings.new_text_fade(),
        context_before: settings.context_before_bytes,
        context_after: settings.context_after_bytes,
        thinking_label: translations.thinking().to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::{DecorationKind, HandlerContext, MarkStyle};
    use crate::error::Error;
    use crate::ghost::CompletionStream;
    use crate::state::ChangeSet;
    use crate::syntax::{NodeKind, SyntaxNode};
    use egui::Pos2;
    use futures_util::{stream, StreamExt};
    use tokio_util::sync::CancellationToken;

    fn surface(text: &str) -> MarkdownSurface {
        let _ = env_logger::builder().is_test(true).try_init();
        MarkdownSurface::new(text, SurfaceSettings::default())
    }

    fn ms(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn has_reference_highlight(set: &DecorationSet) -> bool {
        set.iter()
            .any(|d| d.kind == DecorationKind::Mark(MarkStyle::ReferenceHighlight))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decorations
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_bold_toggles_with_caret() {
        let mut surface = surface("**bold** then plain words here");
        let now = Instant::now();

        surface.set_selection(Selection::cursor(4)).unwrap();
        assert!(surface.decorations(now).widgets().next().is_none());

        surface.set_selection(Selection::cursor(20)).unwrap();
        let set = surface.decorations(now);
        let widget = set.widgets().next().unwrap();
        assert_eq!(widget.kind, WidgetKind::Strong);
        assert_eq!(widget.content, "bold");
    }

    #[test]
    fn test_cached_decorations_are_stable() {
        let mut surface = surface("# Title\n\n*a* and `b`");
        let now = Instant::now();
        let first = surface.decorations(now);
        let second = surface.decorations(now);
        assert_eq!(first, second);

        surface.set_hide_markers(false);
        assert_ne!(surface.decorations(now), first);
    }

    fn skip_node(_: &HandlerContext<'_>, _: &SyntaxNode) -> Vec<Decoration> {
        Vec::new()
    }

    #[test]
    fn test_registered_handler_overrides_default() {
        let text = "a\n\n---\n\nb";
        let now = Instant::now();
        let is_rule = |set: &DecorationSet| set.widgets().any(|w| w.kind == WidgetKind::Rule);
        assert!(is_rule(&surface(text).decorations(now)));

        let mut handlers = HandlerRegistry::with_defaults();
        handlers.register(NodeKind::HorizontalRule.name(), skip_node);
        let mut custom = surface(text).with_handlers(handlers);
        assert!(!is_rule(&custom.decorations(now)));
    }

    #[test]
    fn test_settings_change_invalidates_cache() {
        let mut surface = surface("See *this* word");
        let now = Instant::now();
        assert!(!surface.decorations(now).is_empty());
        surface.set_settings(SurfaceSettings {
            hide_markers: false,
            ..SurfaceSettings::default()
        });
        assert!(surface.decorations(now).is_empty());
    }

    #[test]
    fn test_invalid_transaction_leaves_surface_unchanged() {
        let mut surface = surface("abc");
        let tr = Transaction::new().with_changes(ChangeSet::insert(10, 0, "x").unwrap());
        assert!(surface.dispatch(tr).is_err());
        assert_eq!(surface.doc().text(), "abc");
        assert_eq!(surface.doc().version(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation & highlight
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_footnote_label() {
        let surface = surface("See[^n] and[^gone].\n\n[^n]: Here.");
        let footnote = |label: &str, start| {
            InlineWidget::new(
                WidgetKind::Footnote {
                    label: label.to_string(),
                },
                label,
                format!("[^{}]", label),
                start,
            )
        };
        assert_eq!(surface.missing_footnote_label(&footnote("n", 3)), None);
        assert_eq!(
            surface.missing_footnote_label(&footnote("gone", 11)),
            Some("Footnote not found")
        );
        let code = InlineWidget::new(WidgetKind::InlineCode, "x", "`x`", 0);
        assert_eq!(surface.missing_footnote_label(&code), None);
    }

    #[test]
    fn test_show_widget_without_press() {
        let mut surface = surface("Use `x` here");
        let widget = InlineWidget::new(WidgetKind::InlineCode, "x", "`x`", 4);
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                let response = surface.show_widget(ui, &widget, Instant::now()).unwrap();
                assert!(!response.clicked());
            });
        });
        assert_eq!(surface.selection(), &Selection::cursor(0));
        assert_eq!(surface.take_scroll_request(), None);
    }

    #[test]
    fn test_scroll_request_carries_margin() {
        let mut surface = surface("one\ntwo");
        surface.set_settings(SurfaceSettings {
            scroll_margin_lines: 5,
            ..SurfaceSettings::default()
        });
        surface
            .dispatch(Transaction::new().with_selection(Selection::cursor(6)).scroll_into_view())
            .unwrap();
        assert_eq!(
            surface.take_scroll_request(),
            Some(ScrollRequest {
                pos: 6,
                margin_lines: 5
            })
        );
    }

    const NOTES: &str = "Read this[^n] now.\n\n[^n]: The note.";

    #[test]
    fn test_footnote_press_navigates_and_highlights() {
        let mut surface = surface(NOTES);
        let t0 = Instant::now();
        surface
            .handle_widget_action(
                WidgetAction::Navigate {
                    reference: "^n".to_string(),
                    from: 9,
                    to: 13,
                },
                t0,
            )
            .unwrap();

        let line = surface.doc().line(2).unwrap();
        let (line_from, line_to) = (line.from, line.to);
        assert_eq!(surface.selection(), &Selection::cursor(line_to));
        assert_eq!(
            surface.take_scroll_request(),
            Some(ScrollRequest {
                pos: line_to,
                margin_lines: 3
            })
        );
        assert_eq!(surface.take_scroll_request(), None);

        let live = surface.decorations(ms(t0, 1000));
        assert!(live
            .iter()
            .any(|d| d.kind == DecorationKind::Mark(MarkStyle::ReferenceHighlight)
                && (d.from, d.to) == (line_from, line_to)));
        assert!(!has_reference_highlight(&surface.decorations(ms(t0, 2001))));

        assert_eq!(
            surface.repaint_after(ms(t0, 500)),
            Some(Duration::from_millis(1500))
        );
        assert!(surface.tick(ms(t0, 2001)));
        assert_eq!(surface.repaint_after(ms(t0, 2001)), None);
    }

    #[test]
    fn test_missing_definition_selects_link() {
        let mut surface = surface("See [x][nowhere] here");
        surface
            .handle_widget_action(
                WidgetAction::Navigate {
                    reference: "nowhere".to_string(),
                    from: 4,
                    to: 16,
                },
                Instant::now(),
            )
            .unwrap();
        assert_eq!(surface.selection(), &Selection::single(4, 16));
        assert!(!has_reference_highlight(&surface.decorations(Instant::now())));
    }

    #[test]
    fn test_highlight_follows_edit() {
        let mut surface = surface(NOTES);
        let t0 = Instant::now();
        surface
            .dispatch_at(
                Transaction::new().with_effect(Effect::AddHighlight { from: 20, to: 35 }),
                t0,
            )
            .unwrap();
        let len = surface.doc().len();
        surface
            .dispatch_at(
                Transaction::new().with_changes(ChangeSet::insert(len, 0, ">> ").unwrap()),
                t0,
            )
            .unwrap();
        let set = surface.decorations(ms(t0, 10));
        assert!(set
            .iter()
            .any(|d| d.kind == DecorationKind::Mark(MarkStyle::ReferenceHighlight)
                && (d.from, d.to) == (23, 38)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image drag
    // ─────────────────────────────────────────────────────────────────────────

    struct Rows;

    impl PosAtCoords for Rows {
        fn pos_at_coords(&self, pointer: Pos2) -> Option<usize> {
            // 20px rows over the test document below
            let starts = [0, 5, 9, 13, 39, 44, 49, 53];
            starts.get((pointer.y / 20.0) as usize).copied()
        }
    }

    const IMAGES: &str = "zero\none\ntwo\nthree ![alt](src.png) end\nfour\nfive\nsix\nseven";

    #[test]
    fn test_settings_change_during_drag_clears_placeholder() {
        let mut surface = surface(IMAGES);
        let t0 = Instant::now();
        let from = IMAGES.find("![").unwrap();
        let to = from + "![alt](src.png)".len();
        let has_placeholder = |surface: &mut MarkdownSurface| {
            surface
                .decorations(ms(t0, 300))
                .iter()
                .any(|d| d.kind == DecorationKind::Line(LineStyle::DropPlaceholder))
        };

        surface
            .handle_widget_action(
                WidgetAction::ImagePress {
                    from,
                    to,
                    pointer: Pos2::new(5.0, 65.0),
                },
                t0,
            )
            .unwrap();
        surface
            .pointer(PointerEvent::Move(Pos2::new(5.0, 145.0)), ms(t0, 300), &Rows)
            .unwrap();
        assert!(has_placeholder(&mut surface));

        surface.set_settings(SurfaceSettings::default());
        assert!(!has_placeholder(&mut surface));
        assert!(surface.drag_visual(from).is_none());
    }

    #[test]
    fn test_image_drag_through_surface() {
        let mut surface = surface(IMAGES);
        let t0 = Instant::now();
        let from = IMAGES.find("![").unwrap();
        let to = from + "![alt](src.png)".len();

        surface
            .handle_widget_action(
                WidgetAction::ImagePress {
                    from,
                    to,
                    pointer: Pos2::new(5.0, 65.0),
                },
                t0,
            )
            .unwrap();
        assert_eq!(surface.repaint_after(t0), Some(Duration::from_millis(200)));

        surface
            .pointer(PointerEvent::Move(Pos2::new(5.0, 145.0)), ms(t0, 300), &Rows)
            .unwrap();
        let placeholder = surface
            .decorations(ms(t0, 300))
            .iter()
            .any(|d| d.kind == DecorationKind::Line(LineStyle::DropPlaceholder) && d.from == 53);
        assert!(placeholder);
        assert!(surface.drag_visual(from).is_some());

        surface
            .pointer(PointerEvent::Release(Pos2::new(5.0, 145.0)), ms(t0, 400), &Rows)
            .unwrap();
        assert_eq!(
            surface.doc().text(),
            "zero\none\ntwo\nthree  end\nfour\nfive\nsix\nseven ![alt](src.png)"
        );
        assert!(!surface
            .decorations(ms(t0, 400))
            .iter()
            .any(|d| d.kind == DecorationKind::Line(LineStyle::DropPlaceholder)));
    }

    #[test]
    fn test_image_click_selects_source() {
        let mut surface = surface(IMAGES);
        let t0 = Instant::now();
        let from = IMAGES.find("![").unwrap();
        surface
            .handle_widget_action(
                WidgetAction::ImagePress {
                    from,
                    to: from + 15,
                    pointer: Pos2::new(5.0, 65.0),
                },
                t0,
            )
            .unwrap();
        surface
            .pointer(PointerEvent::Release(Pos2::new(5.0, 65.0)), ms(t0, 80), &Rows)
            .unwrap();
        assert_eq!(surface.selection(), &Selection::single(from, from + 15));
        assert_eq!(surface.doc().text(), IMAGES);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ghost writer
    // ─────────────────────────────────────────────────────────────────────────

    struct Chunks(Vec<&'static str>, u64);

    impl CompletionBackend for Chunks {
        fn stream_completion(&self, _: &str, _: &str, _: CancellationToken) -> CompletionStream {
            let delay = Duration::from_millis(self.1);
            stream::iter(self.0.clone())
                .then(move |chunk| async move {
                    tokio::time::sleep(delay).await;
                    Ok(chunk.to_string())
                })
                .boxed()
        }
    }

    async fn drain(surface: &mut MarkdownSurface) {
        while surface.is_writing() {
            let event = surface.next_ghost_event().await.unwrap();
            surface.apply_ghost_event(event).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_twice_keeps_only_second_after_cancel() {
        let mut surface = surface("Once upon a time.");
        surface.set_selection(Selection::cursor(17)).unwrap();

        let first = surface
            .continue_writing(Some(Arc::new(Chunks(vec![" A1", " A2", " A3"], 100))))
            .unwrap();
        let event = surface.next_ghost_event().await.unwrap();
        surface.apply_ghost_event(event).unwrap();
        assert_eq!(surface.doc().text(), "Once upon a time. A1");
        surface.set_selection(Selection::cursor(20)).unwrap();

        let second = surface
            .continue_writing(Some(Arc::new(Chunks(vec![" B1", " B2"], 10))))
            .unwrap();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        drain(&mut surface).await;
        assert_eq!(surface.doc().text(), "Once upon a time. A1 B1 B2");
        assert_eq!(surface.selection(), &Selection::cursor(26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_thinking_indicator_while_streaming() {
        let mut surface = surface("Hi.");
        surface.set_selection(Selection::cursor(3)).unwrap();
        surface
            .continue_writing(Some(Arc::new(Chunks(vec![" there"], 10))))
            .unwrap();

        let set = surface.decorations(Instant::now());
        let thinking = set
            .widgets()
            .find(|w| w.kind == WidgetKind::Thinking)
            .unwrap();
        assert_eq!(thinking.content, "AI is thinking…");

        drain(&mut surface).await;
        assert!(surface
            .decorations(Instant::now())
            .widgets()
            .all(|w| w.kind != WidgetKind::Thinking));
        assert!(surface
            .decorations(Instant::now())
            .iter()
            .any(|d| d.kind == DecorationKind::Mark(MarkStyle::NewText)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translated_labels() {
        let translations = Translations::from_json(
            r#"{"ai.thinking": "KI denkt nach…", "image.drop_here": "Bild hier ablegen"}"#,
        )
        .unwrap();
        let mut surface = surface("Hallo.").with_translations(translations);
        assert_eq!(surface.drop_placeholder_label(), "Bild hier ablegen");
        assert_eq!(surface.continue_writing_label(), "Continue writing");

        surface.set_selection(Selection::cursor(6)).unwrap();
        surface
            .continue_writing(Some(Arc::new(Chunks(vec![" Welt"], 10))))
            .unwrap();
        let set = surface.decorations(Instant::now());
        assert!(set
            .widgets()
            .any(|w| w.kind == WidgetKind::Thinking && w.content == "KI denkt nach…"));
        surface.cancel_writing();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_writing_keeps_partial_text() {
        let mut surface = surface("ab");
        surface.set_selection(Selection::cursor(2)).unwrap();
        let handle = surface
            .continue_writing(Some(Arc::new(Chunks(vec!["X", "Y", "Z"], 10))))
            .unwrap();
        let event = surface.next_ghost_event().await.unwrap();
        surface.apply_ghost_event(event).unwrap();
        surface.set_selection(Selection::cursor(0)).unwrap();

        surface.cancel_writing();
        assert!(handle.is_cancelled());
        assert!(!surface.is_writing());
        let new_text = |surface: &mut MarkdownSurface| {
            surface
                .decorations(Instant::now())
                .iter()
                .any(|d| d.kind == DecorationKind::Mark(MarkStyle::NewText))
        };
        assert!(new_text(&mut surface));

        tokio::time::sleep(Duration::from_millis(50)).await;
        surface.pump_ghost_events();
        assert_eq!(surface.doc().text(), "abX");
        assert_eq!(surface.selection(), &Selection::cursor(3));
        let set = surface.decorations(Instant::now());
        assert!(set.widgets().all(|w| w.kind != WidgetKind::Thinking));
        assert!(new_text(&mut surface));

        tokio::time::sleep(surface.settings().new_text_fade()).await;
        surface.pump_ghost_events();
        assert!(!new_text(&mut surface));
    }

    #[tokio::test]
    async fn test_continue_without_backend() {
        let mut surface = surface("text");
        let result = surface.continue_writing(None);
        assert!(matches!(result, Err(Error::NoStreamHandler)));
        assert!(!surface.is_writing());
        assert_eq!(surface.doc().text(), "text");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_typing_during_stream() {
        let mut surface = surface("ab");
        surface.set_selection(Selection::cursor(2)).unwrap();
        surface
            .continue_writing(Some(Arc::new(Chunks(vec!["X", "Y"], 10))))
            .unwrap();

        let event = surface.next_ghost_event().await.unwrap();
        surface.apply_ghost_event(event).unwrap();
        let len = surface.doc().len();
        surface
            .dispatch(Transaction::new().with_changes(ChangeSet::insert(len, 0, "# ").unwrap()))
            .unwrap();

        drain(&mut surface).await;
        assert_eq!(surface.doc().text(), "# abXY");
    }
}
