//! egui rendering for inline widgets
//!
//! Every widget renders as a single label. The label senses clicks and drags
//! so a primary press can be intercepted and turned into a [`WidgetAction`].

use egui::{Align2, Color32, FontId, Response, RichText, Sense, Ui, Vec2};

use crate::config::Theme;
use crate::decorations::QuoteTone;
use crate::widgets::{InlineWidget, WidgetAction, WidgetKind};

// ─────────────────────────────────────────────────────────────────────────────
// Palette
// ─────────────────────────────────────────────────────────────────────────────

/// Number of distinct blockquote bar colours before the deep colour is reused.
pub const QUOTE_TONES: usize = 4;

/// Theme-aware colours for widgets and decorations.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePalette {
    /// Primary text colour
    pub text: Color32,
    /// De-emphasised text (definitions, thinking indicator)
    pub muted: Color32,
    pub heading: Color32,
    pub link: Color32,
    pub code_bg: Color32,
    pub code_text: Color32,
    /// Background of `==mark==` text
    pub highlight_bg: Color32,
    pub bullet: Color32,
    pub rule: Color32,
    /// Background of a code block line
    pub code_block_bg: Color32,
    pub quote_tones: [Color32; QUOTE_TONES],
    pub quote_deep: Color32,
    /// Background of the temporary definition highlight
    pub reference_highlight: Color32,
    /// Background of ghost-writer text before it fades
    pub new_text: Color32,
    pub drop_placeholder: Color32,
}

impl SurfacePalette {
    /// Create colours for the given theme.
    pub fn from_theme(theme: Theme, visuals: &egui::Visuals) -> Self {
        match theme {
            Theme::Light => Self::light(),
            Theme::Dark => Self::dark(),
            Theme::System => {
                if visuals.dark_mode {
                    Self::dark()
                } else {
                    Self::light()
                }
            }
        }
    }

    pub fn light() -> Self {
        Self {
            text: Color32::from_rgb(30, 30, 30),
            muted: Color32::from_rgb(120, 120, 130),
            heading: Color32::from_rgb(20, 20, 40),
            link: Color32::from_rgb(0, 102, 204),
            code_bg: Color32::from_rgb(240, 240, 245),
            code_text: Color32::from_rgb(180, 40, 80),
            highlight_bg: Color32::from_rgb(255, 240, 150),
            bullet: Color32::from_rgb(100, 100, 110),
            rule: Color32::from_rgb(200, 200, 205),
            code_block_bg: Color32::from_rgb(246, 246, 250),
            quote_tones: [
                Color32::from_rgb(100, 149, 237),
                Color32::from_rgb(60, 179, 113),
                Color32::from_rgb(218, 165, 32),
                Color32::from_rgb(199, 21, 133),
            ],
            quote_deep: Color32::from_rgb(150, 150, 160),
            reference_highlight: Color32::from_rgb(255, 230, 120),
            new_text: Color32::from_rgb(220, 235, 255),
            drop_placeholder: Color32::from_rgb(0, 120, 215),
        }
    }

    pub fn dark() -> Self {
        Self {
            text: Color32::from_rgb(220, 220, 220),
            muted: Color32::from_rgb(140, 140, 150),
            heading: Color32::from_rgb(240, 240, 250),
            link: Color32::from_rgb(100, 170, 255),
            code_bg: Color32::from_rgb(45, 45, 50),
            code_text: Color32::from_rgb(230, 140, 160),
            highlight_bg: Color32::from_rgb(110, 95, 30),
            bullet: Color32::from_rgb(160, 160, 170),
            rule: Color32::from_rgb(80, 80, 85),
            code_block_bg: Color32::from_rgb(35, 35, 40),
            quote_tones: [
                Color32::from_rgb(100, 149, 237),
                Color32::from_rgb(80, 200, 140),
                Color32::from_rgb(230, 180, 60),
                Color32::from_rgb(220, 90, 170),
            ],
            quote_deep: Color32::from_rgb(110, 110, 120),
            reference_highlight: Color32::from_rgb(120, 100, 30),
            new_text: Color32::from_rgb(40, 60, 90),
            drop_placeholder: Color32::from_rgb(80, 160, 255),
        }
    }

    /// Colour of a blockquote bar.
    pub fn quote_color(&self, tone: QuoteTone) -> Color32 {
        match tone {
            QuoteTone::Level(level) => self
                .quote_tones
                .get(level as usize)
                .copied()
                .unwrap_or(self.quote_deep),
            QuoteTone::Deep => self.quote_deep,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Visual state of an image widget while it is being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragVisual {
    /// Pointer offset from where the drag started
    pub offset: Vec2,
    /// Opacity of the widget left in place
    pub opacity: f32,
}

/// Output from showing a widget.
pub struct WidgetResponse {
    pub response: Response,
    /// Action triggered by a press this frame
    pub action: WidgetAction,
}

fn heading_size(level: u8, base: f32) -> f32 {
    match level {
        1 => base * 2.0,
        2 => base * 1.6,
        3 => base * 1.35,
        4 => base * 1.2,
        5 => base * 1.1,
        _ => base,
    }
}

impl InlineWidget {
    /// The styled text for this widget.
    pub fn rich_text(&self, palette: &SurfacePalette, font_size: f32) -> RichText {
        let text = RichText::new(&self.content).size(font_size).color(palette.text);
        match &self.kind {
            WidgetKind::Heading(level) => text
                .size(heading_size(*level, font_size))
                .color(palette.heading)
                .strong(),
            WidgetKind::Emphasis => text.italics(),
            WidgetKind::Strong => text.strong(),
            WidgetKind::InlineCode => text
                .code()
                .color(palette.code_text)
                .background_color(palette.code_bg),
            WidgetKind::Strikethrough => text.strikethrough(),
            WidgetKind::Highlight => text.background_color(palette.highlight_bg),
            WidgetKind::Underline => text.underline(),
            WidgetKind::Link { .. } => text.color(palette.link).underline(),
            WidgetKind::Image { alt, .. } => {
                RichText::new(format!("🖼 {}", alt)).size(font_size).color(palette.link)
            }
            WidgetKind::Footnote { label } => RichText::new(format!("[{}]", label))
                .color(palette.link)
                .small_raised(),
            WidgetKind::Definition { label, target, footnote } => {
                let shown = match (footnote, target) {
                    (true, _) => format!("{}:", label),
                    (false, Some(target)) => format!("{} → {}", label, target),
                    (false, None) => label.clone(),
                };
                RichText::new(shown).size(font_size * 0.9).color(palette.muted)
            }
            WidgetKind::Bullet(glyph) => RichText::new(glyph.to_string())
                .size(font_size)
                .color(palette.bullet),
            WidgetKind::Rule => RichText::new(self.content.repeat(24)).color(palette.rule),
            WidgetKind::Thinking => text.italics().color(palette.muted),
        }
    }

    /// Render the widget as a single label and translate a primary press
    /// into an action.
    pub fn show(
        &self,
        ui: &mut Ui,
        palette: &SurfacePalette,
        font_size: f32,
        drag: Option<DragVisual>,
    ) -> WidgetResponse {
        let mut rich = self.rich_text(palette, font_size);
        if let Some(drag) = drag {
            rich = rich.color(palette.text.gamma_multiply(drag.opacity));
        }

        let mut response = ui.add(egui::Label::new(rich).sense(Sense::click_and_drag()));

        let pressed =
            response.is_pointer_button_down_on() && ui.input(|i| i.pointer.primary_pressed());
        let action = if pressed && self.handles_press() {
            let pointer = response
                .interact_pointer_pos()
                .unwrap_or(response.rect.center());
            self.press(pointer)
        } else {
            WidgetAction::None
        };

        if let Some(drag) = drag {
            ui.painter().text(
                response.rect.left_top() + drag.offset,
                Align2::LEFT_TOP,
                &self.content,
                FontId::proportional(font_size),
                palette.link,
            );
        }

        if let Some(text) = self.hover_text() {
            response = response.on_hover_text(text);
        }

        WidgetResponse { response, action }
    }
}
