//! Surface settings
//!
//! This module defines the `SurfaceSettings` struct that holds every
//! user-configurable option of the editing surface, with serde support for
//! JSON persistence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Available color themes for the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the host's visuals
    System,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences for the editing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Hide Markdown markers away from the caret
    pub hide_markers: bool,

    pub theme: Theme,

    /// Base font size in points
    pub font_size: f32,

    /// How long an image must be held before a drag starts
    pub drag_hold_ms: u64,

    /// How long ghost-writer text stays marked after the stream ends
    pub new_text_fade_ms: u64,

    /// Bytes of text before the caret sent as completion context
    pub context_before_bytes: usize,

    /// Bytes of text after the caret sent as completion context
    pub context_after_bytes: usize,

    /// Lines kept visible around a scroll target
    pub scroll_margin_lines: usize,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            hide_markers: true,
            theme: Theme::default(),
            font_size: 14.0,
            drag_hold_ms: 200,
            new_text_fade_ms: 1500,
            context_before_bytes: 2000,
            context_after_bytes: 500,
            scroll_margin_lines: 3,
        }
    }
}

impl SurfaceSettings {
    pub const MIN_FONT_SIZE: f32 = 8.0;
    pub const MAX_FONT_SIZE: f32 = 72.0;

    pub const MIN_DRAG_HOLD_MS: u64 = 50;
    pub const MAX_DRAG_HOLD_MS: u64 = 2000;

    pub const MAX_FADE_MS: u64 = 10_000;

    pub const MAX_CONTEXT_BYTES: usize = 64 * 1024;

    pub const MAX_SCROLL_MARGIN: usize = 20;

    /// Clamp every value into its valid range.
    pub fn sanitize(&mut self) {
        self.font_size = self
            .font_size
            .clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);
        if !self.font_size.is_finite() {
            self.font_size = Self::default().font_size;
        }

        self.drag_hold_ms = self
            .drag_hold_ms
            .clamp(Self::MIN_DRAG_HOLD_MS, Self::MAX_DRAG_HOLD_MS);
        self.new_text_fade_ms = self.new_text_fade_ms.min(Self::MAX_FADE_MS);

        self.context_before_bytes = self.context_before_bytes.min(Self::MAX_CONTEXT_BYTES);
        self.context_after_bytes = self.context_after_bytes.min(Self::MAX_CONTEXT_BYTES);

        self.scroll_margin_lines = self.scroll_margin_lines.min(Self::MAX_SCROLL_MARGIN);
    }

    /// Parse JSON and sanitize the result.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn drag_hold(&self) -> Duration {
        Duration::from_millis(self.drag_hold_ms)
    }

    pub fn new_text_fade(&self) -> Duration {
        Duration::from_millis(self.new_text_fade_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SurfaceSettings::default();
        assert!(settings.hide_markers);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.drag_hold(), Duration::from_millis(200));
        assert_eq!(settings.new_text_fade(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = SurfaceSettings::from_json_sanitized(r#"{"theme": "dark"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.hide_markers);
        assert_eq!(settings.context_before_bytes, 2000);
    }

    #[test]
    fn test_sanitize_clamps() {
        let settings = SurfaceSettings::from_json_sanitized(
            r#"{"font_size": 2.0, "drag_hold_ms": 0, "new_text_fade_ms": 99999, "context_after_bytes": 999999999}"#,
        )
        .unwrap();
        assert_eq!(settings.font_size, SurfaceSettings::MIN_FONT_SIZE);
        assert_eq!(settings.drag_hold_ms, SurfaceSettings::MIN_DRAG_HOLD_MS);
        assert_eq!(settings.new_text_fade_ms, SurfaceSettings::MAX_FADE_MS);
        assert_eq!(settings.context_after_bytes, SurfaceSettings::MAX_CONTEXT_BYTES);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let settings =
            SurfaceSettings::from_json_sanitized(r#"{"hide_markers": false, "future": 1}"#).unwrap();
        assert!(!settings.hide_markers);
    }

    #[test]
    fn test_wrong_types_rejected() {
        assert!(SurfaceSettings::from_json_sanitized(r#"{"theme": 3}"#).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let settings = SurfaceSettings {
            theme: Theme::System,
            hide_markers: false,
            ..SurfaceSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(SurfaceSettings::from_json_sanitized(&json).unwrap(), settings);
    }
}
