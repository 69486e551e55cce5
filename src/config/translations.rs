//! User-visible strings
//!
//! The host supplies a flat key → string map. Every lookup carries its own
//! literal fallback, so a missing or empty entry never blanks a label.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result, ResultExt};

pub const AI_THINKING: &str = "ai.thinking";
pub const AI_CONTINUE: &str = "ai.continue";
pub const IMAGE_DROP_HERE: &str = "image.drop_here";
pub const FOOTNOTE_MISSING: &str = "footnote.missing";

/// A flat translation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations {
    strings: HashMap<String, String>,
}

impl Translations {
    pub fn new(strings: HashMap<String, String>) -> Self {
        Self { strings }
    }

    /// Parse a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self> {
        let strings: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { strings })
    }

    /// Load a JSON translation file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let translations = Self::from_json(&contents)?;
        debug!(
            "Loaded {} translations from {}",
            translations.strings.len(),
            path.display()
        );
        Ok(translations)
    }

    /// Load a translation file, falling back to the built-in labels on any
    /// failure.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_warn_default(Self::default(), "Failed to load translations")
    }

    /// The string for `key`, or `fallback` when it is missing or empty.
    pub fn get<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        match self.strings.get(key) {
            Some(value) if !value.trim().is_empty() => value,
            _ => fallback,
        }
    }

    pub fn thinking(&self) -> &str {
        self.get(AI_THINKING, "AI is thinking…")
    }

    pub fn continue_writing(&self) -> &str {
        self.get(AI_CONTINUE, "Continue writing")
    }

    pub fn drop_here(&self) -> &str {
        self.get(IMAGE_DROP_HERE, "Drop image here")
    }

    pub fn footnote_missing(&self) -> &str {
        self.get(FOOTNOTE_MISSING, "Footnote not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fallbacks_when_missing() {
        let translations = Translations::default();
        assert_eq!(translations.thinking(), "AI is thinking…");
        assert_eq!(translations.drop_here(), "Drop image here");
    }

    #[test]
    fn test_lookup_and_empty_value() {
        let translations =
            Translations::from_json(r#"{"ai.thinking": "KI denkt nach…", "ai.continue": " "}"#)
                .unwrap();
        assert_eq!(translations.thinking(), "KI denkt nach…");
        assert_eq!(translations.continue_writing(), "Continue writing");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("de.json");
        fs::write(&path, r#"{"image.drop_here": "Bild hier ablegen"}"#).unwrap();
        let translations = Translations::load_from(&path).unwrap();
        assert_eq!(translations.drop_here(), "Bild hier ablegen");
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(Translations::from_json("[1, 2]").is_err());
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Translations::load_from(&dir.path().join("missing.json")),
            Err(Error::ConfigLoad { .. })
        ));
    }

    #[test]
    fn test_load_or_default_absorbs_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let translations = Translations::load_or_default(&path);
        assert_eq!(translations.footnote_missing(), "Footnote not found");
    }
}
