//! Settings file persistence
//!
//! Loads and saves `SurfaceSettings` under the platform config directory
//! with graceful fallback to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::SurfaceSettings;
use crate::error::{Error, Result, ResultExt};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Directory name under the platform config directory
const APP_NAME: &str = "livemark";

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Suffix of the temporary file used for atomic writes
const TEMP_SUFFIX: &str = "tmp";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// The platform configuration directory for the surface.
///
/// - **Windows**: `%APPDATA%\livemark\`
/// - **macOS**: `~/Library/Application Support/livemark/`
/// - **Linux**: `~/.config/livemark/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the platform directory cannot be
/// determined.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from the default location, falling back to defaults on any
/// failure.
pub fn load_settings() -> SurfaceSettings {
    get_settings_path()
        .and_then(|path| load_settings_from(&path))
        .unwrap_or_warn_default(SurfaceSettings::default(), "Failed to load settings")
}

/// Load settings from `path`.
///
/// A missing or empty file gives defaults; an unreadable or invalid one is
/// an error.
pub fn load_settings_from(path: &Path) -> Result<SurfaceSettings> {
    if !path.exists() {
        debug!("Settings file not found at {}, using defaults", path.display());
        return Ok(SurfaceSettings::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Settings file is empty, using defaults");
        return Ok(SurfaceSettings::default());
    }

    let settings = SurfaceSettings::from_json_sanitized(&contents).map_err(|e| {
        warn!("Settings file at {} contains invalid JSON: {}", path.display(), e);
        Error::ConfigParse {
            message: format!("Failed to parse settings file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!("Settings loaded from {}", path.display());
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save
// ─────────────────────────────────────────────────────────────────────────────

/// Save settings to the default location.
pub fn save_settings(settings: &SurfaceSettings) -> Result<()> {
    save_settings_to(settings, &get_settings_path()?)
}

/// Save settings to `path`: write a sibling temp file, then rename it over
/// the target. Parent directories are created as needed.
pub fn save_settings_to(settings: &SurfaceSettings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("Creating config directory: {}", dir.display());
            fs::create_dir_all(dir).map_err(|e| Error::ConfigSave {
                path: dir.to_path_buf(),
                source: Box::new(e),
            })?;
        }
    }

    let json = serde_json::to_string_pretty(settings).map_err(|e| Error::ConfigSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let temp_path = path.with_extension(TEMP_SUFFIX);
    fs::write(&temp_path, &json).map_err(|e| Error::ConfigSave {
        path: temp_path.clone(),
        source: Box::new(e),
    })?;
    fs::rename(&temp_path, path).map_err(|e| Error::ConfigSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    info!("Settings saved to {}", path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
