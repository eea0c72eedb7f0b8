use super::MapSettings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Directory holding persisted settings.
pub fn settings_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ThreatMap")
}

pub fn default_settings_path() -> PathBuf {
    settings_dir().join(SETTINGS_FILE)
}

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<MapSettings> {
    if !path.exists() {
        log::info!("No settings at {}, using defaults", path.display());
        return Ok(MapSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = serde_json::from_str(&content)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &MapSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
        .with_context(|| format!("writing settings to {}", path.display()))?;
    log::info!("Settings saved to {}", path.display());
    Ok(())
}
