use crate::model::Track;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "songcard";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "songcard.log";
const DEFAULT_ASSET_ROOT: &str = "assets";

/// Read-only startup settings. The player never writes this file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub asset_root: PathBuf,
    pub tracks: Option<Vec<Track>>,
    pub log_file: Option<PathBuf>,
    pub volume_step: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
            tracks: None,
            log_file: None,
            volume_step: 5,
        }
    }
}

impl Settings {
    pub fn volume_step(&self) -> i32 {
        i32::from(self.volume_step.clamp(1, 25))
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("SONGCARD_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}
