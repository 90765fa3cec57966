//! Configuration module for hotel-search-rs
//!
//! Handles loading and validating settings from YAML files and environment variables.
//! Settings are plain values handed to [`crate::SearchClient::new`]; nothing is held globally.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at a settings file
pub const SETTINGS_PATH_ENV: &str = "HOTEL_SEARCH_SETTINGS_PATH";

/// Load settings from an explicit path, the environment, a default location, or defaults
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        info!("Loading settings from: {}", path.display());
        return finish(Settings::from_file(path)?);
    }

    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            return finish(Settings::from_file(&path)?);
        }
    }

    let paths = [
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        dirs::config_dir()
            .map(|p| p.join("hotel-search/settings.yml"))
            .unwrap_or_default(),
    ];

    for path in paths.iter() {
        if path.is_file() {
            info!("Loading settings from: {}", path.display());
            return finish(Settings::from_file(path)?);
        }
    }

    info!("No settings file found, using defaults");
    finish(Settings::default())
}

fn finish(mut settings: Settings) -> Result<Settings> {
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}
