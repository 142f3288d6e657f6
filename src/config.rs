// src/config.rs

//! Configuration for the video backend.
//!
//! Deserialized from a JSON file when one is given; every field has a
//! default matching the emulated hardware, so an empty file (or no file)
//! yields a working setup. `#[serde(default)]` keeps partial files valid.

use crate::color::Palette;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// PAL/NTSC horizontal scan frequency in Hz; one scanline is rendered
/// per period (64 us).
pub const DEFAULT_HORIZONTAL_FREQ_HZ: u32 = 15_625;

/// Complete backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
    pub font: FontSourceConfig,
    pub palette: Palette,
}

impl Config {
    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Refresh timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Horizontal scan frequency in Hz. The tick period is
    /// `1_000_000 / horizontal_freq_hz` microseconds.
    pub horizontal_freq_hz: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            horizontal_freq_hz: DEFAULT_HORIZONTAL_FREQ_HZ,
        }
    }
}

/// Where the character generator ROM comes from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FontSourceConfig {
    /// Path to a 2048-byte glyph ROM image. `None` selects the builtin
    /// printable-ASCII font.
    pub rom_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_hardware() {
        let config = Config::default();
        assert_eq!(config.timing.horizontal_freq_hz, 15_625);
        assert!(config.font.rom_path.is_none());
    }

    #[test]
    fn partial_json_fills_remaining_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"timing": {"horizontal_freq_hz": 1000}}"#).unwrap();
        assert_eq!(config.timing.horizontal_freq_hz, 1000);
        assert!(config.font.rom_path.is_none());
        assert_eq!(config.palette, Palette::default());
    }

    #[test]
    fn empty_json_is_a_valid_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timing.horizontal_freq_hz, DEFAULT_HORIZONTAL_FREQ_HZ);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/crt-video.json")).is_err());
    }
}
