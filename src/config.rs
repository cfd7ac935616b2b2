// src/config.rs - TOML configuration for tracking, analysis and export
use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};

use crate::tracking::{TrackerConfig, MAX_LIVE_TRACKS};
use crate::visualization::{DEFAULT_HEATMAP_COLS, DEFAULT_HEATMAP_ROWS};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frames per second of the source video
    pub frame_rate: f64,
    pub heatmap_rows: usize,
    pub heatmap_cols: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            heatmap_rows: DEFAULT_HEATMAP_ROWS,
            heatmap_cols: DEFAULT_HEATMAP_COLS,
        }
    }
}

impl AnalysisConfig {
    /// Seconds per frame.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Session directories are created under this path
    pub output_dir: PathBuf,
    pub write_csv: bool,
    pub write_report: bool,
    pub write_series: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_csv: true,
            write_report: true,
            write_series: true,
        }
    }
}

/// `~/Documents/HandTracker` when the platform has a documents folder,
/// `./output` otherwise.
pub fn default_output_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|d| d.join("HandTracker")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_LIVE_TRACKS).contains(&self.tracker.max_tracks) {
            return Err(Error::Config(format!(
                "max_tracks must be in [1, {}], got {}",
                MAX_LIVE_TRACKS, self.tracker.max_tracks
            )));
        }
        if !(self.analysis.frame_rate.is_finite() && self.analysis.frame_rate > 0.0) {
            return Err(Error::Config(format!(
                "frame_rate must be > 0, got {}",
                self.analysis.frame_rate
            )));
        }
        if self.analysis.heatmap_rows == 0 || self.analysis.heatmap_cols == 0 {
            return Err(Error::Config(format!(
                "heatmap must have at least one row and column, got {}x{}",
                self.analysis.heatmap_rows, self.analysis.heatmap_cols
            )));
        }
        if self.export.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from the default location, or defaults if there is none
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "HandTracker")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
