//! Editor configuration.
//!
//! Product policy constants live here rather than in the editing code so they
//! can be tuned per deployment. Missing fields fall back to defaults.

use crate::category::DesignCategory;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Tunable editor behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest width/height reachable by interactive resize.
    pub min_element_size: f64,
    /// Largest width/height reachable by interactive resize.
    pub max_element_size: f64,
    /// Degrees applied by a single rotate-left/rotate-right action.
    pub rotation_step: f64,
    /// Maximum number of history entries; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Offset applied to duplicated elements.
    pub duplicate_offset: Vec2,
    /// Scale applied to images whose descriptor gives no size or scale.
    pub default_image_scale: f64,
    /// Where newly inserted images are placed.
    pub image_insert_position: Point,
    /// Spacing of grid guide lines.
    pub grid_spacing: f64,
    /// Width of the bleed area drawn outside the canvas.
    pub bleed: f64,
    /// Category used for new designs.
    pub default_category: DesignCategory,
    /// Directory for saved designs; platform default when unset.
    pub storage_dir: Option<PathBuf>,
    /// Seconds between autosaves of a dirty document.
    pub autosave_interval_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_element_size: 30.0,
            max_element_size: 600.0,
            rotation_step: 10.0,
            history_limit: None,
            duplicate_offset: Vec2::new(20.0, 20.0),
            default_image_scale: 0.5,
            image_insert_position: Point::new(100.0, 100.0),
            grid_spacing: 50.0,
            bleed: 10.0,
            default_category: DesignCategory::default(),
            storage_dir: None,
            autosave_interval_secs: 30,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Clamp an interactive resize to the configured bounds.
    pub fn clamp_dimension(&self, value: f64) -> f64 {
        value.clamp(self.min_element_size, self.max_element_size)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_element_size >= 0.0 && self.min_element_size <= self.max_element_size) {
            return Err(ConfigError::Parse(format!(
                "min_element_size ({}) must be between 0 and max_element_size ({})",
                self.min_element_size, self.max_element_size
            )));
        }
        if self.grid_spacing <= 0.0 {
            return Err(ConfigError::Parse("grid_spacing must be positive".to_string()));
        }
        Ok(())
    }
}
