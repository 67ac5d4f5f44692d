//! Editor settings loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load an [`EditorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the edit session, renderer and crop editor.
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Longest side of the preview bitmap the tiers render from.
    pub preview_max_dim: u32,
    /// Longest side of the high-resolution source.
    pub highres_max_dim: u32,
    /// Whether a high-resolution source is kept for the HIGHRES tier.
    pub supports_highres: bool,
    /// Upper bound for the zoom factor.
    pub max_scale_factor: f64,
    /// Render worker threads, 0 for the rayon default.
    pub worker_threads: usize,
    /// Crop handle hit radius in screen pixels.
    pub touch_tolerance: f64,
    /// Smallest crop side in screen pixels.
    pub min_crop_side: f64,
    /// Fraction of the view the crop editor fills with the image.
    pub crop_display_scale: f64,
    /// Idle buffers kept per bitmap size and tag.
    pub cache_max_per_key: usize,
    /// Total bytes the bitmap pool may hold, in use or idle.
    pub memory_budget_bytes: usize,
    /// Reset history to the loaded preset instead of an empty one.
    pub reset_to_loaded: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            preview_max_dim: 900,
            highres_max_dim: 4096,
            supports_highres: true,
            max_scale_factor: 3.0,
            worker_threads: 0,
            touch_tolerance: 45.0,
            min_crop_side: 20.0,
            crop_display_scale: 0.9,
            cache_max_per_key: 4,
            memory_budget_bytes: 512 * 1024 * 1024,
            reset_to_loaded: false,
        }
    }
}

impl EditorConfig {
    /// Parse a config, failing on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Read a config file, falling back to defaults when it is missing or
    /// cannot be used.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!(%err, ?path, "unusable editor config; using defaults");
            Self::default()
        })
    }
}
