//! Profiler settings

use crate::error::ProfilerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest polling interval the profiler accepts, in seconds.
pub const MAX_UPDATE_INTERVAL_SEC: f32 = 0.5;

/// Profiler configuration. Every field has a default, so a partial JSON
/// document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerSettings {
    pub enabled: bool,
    pub cpu_enabled: bool,
    pub gpu_enabled: bool,
    /// Seconds between polled frames, clamped to `[0, 0.5]`.
    pub update_interval_sec: f32,
    /// Time block slots allocated up front for each buffer.
    pub initial_capacity: usize,
    pub stutter_threshold_ms: f32,
    /// EMA window for the displayed averages.
    pub smoothing_frames: u32,
    /// EMA window for the stutter baseline.
    pub stutter_baseline_frames: u32,
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cpu_enabled: true,
            gpu_enabled: true,
            update_interval_sec: 0.2,
            initial_capacity: 256,
            stutter_threshold_ms: 0.5,
            smoothing_frames: 20,
            stutter_baseline_frames: 5,
        }
    }
}

impl ProfilerSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ProfilerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfilerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ProfilerError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ProfilerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// NaN collapses to 0 (poll every frame).
pub(crate) fn clamp_interval(seconds: f32) -> f32 {
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.clamp(0.0, MAX_UPDATE_INTERVAL_SEC)
}
