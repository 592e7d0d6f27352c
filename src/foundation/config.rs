use std::path::Path;

use anyhow::Context as _;

use crate::foundation::color::{DEFAULT_BRIGHTNESS_CEILING, MAX_RGB_SUM};
use crate::foundation::error::{GpuPortError, GpuPortResult};

/// Built-in display backends a [`Canvas`](crate::Canvas) can create by itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory surface with simulated vsync pacing.
    #[default]
    Headless,
}

/// Options for the in-memory [`HeadlessBackend`](crate::HeadlessBackend).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HeadlessOpts {
    /// Number of rows the simulated surface offers (bounds `node_length`).
    pub surface_height: u32,
    /// Simulated refresh rate. `None` presents immediately without vsync pacing.
    pub refresh_hz: Option<f64>,
}

impl Default for HeadlessOpts {
    fn default() -> Self {
        Self {
            surface_height: 1080,
            refresh_hz: Some(60.0),
        }
    }
}

/// Options controlling a canvas, its encoder and its backend.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CanvasOpts {
    /// R+G+B ceiling applied to WS281X pixels. `None` (or >= 765) disables limiting.
    pub max_brightness: Option<u16>,
    /// Copy raw colors into the frame buffer instead of encoding them (visual debugging only).
    pub dev_mode: bool,
    /// Backend created by [`Canvas::new`](crate::Canvas::new).
    pub backend: BackendKind,
    /// Settings for [`BackendKind::Headless`].
    pub headless: HeadlessOpts,
    /// Throttling stops once the target time is closer than this many milliseconds.
    pub throttle_slack_ms: u64,
}

impl Default for CanvasOpts {
    fn default() -> Self {
        Self {
            max_brightness: Some(DEFAULT_BRIGHTNESS_CEILING),
            dev_mode: false,
            backend: BackendKind::Headless,
            headless: HeadlessOpts::default(),
            throttle_slack_ms: 2,
        }
    }
}

impl CanvasOpts {
    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> GpuPortResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read canvas options '{}'", path.display()))?;
        let opts: Self = serde_json::from_str(&text)
            .map_err(|e| GpuPortError::config(format!("parse '{}': {e}", path.display())))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject values no backend or encoder can work with.
    pub fn validate(&self) -> GpuPortResult<()> {
        if self.max_brightness == Some(0) {
            return Err(GpuPortError::config(
                "max_brightness must be > 0 when set (use null to disable limiting)",
            ));
        }
        if self.headless.surface_height == 0 {
            return Err(GpuPortError::config("headless.surface_height must be > 0"));
        }
        if let Some(hz) = self.headless.refresh_hz
            && (!hz.is_finite() || hz <= 0.0)
        {
            return Err(GpuPortError::config(format!(
                "headless.refresh_hz must be finite and > 0, got {hz}"
            )));
        }
        Ok(())
    }

    /// Effective brightness ceiling, or `None` when limiting is off.
    pub fn brightness_ceiling(&self) -> Option<u16> {
        self.max_brightness.filter(|&c| c < MAX_RGB_SUM)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
