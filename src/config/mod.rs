//! Configuration management for move-drag
//!
//! Drag behaviour is read from a TOML file. The session itself never sees
//! this file: [`DragConfig::options`] turns the loaded settings into the
//! immutable [`DragOptions`] snapshot a drag starts with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::animation::EasingCurve;
use crate::session::DragOptions;

/// Main configuration struct containing all move-drag settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MoveDragConfig {
    /// Drag behaviour
    #[serde(default)]
    pub drag: DragConfig,

    /// Scale animation
    #[serde(default)]
    pub animation: AnimationConfig,

    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DragConfig {
    /// Hold tiled and fullscreen windows until dragged past the threshold
    pub enable_snap_off: bool,

    /// Snap-off distance (pixels)
    pub snap_off_threshold: f64,

    /// Move dialogs together with their main window
    pub join_views: bool,

    /// Scale windows start with when grabbed (2.0 = half size)
    pub initial_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Scale animation duration (milliseconds)
    pub scale_duration: u32,

    /// Animation curve ("linear", "ease-in", "ease-out", "ease-in-out")
    pub curve: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            enable_snap_off: true,
            snap_off_threshold: 10.0,
            join_views: false,
            initial_scale: 1.0,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            scale_duration: 300,
            curve: "ease-out".to_string(),
        }
    }
}

impl DragConfig {
    /// Options snapshot for a new drag, animated as `animation` describes
    pub fn options(&self, animation: &AnimationConfig) -> DragOptions {
        DragOptions {
            enable_snap_off: self.enable_snap_off,
            snap_off_threshold: self.snap_off_threshold,
            join_views: self.join_views,
            initial_scale: self.initial_scale,
            scale_duration: Duration::from_millis(animation.scale_duration as u64),
            scale_curve: EasingCurve::from_name(&animation.curve).unwrap_or_default(),
        }
    }
}

impl MoveDragConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: MoveDragConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.drag.initial_scale.is_finite() || self.drag.initial_scale < 1.0 {
            anyhow::bail!(
                "Invalid initial_scale {}: must be a finite value of at least 1.0",
                self.drag.initial_scale
            );
        }

        if !self.drag.snap_off_threshold.is_finite() || self.drag.snap_off_threshold < 0.0 {
            anyhow::bail!(
                "Invalid snap_off_threshold {}: must not be negative",
                self.drag.snap_off_threshold
            );
        }

        if self.animation.scale_duration == 0 {
            anyhow::bail!("Invalid scale_duration: must be greater than 0");
        }

        if EasingCurve::from_name(&self.animation.curve).is_none() {
            anyhow::bail!("Invalid animation curve: {}", self.animation.curve);
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one
    /// Sections of the partial config that differ from the defaults win
    pub fn merge_partial(mut self, partial: MoveDragConfig) -> Self {
        let default_config = MoveDragConfig::default();

        if partial.drag != default_config.drag {
            self.drag = partial.drag;
        }
        if partial.animation != default_config.animation {
            self.animation = partial.animation;
        }
        if partial.general != default_config.general {
            self.general = partial.general;
        }

        self
    }

    /// Options snapshot for a new drag
    pub fn drag_options(&self) -> DragOptions {
        self.drag.options(&self.animation)
    }
}
