//! Viewer configuration.
//!
//! Settings can be created programmatically, loaded from a TOML file or read
//! from environment variables. The controller receives one explicit
//! configuration object; nothing is set up globally.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use viewer_core::ViewMode;

pub const DEFAULT_BUFFER_CAPACITY: usize = pdfview_cache::DEFAULT_CACHE_SIZE;

/// 4096 × 4096 device pixels.
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 16_777_216;

pub const DEFAULT_PAGE_GAP: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Rendered pages kept before the least recently used one is released
    pub buffer_capacity: usize,
    /// Largest backing surface in device pixels; 0 disables the limit
    pub max_canvas_pixels: u64,
    pub device_pixel_ratio: f64,
    /// Scale applied when a document opens
    pub default_scale: f32,
    /// Vertical gap between pages in continuous mode, in CSS pixels
    pub page_gap: f32,
    pub view_mode: ViewMode,
    /// Trigger companion text layers after a page renders
    pub text_layer: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            device_pixel_ratio: 1.0,
            default_scale: 1.0,
            page_gap: DEFAULT_PAGE_GAP,
            view_mode: ViewMode::SinglePage,
            text_layer: false,
        }
    }
}

impl ViewerConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_max_canvas_pixels(mut self, pixels: u64) -> Self {
        self.max_canvas_pixels = pixels;
        self
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    pub fn with_default_scale(mut self, scale: f32) -> Self {
        self.default_scale = scale;
        self
    }

    pub fn with_page_gap(mut self, gap: f32) -> Self {
        self.page_gap = gap;
        self
    }

    pub fn with_view_mode(mut self, mode: ViewMode) -> Self {
        self.view_mode = mode;
        self
    }

    pub fn with_text_layer(mut self, enabled: bool) -> Self {
        self.text_layer = enabled;
        self
    }

    /// Returns the default configuration file location for the current platform.
    ///
    /// - Linux: ~/.config/pdfview/config.toml
    /// - macOS: ~/Library/Application Support/pdfview/config.toml
    /// - Windows: %APPDATA%\pdfview\config.toml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("pdfview"))
            .unwrap_or_else(|| PathBuf::from(".pdfview"))
            .join("config.toml")
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PDFVIEW_BUFFER_CAPACITY`: rendered pages kept (default: 10)
    /// - `PDFVIEW_MAX_CANVAS_PIXELS`: surface pixel budget, 0 for none (default: 16777216)
    /// - `PDFVIEW_DEVICE_PIXEL_RATIO`: device pixel ratio (default: 1.0)
    /// - `PDFVIEW_DEFAULT_SCALE`: initial scale (default: 1.0)
    /// - `PDFVIEW_PAGE_GAP`: gap between pages in CSS pixels (default: 10)
    /// - `PDFVIEW_VIEW_MODE`: `single` or `continuous` (default: single)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_value("PDFVIEW_BUFFER_CAPACITY")? {
            config.buffer_capacity = value;
        }
        if let Some(value) = env_value("PDFVIEW_MAX_CANVAS_PIXELS")? {
            config.max_canvas_pixels = value;
        }
        if let Some(value) = env_value("PDFVIEW_DEVICE_PIXEL_RATIO")? {
            config.device_pixel_ratio = value;
        }
        if let Some(value) = env_value("PDFVIEW_DEFAULT_SCALE")? {
            config.default_scale = value;
        }
        if let Some(value) = env_value("PDFVIEW_PAGE_GAP")? {
            config.page_gap = value;
        }
        if let Some(value) = env_value("PDFVIEW_VIEW_MODE")? {
            config.view_mode = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// ```toml
    /// buffer_capacity = 10
    /// max_canvas_pixels = 16777216
    /// device_pixel_ratio = 2.0
    /// default_scale = 1.25
    /// page_gap = 10.0
    /// view_mode = "continuous"
    /// text_layer = false
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Rejects values the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue("buffer_capacity".to_owned()));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(ConfigError::InvalidValue("device_pixel_ratio".to_owned()));
        }
        if !(self.default_scale.is_finite() && self.default_scale > 0.0) {
            return Err(ConfigError::InvalidValue("default_scale".to_owned()));
        }
        if !(self.page_gap.is_finite() && self.page_gap >= 0.0) {
            return Err(ConfigError::InvalidValue("page_gap".to_owned()));
        }

        Ok(())
    }
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_owned())),
        Err(_) => Ok(None),
    }
}
