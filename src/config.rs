//! Configuration file support.
//!
//! Settings are stored as JSON. Every section and field has a default, so a
//! config file only needs to contain what it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{canvas, export, zoom};
use crate::keybindings::KeyBindings;
use crate::mask::EmptyPolygonPolicy;
use crate::view_transform::{CanvasSize, ZoomLimits};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Filter string understood by `env_logger`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Display surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// RGB fill outside the image footprint
    pub background: [u8; 3],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: canvas::WIDTH,
            height: canvas::HEIGHT,
            background: canvas::BACKGROUND,
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }
}

/// Wheel zoom settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub factor: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            factor: zoom::FACTOR,
            min_scale: zoom::MIN_SCALE,
            max_scale: zoom::MAX_SCALE,
        }
    }
}

impl ZoomConfig {
    pub fn limits(&self) -> ZoomLimits {
        ZoomLimits {
            factor: self.factor,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
        }
    }
}

/// Mask generation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Mask produced for a bad image without polygon points
    pub empty_polygon: EmptyPolygonPolicy,
}

/// Dataset output layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output root, relative to the input folder
    pub out_dir: String,
    /// Appended to the image stem for mask file names
    pub mask_suffix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: export::OUT_DIR.to_string(),
            mask_suffix: export::MASK_SUFFIX.to_string(),
        }
    }
}

/// Settings for the post-export training step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub enabled: bool,
    /// Name given to the trained component
    pub component_name: String,
    /// Component file, relative to the input folder
    pub component_file: String,
    /// Score every bad image with the trained component
    pub score_bad_images: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            component_name: "screw".to_string(),
            component_file: "component_1.json".to_string(),
            score_bad_images: true,
        }
    }
}

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub zoom: ZoomConfig,

    #[serde(default)]
    pub keybindings: KeyBindings,

    #[serde(default)]
    pub mask: MaskConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// TTF/OTF font for the status label text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_font: Option<PathBuf>,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            canvas: CanvasConfig::default(),
            zoom: ZoomConfig::default(),
            keybindings: KeyBindings::default(),
            mask: MaskConfig::default(),
            export: ExportConfig::default(),
            training: TrainingConfig::default(),
            log_level: LogLevel::default(),
            label_font: None,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid("canvas size must be non-zero".to_string()));
        }
        let zoom = &self.zoom;
        if zoom.factor.is_nan() || zoom.factor <= 1.0 {
            return Err(ConfigError::Invalid("zoom factor must be greater than 1".to_string()));
        }
        if zoom.min_scale.is_nan()
            || zoom.max_scale.is_nan()
            || zoom.min_scale <= 0.0
            || zoom.min_scale > zoom.max_scale
        {
            return Err(ConfigError::Invalid(format!(
                "invalid scale range [{}, {}]",
                zoom.min_scale, zoom.max_scale
            )));
        }
        if let Some((key, first, second)) = self.keybindings.key_conflict() {
            return Err(ConfigError::Invalid(format!(
                "key '{}' is bound to both {:?} and {:?}",
                key, first, second
            )));
        }
        Ok(())
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("defect-annotator").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("defect-annotator")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from the default path.
    ///
    /// Returns `Ok(None)` if there is no default path or no file there.
    pub fn load_from_default_path() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::default_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)?;
        Ok(path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Value out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
