//! Editor settings consumed by the input dispatcher.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elements::SerializableColor;
use crate::tools::{EraserMode, ToolKind, ToolSize};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid pressure multipliers: min {min} must be >= 0 and <= max {max}")]
    InvalidMultipliers { min: f64, max: f64 },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tool override applied while a particular button or device is down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Tool to switch to; `None` keeps the current tool.
    pub action: Option<ToolKind>,
    /// Color override for pens, highlighters and text.
    pub color: Option<SerializableColor>,
    pub size: Option<ToolSize>,
    pub ruler: bool,
    pub shape_recognizer: bool,
    pub eraser_mode: Option<EraserMode>,
    /// Device name this override is bound to (touch only).
    pub device: String,
    /// Ignore drawing input from this device entirely (touch only).
    pub disable_drawing: bool,
}

impl ButtonConfig {
    pub fn with_action(action: ToolKind) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }
}

/// Settings that shape how pointer input becomes page edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extended input (stylus pressure, per-device events) is enabled.
    pub use_xinput: bool,
    /// Width multiplier at zero pressure.
    pub width_minimum_multiplier: f64,
    /// Width multiplier at full pressure.
    pub width_maximum_multiplier: f64,
    pub middle_button: ButtonConfig,
    pub right_button: ButtonConfig,
    /// Override used when input comes from the eraser end of a stylus.
    pub eraser_button: ButtonConfig,
    /// Override used for the touch device named in `touch_button.device`.
    pub touch_button: ButtonConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_xinput: false,
            width_minimum_multiplier: 0.0,
            width_maximum_multiplier: 1.25,
            middle_button: ButtonConfig::with_action(ToolKind::Hand),
            right_button: ButtonConfig::default(),
            eraser_button: ButtonConfig::with_action(ToolKind::Eraser),
            touch_button: ButtonConfig::default(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from JSON. Missing keys take defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let (min, max) = (self.width_minimum_multiplier, self.width_maximum_multiplier);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(ConfigError::InvalidMultipliers { min, max });
        }
        Ok(())
    }
}
