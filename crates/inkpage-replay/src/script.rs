//! Event scripts: a page size plus the input recorded against it.

use std::path::Path;

use inkpage_core::{ConfigError, KeyEvent, PointerEvent, ToolKind, UndoError};
use inkpage_render::RendererError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or replaying a script.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Script error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),
    #[error("Undo error: {0}")]
    Undo(#[from] UndoError),
    #[error("Render error: {0}")]
    Render(#[from] RendererError),
}

pub type ReplayResult<T> = Result<T, ReplayError>;

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Pointer { event: PointerEvent },
    Key { event: KeyEvent },
    Tool { tool: ToolKind },
    Zoom { zoom: f64 },
    /// Host idle callback; runs a pending raster rebuild.
    Idle,
    Paint,
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// A4 in points unless given.
    #[serde(default = "default_width")]
    pub page_width: f64,
    #[serde(default = "default_height")]
    pub page_height: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    pub events: Vec<ScriptEvent>,
}

fn default_width() -> f64 {
    595.0
}

fn default_height() -> f64 {
    842.0
}

fn default_zoom() -> f64 {
    1.0
}

impl Script {
    pub fn from_json(json: &str) -> ReplayResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> ReplayResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpage_core::{Key, MouseButton};

    #[test]
    fn test_defaults() {
        let script = Script::from_json(r#"{"events": []}"#).unwrap();
        assert_eq!(script.page_width, 595.0);
        assert_eq!(script.page_height, 842.0);
        assert_eq!(script.zoom, 1.0);
    }

    #[test]
    fn test_parse_events() {
        let json = r#"{
            "page_width": 200.0,
            "events": [
                {"type": "tool", "tool": "Highlighter"},
                {"type": "pointer", "event": {"Press": {"position": {"x": 10.0, "y": 20.0}, "button": "Primary"}}},
                {"type": "key", "event": {"key": {"Character": "a"}}},
                {"type": "undo"}
            ]
        }"#;
        let script = Script::from_json(json).unwrap();
        assert_eq!(script.page_width, 200.0);
        assert_eq!(script.events[0], ScriptEvent::Tool { tool: ToolKind::Highlighter });

        let ScriptEvent::Pointer { event: PointerEvent::Press(press) } = &script.events[1] else {
            panic!("expected a press");
        };
        assert_eq!(press.button, MouseButton::Primary);
        assert_eq!(press.click_count, 1);
        assert_eq!(press.device.name, "Core Pointer");

        let ScriptEvent::Key { event } = &script.events[2] else {
            panic!("expected a key");
        };
        assert_eq!(event.key, Key::Character("a".to_string()));
        assert_eq!(script.events[3], ScriptEvent::Undo);
    }

    #[test]
    fn test_missing_events_is_an_error() {
        assert!(matches!(Script::from_json("{}"), Err(ReplayError::Json(_))));
    }
}
