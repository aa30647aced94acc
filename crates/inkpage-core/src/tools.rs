//! Tool selection and per-tool settings.

use serde::{Deserialize, Serialize};

use crate::elements::{SerializableColor, StrokeTool};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Highlighter,
    Eraser,
    Hand,
    SelectRect,
    SelectRegion,
    SelectObject,
    Text,
    VerticalSpace,
    Image,
}

impl ToolKind {
    /// Tools that draw or erase ink.
    pub fn is_ink(self) -> bool {
        matches!(self, ToolKind::Pen | ToolKind::Highlighter | ToolKind::Eraser)
    }
}

/// Discrete thickness steps shared by the ink tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolSize {
    VeryFine,
    Fine,
    #[default]
    Medium,
    Thick,
    VeryThick,
}

const PEN_THICKNESS: [f64; 5] = [0.42, 0.85, 1.41, 2.26, 5.67];
const ERASER_THICKNESS: [f64; 5] = [2.83, 2.83, 8.50, 19.84, 19.84];
const HIGHLIGHTER_THICKNESS: [f64; 5] = [2.83, 2.83, 8.50, 19.84, 19.84];

impl ToolSize {
    fn index(self) -> usize {
        match self {
            ToolSize::VeryFine => 0,
            ToolSize::Fine => 1,
            ToolSize::Medium => 2,
            ToolSize::Thick => 3,
            ToolSize::VeryThick => 4,
        }
    }

    /// Line width (or eraser radius) in page units for a stroke tool.
    pub fn thickness(self, tool: StrokeTool) -> f64 {
        let table = match tool {
            StrokeTool::Pen => &PEN_THICKNESS,
            StrokeTool::Highlighter => &HIGHLIGHTER_THICKNESS,
            StrokeTool::Eraser => &ERASER_THICKNESS,
        };
        table[self.index()]
    }
}

/// How the eraser treats the strokes it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EraserMode {
    /// Cut strokes where the eraser passes.
    #[default]
    Standard,
    /// Remove every stroke the eraser touches.
    DeleteStroke,
    /// Paint over ink with a background-colored stroke.
    Whiteout,
}

/// Settings remembered for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub color: SerializableColor,
    pub size: ToolSize,
    pub ruler: bool,
    pub shape_recognizer: bool,
}

impl ToolSettings {
    fn with_color(color: SerializableColor) -> Self {
        Self {
            color,
            size: ToolSize::default(),
            ruler: false,
            shape_recognizer: false,
        }
    }
}

/// Pen or highlighter parameters resolved for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct InkTool {
    pub color: SerializableColor,
    pub width: f64,
    pub ruler: bool,
    pub shape_recognizer: bool,
}

/// Eraser parameters resolved for erasing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraserTool {
    pub mode: EraserMode,
    pub radius: f64,
}

/// The active tool with its resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Tool {
    Pen(InkTool),
    Highlighter(InkTool),
    Eraser(EraserTool),
    Hand,
    SelectRect,
    SelectRegion,
    SelectObject,
    Text { color: SerializableColor },
    VerticalSpace,
    Image,
}

impl Tool {
    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::Pen(_) => ToolKind::Pen,
            Tool::Highlighter(_) => ToolKind::Highlighter,
            Tool::Eraser(_) => ToolKind::Eraser,
            Tool::Hand => ToolKind::Hand,
            Tool::SelectRect => ToolKind::SelectRect,
            Tool::SelectRegion => ToolKind::SelectRegion,
            Tool::SelectObject => ToolKind::SelectObject,
            Tool::Text { .. } => ToolKind::Text,
            Tool::VerticalSpace => ToolKind::VerticalSpace,
            Tool::Image => ToolKind::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ToolState {
    current: ToolKind,
    pen: ToolSettings,
    highlighter: ToolSettings,
    eraser: ToolSettings,
    text: ToolSettings,
    eraser_mode: EraserMode,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            current: ToolKind::default(),
            pen: ToolSettings::with_color(SerializableColor::black()),
            highlighter: ToolSettings::with_color(SerializableColor::new(255, 255, 0, 255)),
            eraser: ToolSettings::with_color(SerializableColor::white()),
            text: ToolSettings::with_color(SerializableColor::black()),
            eraser_mode: EraserMode::default(),
        }
    }
}

impl ToolState {
    fn settings_mut(&mut self) -> Option<&mut ToolSettings> {
        match self.current {
            ToolKind::Pen => Some(&mut self.pen),
            ToolKind::Highlighter => Some(&mut self.highlighter),
            ToolKind::Eraser => Some(&mut self.eraser),
            ToolKind::Text => Some(&mut self.text),
            _ => None,
        }
    }
}

/// Manages the current tool and a one-level save slot used by button
/// overrides.
///
/// Setters only record that something changed; the caller drains that with
/// [`ToolHandler::take_change`] and notifies listeners once per batch.
#[derive(Debug, Clone, Default)]
pub struct ToolHandler {
    state: ToolState,
    saved: Option<ToolState>,
    changed: bool,
}

impl ToolHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_kind(&self) -> ToolKind {
        self.state.current
    }

    pub fn eraser_mode(&self) -> EraserMode {
        self.state.eraser_mode
    }

    /// The active tool with widths resolved from its size step.
    pub fn active_tool(&self) -> Tool {
        let s = &self.state;
        let ink = |settings: &ToolSettings, tool: StrokeTool| InkTool {
            color: settings.color,
            width: settings.size.thickness(tool),
            ruler: settings.ruler,
            shape_recognizer: settings.shape_recognizer,
        };
        match s.current {
            ToolKind::Pen => Tool::Pen(ink(&s.pen, StrokeTool::Pen)),
            ToolKind::Highlighter => Tool::Highlighter(ink(&s.highlighter, StrokeTool::Highlighter)),
            ToolKind::Eraser => Tool::Eraser(EraserTool {
                mode: s.eraser_mode,
                radius: s.eraser.size.thickness(StrokeTool::Eraser),
            }),
            ToolKind::Hand => Tool::Hand,
            ToolKind::SelectRect => Tool::SelectRect,
            ToolKind::SelectRegion => Tool::SelectRegion,
            ToolKind::SelectObject => Tool::SelectObject,
            ToolKind::Text => Tool::Text { color: s.text.color },
            ToolKind::VerticalSpace => Tool::VerticalSpace,
            ToolKind::Image => Tool::Image,
        }
    }

    pub fn select_tool(&mut self, kind: ToolKind) {
        if self.state.current != kind {
            self.state.current = kind;
            self.changed = true;
        }
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.update_settings(|s| s.color = color);
    }

    pub fn set_size(&mut self, size: ToolSize) {
        self.update_settings(|s| s.size = size);
    }

    pub fn set_ruler(&mut self, ruler: bool) {
        self.update_settings(|s| s.ruler = ruler);
    }

    pub fn set_shape_recognizer(&mut self, enabled: bool) {
        self.update_settings(|s| s.shape_recognizer = enabled);
    }

    pub fn set_eraser_mode(&mut self, mode: EraserMode) {
        if self.state.eraser_mode != mode {
            self.state.eraser_mode = mode;
            self.changed = true;
        }
    }

    fn update_settings(&mut self, f: impl FnOnce(&mut ToolSettings)) {
        if let Some(settings) = self.state.settings_mut() {
            let before = settings.clone();
            f(settings);
            if *settings != before {
                self.changed = true;
            }
        }
    }

    /// Remember the complete tool state so a temporary override can be undone.
    pub fn copy_current_config(&mut self) {
        self.saved = Some(self.state.clone());
    }

    /// Return to the state saved by [`copy_current_config`](Self::copy_current_config).
    /// Does nothing when no state is saved.
    pub fn restore_last_config(&mut self) {
        if let Some(saved) = self.saved.take() {
            if saved != self.state {
                self.changed = true;
            }
            self.state = saved;
        }
    }

    /// Whether anything changed since the last call.
    pub fn take_change(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}
