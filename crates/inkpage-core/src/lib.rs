//! InkPage Core Library
//!
//! Page model and input interpretation for a handwritten-note page view:
//! strokes, erasing, selections, text editing and the undo log behind them.

pub mod accumulator;
pub mod config;
pub mod dispatcher;
pub mod elements;
pub mod eraser;
pub mod geometry;
pub mod host;
pub mod input;
pub mod page;
pub mod recognizer;
pub mod selection;
pub mod text_editor;
pub mod tools;
pub mod undo;

pub use accumulator::{PressureMapping, SampleOutcome, StrokeBuilder, StrokeOptions, MOTION_THRESHOLD};
pub use config::{ButtonConfig, ConfigError, ConfigResult, Settings};
pub use dispatcher::{DispatcherState, EditContext, InputDispatcher};
pub use elements::{Element, ElementId, Image, SerializableColor, Stroke, StrokeTool, Text};
pub use eraser::EraseGesture;
pub use host::{NullHost, Repaint, ViewHost};
pub use input::{ButtonEvent, InputDevice, Key, KeyEvent, Modifiers, MotionEvent, MouseButton, PointerEvent};
pub use page::{Layer, Page};
pub use recognizer::{LineRecognizer, ShapeRecognizer};
pub use selection::{EditMode, EditSelection, HandleKind, Selector};
pub use text_editor::{TextEditResult, TextEditor};
pub use tools::{EraserMode, Tool, ToolHandler, ToolKind, ToolSize};
pub use undo::{UndoAction, UndoError, UndoHistory, UndoResult, MAX_UNDO_HISTORY};
