//! Pointer, device and keyboard event types delivered by the host view.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Opaque device identity, compared by equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// What kind of hardware produced an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSource {
    #[default]
    Mouse,
    Pen,
    /// The eraser end of a stylus.
    Eraser,
    Cursor,
    Touch,
}

/// Description of an input device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDevice {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: DeviceSource,
    /// Number of valuator axes; more than two means pressure may be present.
    #[serde(default = "default_axes")]
    pub num_axes: usize,
    /// Calibrated (min, max) of the pressure axis.
    #[serde(default)]
    pub pressure_range: Option<(f64, f64)>,
}

fn default_axes() -> usize {
    2
}

impl Default for InputDevice {
    fn default() -> Self {
        Self::core_pointer()
    }
}

impl InputDevice {
    /// The plain mouse pointer every host has.
    pub fn core_pointer() -> Self {
        Self {
            id: DeviceId(0),
            name: "Core Pointer".to_string(),
            source: DeviceSource::Mouse,
            num_axes: 2,
            pressure_range: None,
        }
    }

    /// A stylus reporting pressure in `0.0..=1.0`.
    pub fn stylus(id: u32, name: &str) -> Self {
        Self {
            id: DeviceId(id),
            name: name.to_string(),
            source: DeviceSource::Pen,
            num_axes: 5,
            pressure_range: Some((0.0, 1.0)),
        }
    }

    pub fn has_pressure(&self) -> bool {
        self.num_axes > 2 && self.pressure_range.is_some()
    }

    /// Map a raw axis value into `0.0..=1.0`.
    ///
    /// Returns `None` for devices without pressure, non-finite samples or a
    /// degenerate calibration range.
    pub fn normalized_pressure(&self, raw: Option<f64>) -> Option<f64> {
        if !self.has_pressure() {
            return None;
        }
        let (min, max) = self.pressure_range?;
        let raw = raw?;
        if !raw.is_finite() || !(max - min).is_normal() {
            return None;
        }
        Some(((raw - min) / (max - min)).clamp(0.0, 1.0))
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer button identifiers. Indices 4 and above are wheel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Other(u32),
}

/// Direction a wheel button asks the enclosing view to scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MouseButton {
    pub fn from_index(index: u32) -> Self {
        match index {
            1 => MouseButton::Primary,
            2 => MouseButton::Middle,
            3 => MouseButton::Secondary,
            n => MouseButton::Other(n),
        }
    }

    pub fn index(self) -> u32 {
        match self {
            MouseButton::Primary => 1,
            MouseButton::Middle => 2,
            MouseButton::Secondary => 3,
            MouseButton::Other(n) => n,
        }
    }

    /// Scroll direction for buttons past the third: 4 up, 5 down, 6 left,
    /// anything higher right.
    pub fn scroll_direction(self) -> Option<ScrollDirection> {
        match self.index() {
            0..=3 => None,
            4 => Some(ScrollDirection::Up),
            5 => Some(ScrollDirection::Down),
            6 => Some(ScrollDirection::Left),
            _ => Some(ScrollDirection::Right),
        }
    }
}

/// A button press or release in widget (zoomed) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub position: Point,
    pub button: MouseButton,
    #[serde(default)]
    pub device: InputDevice,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// 1 for a single press, 2 or 3 for synthesized double/triple presses.
    #[serde(default = "default_click_count")]
    pub click_count: u8,
    /// Raw pressure axis value, if the device reported one.
    #[serde(default)]
    pub pressure: Option<f64>,
}

fn default_click_count() -> u8 {
    1
}

impl ButtonEvent {
    pub fn new(position: Point, button: MouseButton, device: InputDevice) -> Self {
        Self {
            position,
            button,
            device,
            modifiers: Modifiers::default(),
            click_count: 1,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Pointer motion in widget (zoomed) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub position: Point,
    #[serde(default)]
    pub device: InputDevice,
    #[serde(default)]
    pub pressure: Option<f64>,
}

impl MotionEvent {
    pub fn new(position: Point, device: InputDevice) -> Self {
        Self {
            position,
            device,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// Pointer event type for unified mouse/stylus/touch handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Press(ButtonEvent),
    Motion(MotionEvent),
    Release(ButtonEvent),
}

/// Keys the editing core reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Printable input, possibly several characters from an input method.
    Character(String),
    Backspace,
    Delete,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    Other(String),
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }
}
