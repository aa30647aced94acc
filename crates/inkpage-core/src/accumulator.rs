//! Builds a stroke from the samples of a single pointing device.

use kurbo::Point;

use crate::config::Settings;
use crate::elements::{SerializableColor, Stroke, StrokeTool};
use crate::input::{DeviceId, InputDevice};

/// Minimum distance in page units between consecutive stroke points.
pub const MOTION_THRESHOLD: f64 = 0.3;

/// Maps normalized pressure onto a width multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureMapping {
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl PressureMapping {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_multiplier: settings.width_minimum_multiplier,
            max_multiplier: settings.width_maximum_multiplier,
        }
    }

    /// `(1 - p) * min + p * max` for pressure `p` in `0.0..=1.0`.
    pub fn multiplier(&self, pressure: f64) -> f64 {
        (1.0 - pressure) * self.min_multiplier + pressure * self.max_multiplier
    }
}

/// Style of the stroke being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOptions {
    pub tool: StrokeTool,
    pub color: SerializableColor,
    pub width: f64,
    /// Keep the stroke a straight segment from the first point.
    pub ruler: bool,
    /// Pressure mapping for pressure-sensitive pens; `None` draws uniform width.
    pub pressure: Option<PressureMapping>,
}

/// Outcome of feeding one motion sample to a [`StrokeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Accepted,
    /// Closer than [`MOTION_THRESHOLD`] to the previous point.
    TooClose,
    /// The sample came from a device other than the one drawing this stroke.
    ForeignDevice,
}

/// An in-progress stroke owned by the device that started it.
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    stroke: Stroke,
    device: InputDevice,
    ruler: bool,
    pressure: Option<PressureMapping>,
}

impl StrokeBuilder {
    /// Start a stroke at `start` with the first sample's pressure.
    pub fn begin(options: StrokeOptions, start: Point, device: &InputDevice, pressure: Option<f64>) -> Self {
        let pressure_mapping = options.pressure.filter(|_| device.has_pressure());
        let mut builder = Self {
            stroke: Stroke::new(options.tool, options.color, options.width),
            device: device.clone(),
            ruler: options.ruler,
            pressure: pressure_mapping,
        };
        builder.push(start, pressure);
        builder
    }

    pub fn device(&self) -> DeviceId {
        self.device.id
    }

    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    /// Append a sample in page coordinates.
    pub fn add_point(&mut self, device: DeviceId, point: Point, pressure: Option<f64>) -> SampleOutcome {
        if device != self.device.id {
            return SampleOutcome::ForeignDevice;
        }
        let Some(last) = self.stroke.last_point() else {
            self.push(point, pressure);
            return SampleOutcome::Accepted;
        };
        if last.distance(point) < MOTION_THRESHOLD {
            return SampleOutcome::TooClose;
        }

        if self.ruler && self.stroke.point_count() >= 2 {
            self.stroke.set_last_point(point);
            if let Some(width) = self.sample_width(pressure) {
                self.stroke.set_last_width(width);
            }
        } else {
            self.push(point, pressure);
        }
        SampleOutcome::Accepted
    }

    fn push(&mut self, point: Point, pressure: Option<f64>) {
        self.stroke.add_point(point);
        if let Some(width) = self.sample_width(pressure) {
            self.stroke.add_width(width);
        }
    }

    /// Width for a sample on a pressure pen. A missing or non-finite reading
    /// falls back to the nominal width.
    fn sample_width(&self, pressure: Option<f64>) -> Option<f64> {
        let mapping = self.pressure?;
        let multiplier = self
            .device
            .normalized_pressure(pressure)
            .map(|p| mapping.multiplier(p))
            .unwrap_or(1.0);
        Some(self.stroke.width * multiplier)
    }

    /// Finish the stroke so it is ready to be inserted into a layer.
    ///
    /// A single-point stroke becomes a dot: the point is duplicated and any
    /// pressure widths dropped. Widths that do not line up with the points are
    /// cleared as well.
    pub fn finish(self) -> Stroke {
        let mut stroke = self.stroke;
        if stroke.point_count() == 1 {
            if let Some(p) = stroke.last_point() {
                stroke.add_point(p);
            }
            stroke.clear_widths();
        }
        if stroke.has_pressure() && stroke.widths().len() != stroke.point_count() {
            log::debug!(
                "dropping {} widths for a {}-point stroke",
                stroke.widths().len(),
                stroke.point_count()
            );
            stroke.clear_widths();
        }
        stroke.free_unused();
        stroke
    }
}
