// Hidpoll Rumblers
// Force-feedback actuators attached to a controller

use crate::backend::BackendResult;
use crate::Identifier;

/// A force-feedback actuator.
///
/// How an intensity is encoded and uploaded to the device is the backend's
/// business; the core only hands over a clamped intensity.
pub trait Rumbler: Send {
    /// Drive the actuator at `intensity` in [-1, 1]; 0 stops it
    fn rumble(&mut self, intensity: f32) -> BackendResult<()>;

    /// Human-readable name of the axis this actuator acts on
    fn axis_name(&self) -> &str;

    /// Identifier of the axis this actuator acts on, if it maps to one
    fn axis_identifier(&self) -> Option<Identifier>;
}

/// Clamp a requested intensity into the accepted range.
///
/// NaN is treated as "stop".
pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(-1.0, 1.0)
    }
}

/// Rumbler that only records the last intensity it was given.
///
/// Useful for controllers whose actuators are driven elsewhere, and in
/// tests.
#[derive(Debug, Clone)]
pub struct RecordingRumbler {
    axis_name: String,
    axis: Option<Identifier>,
    intensity: f32,
}

impl RecordingRumbler {
    pub fn new(axis_name: impl Into<String>, axis: Option<Identifier>) -> Self {
        Self {
            axis_name: axis_name.into(),
            axis,
            intensity: 0.0,
        }
    }

    /// Last intensity applied
    pub fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl Rumbler for RecordingRumbler {
    fn rumble(&mut self, intensity: f32) -> BackendResult<()> {
        self.intensity = clamp_intensity(intensity);
        log::trace!("Rumbler {} set to {}", self.axis_name, self.intensity);
        Ok(())
    }

    fn axis_name(&self) -> &str {
        &self.axis_name
    }

    fn axis_identifier(&self) -> Option<Identifier> {
        self.axis
    }
}
