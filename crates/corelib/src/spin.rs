use crate::{Mat4, error::CoreError, error::CoreResult};

/// Model rotation about +Y, advanced by a fixed number of degrees per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin {
    degrees: f32,
    step: f32,
}

impl Spin {
    pub const DEFAULT_STEP: f32 = 1.0;

    /// `step` is in degrees per frame and must be finite. Zero keeps the model still.
    pub fn new(step: f32) -> CoreResult<Self> {
        if !step.is_finite() {
            return Err(CoreError::InvalidSpinStep(step));
        }
        Ok(Self { degrees: 0.0, step })
    }

    #[inline]
    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Advance one frame, wrapping into [0, 360).
    pub fn advance(&mut self) -> f32 {
        self.degrees = (self.degrees + self.step).rem_euclid(360.0);
        self.degrees
    }

    #[inline]
    pub fn model(&self) -> Mat4 {
        Mat4::from_rotation_y(self.degrees.to_radians())
    }
}

impl Default for Spin {
    fn default() -> Self {
        Self {
            degrees: 0.0,
            step: Self::DEFAULT_STEP,
        }
    }
}
