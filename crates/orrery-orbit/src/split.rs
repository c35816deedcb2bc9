//! Double-precision values split into two `f32` halves for relative-to-eye
//! rendering.
//!
//! The GPU reconstructs `high - eye_high + (low - eye_low)`, which keeps
//! sub-meter precision at solar-system distances even though every shader
//! input is single precision.

use glam::{DAffine3, DMat4, DVec3, Mat4};

/// A double split into a coarse `high` part and the `low` remainder.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplitF64 {
    pub high: f32,
    pub low: f32,
}

impl SplitF64 {
    /// Recombine the halves in double precision.
    pub fn to_f64(self) -> f64 {
        self.high as f64 + self.low as f64
    }
}

/// `high = v as f32`, `low = (v - high) as f32`.
#[inline]
pub fn split_f64(value: f64) -> SplitF64 {
    let high = value as f32;
    let low = (value - high as f64) as f32;
    SplitF64 { high, low }
}

/// Component-wise split of a vector into `(high, low)` arrays.
pub fn split_vec3(value: DVec3) -> ([f32; 3], [f32; 3]) {
    let x = split_f64(value.x);
    let y = split_f64(value.y);
    let z = split_f64(value.z);
    ([x.high, y.high, z.high], [x.low, y.low, z.low])
}

/// Per-draw transform data for relative-to-eye rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeToEye {
    /// `view * model` with its translation removed.
    pub rotation: Mat4,
    /// Eye position in model space, high halves.
    pub eye_high: [f32; 3],
    /// Eye position in model space, low halves.
    pub eye_low: [f32; 3],
}

impl RelativeToEye {
    /// Build from the combined `view * model` transform.
    ///
    /// The eye position is the translation of the inverse transform, so it is
    /// expressed in the model's own coordinates.
    pub fn from_model_view(model_view: DAffine3) -> Self {
        let eye = model_view.inverse().translation;
        let (eye_high, eye_low) = split_vec3(eye);
        let mut rotation_only = model_view;
        rotation_only.translation = DVec3::ZERO;
        Self {
            rotation: DMat4::from(rotation_only).as_mat4(),
            eye_high,
            eye_low,
        }
    }
}
