//! Body id <-> flat RGB color used by the picking pass.

use crate::body::{BodyId, MAX_BODY_ID};

/// 8-bit RGB bytes for an id.
pub fn id_to_rgb8(id: BodyId) -> [u8; 3] {
    let raw = id.get();
    [(raw >> 16 & 0xff) as u8, (raw >> 8 & 0xff) as u8, (raw & 0xff) as u8]
}

/// Normalized color written by the picking shader.
pub fn id_to_color(id: BodyId) -> [f32; 3] {
    id_to_rgb8(id).map(|c| c as f32 / 255.0)
}

/// Inverse of [`id_to_rgb8`].
pub fn rgb8_to_id(rgb: [u8; 3]) -> BodyId {
    let raw = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
    debug_assert!(raw <= MAX_BODY_ID);
    BodyId::from_raw(raw)
}
