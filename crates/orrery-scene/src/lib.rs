//! The body hierarchy: catalog lookup, tree construction, per-tick frame
//! composition and per-pass draw dispatch.
//!
//! Rendering backends implement [`RenderVisitor`]; this crate decides what
//! each body draws in each [`RenderMode`] and in what order, but owns no GPU
//! state.

pub mod body;
pub mod error;
pub mod frame;
pub mod lod;
pub mod picking;
pub mod plan;
pub mod render_mode;
pub mod settings;
pub mod source;

pub use body::{BodyId, BodyIndex, BodyNode, BodyTree, MAX_BODY_ID};
pub use error::SceneError;
pub use frame::{Frames, spin_angle};
pub use lod::{ScreenMetrics, crossfade_alpha, hidden_by_parent, projected_pixels};
pub use picking::{id_to_color, id_to_rgb8, rgb8_to_id};
pub use plan::{draw_all, draw_scene, sort_near_to_far};
pub use render_mode::{RenderMode, RenderVisitor, Shading};
pub use settings::RenderSettings;
pub use source::{BodyCatalog, BodyParams, BodyRecord, BodySource, RingParams};
