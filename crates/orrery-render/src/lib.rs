//! wgpu rendering of the body tree: device and surface management, the
//! camera, body geometry and pipelines, bloom and antialiasing passes,
//! picking readback and the background starfield.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod draw;
pub mod gpu;
pub mod mesh;
pub mod picking;
pub mod pipeline;
pub mod post;
pub mod scene_pipeline;
pub mod starfield;
pub mod targets;
pub mod textures;
pub mod transition;

pub use buffer::{GpuMesh, LineVertex, SurfaceVertex};
pub use camera::{Camera, TransitionTimings};
pub use depth::{DepthBuffer, LOG_DEPTH_C, LOG_DEPTH_FAR_PLANE, log_depth, log_z_buffer_c};
pub use draw::{DrawList, GpuVisitor, PassView, SceneResources};
pub use gpu::{
    HeadlessContext, RenderContext, RenderContextError, SurfaceError,
    init_render_context_blocking,
};
pub use picking::{PickError, PickTarget};
pub use pipeline::{BodyLayouts, BodyPipelines, DrawUniform, Piece};
pub use post::{GAUSSIAN_WEIGHTS, PostProcessor};
pub use scene_pipeline::{FrameSettings, ScenePipeline};
pub use starfield::{Star, StarfieldGenerator, color_index_to_rgb, eme2000_frame};
pub use targets::{ColorTarget, OFFSCREEN_FORMAT, RenderTargets};
pub use textures::{TextureError, TextureLibrary};
pub use transition::{Easing, Interpolate, Transition};
