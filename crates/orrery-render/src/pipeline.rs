//! Render pipelines for every visual piece of a body.
//!
//! All pieces share one WGSL module and one per-draw [`DrawUniform`] bound
//! with a dynamic offset. Textured pieces additionally bind a day/night
//! texture pair.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::buffer::{LineVertex, SurfaceVertex, trail_vertex_layout};
use crate::depth::depth_stencil_state;

/// Byte distance between consecutive draws in the uniform buffer; the
/// minimum dynamic offset alignment wgpu guarantees.
pub const UNIFORM_STRIDE: wgpu::BufferAddress = 256;

/// Per-draw shader parameters.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    /// Eye-space transform. Rotation only for relative-to-eye trails.
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// RGB plus the pass alpha.
    pub color: [f32; 4],
    /// Light source position in eye space.
    pub light_position: [f32; 4],
    pub eye_high: [f32; 4],
    pub eye_low: [f32; 4],
    /// x: log depth constant, y: C, z: solid shading, w: emissive.
    pub depth: [f32; 4],
    /// x, y: size in pixels, z: horizontal offset in pixels, w: 1 for a rectangle.
    pub billboard: [f32; 4],
    /// x, y: target size in pixels.
    pub viewport: [f32; 4],
    /// x: night texture present.
    pub material: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<DrawUniform>() as u64, UNIFORM_STRIDE);

impl Default for DrawUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Which pipeline a draw goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    Sphere,
    Ring,
    RingSolid,
    Axis,
    Trail,
    Billboard,
    BillboardSolid,
}

impl Piece {
    pub fn is_textured(self) -> bool {
        matches!(self, Piece::Sphere | Piece::Ring | Piece::RingSolid)
    }
}

/// Bind group layouts shared by every body pipeline.
pub struct BodyLayouts {
    pub uniform: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    textured: wgpu::PipelineLayout,
    untextured: wgpu::PipelineLayout,
    module: wgpu::ShaderModule,
}

impl BodyLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("body-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_STRIDE),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("body-texture-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let textured = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("body-textured-layout"),
            bind_group_layouts: &[&uniform, &textures],
            immediate_size: 0,
        });
        let untextured = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("body-untextured-layout"),
            bind_group_layouts: &[&uniform],
            immediate_size: 0,
        });
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("body-shader"),
            source: wgpu::ShaderSource::Wgsl(BODY_SHADER_SOURCE.into()),
        });

        Self {
            uniform,
            textures,
            textured,
            untextured,
            module,
        }
    }
}

/// One pipeline per [`Piece`] for a given color format and sample count.
pub struct BodyPipelines {
    sample_count: u32,
    sphere: wgpu::RenderPipeline,
    ring: wgpu::RenderPipeline,
    ring_solid: wgpu::RenderPipeline,
    axis: wgpu::RenderPipeline,
    trail: wgpu::RenderPipeline,
    billboard: wgpu::RenderPipeline,
    billboard_solid: wgpu::RenderPipeline,
}

struct PieceDesc<'a> {
    label: &'a str,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    blended: bool,
    textured: bool,
}

impl BodyPipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BodyLayouts,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let surface = [SurfaceVertex::layout()];
        let line = [LineVertex::layout()];
        let trail = [trail_vertex_layout()];
        let build = |desc: PieceDesc| {
            create_piece_pipeline(device, layouts, format, sample_count, desc)
        };

        Self {
            sample_count,
            sphere: build(PieceDesc {
                label: "body-sphere",
                vertex_entry: "vs_surface",
                fragment_entry: "fs_sphere",
                buffers: &surface,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                blended: false,
                textured: true,
            }),
            ring: build(PieceDesc {
                label: "body-ring",
                vertex_entry: "vs_surface",
                fragment_entry: "fs_ring",
                buffers: &surface,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blended: true,
                textured: true,
            }),
            ring_solid: build(PieceDesc {
                label: "body-ring-solid",
                vertex_entry: "vs_surface",
                fragment_entry: "fs_ring",
                buffers: &surface,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blended: false,
                textured: true,
            }),
            axis: build(PieceDesc {
                label: "body-axis",
                vertex_entry: "vs_axis",
                fragment_entry: "fs_line",
                buffers: &line,
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                blended: false,
                textured: false,
            }),
            trail: build(PieceDesc {
                label: "body-trail",
                vertex_entry: "vs_trail",
                fragment_entry: "fs_line",
                buffers: &trail,
                topology: wgpu::PrimitiveTopology::LineStrip,
                cull_mode: None,
                blended: true,
                textured: false,
            }),
            billboard: build(PieceDesc {
                label: "body-billboard",
                vertex_entry: "vs_billboard",
                fragment_entry: "fs_billboard",
                buffers: &[],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blended: true,
                textured: false,
            }),
            billboard_solid: build(PieceDesc {
                label: "body-billboard-solid",
                vertex_entry: "vs_billboard",
                fragment_entry: "fs_billboard",
                buffers: &[],
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blended: false,
                textured: false,
            }),
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn get(&self, piece: Piece) -> &wgpu::RenderPipeline {
        match piece {
            Piece::Sphere => &self.sphere,
            Piece::Ring => &self.ring,
            Piece::RingSolid => &self.ring_solid,
            Piece::Axis => &self.axis,
            Piece::Trail => &self.trail,
            Piece::Billboard => &self.billboard,
            Piece::BillboardSolid => &self.billboard_solid,
        }
    }
}

fn create_piece_pipeline(
    device: &wgpu::Device,
    layouts: &BodyLayouts,
    format: wgpu::TextureFormat,
    sample_count: u32,
    desc: PieceDesc,
) -> wgpu::RenderPipeline {
    let layout = if desc.textured {
        &layouts.textured
    } else {
        &layouts.untextured
    };
    let strip_index_format = (desc.topology == wgpu::PrimitiveTopology::LineStrip)
        .then_some(wgpu::IndexFormat::Uint32);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &layouts.module,
            entry_point: Some(desc.vertex_entry),
            buffers: desc.buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(depth_stencil_state(!desc.blended, true)),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &layouts.module,
            entry_point: Some(desc.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: desc.blended.then_some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

/// The WGSL source shared by every body piece.
pub const BODY_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
    color: vec4<f32>,
    light_position: vec4<f32>,
    eye_high: vec4<f32>,
    eye_low: vec4<f32>,
    depth: vec4<f32>,
    billboard: vec4<f32>,
    viewport: vec4<f32>,
    material: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u: DrawUniform;
@group(1) @binding(0) var day_texture: texture_2d<f32>;
@group(1) @binding(1) var night_texture: texture_2d<f32>;
@group(1) @binding(2) var body_sampler: sampler;

// Logarithmic depth in [0, 1]; keeps precision from metres to light years.
fn log_depth(clip: vec4<f32>) -> vec4<f32> {
    var p = clip;
    p.z = log(u.depth.y * max(p.w, 1e-6) + 1.0) * u.depth.x * 0.5 * p.w;
    return p;
}

fn is_solid() -> bool {
    return u.depth.z > 0.5;
}

struct SurfaceOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) eye_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_surface(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> SurfaceOutput {
    let eye = u.model_view * vec4<f32>(position, 1.0);
    var out: SurfaceOutput;
    out.position = log_depth(u.projection * eye);
    out.eye_position = eye.xyz;
    out.normal = (u.model_view * vec4<f32>(normal, 0.0)).xyz;
    out.uv = uv;
    return out;
}

@fragment
fn fs_sphere(in: SurfaceOutput) -> @location(0) vec4<f32> {
    let day = textureSample(day_texture, body_sampler, in.uv);
    let night = textureSample(night_texture, body_sampler, in.uv);
    if (is_solid()) {
        return vec4<f32>(u.color.rgb, 1.0);
    }
    if (u.depth.w > 0.5) {
        return vec4<f32>(day.rgb, u.color.a);
    }
    let n = normalize(in.normal);
    let l = normalize(u.light_position.xyz - in.eye_position);
    let lambert = max(dot(n, l), 0.0);
    var rgb = day.rgb * lambert;
    if (u.material.x > 0.5) {
        rgb = rgb + night.rgb * clamp(1.0 - 4.0 * lambert, 0.0, 1.0);
    }
    return vec4<f32>(rgb, u.color.a);
}

@fragment
fn fs_ring(in: SurfaceOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(day_texture, body_sampler, vec2<f32>(in.uv.x, 0.5));
    if (is_solid()) {
        return vec4<f32>(u.color.rgb, 1.0);
    }
    return vec4<f32>(texel.rgb, texel.a * u.color.a);
}

struct LineOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_axis(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> LineOutput {
    var out: LineOutput;
    out.position = log_depth(u.projection * u.model_view * vec4<f32>(position, 1.0));
    out.color = color;
    return out;
}

// Relative to eye: the large common part cancels before the f32 rotation.
@vertex
fn vs_trail(
    @location(0) high: vec3<f32>,
    @location(1) low: vec3<f32>,
    @location(2) alpha: f32,
) -> LineOutput {
    let relative = (high - u.eye_high.xyz) + (low - u.eye_low.xyz);
    var out: LineOutput;
    out.position = log_depth(u.projection * u.model_view * vec4<f32>(relative, 1.0));
    out.color = vec4<f32>(u.color.rgb, alpha * u.color.a);
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    return in.color;
}

struct BillboardOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) corner: vec2<f32>,
};

@vertex
fn vs_billboard(@builtin(vertex_index) idx: u32) -> BillboardOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[idx];
    let center = log_depth(u.projection * u.model_view * vec4<f32>(0.0, 0.0, 0.0, 1.0));
    let offset_px = vec2<f32>(u.billboard.z, 0.0) + corner * u.billboard.xy * 0.5;
    let offset_ndc = offset_px * 2.0 / u.viewport.xy;
    var out: BillboardOutput;
    out.position = vec4<f32>(center.xy + offset_ndc * center.w, center.z, center.w);
    out.corner = corner;
    return out;
}

@fragment
fn fs_billboard(in: BillboardOutput) -> @location(0) vec4<f32> {
    if (u.billboard.w < 0.5 && dot(in.corner, in.corner) > 1.0) {
        discard;
    }
    if (is_solid()) {
        return vec4<f32>(u.color.rgb, 1.0);
    }
    return u.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_draw_uniform_fills_one_stride() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 256);
        assert_eq!(std::mem::align_of::<DrawUniform>(), 4);
    }

    #[test]
    fn test_shader_declares_every_entry_point() {
        for entry in [
            "fn vs_surface",
            "fn fs_sphere",
            "fn fs_ring",
            "fn vs_axis",
            "fn vs_trail",
            "fn fs_line",
            "fn vs_billboard",
            "fn fs_billboard",
        ] {
            assert!(BODY_SHADER_SOURCE.contains(entry), "missing {entry}");
        }
    }

    #[test]
    fn test_textured_pieces() {
        assert!(Piece::Sphere.is_textured());
        assert!(Piece::RingSolid.is_textured());
        assert!(!Piece::Trail.is_textured());
        assert!(!Piece::BillboardSolid.is_textured());
    }

    #[test]
    fn test_pipelines_build_for_single_and_multisample() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let layouts = BodyLayouts::new(&device);
        for samples in [1, 4] {
            let pipelines =
                BodyPipelines::new(&device, &layouts, wgpu::TextureFormat::Rgba8Unorm, samples);
            assert_eq!(pipelines.sample_count(), samples);
        }
    }
}
