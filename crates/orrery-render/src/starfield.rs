//! Background star catalog ("galaxy").
//!
//! Stars are generated once from a seed, uploaded as instances and drawn as
//! screen-aligned quads before any body, with depth testing off. Positions
//! are directions at infinity, so only the camera rotation moves them.

use bytemuck::{Pod, Zeroable};
use glam::{DAffine3, DMat4, DVec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wgpu::util::DeviceExt;

use crate::depth::depth_stencil_state;

/// Faintest magnitude in the catalog.
pub const FAINTEST_MAGNITUDE: f32 = 7.0;
const BRIGHTEST_MAGNITUDE: f32 = -1.5;

/// One background star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub direction: Vec3,
    /// B−V color index.
    pub color_index: f32,
    pub magnitude: f32,
}

impl Star {
    pub fn color(&self) -> [f32; 3] {
        color_index_to_rgb(self.color_index)
    }

    /// Quad diameter in pixels before supersampling.
    pub fn size(&self) -> f32 {
        1.0 + 0.5 * (FAINTEST_MAGNITUDE - self.magnitude).max(0.0)
    }

    pub fn brightness(&self) -> f32 {
        let span = FAINTEST_MAGNITUDE - BRIGHTEST_MAGNITUDE;
        (0.25 + 0.75 * (FAINTEST_MAGNITUDE - self.magnitude) / span).clamp(0.0, 1.0)
    }
}

/// Deterministic star catalog generator.
pub struct StarfieldGenerator {
    seed: u64,
    star_count: u32,
}

impl StarfieldGenerator {
    pub fn new(seed: u64, star_count: u32) -> Self {
        Self { seed, star_count }
    }

    /// Uniform directions on the sphere; faint stars outnumber bright ones.
    pub fn generate(&self) -> Vec<Star> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..self.star_count)
            .map(|_| {
                let theta = rng.random::<f32>() * std::f32::consts::TAU;
                let phi = (1.0 - 2.0 * rng.random::<f32>()).acos();
                let direction =
                    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());

                let span = FAINTEST_MAGNITUDE - BRIGHTEST_MAGNITUDE;
                let magnitude = BRIGHTEST_MAGNITUDE + span * rng.random::<f32>().powf(0.25);
                // Triangular distribution centered on solar-type stars.
                let color_index = -0.4 + 1.2 * (rng.random::<f32>() + rng.random::<f32>());

                Star {
                    direction,
                    color_index,
                    magnitude,
                }
            })
            .collect()
    }
}

/// Upper bounds of the B−V bins and their 8-bit RGB colors.
const COLOR_INDEX_TABLE: [(f32, [u8; 3]); 48] = [
    (-0.40, [155, 178, 255]),
    (-0.35, [158, 181, 255]),
    (-0.30, [163, 185, 255]),
    (-0.25, [170, 191, 255]),
    (-0.20, [178, 197, 255]),
    (-0.15, [187, 204, 255]),
    (-0.10, [196, 210, 255]),
    (-0.05, [204, 216, 255]),
    (0.00, [211, 221, 255]),
    (0.05, [218, 226, 255]),
    (0.10, [223, 229, 255]),
    (0.15, [228, 233, 255]),
    (0.20, [233, 236, 255]),
    (0.25, [238, 239, 255]),
    (0.30, [243, 242, 255]),
    (0.35, [248, 246, 255]),
    (0.40, [254, 249, 255]),
    (0.45, [255, 249, 251]),
    (0.50, [255, 247, 245]),
    (0.55, [255, 245, 239]),
    (0.60, [255, 243, 234]),
    (0.65, [255, 241, 229]),
    (0.70, [255, 239, 224]),
    (0.75, [255, 237, 219]),
    (0.80, [255, 235, 214]),
    (0.85, [255, 233, 210]),
    (0.90, [255, 232, 206]),
    (0.95, [255, 230, 202]),
    (1.00, [255, 229, 198]),
    (1.05, [255, 227, 195]),
    (1.10, [255, 226, 191]),
    (1.15, [255, 224, 187]),
    (1.20, [255, 223, 184]),
    (1.25, [255, 221, 180]),
    (1.30, [255, 219, 176]),
    (1.35, [255, 218, 173]),
    (1.40, [255, 216, 169]),
    (1.45, [255, 214, 165]),
    (1.50, [255, 213, 161]),
    (1.55, [255, 210, 156]),
    (1.60, [255, 208, 150]),
    (1.65, [255, 204, 143]),
    (1.70, [255, 200, 133]),
    (1.75, [255, 193, 120]),
    (1.80, [255, 183, 101]),
    (1.85, [255, 169, 75]),
    (1.90, [255, 149, 35]),
    (1.95, [255, 123, 0]),
];
const REDDEST: [u8; 3] = [255, 82, 0];

/// Color of a star with B−V index `bv`, in `[0, 1]`.
pub fn color_index_to_rgb(bv: f32) -> [f32; 3] {
    let rgb = COLOR_INDEX_TABLE
        .iter()
        .find(|(upper, _)| bv < *upper + 1e-4)
        .map_or(REDDEST, |(_, rgb)| *rgb);
    rgb.map(|c| c as f32 / 255.0)
}

/// The frame the star catalog is expressed in: `frame_body`'s reference
/// frame at J2000 turned by −π/2 about its Z axis, rotation only.
pub fn eme2000_frame(frame_body_reference: &DAffine3) -> DAffine3 {
    let mut frame = *frame_body_reference
        * DAffine3::from_rotation_z(-std::f64::consts::FRAC_PI_2);
    frame.translation = DVec3::ZERO;
    frame
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct StarInstance {
    direction: [f32; 3],
    size: f32,
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct StarUniform {
    view_projection: [[f32; 4]; 4],
    /// x, y: viewport in pixels, z: point size coefficient.
    viewport: [f32; 4],
}

const STAR_SHADER_SOURCE: &str = r#"
struct StarUniform {
    view_projection: mat4x4<f32>,
    viewport: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u: StarUniform;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_star(
    @builtin(vertex_index) idx: u32,
    @location(0) direction: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[idx];
    let clip = u.view_projection * vec4<f32>(direction, 0.0);
    let offset = corner * size * u.viewport.z / u.viewport.xy;
    var out: VertexOutput;
    out.position = vec4<f32>(clip.xy + offset * clip.w, 0.5 * clip.w, clip.w);
    out.corner = corner;
    out.color = color;
    return out;
}

@fragment
fn fs_star(in: VertexOutput) -> @location(0) vec4<f32> {
    let r2 = dot(in.corner, in.corner);
    if (r2 > 1.0) {
        discard;
    }
    return vec4<f32>(in.color.rgb, in.color.a * (1.0 - r2));
}
"#;

/// GPU resources for the background stars.
pub struct Starfield {
    instances: wgpu::Buffer,
    instance_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    single: wgpu::RenderPipeline,
    multisampled: wgpu::RenderPipeline,
    msaa_samples: u32,
}

impl Starfield {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        msaa_samples: u32,
        stars: &[Star],
    ) -> Self {
        let instances: Vec<StarInstance> = stars
            .iter()
            .map(|star| {
                let [r, g, b] = star.color();
                StarInstance {
                    direction: star.direction.to_array(),
                    size: star.size(),
                    color: [r, g, b, star.brightness()],
                }
            })
            .collect();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("star-instances"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("star-uniform"),
            size: std::mem::size_of::<StarUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("star-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star-bg"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("star-layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("star-shader"),
            source: wgpu::ShaderSource::Wgsl(STAR_SHADER_SOURCE.into()),
        });

        let msaa_samples = msaa_samples.max(1);
        Self {
            instances: instance_buffer,
            instance_count: instances.len() as u32,
            uniform_buffer,
            bind_group,
            single: create_star_pipeline(device, &pipeline_layout, &shader, format, 1),
            multisampled: create_star_pipeline(
                device,
                &pipeline_layout,
                &shader,
                format,
                msaa_samples,
            ),
            msaa_samples,
        }
    }

    pub fn star_count(&self) -> u32 {
        self.instance_count
    }

    /// Update the rotation-only view of the catalog frame.
    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        view: &DAffine3,
        projection: &DMat4,
        frame: &DAffine3,
        viewport: [f32; 2],
        point_coefficient: f32,
    ) {
        let mut rotation = *view * *frame;
        rotation.translation = DVec3::ZERO;
        let view_projection = (*projection * DMat4::from(rotation)).as_mat4();
        let uniform = StarUniform {
            view_projection: view_projection.to_cols_array_2d(),
            viewport: [viewport[0], viewport[1], point_coefficient, 0.0],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, sample_count: u32) {
        if self.instance_count == 0 {
            return;
        }
        let pipeline = if sample_count == self.msaa_samples && sample_count > 1 {
            &self.multisampled
        } else {
            &self.single
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.instances.slice(..));
        pass.draw(0..6, 0..self.instance_count);
    }
}

fn create_star_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("starfield"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_star"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<StarInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(depth_stencil_state(false, false)),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_star"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}
