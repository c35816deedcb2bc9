//! Fullscreen post-processing: bloom blur, FXAA, supersample downsampling
//! and the final composite onto the surface.
//!
//! Every pass draws one fullscreen triangle and samples a single
//! [`ColorTarget`]. Texel offsets come from the sampled texture's own size,
//! so the blur steps in bloom-target texels and FXAA in viewport texels.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::targets::{ColorTarget, OFFSCREEN_FORMAT};

/// 9-tap Gaussian weights, center first.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_216,
];

const FXAA_SPAN_MAX: f32 = 8.0;
const FXAA_REDUCE_MUL: f32 = 1.0 / 8.0;
const FXAA_REDUCE_MIN: f32 = 1.0 / 128.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct PostParams {
    pub weights: [f32; 4],
    pub edge_weight: f32,
    pub fxaa_span_max: f32,
    pub fxaa_reduce_mul: f32,
    pub fxaa_reduce_min: f32,
}

impl Default for PostParams {
    fn default() -> Self {
        Self {
            weights: [
                GAUSSIAN_WEIGHTS[0],
                GAUSSIAN_WEIGHTS[1],
                GAUSSIAN_WEIGHTS[2],
                GAUSSIAN_WEIGHTS[3],
            ],
            edge_weight: GAUSSIAN_WEIGHTS[4],
            fxaa_span_max: FXAA_SPAN_MAX,
            fxaa_reduce_mul: FXAA_REDUCE_MUL,
            fxaa_reduce_min: FXAA_REDUCE_MIN,
        }
    }
}

pub const POST_SHADER_SOURCE: &str = r#"
struct PostParams {
    weights: vec4<f32>,
    edge_weight: f32,
    fxaa_span_max: f32,
    fxaa_reduce_mul: f32,
    fxaa_reduce_min: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: PostParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

fn weight(i: i32) -> f32 {
    if (i == 4) {
        return params.edge_weight;
    }
    return params.weights[i];
}

fn blur(uv: vec2<f32>, direction: vec2<f32>) -> vec4<f32> {
    let texel = direction / vec2<f32>(textureDimensions(input_tex));
    var sum = textureSample(input_tex, input_sampler, uv) * weight(0);
    for (var i = 1; i < 5; i = i + 1) {
        let offset = texel * f32(i);
        sum = sum + textureSample(input_tex, input_sampler, uv + offset) * weight(i);
        sum = sum + textureSample(input_tex, input_sampler, uv - offset) * weight(i);
    }
    return sum;
}

@fragment
fn fs_blur_horizontal(in: VertexOutput) -> @location(0) vec4<f32> {
    return blur(in.uv, vec2<f32>(1.0, 0.0));
}

@fragment
fn fs_blur_vertical(in: VertexOutput) -> @location(0) vec4<f32> {
    return blur(in.uv, vec2<f32>(0.0, 1.0));
}

fn luma(rgb: vec3<f32>) -> f32 {
    return dot(rgb, vec3<f32>(0.299, 0.587, 0.114));
}

@fragment
fn fs_fxaa(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = 1.0 / vec2<f32>(textureDimensions(input_tex));
    let rgb_nw = textureSample(input_tex, input_sampler, in.uv + vec2<f32>(-1.0, -1.0) * texel).rgb;
    let rgb_ne = textureSample(input_tex, input_sampler, in.uv + vec2<f32>(1.0, -1.0) * texel).rgb;
    let rgb_sw = textureSample(input_tex, input_sampler, in.uv + vec2<f32>(-1.0, 1.0) * texel).rgb;
    let rgb_se = textureSample(input_tex, input_sampler, in.uv + vec2<f32>(1.0, 1.0) * texel).rgb;
    let center = textureSample(input_tex, input_sampler, in.uv);

    let luma_nw = luma(rgb_nw);
    let luma_ne = luma(rgb_ne);
    let luma_sw = luma(rgb_sw);
    let luma_se = luma(rgb_se);
    let luma_m = luma(center.rgb);
    let luma_min = min(luma_m, min(min(luma_nw, luma_ne), min(luma_sw, luma_se)));
    let luma_max = max(luma_m, max(max(luma_nw, luma_ne), max(luma_sw, luma_se)));

    var dir = vec2<f32>(
        -((luma_nw + luma_ne) - (luma_sw + luma_se)),
        (luma_nw + luma_sw) - (luma_ne + luma_se),
    );
    let dir_reduce = max(
        (luma_nw + luma_ne + luma_sw + luma_se) * 0.25 * params.fxaa_reduce_mul,
        params.fxaa_reduce_min,
    );
    let rcp_dir_min = 1.0 / (min(abs(dir.x), abs(dir.y)) + dir_reduce);
    dir = clamp(
        dir * rcp_dir_min,
        vec2<f32>(-params.fxaa_span_max),
        vec2<f32>(params.fxaa_span_max),
    ) * texel;

    let rgb_a = 0.5 * (
        textureSample(input_tex, input_sampler, in.uv + dir * (1.0 / 3.0 - 0.5)).rgb +
        textureSample(input_tex, input_sampler, in.uv + dir * (2.0 / 3.0 - 0.5)).rgb
    );
    let rgb_b = rgb_a * 0.5 + 0.25 * (
        textureSample(input_tex, input_sampler, in.uv + dir * -0.5).rgb +
        textureSample(input_tex, input_sampler, in.uv + dir * 0.5).rgb
    );
    let luma_b = luma(rgb_b);
    if (luma_b < luma_min || luma_b > luma_max) {
        return vec4<f32>(rgb_a, center.a);
    }
    return vec4<f32>(rgb_b, center.a);
}

@fragment
fn fs_copy(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(input_tex, input_sampler, in.uv).rgb, 1.0);
}
"#;

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Pipelines and shared bindings for every fullscreen pass.
pub struct PostProcessor {
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_bind_group: wgpu::BindGroup,
    blur_horizontal: wgpu::RenderPipeline,
    blur_vertical: wgpu::RenderPipeline,
    fxaa: wgpu::RenderPipeline,
    downsample: wgpu::RenderPipeline,
    present: wgpu::RenderPipeline,
    present_additive: wgpu::RenderPipeline,
}

impl PostProcessor {
    /// `surface_format` is the format of the final composite target.
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post-shader"),
            source: wgpu::ShaderSource::Wgsl(POST_SHADER_SOURCE.into()),
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<PostParams>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-texture-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-layout"),
            bind_group_layouts: &[&params_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = |entry, format, blend, label| {
            create_fullscreen_pipeline(device, &shader, &layout, entry, format, blend, label)
        };
        let blur_horizontal = pipeline(
            "fs_blur_horizontal",
            OFFSCREEN_FORMAT,
            None,
            "post-blur-horizontal",
        );
        let blur_vertical = pipeline("fs_blur_vertical", OFFSCREEN_FORMAT, None, "post-blur-vertical");
        let fxaa = pipeline("fs_fxaa", OFFSCREEN_FORMAT, None, "post-fxaa");
        let downsample = pipeline("fs_copy", OFFSCREEN_FORMAT, None, "post-downsample");
        let present = pipeline("fs_copy", surface_format, None, "post-present");
        let present_additive = pipeline(
            "fs_copy",
            surface_format,
            Some(ADDITIVE),
            "post-present-additive",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("post-params"),
            contents: bytemuck::cast_slice(&[PostParams::default()]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post-params-bg"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        Self {
            texture_layout,
            sampler,
            params_bind_group,
            blur_horizontal,
            blur_vertical,
            fxaa,
            downsample,
            present,
            present_additive,
        }
    }

    /// Layout of the texture bind group every [`ColorTarget`] carries.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// `passes` rounds of horizontal then vertical blur. The result ends up
    /// back in `targets[0]`.
    pub fn blur(&self, encoder: &mut wgpu::CommandEncoder, targets: &[ColorTarget; 2], passes: u32) {
        for _ in 0..passes {
            self.run_pass(
                encoder,
                &self.blur_horizontal,
                &targets[0],
                &targets[1].view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "bloom-blur-horizontal",
            );
            self.run_pass(
                encoder,
                &self.blur_vertical,
                &targets[1],
                &targets[0].view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "bloom-blur-vertical",
            );
        }
    }

    /// Edge-antialias `source` into `destination`.
    pub fn fxaa(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &ColorTarget,
        destination: &ColorTarget,
    ) {
        self.run_pass(
            encoder,
            &self.fxaa,
            source,
            &destination.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "fxaa",
        );
    }

    /// Filter a supersampled `source` down to `destination`'s size.
    pub fn downsample(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &ColorTarget,
        destination: &ColorTarget,
    ) {
        self.run_pass(
            encoder,
            &self.downsample,
            source,
            &destination.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "ssaa-downsample",
        );
    }

    /// Draw `scene` to the surface, then add `bloom` on top when present.
    pub fn composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &ColorTarget,
        bloom: Option<&ColorTarget>,
        surface_view: &wgpu::TextureView,
    ) {
        self.run_pass(
            encoder,
            &self.present,
            scene,
            surface_view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "composite-scene",
        );
        if let Some(bloom) = bloom {
            self.run_pass(
                encoder,
                &self.present_additive,
                bloom,
                surface_view,
                wgpu::LoadOp::Load,
                "composite-bloom",
            );
        }
    }

    fn run_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        source: &ColorTarget,
        target_view: &wgpu::TextureView,
        load_op: wgpu::LoadOp<wgpu::Color>,
        label: &str,
    ) {
        let Some(texture_bind_group) = source.bind_group.as_ref() else {
            log::warn!("{label}: source target is multisampled, skipping");
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.params_bind_group, &[]);
        pass.set_bind_group(1, texture_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_gaussian_weights_sum_to_approximately_one() {
        let sum = GAUSSIAN_WEIGHTS[0] + 2.0 * GAUSSIAN_WEIGHTS[1..].iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 0.01, "Gaussian weights should sum to ~1.0, got {sum}");
    }

    #[test]
    fn test_gaussian_weights_fall_off() {
        assert!(GAUSSIAN_WEIGHTS.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_post_params_layout() {
        assert_eq!(std::mem::size_of::<PostParams>(), 32);
        let params = PostParams::default();
        assert_eq!(params.edge_weight, GAUSSIAN_WEIGHTS[4]);
        assert_eq!(params.fxaa_span_max, 8.0);
    }

    #[test]
    fn test_shader_entry_points() {
        for entry in [
            "fn vs_fullscreen",
            "fn fs_blur_horizontal",
            "fn fs_blur_vertical",
            "fn fs_fxaa",
            "fn fs_copy",
        ] {
            assert!(POST_SHADER_SOURCE.contains(entry), "missing {entry}");
        }
    }

    #[test]
    fn test_pipelines_build() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let post = PostProcessor::new(&device, wgpu::TextureFormat::Bgra8Unorm);
        let target = ColorTarget::new(
            &device,
            post.texture_layout(),
            post.sampler(),
            "test-target",
            16,
            16,
            1,
        );
        assert!(target.bind_group.is_some());
    }
}
