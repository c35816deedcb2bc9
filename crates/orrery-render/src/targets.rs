//! Offscreen color targets and the set of them a frame renders through.

use orrery_config::{AntiAliasingMode, RenderConfig};

use crate::depth::DepthBuffer;
use crate::gpu::RenderContextError;

/// Format of every offscreen color target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A color texture that can be rendered to and, when single-sampled,
/// sampled by the fullscreen passes or copied for readback.
pub struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Texture + sampler bind group; `None` for multisampled targets.
    pub bind_group: Option<wgpu::BindGroup>,
    width: u32,
    height: u32,
    sample_count: u32,
}

impl ColorTarget {
    pub fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        label: &str,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let usage = if sample_count > 1 {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = (sample_count == 1).then(|| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        });

        Self {
            texture,
            view,
            bind_group,
            width,
            height,
            sample_count,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

/// Where the full scene is drawn for a given antialiasing mode.
pub struct SceneTarget<'a> {
    pub color: &'a ColorTarget,
    pub depth: &'a DepthBuffer,
    /// Multisample resolve destination.
    pub resolve: Option<&'a ColorTarget>,
}

/// Every offscreen target a frame needs, sized from the viewport.
///
/// `simple` is viewport-sized and doubles as the picking target. `msaa`
/// resolves into `simple`, `ssaa` is downsampled into it and FXAA filters
/// `simple` into `simple2`. The two bloom targets ping-pong the blur.
pub struct RenderTargets {
    width: u32,
    height: u32,
    msaa_samples: u32,
    supersample_factor: u32,
    bloom_downscale: u32,
    pub simple: ColorTarget,
    pub simple2: ColorTarget,
    pub msaa: ColorTarget,
    pub ssaa: ColorTarget,
    pub bloom: [ColorTarget; 2],
    depth: DepthBuffer,
    msaa_depth: DepthBuffer,
    ssaa_depth: DepthBuffer,
    bloom_depth: DepthBuffer,
}

impl RenderTargets {
    pub fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        config: &RenderConfig,
    ) -> Result<Self, RenderContextError> {
        let msaa_samples = config.msaa_samples.max(1);
        let supersample_factor = config.supersample_factor.max(1);
        let bloom_downscale = config.bloom_downscale.max(1);
        check_fits(device, width * supersample_factor, height * supersample_factor)?;

        let (w, h) = (width.max(1), height.max(1));
        let (sw, sh) = (w * supersample_factor, h * supersample_factor);
        let (bw, bh) = ((w / bloom_downscale).max(1), (h / bloom_downscale).max(1));
        let color = |label, width, height, samples| {
            ColorTarget::new(device, texture_layout, sampler, label, width, height, samples)
        };

        let targets = Self {
            width: w,
            height: h,
            msaa_samples,
            supersample_factor,
            bloom_downscale,
            simple: color("simple-target", w, h, 1),
            simple2: color("simple2-target", w, h, 1),
            msaa: color("msaa-target", w, h, msaa_samples),
            ssaa: color("ssaa-target", sw, sh, 1),
            bloom: [color("bloom-target-0", bw, bh, 1), color("bloom-target-1", bw, bh, 1)],
            depth: DepthBuffer::new(device, w, h, 1),
            msaa_depth: DepthBuffer::new(device, w, h, msaa_samples),
            ssaa_depth: DepthBuffer::new(device, sw, sh, 1),
            bloom_depth: DepthBuffer::new(device, bw, bh, 1),
        };
        log::debug!(
            "Render targets {w}x{h} (msaa x{msaa_samples}, ssaa {sw}x{sh}, bloom {bw}x{bh})"
        );
        Ok(targets)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn msaa_samples(&self) -> u32 {
        self.msaa_samples
    }

    pub fn bloom_size(&self) -> (u32, u32) {
        self.bloom[0].size()
    }

    /// Reallocate everything for a new viewport size.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Result<(), RenderContextError> {
        if (width.max(1), height.max(1)) == (self.width, self.height) {
            return Ok(());
        }
        let config = RenderConfig {
            msaa_samples: self.msaa_samples,
            supersample_factor: self.supersample_factor,
            bloom_downscale: self.bloom_downscale,
            ..RenderConfig::default()
        };
        *self = Self::new(device, texture_layout, sampler, width, height, &config)?;
        Ok(())
    }

    /// Color and depth attachments the scene pass uses under `mode`.
    pub fn scene_target(&self, mode: AntiAliasingMode) -> SceneTarget<'_> {
        match mode {
            AntiAliasingMode::Msaa => SceneTarget {
                color: &self.msaa,
                depth: &self.msaa_depth,
                resolve: Some(&self.simple),
            },
            AntiAliasingMode::Ssaa => SceneTarget {
                color: &self.ssaa,
                depth: &self.ssaa_depth,
                resolve: None,
            },
            AntiAliasingMode::None | AntiAliasingMode::Fxaa => SceneTarget {
                color: &self.simple,
                depth: &self.depth,
                resolve: None,
            },
        }
    }

    /// The viewport-sized target used for picking.
    pub fn picking_target(&self) -> SceneTarget<'_> {
        SceneTarget {
            color: &self.simple,
            depth: &self.depth,
            resolve: None,
        }
    }

    /// Light-source pre-pass target.
    pub fn bloom_target(&self) -> SceneTarget<'_> {
        SceneTarget {
            color: &self.bloom[0],
            depth: &self.bloom_depth,
            resolve: None,
        }
    }
}

fn check_fits(device: &wgpu::Device, width: u32, height: u32) -> Result<(), RenderContextError> {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(RenderContextError::TargetAllocation(format!(
            "{width}x{height} exceeds the device limit of {max}"
        )));
    }
    Ok(())
}
