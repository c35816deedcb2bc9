//! Depth attachments and the logarithmic depth mapping shared by every body
//! shader.
//!
//! Vertex shaders replace clip-space z with `ln(C·w + 1) · logc · 0.5 · w`,
//! which spreads depth precision evenly over scales from metres to light
//! years. The attachment itself uses the regular `Less` comparison.

/// Logarithmic depth constant `C`.
pub const LOG_DEPTH_C: f32 = 1.0;

/// Farthest distance the log mapping resolves before saturating.
pub const LOG_DEPTH_FAR_PLANE: f64 = 1000.0 * 5_874_000.0;

/// `2 / ln(far · C + 1)`.
pub fn log_z_buffer_c() -> f32 {
    (2.0 / (LOG_DEPTH_FAR_PLANE * f64::from(LOG_DEPTH_C) + 1.0).ln()) as f32
}

/// Normalized `[0, 1]` depth the shaders produce for eye distance `w`.
pub fn log_depth(w: f64) -> f64 {
    let c = f64::from(LOG_DEPTH_C);
    (c * w.max(1e-6) + 1.0).ln() * f64::from(log_z_buffer_c()) * 0.5
}

/// Depth buffer matching one color target.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    sample_count: u32,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Cleared to the far end of the log range.
    pub const CLEAR_VALUE: f32 = 1.0;

    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::Less;

    pub fn new(device: &wgpu::Device, width: u32, height: u32, sample_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            format: Self::FORMAT,
            width,
            height,
            sample_count,
        }
    }

    /// No-op if dimensions are unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(device, width, height, self.sample_count);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Depth attachment that clears to [`Self::CLEAR_VALUE`].
    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(Self::CLEAR_VALUE),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }
}

/// Depth state for pipelines drawing into a [`DepthBuffer`].
pub fn depth_stencil_state(write: bool, test: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DepthBuffer::FORMAT,
        depth_write_enabled: write,
        depth_compare: if test {
            DepthBuffer::COMPARE_FUNCTION
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_depth_texture_format_is_depth32float() {
        assert_eq!(DepthBuffer::FORMAT, wgpu::TextureFormat::Depth32Float);
    }

    #[test]
    fn test_clear_value_is_far() {
        assert_eq!(DepthBuffer::CLEAR_VALUE, 1.0);
        assert_eq!(DepthBuffer::COMPARE_FUNCTION, wgpu::CompareFunction::Less);
    }

    #[test]
    fn test_log_depth_spans_unit_range() {
        assert!(log_depth(0.0).abs() < 1e-5);
        assert!((log_depth(LOG_DEPTH_FAR_PLANE) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_log_depth_is_monotonic_across_scales() {
        let mut last = log_depth(1.0);
        for exponent in 1..12 {
            let d = log_depth(10f64.powi(exponent));
            assert!(d > last, "depth not increasing at 1e{exponent}");
            last = d;
        }
    }

    #[test]
    fn test_depth_state_can_disable_testing() {
        let state = depth_stencil_state(false, false);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Always);
        assert!(!state.depth_write_enabled);
        assert_eq!(depth_stencil_state(true, true).depth_compare, wgpu::CompareFunction::Less);
    }

    #[test]
    fn test_depth_texture_dimensions_match_target() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let depth = DepthBuffer::new(&device, 1920, 1080, 1);
        assert_eq!(depth.width(), 1920);
        assert_eq!(depth.height(), 1080);
    }

    #[test]
    fn test_resize_keeps_sample_count() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut depth = DepthBuffer::new(&device, 800, 600, 4);
        depth.resize(&device, 1024, 768);
        assert_eq!(depth.width(), 1024);
        assert_eq!(depth.sample_count(), 4);
        assert_eq!(depth.texture.sample_count(), 4);
    }
}
