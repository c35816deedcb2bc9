//! wgpu device setup.
//!
//! [`RenderContext`] drives a window surface; [`HeadlessContext`] has only a
//! device and queue and backs the offscreen tests.

use std::sync::Arc;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    #[error("no usable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("GPU device refused: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("cannot create window surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// A scene target exceeds the device limits or could not be allocated.
    #[error("render targets: {0}")]
    TargetAllocation(String),
}

/// Why no frame could be acquired. `Timeout` only skips the frame.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface lost")]
    Lost,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("timed out waiting for a frame")]
    Timeout,
}

fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn open_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderContextError> {
    let power_preference = if surface.is_some() {
        wgpu::PowerPreference::HighPerformance
    } else {
        wgpu::PowerPreference::default()
    };
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await?;

    let info = adapter.get_info();
    log::info!("GPU adapter: {} on {:?} ({:?})", info.name, info.backend, info.device_type);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("orrery-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok((adapter, device, queue))
}

/// Device, queue and the configured surface of the viewer window.
pub struct RenderContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl RenderContext {
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderContextError> {
        let instance = new_instance();
        let size = window.inner_size();
        let surface = instance.create_surface(window)?;
        let (adapter, device, queue) = open_device(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&caps.formats);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: pick_present_mode(&caps.present_modes, vsync),
            alpha_mode: caps.alpha_modes[0],
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::debug!(
            "Surface {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            surface_format,
            surface_config.present_mode
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            surface_format,
        })
    }

    /// Surface size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigure for a new window size; zero extents become 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Next swapchain texture. Lost and outdated surfaces are reconfigured
    /// once before giving up.
    pub fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        let first = self.surface.get_current_texture();
        match first {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Timeout) => Err(SurfaceError::Timeout),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(SurfaceError::OutOfMemory),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface invalidated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                self.surface.get_current_texture().map_err(|_| SurfaceError::Lost)
            }
            Err(wgpu::SurfaceError::Other) => {
                log::error!("Surface reported an unspecified error");
                Err(SurfaceError::Lost)
            }
        }
    }
}

/// Blocks on [`RenderContext::new`] with `pollster`.
pub fn init_render_context_blocking(
    window: Arc<Window>,
    vsync: bool,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::new(window, vsync))
}

pub struct HeadlessContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl HeadlessContext {
    pub async fn new() -> Result<Self, RenderContextError> {
        let instance = new_instance();
        let (adapter, device, queue) = open_device(&instance, None).await?;
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn new_blocking() -> Result<Self, RenderContextError> {
        pollster::block_on(Self::new())
    }
}

/// Offscreen targets already hold display-referred colors, so a linear
/// surface format avoids encoding gamma twice.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
    [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
        .into_iter()
        .find(|preferred| formats.contains(preferred))
        .or_else(|| formats.iter().copied().find(|f| !f.is_srgb()))
        .unwrap_or(formats[0])
}

fn pick_present_mode(available: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// `None` on machines without an adapter; GPU tests return early then.
#[cfg(test)]
pub(crate) fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    HeadlessContext::new_blocking()
        .ok()
        .map(|ctx| (ctx.device, ctx.queue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    #[test]
    fn test_linear_bgra_wins() {
        assert_eq!(pick_surface_format(&[F::Bgra8UnormSrgb, F::Rgba8Unorm, F::Bgra8Unorm]), F::Bgra8Unorm);
    }

    #[test]
    fn test_linear_rgba_when_no_bgra() {
        assert_eq!(pick_surface_format(&[F::Bgra8UnormSrgb, F::Rgba8Unorm]), F::Rgba8Unorm);
    }

    #[test]
    fn test_any_linear_format_before_srgb() {
        assert_eq!(pick_surface_format(&[F::Rgba8UnormSrgb, F::Rgb10a2Unorm]), F::Rgb10a2Unorm);
    }

    #[test]
    fn test_srgb_only_surface_uses_first() {
        assert_eq!(pick_surface_format(&[F::Bgra8UnormSrgb, F::Rgba8UnormSrgb]), F::Bgra8UnormSrgb);
    }

    #[test]
    fn test_present_mode() {
        use wgpu::PresentMode as P;
        assert_eq!(pick_present_mode(&[P::Mailbox, P::Fifo], true), P::Fifo);
        assert_eq!(pick_present_mode(&[P::Immediate, P::Mailbox, P::Fifo], false), P::Mailbox);
        assert_eq!(pick_present_mode(&[P::Immediate, P::Fifo], false), P::Immediate);
        assert_eq!(pick_present_mode(&[P::Fifo], false), P::Fifo);
    }

    #[test]
    fn test_target_error_carries_reason() {
        let err = RenderContextError::TargetAllocation("8192x8192 exceeds 4096".into());
        assert!(err.to_string().contains("exceeds 4096"));
    }
}
