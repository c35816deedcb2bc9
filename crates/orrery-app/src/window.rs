//! Window creation, event handling and the frame loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use orrery_config::Config;
use orrery_render::{RenderContext, ScenePipeline, SurfaceError, init_render_context_blocking};
use orrery_scene::BodyTree;
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::input::{Intent, PointerState, key_intent};
use crate::timeline::Timeline;
use crate::viewer::{Viewer, WindowRequest};

/// Title and logical size from the config; fullscreen means borderless on
/// the current monitor.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

/// Application state: the window, GPU objects, the scene viewer and the clock.
pub struct AppState {
    pub config: Config,
    pub window: Option<Arc<Window>>,
    pub gpu: Option<RenderContext>,
    pub pipeline: Option<ScenePipeline>,
    pub viewer: Viewer,
    pub timeline: Timeline,
    pub pointer: PointerState,
    /// Directory body texture names are resolved against.
    pub texture_root: PathBuf,
    pub frame_count: u64,
}

impl AppState {
    /// Hand `tree` to a new viewer and start the clock at real time.
    pub fn new(config: Config, tree: BodyTree, texture_root: PathBuf) -> Self {
        let viewer = Viewer::new(&config);
        let timeline = Timeline::new(&config.timeline);
        viewer.add_bodies(tree, &config.scene.frame_body, timeline.current_time());
        Self {
            viewer,
            timeline,
            pointer: PointerState::new(),
            texture_root,
            window: None,
            gpu: None,
            pipeline: None,
            frame_count: 0,
            config,
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        match &self.gpu {
            Some(gpu) => gpu.size(),
            None => (self.config.window.width, self.config.window.height),
        }
    }

    fn initialize_rendering(&mut self, gpu: &RenderContext) -> bool {
        let (width, height) = gpu.size();
        let mut pipeline = match ScenePipeline::new(
            &gpu.device,
            gpu.surface_format,
            width,
            height,
            &self.config.render,
            self.texture_root.clone(),
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!("Render target allocation failed: {e}");
                return false;
            }
        };
        self.viewer.with_scene(|tree, _, _| {
            pipeline.add_bodies(&gpu.device, &gpu.queue, tree);
        });
        pipeline.set_star_frame(self.viewer.star_frame());
        self.viewer.set_viewport(width, height);
        self.pipeline = Some(pipeline);
        true
    }

    fn handle_intent(&mut self, event_loop: &ActiveEventLoop, intent: Intent) {
        match self.viewer.apply(intent, &mut self.timeline) {
            WindowRequest::None => {}
            WindowRequest::Close => {
                info!("Quit requested");
                event_loop.exit();
            }
            WindowRequest::ToggleFullscreen => {
                if let Some(window) = &self.window {
                    let fullscreen = match window.fullscreen() {
                        Some(_) => None,
                        None => Some(Fullscreen::Borderless(None)),
                    };
                    window.set_fullscreen(fullscreen);
                }
            }
        }
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
            if let Some(pipeline) = &mut self.pipeline
                && let Err(e) = pipeline.resize(&gpu.device, width, height)
            {
                error!("Render target reallocation failed: {e}");
                event_loop.exit();
                return;
            }
        }
        self.viewer.set_viewport(width, height);
        info!("Window resized to {}x{}", width, height);
    }

    /// Advance the clock and camera, draw, present, then service a pending pick.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let frame_time = self.timeline.update();
        self.viewer.animate(self.timeline.current_time());
        self.viewer.advance_camera(frame_time);

        let (Some(gpu), Some(pipeline)) = (&mut self.gpu, &mut self.pipeline) else {
            return;
        };
        match gpu.acquire_frame() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.viewer.with_scene(|tree, camera, frame| {
                    pipeline.render(&gpu.device, &gpu.queue, tree, camera, frame, &view);
                });
                surface_texture.present();
                self.frame_count += 1;

                if let Some(position) = self.viewer.take_pick() {
                    let result = self.viewer.with_scene(|tree, camera, frame| {
                        pipeline.pick(&gpu.device, &gpu.queue, tree, camera, frame, position)
                    });
                    match result {
                        Ok(hit) => self.viewer.finish_pick(hit),
                        Err(e) => warn!("Pick at {position:?} failed: {e}"),
                    }
                }

                if self.frame_count.is_multiple_of(600) {
                    debug!(
                        "t={:.0}s rate={} selection={:?} altitude={:.0}m",
                        self.timeline.current_time(),
                        self.timeline.rate(),
                        self.viewer.selection(),
                        self.viewer.distance_to_ground(),
                    );
                }
            }
            Err(SurfaceError::Lost) => {
                let (width, height) = gpu.size();
                gpu.resize(width, height);
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU out of memory, quitting");
                event_loop.exit();
            }
            Err(SurfaceError::Timeout) => {
                debug!("Frame acquisition timed out, skipped");
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = Arc::new(
            event_loop
                .create_window(window_attributes_from_config(&self.config))
                .expect("window creation failed"),
        );
        let ctx = match init_render_context_blocking(Arc::clone(&window), self.config.window.vsync) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("Cannot start rendering: {e}");
                event_loop.exit();
                return;
            }
        };
        if !self.initialize_rendering(&ctx) {
            event_loop.exit();
            return;
        }
        self.gpu = Some(ctx);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let intent = match event {
            WindowEvent::CloseRequested => {
                info!("Window closed after {} frames", self.frame_count);
                event_loop.exit();
                None
            }
            WindowEvent::Resized(new_size) => {
                self.resize(event_loop, new_size.width, new_size.height);
                None
            }
            WindowEvent::KeyboardInput { event, .. } => {
                key_intent(&event.logical_key, event.state, event.repeat)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer.on_cursor_moved(position.x, position.y)
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer.on_button(button, state, Instant::now())
            }
            WindowEvent::MouseWheel { delta, .. } => self.pointer.on_scroll(delta),
            WindowEvent::Touch(touch) => self.pointer.on_touch(
                touch.id,
                touch.location.x,
                touch.location.y,
                touch.phase,
            ),
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                None
            }
            _ => None,
        };
        if let Some(intent) = intent {
            self.handle_intent(event_loop, intent);
        }
    }
}

/// Blocks until the viewer window closes.
#[instrument(skip_all)]
pub fn run(config: Config, tree: BodyTree, texture_root: PathBuf) {
    let event_loop = EventLoop::new().expect("event loop creation failed");
    let mut app = AppState::new(config, tree, texture_root);
    event_loop.run_app(&mut app).expect("event loop terminated abnormally");
}
