//! Per-frame orchestration: LOD metrics, starfield, opaque and translucent
//! body passes, bloom, antialiasing, composite and picking.

use std::path::PathBuf;

use glam::{DAffine3, DVec3};
use orrery_config::{AntiAliasingMode, RenderConfig};
use orrery_scene::{
    BodyIndex, BodyTree, RenderMode, RenderSettings, draw_all, draw_scene, sort_near_to_far,
};

use crate::camera::Camera;
use crate::draw::{DrawList, GpuVisitor, PassView, SceneResources};
use crate::gpu::RenderContextError;
use crate::picking::{PickError, PickTarget};
use crate::pipeline::{BodyLayouts, BodyPipelines};
use crate::post::PostProcessor;
use crate::starfield::{Starfield, StarfieldGenerator};
use crate::targets::{ColorTarget, OFFSCREEN_FORMAT, RenderTargets, SceneTarget};

/// Mutable per-frame render state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub antialiasing: AntiAliasingMode,
    /// Horizontal+vertical blur rounds; 0 disables bloom.
    pub blur_passes: u32,
    pub render: RenderSettings,
}

impl FrameSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            antialiasing: config.antialiasing,
            blur_passes: config.blur_passes,
            render: RenderSettings {
                show_axis: config.show_axis,
                show_orbits: config.show_orbits,
                point_size_threshold: config.point_size_threshold
                    * config.antialiasing.size_coefficient(config.supersample_factor),
            },
        }
    }
}

/// Owns every GPU resource needed to draw the body tree.
pub struct ScenePipeline {
    supersample_factor: u32,
    layouts: BodyLayouts,
    single: BodyPipelines,
    multisampled: BodyPipelines,
    resources: SceneResources,
    post: PostProcessor,
    targets: RenderTargets,
    starfield: Starfield,
    star_frame: DAffine3,
    light_draws: DrawList,
    scene_draws: DrawList,
    pick_draws: DrawList,
    pick: PickTarget,
}

impl ScenePipeline {
    /// `surface_format` is the format of the view passed to [`Self::render`].
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &RenderConfig,
        texture_root: impl Into<PathBuf>,
    ) -> Result<Self, RenderContextError> {
        let post = PostProcessor::new(device, surface_format);
        let targets = RenderTargets::new(
            device,
            post.texture_layout(),
            post.sampler(),
            width,
            height,
            config,
        )?;
        let layouts = BodyLayouts::new(device);
        let single = BodyPipelines::new(device, &layouts, OFFSCREEN_FORMAT, 1);
        let multisampled =
            BodyPipelines::new(device, &layouts, OFFSCREEN_FORMAT, targets.msaa_samples());
        let stars = StarfieldGenerator::new(config.star_seed, config.star_count).generate();
        let starfield = Starfield::new(device, OFFSCREEN_FORMAT, targets.msaa_samples(), &stars);
        log::info!(
            "Scene pipeline ready ({width}x{height}, {} stars)",
            starfield.star_count()
        );

        Ok(Self {
            supersample_factor: config.supersample_factor.max(1),
            light_draws: DrawList::new(device, &layouts, "light-draws"),
            scene_draws: DrawList::new(device, &layouts, "scene-draws"),
            pick_draws: DrawList::new(device, &layouts, "pick-draws"),
            resources: SceneResources::new(device, texture_root),
            pick: PickTarget::new(device),
            star_frame: DAffine3::IDENTITY,
            layouts,
            single,
            multisampled,
            post,
            targets,
            starfield,
        })
    }

    /// Upload meshes, textures and trails for the bodies of `tree`.
    pub fn add_bodies(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, tree: &BodyTree) {
        self.resources.add_bodies(device, queue, &self.layouts, tree);
    }

    /// Frame the star catalog is drawn in.
    pub fn set_star_frame(&mut self, frame: DAffine3) {
        self.star_frame = frame;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.targets.width(), self.targets.height())
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Reallocate the offscreen targets. Failure is fatal for rendering.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), RenderContextError> {
        self.targets.resize(
            device,
            self.post.texture_layout(),
            self.post.sampler(),
            width,
            height,
        )?;
        log::debug!("Scene pipeline resized to {width}x{height}");
        Ok(())
    }

    /// Draw one frame of `tree` as seen by `camera` into `surface_view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        tree: &mut BodyTree,
        camera: &Camera,
        frame: &FrameSettings,
        surface_view: &wgpu::TextureView,
    ) {
        let mode = frame.antialiasing;
        let coefficient = mode.size_coefficient(self.supersample_factor);
        let (target_width, target_height) = self.targets.scene_target(mode).color.size();

        tree.update_screen_metrics(camera.position(), camera.vertical_fov(), target_height as f64);
        let light = light_position(tree);
        let order = sort_near_to_far(tree, camera.position());
        self.resources.upload_trails(queue, tree);

        let bloom = frame.blur_passes > 0;
        self.light_draws.clear();
        if bloom {
            let (w, h) = self.targets.bloom_size();
            let view = PassView::new(camera, light, [w as f32, h as f32], 1.0);
            let mut visitor = GpuVisitor::new(&view, &self.resources, &mut self.light_draws);
            draw_all(tree, RenderMode::LightSource, &frame.render, &mut visitor);
        }
        self.light_draws.upload(device, queue, &self.layouts);

        self.scene_draws.clear();
        let view = PassView::new(
            camera,
            light,
            [target_width as f32, target_height as f32],
            coefficient,
        );
        {
            let mut visitor = GpuVisitor::new(&view, &self.resources, &mut self.scene_draws);
            draw_scene(tree, &order, &frame.render, &mut visitor);
        }
        self.scene_draws.upload(device, queue, &self.layouts);
        self.starfield.prepare(
            queue,
            &view.view,
            &view.projection,
            &self.star_frame,
            view.viewport,
            coefficient,
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene-frame"),
        });

        if bloom {
            self.body_pass(
                &mut encoder,
                self.targets.bloom_target(),
                false,
                &self.light_draws,
                "light-pass",
            );
            self.post.blur(&mut encoder, &self.targets.bloom, frame.blur_passes);
        }

        self.body_pass(
            &mut encoder,
            self.targets.scene_target(mode),
            true,
            &self.scene_draws,
            "scene-pass",
        );

        let resolved: &ColorTarget = match mode {
            AntiAliasingMode::Ssaa => {
                self.post
                    .downsample(&mut encoder, &self.targets.ssaa, &self.targets.simple);
                &self.targets.simple
            }
            AntiAliasingMode::Fxaa => {
                self.post
                    .fxaa(&mut encoder, &self.targets.simple, &self.targets.simple2);
                &self.targets.simple2
            }
            AntiAliasingMode::None | AntiAliasingMode::Msaa => &self.targets.simple,
        };
        self.post.composite(
            &mut encoder,
            resolved,
            bloom.then_some(&self.targets.bloom[0]),
            surface_view,
        );

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Render the picking pass and decode the body under `position`, in
    /// viewport pixels. A miss is `Ok(None)`.
    pub fn pick(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        tree: &mut BodyTree,
        camera: &Camera,
        frame: &FrameSettings,
        position: (u32, u32),
    ) -> Result<Option<BodyIndex>, PickError> {
        let (x, y) = position;
        let (width, height) = self.size();
        // The picking target is viewport-sized even under supersampling.
        let coefficient = frame.antialiasing.size_coefficient(self.supersample_factor);
        let settings = RenderSettings {
            point_size_threshold: frame.render.point_size_threshold / coefficient,
            ..frame.render
        };
        tree.update_screen_metrics(camera.position(), camera.vertical_fov(), height as f64);

        self.pick_draws.clear();
        let view = PassView::new(camera, light_position(tree), [width as f32, height as f32], 1.0);
        {
            let mut visitor = GpuVisitor::new(&view, &self.resources, &mut self.pick_draws);
            draw_all(tree, RenderMode::Picking, &settings, &mut visitor);
        }
        self.pick_draws.upload(device, queue, &self.layouts);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pick-frame"),
        });
        self.body_pass(
            &mut encoder,
            self.targets.picking_target(),
            false,
            &self.pick_draws,
            "pick-pass",
        );
        queue.submit(std::iter::once(encoder.finish()));

        let hit = self
            .pick
            .read(device, queue, &self.targets.simple, x, y)?
            .and_then(|id| tree.by_id(id));
        match hit {
            Some(index) => log::debug!("Picked '{}' at ({x}, {y})", tree[index].name()),
            None => log::debug!("Pick at ({x}, {y}) hit nothing"),
        }
        Ok(hit)
    }

    fn body_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: SceneTarget<'_>,
        with_stars: bool,
        draws: &DrawList,
        label: &str,
    ) {
        let sample_count = target.color.sample_count();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color.view,
                resolve_target: target.resolve.map(|t| &t.view),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(target.depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        if with_stars {
            self.starfield.draw(&mut pass, sample_count);
        }
        let pipelines = if sample_count > 1 {
            &self.multisampled
        } else {
            &self.single
        };
        draws.record(&mut pass, pipelines, &self.resources);
    }
}

fn light_position(tree: &BodyTree) -> DVec3 {
    tree.root().map_or(DVec3::ZERO, |root| tree[root].center())
}
