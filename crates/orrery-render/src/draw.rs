//! GPU side of the body draw dispatch.
//!
//! [`GpuVisitor`] turns [`RenderVisitor`] calls into [`DrawCommand`]s with a
//! per-draw [`DrawUniform`]; a [`DrawList`] uploads the uniforms and records
//! the commands into a render pass.

use std::path::PathBuf;

use glam::{DAffine3, DMat4, DVec3, Mat4};
use orrery_orbit::RelativeToEye;
use orrery_scene::{BodyId, BodyNode, BodyTree, RenderVisitor, Shading};
use rustc_hash::FxHashMap;

use crate::buffer::{self, GpuMesh};
use crate::camera::Camera;
use crate::depth::{LOG_DEPTH_C, log_z_buffer_c};
use crate::mesh::{self, RING_SLICES, SPHERE_SUBDIVISIONS};
use crate::pipeline::{BodyLayouts, BodyPipelines, DrawUniform, Piece, UNIFORM_STRIDE};
use crate::textures::{BodyTexture, TextureLibrary};

/// Diameter of a body's point marker, in pixels before supersampling.
pub const POINT_SIZE: f32 = 5.0;
/// Label tag height and per-character width, in pixels.
pub const LABEL_HEIGHT: f32 = 10.0;
pub const LABEL_CHAR_WIDTH: f32 = 6.0;
const LABEL_GAP: f32 = 4.0;

/// Orbit trail buffers; vertices are rewritten every frame.
pub struct TrailBuffers {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
    vertex_count: usize,
}

/// Everything the GPU needs to draw one body.
pub struct BodyResources {
    pub sphere: GpuMesh,
    pub surface: wgpu::BindGroup,
    pub has_night: bool,
    pub ring: Option<(GpuMesh, wgpu::BindGroup)>,
    pub trail: Option<TrailBuffers>,
}

/// Per-body meshes, textures and trails plus the shared axis lines.
pub struct SceneResources {
    textures: TextureLibrary,
    bodies: FxHashMap<BodyId, BodyResources>,
    axis: wgpu::Buffer,
}

impl SceneResources {
    pub fn new(device: &wgpu::Device, texture_root: impl Into<PathBuf>) -> Self {
        let axis = buffer::vertex_buffer(device, "axis-lines", &mesh::axis_lines());
        Self {
            textures: TextureLibrary::new(device, texture_root),
            bodies: FxHashMap::default(),
            axis,
        }
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyResources> {
        self.bodies.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn axis(&self) -> &wgpu::Buffer {
        &self.axis
    }

    /// Build meshes and load textures for every body not seen before.
    pub fn add_bodies(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BodyLayouts,
        tree: &BodyTree,
    ) {
        for (_, body) in tree.iter() {
            if self.bodies.contains_key(&body.id()) {
                continue;
            }
            let resources = self.create_body(device, queue, layouts, body);
            self.bodies.insert(body.id(), resources);
        }
        log::info!(
            "Uploaded {} bodies ({} textures)",
            self.bodies.len(),
            self.textures.len()
        );
    }

    fn create_body(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BodyLayouts,
        body: &BodyNode,
    ) -> BodyResources {
        let params = body.params();

        let geometry = mesh::sphere(
            params.radius as f32,
            params.flattening as f32,
            SPHERE_SUBDIVISIONS,
        );
        let sphere = GpuMesh::upload(device, body.name(), &geometry);

        let day = self
            .textures
            .load_or_solid(device, queue, params.texture.as_deref(), body.color());
        let night = params
            .night_texture
            .as_deref()
            .and_then(|name| match self.textures.load(device, queue, name) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("{e}; drawing '{}' without a night side", body.name());
                    None
                }
            });
        let has_night = night.is_some();
        let surface = self.texture_bind_group(device, layouts, &day, night.as_deref().unwrap_or(&day));

        let ring = params.ring.as_ref().map(|ring| {
            let geometry = mesh::ring(
                ring.inner_radius as f32,
                ring.outer_radius as f32,
                RING_SLICES,
            );
            let mesh = GpuMesh::upload(device, &format!("{}-ring", body.name()), &geometry);
            let texture =
                self.textures
                    .load_or_solid(device, queue, Some(&ring.texture), body.color());
            let bind_group = self.texture_bind_group(device, layouts, &texture, &texture);
            (mesh, bind_group)
        });

        let trail = body.orbit().map(|orbit| {
            let vertices = orbit.vertices();
            let indices = mesh::trail_indices(vertices.len());
            TrailBuffers {
                vertices: buffer::vertex_buffer(device, &format!("{}-trail", body.name()), vertices),
                indices: buffer::index_buffer(device, &format!("{}-trail", body.name()), &indices),
                index_count: indices.len() as u32,
                vertex_count: vertices.len(),
            }
        });

        BodyResources {
            sphere,
            surface,
            has_night,
            ring,
            trail,
        }
    }

    fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        layouts: &BodyLayouts,
        day: &BodyTexture,
        night: &BodyTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("body-textures"),
            layout: &layouts.textures,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&day.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&night.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(self.textures.sampler()),
                },
            ],
        })
    }

    /// Copy every body's current trail into its vertex buffer.
    pub fn upload_trails(&self, queue: &wgpu::Queue, tree: &BodyTree) {
        for (_, body) in tree.iter() {
            let (Some(orbit), Some(resources)) = (body.orbit(), self.bodies.get(&body.id())) else {
                continue;
            };
            let Some(trail) = &resources.trail else {
                continue;
            };
            let vertices = orbit.vertices();
            if vertices.len() != trail.vertex_count {
                log::warn!("trail of '{}' changed length, skipping upload", body.name());
                continue;
            }
            queue.write_buffer(&trail.vertices, 0, bytemuck::cast_slice(vertices));
        }
    }
}

/// What a command binds besides its uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    Sphere(BodyId),
    Ring(BodyId),
    Trail(BodyId),
    Axis,
    Billboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub piece: Piece,
    pub target: DrawTarget,
}

/// Commands for one pass and the dynamic-offset uniform buffer they index.
pub struct DrawList {
    label: &'static str,
    commands: Vec<DrawCommand>,
    uniforms: Vec<DrawUniform>,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

impl DrawList {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device, layouts: &BodyLayouts, label: &'static str) -> Self {
        let (buffer, bind_group) = create_uniform_buffer(device, layouts, label, Self::INITIAL_CAPACITY);
        Self {
            label,
            commands: Vec::new(),
            uniforms: Vec::new(),
            buffer,
            bind_group,
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.uniforms.clear();
    }

    pub fn push(&mut self, piece: Piece, target: DrawTarget, uniform: DrawUniform) {
        self.commands.push(DrawCommand { piece, target });
        self.uniforms.push(uniform);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn uniforms(&self) -> &[DrawUniform] {
        &self.uniforms
    }

    /// Write the uniforms, growing the buffer when needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layouts: &BodyLayouts) {
        if self.uniforms.len() > self.capacity {
            self.capacity = self.uniforms.len().next_power_of_two();
            let (buffer, bind_group) = create_uniform_buffer(device, layouts, self.label, self.capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            log::debug!("{} uniform buffer grown to {} draws", self.label, self.capacity);
        }
        if !self.uniforms.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.uniforms));
        }
    }

    /// Record every command into `pass`. Bodies without resources are skipped.
    pub fn record(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &BodyPipelines,
        resources: &SceneResources,
    ) {
        for (i, command) in self.commands.iter().enumerate() {
            let offset = (i as wgpu::BufferAddress * UNIFORM_STRIDE) as u32;
            pass.set_pipeline(pipelines.get(command.piece));
            pass.set_bind_group(0, &self.bind_group, &[offset]);
            match command.target {
                DrawTarget::Sphere(id) => {
                    let Some(body) = resources.get(id) else { continue };
                    pass.set_bind_group(1, &body.surface, &[]);
                    body.sphere.draw(pass);
                }
                DrawTarget::Ring(id) => {
                    let Some((mesh, textures)) = resources.get(id).and_then(|b| b.ring.as_ref())
                    else {
                        continue;
                    };
                    pass.set_bind_group(1, textures, &[]);
                    mesh.draw(pass);
                }
                DrawTarget::Trail(id) => {
                    let Some(trail) = resources.get(id).and_then(|b| b.trail.as_ref()) else {
                        continue;
                    };
                    pass.set_vertex_buffer(0, trail.vertices.slice(..));
                    pass.set_index_buffer(trail.indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..trail.index_count, 0, 0..1);
                }
                DrawTarget::Axis => {
                    pass.set_vertex_buffer(0, resources.axis().slice(..));
                    pass.draw(0..6, 0..1);
                }
                DrawTarget::Billboard => pass.draw(0..6, 0..1),
            }
        }
    }
}

fn create_uniform_buffer(
    device: &wgpu::Device,
    layouts: &BodyLayouts,
    label: &str,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: capacity as wgpu::BufferAddress * UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &layouts.uniform,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(UNIFORM_STRIDE),
            }),
        }],
    });
    (buffer, bind_group)
}

/// View parameters shared by every draw of a pass.
#[derive(Debug, Clone, Copy)]
pub struct PassView {
    pub view: DAffine3,
    pub projection: DMat4,
    /// World-space light position (the root body's center).
    pub light: DVec3,
    /// Target size in pixels.
    pub viewport: [f32; 2],
    /// Point and label scale; 2 under supersampling.
    pub point_coefficient: f32,
}

impl PassView {
    pub fn new(camera: &Camera, light: DVec3, viewport: [f32; 2], point_coefficient: f32) -> Self {
        Self {
            view: camera.model_view(),
            projection: camera.projection(),
            light,
            viewport,
            point_coefficient,
        }
    }

    fn base_uniform(&self, model: &DAffine3) -> DrawUniform {
        let light = self.view.transform_point3(self.light).as_vec3();
        DrawUniform {
            model_view: to_mat4(self.view * *model).to_cols_array_2d(),
            projection: self.projection.as_mat4().to_cols_array_2d(),
            light_position: [light.x, light.y, light.z, 1.0],
            depth: [log_z_buffer_c(), LOG_DEPTH_C, 0.0, 0.0],
            viewport: [self.viewport[0], self.viewport[1], 0.0, 0.0],
            ..DrawUniform::default()
        }
    }
}

fn to_mat4(affine: DAffine3) -> Mat4 {
    DMat4::from(affine).as_mat4()
}

fn apply_shading(uniform: &mut DrawUniform, body: &BodyNode, shading: Shading) {
    match shading {
        Shading::Standard { alpha } => {
            let [r, g, b] = body.color();
            uniform.color = [r, g, b, alpha];
        }
        Shading::Solid([r, g, b]) => {
            uniform.color = [r, g, b, 1.0];
            uniform.depth[2] = 1.0;
        }
    }
}

/// Collects the draws of one pass into a [`DrawList`].
pub struct GpuVisitor<'a> {
    pub view: &'a PassView,
    pub resources: &'a SceneResources,
    pub list: &'a mut DrawList,
}

impl<'a> GpuVisitor<'a> {
    pub fn new(view: &'a PassView, resources: &'a SceneResources, list: &'a mut DrawList) -> Self {
        Self {
            view,
            resources,
            list,
        }
    }

    fn billboard(
        &mut self,
        body: &BodyNode,
        frame: &DAffine3,
        shading: Shading,
        size: [f32; 2],
        offset: f32,
        rectangle: bool,
    ) {
        let mut uniform = self.view.base_uniform(frame);
        apply_shading(&mut uniform, body, shading);
        uniform.billboard = [size[0], size[1], offset, if rectangle { 1.0 } else { 0.0 }];
        let piece = match shading {
            Shading::Standard { .. } => Piece::Billboard,
            Shading::Solid(_) => Piece::BillboardSolid,
        };
        self.list.push(piece, DrawTarget::Billboard, uniform);
    }
}

/// Pixel width of a body's label tag.
pub fn label_width(name: &str) -> f32 {
    name.chars().count() as f32 * LABEL_CHAR_WIDTH
}

impl RenderVisitor for GpuVisitor<'_> {
    fn axis(&mut self, _body: &BodyNode, frame: &DAffine3, length: f64) {
        let scaled = *frame * DAffine3::from_scale(DVec3::splat(length));
        let mut uniform = self.view.base_uniform(&scaled);
        uniform.color = [1.0, 1.0, 1.0, 1.0];
        self.list.push(Piece::Axis, DrawTarget::Axis, uniform);
    }

    fn sphere(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading) {
        let mut uniform = self.view.base_uniform(frame);
        apply_shading(&mut uniform, body, shading);
        if body.is_light_source() {
            uniform.depth[3] = 1.0;
        }
        let has_night = self
            .resources
            .get(body.id())
            .is_some_and(|resources| resources.has_night);
        uniform.material[0] = if has_night { 1.0 } else { 0.0 };
        self.list
            .push(Piece::Sphere, DrawTarget::Sphere(body.id()), uniform);
    }

    fn ring(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading) {
        let mut uniform = self.view.base_uniform(frame);
        apply_shading(&mut uniform, body, shading);
        let piece = match shading {
            Shading::Standard { .. } => Piece::Ring,
            Shading::Solid(_) => Piece::RingSolid,
        };
        self.list.push(piece, DrawTarget::Ring(body.id()), uniform);
    }

    fn orbit(&mut self, body: &BodyNode, frame: &DAffine3, alpha: f32) {
        let rte = RelativeToEye::from_model_view(self.view.view * *frame);
        let mut uniform = self.view.base_uniform(frame);
        uniform.model_view = rte.rotation.to_cols_array_2d();
        uniform.eye_high = [rte.eye_high[0], rte.eye_high[1], rte.eye_high[2], 0.0];
        uniform.eye_low = [rte.eye_low[0], rte.eye_low[1], rte.eye_low[2], 0.0];
        let [r, g, b] = body.color();
        uniform.color = [r, g, b, alpha];
        self.list
            .push(Piece::Trail, DrawTarget::Trail(body.id()), uniform);
    }

    fn point(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading) {
        let size = POINT_SIZE * self.view.point_coefficient;
        self.billboard(body, frame, shading, [size, size], 0.0, false);
    }

    fn label(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading) {
        let k = self.view.point_coefficient;
        let width = label_width(body.name()) * k;
        let offset = (POINT_SIZE * 0.5 + LABEL_GAP) * k + width * 0.5;
        self.billboard(body, frame, shading, [width, LABEL_HEIGHT * k], offset, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;
    use orrery_scene::{BodyCatalog, BodyRecord, RenderMode, RenderSettings, draw_all, id_to_color};

    fn tree() -> BodyTree {
        let mut c = BodyCatalog::new();
        c.insert(
            "sun",
            BodyRecord {
                radius: Some(700.0),
                light_source: Some(true),
                satellites: Some("ringed".into()),
                ..Default::default()
            },
        );
        c.insert(
            "ringed",
            BodyRecord {
                radius: Some(60.0),
                ring_texture: Some("rings.png".into()),
                inner_radius: Some(70.0),
                outer_radius: Some(140.0),
                semi_major_axis: Some(10_000.0),
                sidereal_revolution: Some(100.0),
                color: Some(vec![0.2, 0.4, 0.6]),
                ..Default::default()
            },
        );
        let mut tree = BodyTree::build_with_samples(&c, "sun", 16).unwrap();
        tree.set_time(DAffine3::IDENTITY, 0.0);
        tree
    }

    fn pass_view() -> PassView {
        let mut camera = Camera::new();
        camera.set_position(DVec3::new(0.0, 0.0, 50_000.0));
        camera.set_up_vector(DVec3::Y);
        camera.look_at(DVec3::ZERO);
        PassView::new(&camera, DVec3::ZERO, [800.0, 600.0], 2.0)
    }

    #[test]
    fn test_label_width_counts_characters() {
        assert_eq!(label_width("io"), 2.0 * LABEL_CHAR_WIDTH);
        assert_eq!(label_width("ceres"), 5.0 * LABEL_CHAR_WIDTH);
    }

    #[test]
    fn test_solid_shading_sets_flag_and_color() {
        let tree = tree();
        let ringed = &tree[tree.find("ringed").unwrap()];
        let view = pass_view();
        let mut uniform = view.base_uniform(&DAffine3::IDENTITY);
        apply_shading(&mut uniform, ringed, Shading::Solid([0.1, 0.2, 0.3]));
        assert_eq!(uniform.color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(uniform.depth[2], 1.0);

        let mut uniform = view.base_uniform(&DAffine3::IDENTITY);
        apply_shading(&mut uniform, ringed, Shading::Standard { alpha: 0.5 });
        assert_eq!(uniform.color, [0.2, 0.4, 0.6, 0.5]);
        assert_eq!(uniform.depth[2], 0.0);
    }

    #[test]
    fn test_light_position_is_in_eye_space() {
        let view = pass_view();
        let uniform = view.base_uniform(&DAffine3::IDENTITY);
        // The camera looks at the origin from 50 000 units away.
        assert!((uniform.light_position[2] + 50_000.0).abs() < 1.0);
        assert!(uniform.light_position[0].abs() < 1e-3);
    }

    #[test]
    fn test_visitor_builds_pieces_per_mode() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let tree = tree();
        let layouts = BodyLayouts::new(&device);
        let dir = tempfile::tempdir().unwrap();
        let mut resources = SceneResources::new(&device, dir.path());
        resources.add_bodies(&device, &queue, &layouts, &tree);
        assert_eq!(resources.len(), 2);
        let ringed_id = tree[tree.find("ringed").unwrap()].id();
        assert!(resources.get(ringed_id).unwrap().ring.is_some());
        assert!(resources.get(ringed_id).unwrap().trail.is_some());

        let view = pass_view();
        let mut list = DrawList::new(&device, &layouts, "test-draws");
        let ringed = &tree[tree.find("ringed").unwrap()];
        {
            let mut visitor = GpuVisitor::new(&view, &resources, &mut list);
            visitor.point(ringed, &DAffine3::IDENTITY, Shading::Solid(id_to_color(ringed_id)));
            visitor.ring(ringed, &DAffine3::IDENTITY, Shading::BLACK);
            visitor.orbit(ringed, &DAffine3::IDENTITY, 0.5);
        }
        let pieces: Vec<_> = list.commands().iter().map(|c| c.piece).collect();
        assert_eq!(pieces, [Piece::BillboardSolid, Piece::RingSolid, Piece::Trail]);
        assert_eq!(list.uniforms()[0].billboard[0], POINT_SIZE * 2.0);
        assert_eq!(list.uniforms()[2].color[3], 0.5);

        list.clear();
        {
            let mut visitor = GpuVisitor::new(&view, &resources, &mut list);
            draw_all(&tree, RenderMode::Picking, &RenderSettings::default(), &mut visitor);
        }
        assert!(!list.is_empty());
        assert!(list.uniforms().iter().all(|u| u.depth[2] == 1.0));
        list.upload(&device, &queue, &layouts);
        resources.upload_trails(&queue, &tree);
    }

    #[test]
    fn test_draw_list_grows_uniform_buffer() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let layouts = BodyLayouts::new(&device);
        let mut list = DrawList::new(&device, &layouts, "grow");
        for _ in 0..100 {
            list.push(Piece::Billboard, DrawTarget::Billboard, DrawUniform::default());
        }
        list.upload(&device, &queue, &layouts);
        assert_eq!(list.capacity, 128);
        assert_eq!(list.len(), 100);
    }
}
