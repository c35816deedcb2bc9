//! Which visual pieces of a body draw in which pass.

use glam::DAffine3;

use crate::body::BodyNode;
use crate::lod::{crossfade_alpha, hidden_by_parent};
use crate::picking::id_to_color;
use crate::settings::RenderSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Opaque,
    Translucent,
    Picking,
    LightSource,
}

/// How a piece is shaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// The piece's regular look (texture or body color) at `alpha`.
    Standard { alpha: f32 },
    /// A flat color, no texture, no blending.
    Solid([f32; 3]),
}

impl Shading {
    pub const OPAQUE: Shading = Shading::Standard { alpha: 1.0 };
    pub const BLACK: Shading = Shading::Solid([0.0, 0.0, 0.0]);
}

/// Receives draw requests from [`BodyNode::render`].
///
/// Implementors own the actual geometry; frames are in world space.
pub trait RenderVisitor {
    fn axis(&mut self, body: &BodyNode, frame: &DAffine3, length: f64);
    fn sphere(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading);
    fn ring(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading);
    fn orbit(&mut self, body: &BodyNode, frame: &DAffine3, alpha: f32);
    fn point(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading);
    fn label(&mut self, body: &BodyNode, frame: &DAffine3, shading: Shading);
}

impl BodyNode {
    /// Emit this body's draws for one pass.
    pub fn render<V: RenderVisitor + ?Sized>(
        &self,
        mode: RenderMode,
        settings: &RenderSettings,
        visitor: &mut V,
    ) {
        let threshold = settings.point_size_threshold;
        let screen = self.screen();
        if hidden_by_parent(screen.distance_to_parent, threshold) {
            return;
        }
        let large = screen.radius as f32 > threshold;
        let frames = self.frames();

        match mode {
            RenderMode::Opaque => {
                if settings.show_axis {
                    visitor.axis(self, &frames.laplace, 2.0 * self.radius());
                }
                if large {
                    visitor.sphere(self, &frames.reference, Shading::OPAQUE);
                }
            }
            RenderMode::Translucent => {
                if large {
                    if settings.show_orbits && self.orbit().is_some() {
                        visitor.orbit(self, &frames.orbit, 1.0);
                    }
                    if self.has_ring() {
                        visitor.ring(self, &frames.reference, Shading::OPAQUE);
                    }
                } else {
                    let alpha = crossfade_alpha(screen.distance_to_parent, threshold);
                    visitor.point(self, &frames.reference, Shading::Standard { alpha });
                    if settings.show_orbits && self.orbit().is_some() {
                        visitor.orbit(self, &frames.orbit, alpha);
                    }
                    visitor.label(self, &frames.reference, Shading::Standard { alpha });
                }
            }
            RenderMode::Picking => {
                let id = Shading::Solid(id_to_color(self.id()));
                if large {
                    visitor.sphere(self, &frames.reference, id);
                } else {
                    visitor.point(self, &frames.reference, id);
                    visitor.label(self, &frames.reference, id);
                }
            }
            RenderMode::LightSource => {
                if self.is_light_source() {
                    visitor.sphere(self, &frames.reference, Shading::OPAQUE);
                } else if screen.radius > 0 {
                    visitor.sphere(self, &frames.reference, Shading::BLACK);
                }
                if self.has_ring() {
                    visitor.ring(self, &frames.reference, Shading::BLACK);
                }
            }
        }
    }
}
