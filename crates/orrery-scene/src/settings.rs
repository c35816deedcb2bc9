/// Display toggles consulted while dispatching body draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub show_axis: bool,
    pub show_orbits: bool,
    /// On-screen radius (pixels) above which a body is drawn as a sphere
    /// instead of a point.
    pub point_size_threshold: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            show_axis: false,
            show_orbits: true,
            point_size_threshold: 10.0,
        }
    }
}
