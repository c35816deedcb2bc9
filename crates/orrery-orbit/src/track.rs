//! Orbit trail: a sampled closed polyline with a moving head vertex pair.

use bytemuck::{Pod, Zeroable};
use glam::{DQuat, DVec2, DVec3};

use crate::elements::OrbitalElements;
use crate::error::OrbitError;
use crate::split::split_vec3;

/// Samples taken around one revolution.
pub const DEFAULT_TRAIL_SAMPLES: usize = 360;

/// One vertex of the orbit trail, laid out for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TrailVertex {
    pub high: [f32; 3],
    pub low: [f32; 3],
    pub alpha: f32,
}

impl TrailVertex {
    /// Orbital-plane point (z = 0), split for relative-to-eye rendering.
    pub fn from_plane(position: DVec2) -> Self {
        let (high, low) = split_vec3(DVec3::new(position.x, position.y, 0.0));
        Self {
            high,
            low,
            alpha: 1.0,
        }
    }

    pub fn position(&self) -> DVec3 {
        DVec3::new(
            self.high[0] as f64 + self.low[0] as f64,
            self.high[1] as f64 + self.low[1] as f64,
            self.high[2] as f64 + self.low[2] as f64,
        )
    }
}

static_assertions::assert_eq_size!(TrailVertex, [f32; 7]);

/// Keplerian orbit plus its trail geometry.
///
/// The trail holds one vertex per time-table entry plus a duplicated pair at
/// the body's current position. The pair sits at the wrap point of the fade:
/// the first vertex of the pair is the brightest, the second is fully
/// transparent, so a closed line strip never blends head into tail.
#[derive(Debug, Clone)]
pub struct OrbitTrack {
    elements: OrbitalElements,
    orientation: DQuat,
    time_table: Vec<f64>,
    vertices: Vec<TrailVertex>,
    head: usize,
}

impl OrbitTrack {
    pub fn new(elements: OrbitalElements) -> Result<Self, OrbitError> {
        Self::with_samples(elements, DEFAULT_TRAIL_SAMPLES)
    }

    /// Build a track sampling `samples` evenly spaced instants over one period.
    pub fn with_samples(elements: OrbitalElements, samples: usize) -> Result<Self, OrbitError> {
        elements.validate()?;
        let samples = samples.max(1);
        let period = elements.revolution_period;

        // Placeholder head pair, replaced on the first set_body_position.
        let start = TrailVertex::from_plane(elements.position(0.0));
        let mut vertices = Vec::with_capacity(samples + 2);
        vertices.push(start);
        vertices.push(start);

        let mut time_table = Vec::with_capacity(samples);
        for i in 0..samples {
            let t = i as f64 / samples as f64 * period;
            vertices.push(TrailVertex::from_plane(elements.position(t)));
            time_table.push(t);
        }

        let mut track = Self {
            orientation: elements.orientation(),
            elements,
            time_table,
            vertices,
            head: 0,
        };
        track.set_body_position(track.position(0.0), 0.0);
        Ok(track)
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    /// Fixed rotation from the orbital plane into the parent frame.
    pub fn orientation(&self) -> DQuat {
        self.orientation
    }

    /// Orbital-plane position at `time`.
    pub fn position(&self, time: f64) -> DVec2 {
        self.elements.position(time)
    }

    pub fn try_position(&self, time: f64) -> Result<DVec2, OrbitError> {
        self.elements.try_position(time)
    }

    /// Move the trail head to `position`, observed at `time`, and recompute
    /// the fade.
    pub fn set_body_position(&mut self, position: DVec2, time: f64) {
        self.vertices.drain(self.head..self.head + 2);

        let phase = time.rem_euclid(self.elements.revolution_period);
        let index = self
            .time_table
            .iter()
            .position(|&t| t >= phase)
            .unwrap_or(self.time_table.len());

        let vertex = TrailVertex::from_plane(position);
        self.vertices.splice(index..index, [vertex, vertex]);
        self.head = index;

        let n = self.vertices.len();
        for i in 0..n {
            self.vertices[(i + index + 1) % n].alpha = i as f32 / n as f32;
        }
    }

    pub fn vertices(&self) -> &[TrailVertex] {
        &self.vertices
    }

    /// Sample instants within one period, ascending.
    pub fn time_table(&self) -> &[f64] {
        &self.time_table
    }

    /// Index of the brightest vertex of the head pair. The transparent twin
    /// follows at `head_index() + 1`.
    pub fn head_index(&self) -> usize {
        self.head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> OrbitalElements {
        OrbitalElements {
            semi_major_axis: 100.0,
            revolution_period: 360.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_trail_length_is_samples_plus_pair() {
        let track = OrbitTrack::with_samples(circle(), 36).unwrap();
        assert_eq!(track.time_table().len(), 36);
        assert_eq!(track.vertices().len(), 38);
    }

    #[test]
    fn test_invalid_elements_rejected() {
        let mut el = circle();
        el.eccentricity = 1.5;
        assert!(OrbitTrack::new(el).is_err());
    }

    #[test]
    fn test_time_table_spans_one_period() {
        let track = OrbitTrack::with_samples(circle(), 4).unwrap();
        assert_eq!(track.time_table(), &[0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn test_head_inserted_before_first_later_sample() {
        let mut track = OrbitTrack::with_samples(circle(), 4).unwrap();
        track.set_body_position(track.position(100.0), 100.0);
        // Samples 0 and 90 precede t=100, so the pair lands at index 2.
        assert_eq!(track.head_index(), 2);
        let head = track.vertices()[2].position();
        let expected = track.position(100.0);
        assert!((head.truncate() - expected).length() < 1e-3);
    }

    #[test]
    fn test_head_wraps_with_period() {
        let mut track = OrbitTrack::with_samples(circle(), 4).unwrap();
        track.set_body_position(track.position(100.0), 100.0 + 3.0 * 360.0);
        assert_eq!(track.head_index(), 2);
    }

    #[test]
    fn test_negative_time_uses_positive_phase() {
        let mut track = OrbitTrack::with_samples(circle(), 4).unwrap();
        track.set_body_position(track.position(-80.0), -80.0);
        // -80 is phase 280, after every sample.
        assert_eq!(track.head_index(), 4);
    }

    #[test]
    fn test_alpha_fades_from_twin_to_head() {
        let mut track = OrbitTrack::with_samples(circle(), 8).unwrap();
        track.set_body_position(track.position(200.0), 200.0);
        let n = track.vertices().len();
        let head = track.head_index();
        assert_eq!(track.vertices()[(head + 1) % n].alpha, 0.0);
        assert_eq!(track.vertices()[head].alpha, (n - 1) as f32 / n as f32);
        for step in 1..n {
            let prev = track.vertices()[(head + step) % n].alpha;
            let next = track.vertices()[(head + step + 1) % n].alpha;
            assert!(next > prev);
        }
    }

    #[test]
    fn test_repeated_updates_keep_length() {
        let mut track = OrbitTrack::with_samples(circle(), 12).unwrap();
        for t in [0.0, 10.0, 359.0, 720.5, 5.0, -1.0] {
            track.set_body_position(track.position(t), t);
            assert_eq!(track.vertices().len(), 14);
        }
    }
}
