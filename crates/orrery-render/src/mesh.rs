//! CPU-side geometry for bodies: spheroids, rings, axis lines and the
//! closed index loop for orbit trails.

use std::f32::consts::{PI, TAU};

use crate::buffer::{LineVertex, SurfaceVertex};

/// Longitude and latitude subdivisions of a body sphere.
pub const SPHERE_SUBDIVISIONS: u32 = 80;

/// Angular slices of a ring disc.
pub const RING_SLICES: u32 = 180;

/// Indexed triangle-list geometry.
#[derive(Debug, Clone, Default)]
pub struct Geometry<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

/// Oblate spheroid of equatorial `radius`, polar radius `radius·(1 − flattening)`.
///
/// Column `i` runs around the Z axis, row `j` from the north pole down.
/// Texture `u` follows longitude, `v` is 1 at the north pole.
pub fn sphere(radius: f32, flattening: f32, subdivisions: u32) -> Geometry<SurfaceVertex> {
    let n = subdivisions.max(2);
    let mut vertices = Vec::with_capacity(((n + 1) * (n + 1)) as usize);
    for i in 0..=n {
        let theta = i as f32 / n as f32 * TAU;
        for j in 0..=n {
            let phi = j as f32 / n as f32 * PI;
            let v = [theta.cos() * phi.sin(), theta.sin() * phi.sin(), phi.cos()];
            let normal = normalize([v[0] * (1.0 - flattening), v[1] * (1.0 - flattening), v[2]]);
            vertices.push(SurfaceVertex {
                position: [radius * v[0], radius * v[1], radius * (1.0 - flattening) * v[2]],
                normal,
                uv: [i as f32 / n as f32, 1.0 - j as f32 / n as f32],
            });
        }
    }

    let index = |i: u32, j: u32| i * (n + 1) + j;
    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for i in 0..n {
        for j in 0..n {
            let a = index(i, j);
            let b = index(i + 1, j);
            let c = index(i, j + 1);
            let d = index(i + 1, j + 1);
            // Counter-clockwise seen from outside.
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    Geometry { vertices, indices }
}

/// Flat annulus in the body's equatorial plane. Texture `u` runs from the
/// inner edge (0) to the outer edge (1).
pub fn ring(inner_radius: f32, outer_radius: f32, slices: u32) -> Geometry<SurfaceVertex> {
    let slices = slices.max(3);
    let mut vertices = Vec::with_capacity(((slices + 1) * 2) as usize);
    for i in 0..=slices {
        let a = i as f32 * TAU / slices as f32;
        let (s, c) = a.sin_cos();
        for (radius, u) in [(inner_radius, 0.0), (outer_radius, 1.0)] {
            vertices.push(SurfaceVertex {
                position: [radius * c, radius * s, 0.0],
                normal: [0.0, 0.0, 1.0],
                uv: [u, 0.5],
            });
        }
    }
    let mut indices = Vec::with_capacity((slices * 6) as usize);
    for i in 0..slices {
        let inner = 2 * i;
        let outer = inner + 1;
        indices.extend_from_slice(&[inner, outer, inner + 2, outer, outer + 2, inner + 2]);
    }
    Geometry { vertices, indices }
}

/// Unit X, Y and Z segments colored red, green and blue.
pub fn axis_lines() -> [LineVertex; 6] {
    let line = |axis: [f32; 3], color: [f32; 3]| {
        let color = [color[0], color[1], color[2], 1.0];
        [
            LineVertex {
                position: [0.0; 3],
                color,
            },
            LineVertex {
                position: axis,
                color,
            },
        ]
    };
    let [x0, x1] = line([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
    let [y0, y1] = line([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
    let [z0, z1] = line([0.0, 0.0, 1.0], [0.0, 0.0, 1.0]);
    [x0, x1, y0, y1, z0, z1]
}

/// Line-strip indices visiting every trail vertex and closing the loop.
pub fn trail_indices(vertex_count: usize) -> Vec<u32> {
    if vertex_count == 0 {
        return Vec::new();
    }
    let mut indices: Vec<u32> = (0..vertex_count as u32).collect();
    indices.push(0);
    indices
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return [0.0, 0.0, 1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    #[test]
    fn test_sphere_vertex_and_index_counts() {
        let g = sphere(1.0, 0.0, SPHERE_SUBDIVISIONS);
        assert_eq!(g.vertices.len(), 81 * 81);
        assert_eq!(g.indices.len(), 80 * 80 * 6);
        assert!(g.indices.iter().all(|&i| (i as usize) < g.vertices.len()));
    }

    #[test]
    fn test_sphere_radius_and_flattening() {
        let g = sphere(10.0, 0.25, 16);
        for v in &g.vertices {
            let [x, y, z] = v.position;
            // (x² + y²)/a² + z²/c² = 1 with c = a·(1 − f)
            let e = (x * x + y * y) / 100.0 + z * z / (7.5 * 7.5);
            assert!((e - 1.0).abs() < 1e-4, "{:?}", v.position);
            assert!((length(v.normal) - 1.0).abs() < 1e-5);
        }
        assert!((g.vertices[0].position[2] - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_uv_spans_unit_square() {
        let g = sphere(1.0, 0.0, 8);
        assert_eq!(g.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(g.vertices.last().map(|v| v.uv), Some([1.0, 0.0]));
    }

    #[test]
    fn test_sphere_triangles_face_outward() {
        let g = sphere(1.0, 0.0, 12);
        for tri in g.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| g.vertices[i as usize].position);
            let n = cross(sub(b, a), sub(c, a));
            if length(n) < 1e-6 {
                continue; // collapsed at a pole
            }
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            let dot = n[0] * centroid[0] + n[1] * centroid[1] + n[2] * centroid[2];
            assert!(dot > 0.0);
        }
    }

    #[test]
    fn test_ring_spans_inner_to_outer_radius() {
        let g = ring(70.0, 140.0, RING_SLICES);
        assert_eq!(g.vertices.len(), 362);
        assert_eq!(g.indices.len(), 180 * 6);
        for pair in g.vertices.chunks(2) {
            assert!((length(pair[0].position) - 70.0).abs() < 1e-3);
            assert!((length(pair[1].position) - 140.0).abs() < 1e-3);
            assert_eq!(pair[0].uv[0], 0.0);
            assert_eq!(pair[1].uv[0], 1.0);
        }
    }

    #[test]
    fn test_axis_lines_are_unit_rgb() {
        let lines = axis_lines();
        assert_eq!(lines[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(lines[3].color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(lines[5].position, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_trail_indices_close_the_loop() {
        assert_eq!(trail_indices(4), vec![0, 1, 2, 3, 0]);
        assert!(trail_indices(0).is_empty());
    }
}
