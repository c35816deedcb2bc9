//! Closed-form Keplerian orbits and the precision tricks needed to draw them.
//!
//! [`OrbitalElements`] describe an ellipse, [`kepler`] turns time into an
//! eccentric anomaly, and [`OrbitTrack`] keeps the fading trail polyline whose
//! vertices are stored as high/low `f32` pairs (see [`split`]).

pub mod elements;
pub mod error;
pub mod kepler;
pub mod split;
pub mod track;

pub use elements::OrbitalElements;
pub use error::OrbitError;
pub use split::{RelativeToEye, SplitF64, split_f64, split_vec3};
pub use track::{DEFAULT_TRAIL_SAMPLES, OrbitTrack, TrailVertex};
