//! Kepler's equation `M = E - e·sin(E)` solved for the eccentric anomaly.

use crate::error::OrbitError;

/// Tolerance used when propagating orbit positions.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-3;

/// Iteration cap for [`solve_bounded`] when propagating orbit positions.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Residual of Kepler's equation, `E - e·sin(E) - M`.
#[inline]
pub fn residual(eccentricity: f64, mean_anomaly: f64, eccentric_anomaly: f64) -> f64 {
    eccentric_anomaly - eccentricity * eccentric_anomaly.sin() - mean_anomaly
}

/// Newton-Raphson solve seeded with `E = M`, iterating until the residual
/// drops below `epsilon`.
///
/// There is no iteration cap. Pathological inputs (NaN, `e` at or very close
/// to 1) may never converge; use [`solve_bounded`] where that matters.
pub fn solve(eccentricity: f64, mean_anomaly: f64, epsilon: f64) -> f64 {
    let mut anomaly = mean_anomaly;
    loop {
        let delta = residual(eccentricity, mean_anomaly, anomaly);
        anomaly -= delta / (1.0 - eccentricity * anomaly.cos());
        if delta.abs() < epsilon {
            return anomaly;
        }
    }
}

/// Same iteration as [`solve`], but gives up after `max_iterations` steps.
pub fn solve_bounded(
    eccentricity: f64,
    mean_anomaly: f64,
    epsilon: f64,
    max_iterations: u32,
) -> Result<f64, OrbitError> {
    let mut anomaly = mean_anomaly;
    for _ in 0..max_iterations {
        let delta = residual(eccentricity, mean_anomaly, anomaly);
        anomaly -= delta / (1.0 - eccentricity * anomaly.cos());
        if delta.abs() < epsilon {
            return Ok(anomaly);
        }
    }
    Err(OrbitError::NoConvergence {
        eccentricity,
        mean_anomaly,
        iterations: max_iterations,
        last: anomaly,
    })
}
