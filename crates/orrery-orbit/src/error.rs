//! Orbit error types.

/// Errors produced while validating elements or propagating an orbit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrbitError {
    /// Eccentricity outside the closed-ellipse range `[0, 1)`.
    #[error("eccentricity {0} is outside [0, 1)")]
    InvalidEccentricity(f64),

    /// Revolution period is zero, negative, or not finite.
    #[error("revolution period {0} s must be positive")]
    NonPositivePeriod(f64),

    /// Newton-Raphson did not reach the tolerance within the iteration cap.
    #[error(
        "Kepler solver did not converge after {iterations} iterations (e = {eccentricity}, M = {mean_anomaly})"
    )]
    NoConvergence {
        eccentricity: f64,
        mean_anomaly: f64,
        iterations: u32,
        /// Last iterate, usable as a degraded answer.
        last: f64,
    },
}
