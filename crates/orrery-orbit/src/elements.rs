//! Classical orbital elements and closed-form propagation in the orbital plane.

use glam::{DQuat, DVec2};

use crate::error::OrbitError;
use crate::kepler::{self, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// Keplerian elements of a closed (elliptical) orbit.
///
/// Angles are in radians, the period in seconds, and the semi-major axis in
/// whatever length unit the scene uses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitalElements {
    /// Eccentricity, `0 <= e < 1`.
    pub eccentricity: f64,
    /// Semi-major axis.
    pub semi_major_axis: f64,
    /// Inclination.
    pub inclination: f64,
    /// Longitude of the ascending node.
    pub longitude_of_ascending_node: f64,
    /// Argument of periapsis.
    pub argument_of_periapsis: f64,
    /// Mean anomaly at the epoch (t = 0).
    pub mean_anomaly_at_epoch: f64,
    /// Sidereal revolution period.
    pub revolution_period: f64,
}

impl OrbitalElements {
    /// Reject elements that do not describe a closed ellipse with a positive period.
    pub fn validate(&self) -> Result<(), OrbitError> {
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(OrbitError::InvalidEccentricity(self.eccentricity));
        }
        if !(self.revolution_period.is_finite() && self.revolution_period > 0.0) {
            return Err(OrbitError::NonPositivePeriod(self.revolution_period));
        }
        Ok(())
    }

    /// Mean anomaly `M0 + 2π/period · t`.
    pub fn mean_anomaly(&self, time: f64) -> f64 {
        self.mean_anomaly_at_epoch + std::f64::consts::TAU / self.revolution_period * time
    }

    /// Argument of periapsis plus longitude of the ascending node.
    pub fn longitude_of_periapsis(&self) -> f64 {
        self.argument_of_periapsis + self.longitude_of_ascending_node
    }

    /// Rotation from the orbital plane into the parent frame:
    /// `Rz(Ω) · Rx(i) · Rz(ω)`.
    pub fn orientation(&self) -> DQuat {
        DQuat::from_rotation_z(self.longitude_of_ascending_node)
            * DQuat::from_rotation_x(self.inclination)
            * DQuat::from_rotation_z(self.argument_of_periapsis)
    }

    /// Orbital-plane position for an eccentric anomaly, periapsis on +X.
    pub fn position_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> DVec2 {
        let e = self.eccentricity;
        let a = self.semi_major_axis;
        DVec2::new(
            a * (eccentric_anomaly.cos() - e),
            a * (1.0 - e * e).sqrt() * eccentric_anomaly.sin(),
        )
    }

    /// Orbital-plane position at `time` seconds past the epoch.
    pub fn try_position(&self, time: f64) -> Result<DVec2, OrbitError> {
        let anomaly = kepler::solve_bounded(
            self.eccentricity,
            self.mean_anomaly(time),
            DEFAULT_TOLERANCE,
            DEFAULT_MAX_ITERATIONS,
        )?;
        Ok(self.position_at_eccentric_anomaly(anomaly))
    }

    /// Orbital-plane position at `time`, falling back to the solver's last
    /// iterate (with a warning) when Kepler's equation does not converge.
    pub fn position(&self, time: f64) -> DVec2 {
        match self.try_position(time) {
            Ok(position) => position,
            Err(OrbitError::NoConvergence { last, .. }) => {
                log::warn!(
                    "Kepler solver did not converge at t={time} (e={}), using last iterate",
                    self.eccentricity
                );
                self.position_at_eccentric_anomaly(last)
            }
            Err(err) => {
                log::warn!("orbit propagation failed at t={time}: {err}");
                DVec2::ZERO
            }
        }
    }
}
