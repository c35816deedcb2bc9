//! Time-bounded eased interpolation for camera moves.

use glam::{DQuat, DVec3};

/// Easing curves for camera transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed, no acceleration.
    Linear,
    /// Fast start, long circular slow-down at the end.
    #[default]
    OutCirc,
}

impl Easing {
    /// Map a linear progress value (0.0..=1.0) to an eased value.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::OutCirc => {
                let u = t - 1.0;
                (1.0 - u * u).sqrt()
            }
        }
    }
}

/// Values a [`Transition`] can blend between.
pub trait Interpolate: Copy {
    fn interpolate(&self, end: &Self, t: f64) -> Self;
}

impl Interpolate for DVec3 {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        *self * (1.0 - t) + *end * t
    }
}

impl Interpolate for DQuat {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self.slerp(*end, t)
    }
}

/// One value moving from `from` to `to` over a fixed duration.
#[derive(Clone, Copy, Debug)]
pub struct Transition<T> {
    from: T,
    to: T,
    duration: f64,
    elapsed: f64,
    easing: Easing,
}

impl<T: Interpolate> Transition<T> {
    /// A duration of 0 finishes on the first [`advance`](Self::advance).
    pub fn new(from: T, to: T, duration_ms: u64, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration_ms as f64 / 1000.0,
            elapsed: 0.0,
            easing,
        }
    }

    /// Move forward by `dt` seconds. Returns the time left over once the
    /// transition has reached its end, which the next stage may consume.
    pub fn advance(&mut self, dt: f64) -> f64 {
        let remaining = self.duration - self.elapsed;
        if dt >= remaining {
            self.elapsed = self.duration;
            dt - remaining.max(0.0)
        } else {
            self.elapsed += dt;
            0.0
        }
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Current eased value.
    pub fn value(&self) -> T {
        if self.is_finished() {
            return self.to;
        }
        self.from.interpolate(&self.to, self.easing.apply(self.progress()))
    }

    pub fn target(&self) -> T {
        self.to
    }
}
