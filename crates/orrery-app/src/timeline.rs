//! Simulation clock.
//!
//! A millisecond wall-clock reading advanced in fixed ticks, each tick adding
//! `rate · tick` milliseconds. Frame time is fed through an accumulator so the
//! clock advances at the same pace regardless of frame rate.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use orrery_config::TimelineConfig;
use tracing::{debug, warn};

/// UNIX timestamp of the J2000 epoch, in seconds.
pub const J2000: f64 = 946_727_935.0;

/// Longest frame time fed to the accumulator; longer frames are clamped.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Fastest rate reachable with [`Timeline::speed_up`].
pub const MAX_RATE: f64 = 1.0e9;

/// Milliseconds since the UNIX epoch, read from the system clock.
pub fn wall_clock_ms() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64() * 1000.0,
        Err(_) => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    current_ms: f64,
    rate: f64,
    paused_rate: Option<f64>,
    tick_ms: f64,
    accumulator: f64,
    tick_count: u64,
    previous_time: Instant,
}

impl Timeline {
    /// A clock at the current wall-clock time running at `config.start_rate`.
    pub fn new(config: &TimelineConfig) -> Self {
        Self::starting_at(wall_clock_ms(), config)
    }

    pub fn starting_at(ms_since_epoch: f64, config: &TimelineConfig) -> Self {
        Self {
            current_ms: ms_since_epoch,
            rate: config.start_rate,
            paused_rate: None,
            tick_ms: f64::from(config.tick_ms.max(1)),
            accumulator: 0.0,
            tick_count: 0,
            previous_time: Instant::now(),
        }
    }

    /// Seconds elapsed since J2000.
    pub fn current_time(&self) -> f64 {
        self.current_ms / 1000.0 - J2000
    }

    /// Milliseconds since the UNIX epoch.
    pub fn date_time(&self) -> f64 {
        self.current_ms
    }

    pub fn set_date_time(&mut self, ms_since_epoch: f64) {
        self.current_ms = ms_since_epoch;
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused_rate.is_some()
    }

    /// Back to the wall clock at rate 1.
    pub fn real_time(&mut self) {
        self.real_rate();
        self.current_ms = wall_clock_ms();
    }

    pub fn real_rate(&mut self) {
        self.paused_rate = None;
        self.set_rate(1.0);
    }

    pub fn speed_up(&mut self) {
        self.paused_rate = None;
        let rate = self.rate;
        let next = if rate < -1.0 {
            rate / 10.0
        } else if rate < 1.0 {
            rate + 1.0
        } else if rate < MAX_RATE {
            rate * 10.0
        } else {
            rate
        };
        self.set_rate(next);
    }

    pub fn speed_down(&mut self) {
        self.paused_rate = None;
        let rate = self.rate;
        let next = if rate > 1.0 {
            rate / 10.0
        } else if rate > -1.0 {
            rate - 1.0
        } else if rate > -MAX_RATE {
            rate * 10.0
        } else {
            rate
        };
        self.set_rate(next);
    }

    /// Freeze the clock, remembering the rate for [`Self::resume`].
    pub fn pause(&mut self) {
        if self.paused_rate.is_none() {
            self.paused_rate = Some(self.rate);
            self.rate = 0.0;
            debug!("Timeline paused");
        }
    }

    pub fn resume(&mut self) {
        if let Some(rate) = self.paused_rate.take() {
            self.rate = rate;
            debug!("Timeline resumed at rate {rate}");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Measure the wall time since the previous call and advance by it.
    /// Returns the measured frame time in seconds.
    pub fn update(&mut self) -> f64 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time);
        frame_time
    }

    /// Run every whole tick contained in `frame_time` seconds plus the
    /// carried remainder. Returns the number of ticks run.
    pub fn advance(&mut self, frame_time: f64) -> u32 {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }
        self.accumulator += frame_time * 1000.0;

        let mut ticks = 0;
        while self.accumulator >= self.tick_ms {
            self.current_ms += self.rate * self.tick_ms;
            self.accumulator -= self.tick_ms;
            self.tick_count += 1;
            ticks += 1;
        }
        ticks
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        debug!("Timeline rate {rate}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> Timeline {
        Timeline::starting_at(J2000 * 1000.0, &TimelineConfig::default())
    }

    #[test]
    fn test_starts_at_given_date() {
        let t = timeline();
        assert!(t.current_time().abs() < 1e-9);
        assert_eq!(t.rate(), 1.0);
        assert!(!t.is_paused());
    }

    #[test]
    fn test_tick_adds_rate_times_interval() {
        let mut t = timeline();
        assert_eq!(t.advance(0.010), 1);
        assert!((t.date_time() - (J2000 * 1000.0 + 10.0)).abs() < 1e-6);

        t.speed_up(); // 10
        t.advance(0.010);
        assert!((t.date_time() - (J2000 * 1000.0 + 110.0)).abs() < 1e-6);
    }

    #[test]
    fn test_partial_frames_accumulate() {
        let mut t = timeline();
        assert_eq!(t.advance(0.004), 0);
        assert_eq!(t.advance(0.004), 0);
        assert_eq!(t.advance(0.004), 1);
        assert_eq!(t.tick_count(), 1);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut t = timeline();
        let ticks = t.advance(5.0);
        assert_eq!(ticks, (MAX_FRAME_TIME * 1000.0 / 10.0) as u32);
    }

    #[test]
    fn test_speed_up_sequence() {
        let mut t = timeline();
        t.speed_down();
        t.speed_down();
        t.speed_down();
        assert_eq!(t.rate(), -10.0);

        let mut rates = Vec::new();
        for _ in 0..5 {
            t.speed_up();
            rates.push(t.rate());
        }
        assert_eq!(rates, [-1.0, 0.0, 1.0, 10.0, 100.0]);
    }

    #[test]
    fn test_speed_down_mirrors_speed_up() {
        let mut t = timeline();
        for _ in 0..3 {
            t.speed_up();
        }
        assert_eq!(t.rate(), 1000.0);
        let mut rates = Vec::new();
        for _ in 0..6 {
            t.speed_down();
            rates.push(t.rate());
        }
        assert_eq!(rates, [100.0, 10.0, 1.0, 0.0, -1.0, -10.0]);
    }

    #[test]
    fn test_rate_is_capped() {
        let mut t = timeline();
        for _ in 0..20 {
            t.speed_up();
        }
        assert_eq!(t.rate(), MAX_RATE);
        for _ in 0..40 {
            t.speed_down();
        }
        assert_eq!(t.rate(), -MAX_RATE);
    }

    #[test]
    fn test_pause_restores_rate() {
        let mut t = timeline();
        t.speed_up();
        t.toggle_pause();
        assert!(t.is_paused());
        assert_eq!(t.rate(), 0.0);
        let before = t.date_time();
        t.advance(0.1);
        assert_eq!(t.date_time(), before);

        t.toggle_pause();
        assert_eq!(t.rate(), 10.0);
    }

    #[test]
    fn test_real_time_resets_rate_and_clock() {
        let mut t = timeline();
        t.speed_up();
        t.speed_up();
        t.real_time();
        assert_eq!(t.rate(), 1.0);
        assert!((t.date_time() - wall_clock_ms()).abs() < 60_000.0);
    }

    #[test]
    fn test_set_date_time() {
        let mut t = timeline();
        t.set_date_time(0.0);
        assert!((t.current_time() + J2000).abs() < 1e-9);
    }
}
