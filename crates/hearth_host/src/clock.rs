//! # Fixed-Step Clock
//!
//! Turns irregular wall-clock frame deltas into a whole number of fixed
//! steps.
//!
//! ## Design
//!
//! ```text
//! delta ─► clamp(0, max_frame_delta) ─► accumulator += delta
//!   while accumulator >= step && steps < max_steps: accumulator -= step
//!   if the frame used the whole cap: accumulator = 0
//! ```
//!
//! Every step advances by exactly `fixed_step`, so simulation results
//! depend only on the number of steps, never on frame jitter. Discarding
//! the backlog when the cap is hit keeps a slow host from falling further
//! behind on every frame.

use crate::config::HostConfig;

/// Accumulator-based fixed-step scheduler.
#[derive(Clone, Debug)]
pub struct FixedStepClock {
    fixed_step: f64,
    max_steps: u32,
    max_frame_delta: f64,
    accumulator: f64,
    stats: ClockStats,
}

/// Scheduling counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClockStats {
    /// Frames fed to the clock.
    pub frames: u64,
    /// Steps granted.
    pub steps: u64,
    /// Frames whose delta exceeded `max_frame_delta`.
    pub clamped_frames: u64,
    /// Frames that used the whole step cap.
    pub capped_frames: u64,
    /// Simulation seconds thrown away by the cap.
    pub discarded_seconds: f64,
}

impl FixedStepClock {
    /// Creates a clock. Arguments are coerced like [`HostConfig::sanitized`].
    #[must_use]
    pub fn new(fixed_step: f32, max_steps: u32, max_frame_delta: f32) -> Self {
        let mut clock = Self {
            fixed_step: 0.0,
            max_steps: 1,
            max_frame_delta: 0.0,
            accumulator: 0.0,
            stats: ClockStats::default(),
        };
        clock.retune(fixed_step, max_steps, max_frame_delta);
        clock
    }

    /// Creates a clock from host tunables.
    #[must_use]
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.fixed_step, config.max_steps_per_tick, config.max_frame_delta)
    }

    /// Applies new tunables, keeping the accumulator.
    pub fn retune(&mut self, fixed_step: f32, max_steps: u32, max_frame_delta: f32) {
        let config = HostConfig {
            fixed_step,
            max_steps_per_tick: max_steps,
            max_frame_delta,
            ..HostConfig::default()
        }
        .sanitized();
        self.fixed_step = f64::from(config.fixed_step);
        self.max_steps = config.max_steps_per_tick;
        self.max_frame_delta = f64::from(config.max_frame_delta);
    }

    /// Feeds one frame's wall-clock delta (seconds) and returns how many
    /// fixed steps to run now. Negative or NaN deltas count as zero.
    pub fn accumulate(&mut self, delta: f64) -> u32 {
        self.stats.frames += 1;

        let mut delta = if delta.is_nan() { 0.0 } else { delta.max(0.0) };
        if delta > self.max_frame_delta {
            delta = self.max_frame_delta;
            self.stats.clamped_frames += 1;
        }
        self.accumulator += delta;

        let mut steps = 0;
        while self.accumulator >= self.fixed_step && steps < self.max_steps {
            self.accumulator -= self.fixed_step;
            steps += 1;
        }

        // A capped frame never carries a remainder, even a partial step.
        if steps == self.max_steps {
            self.stats.capped_frames += 1;
            self.stats.discarded_seconds += self.accumulator;
            self.accumulator = 0.0;
        }

        self.stats.steps += u64::from(steps);
        steps
    }

    /// The fixed `dt` handed to every step.
    #[inline]
    #[must_use]
    pub fn step(&self) -> f32 {
        self.fixed_step as f32
    }

    /// Step cap.
    #[must_use]
    pub const fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Time owed but not yet stepped. Always below one step after
    /// [`Self::accumulate`].
    #[must_use]
    pub const fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &ClockStats {
        &self.stats
    }

    /// Drops any owed time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_steps() {
        let mut clock = FixedStepClock::new(0.25, 8, 10.0);
        assert_eq!(clock.accumulate(0.5), 2);
        assert_eq!(clock.accumulate(0.125), 0);
        assert_eq!(clock.accumulate(0.125), 1);
        assert_eq!(clock.accumulator(), 0.0);
    }

    #[test]
    fn test_cap_discards_backlog() {
        let mut clock = FixedStepClock::new(0.1, 3, 10.0);
        assert_eq!(clock.accumulate(1.0), 3);
        assert_eq!(clock.accumulator(), 0.0);
        assert_eq!(clock.stats().capped_frames, 1);
        assert!(clock.stats().discarded_seconds > 0.6);
    }

    #[test]
    fn test_cap_drops_partial_remainder() {
        let mut clock = FixedStepClock::new(0.25, 2, 10.0);
        assert_eq!(clock.accumulate(0.625), 2);
        assert_eq!(clock.accumulator(), 0.0);
        assert_eq!(clock.stats().capped_frames, 1);
        assert_eq!(clock.stats().discarded_seconds, 0.125);

        // Below the cap the remainder carries over as usual.
        assert_eq!(clock.accumulate(0.375), 1);
        assert_eq!(clock.accumulator(), 0.125);
        assert_eq!(clock.stats().capped_frames, 1);
    }

    #[test]
    fn test_stall_is_clamped() {
        let mut clock = FixedStepClock::new(0.05, 100, 0.25);
        assert_eq!(clock.accumulate(30.0), 5);
        assert_eq!(clock.stats().clamped_frames, 1);
    }

    #[test]
    fn test_bad_deltas_ignored() {
        let mut clock = FixedStepClock::new(0.1, 4, 0.25);
        assert_eq!(clock.accumulate(-5.0), 0);
        assert_eq!(clock.accumulate(f64::NAN), 0);
        assert_eq!(clock.accumulator(), 0.0);
    }

    #[test]
    fn test_coerces_bad_tunables() {
        let clock = FixedStepClock::new(0.0, 0, -1.0);
        assert!(clock.step() > 0.0);
        assert_eq!(clock.max_steps(), 1);
    }
}
