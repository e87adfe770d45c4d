//! # Host Configuration
//!
//! Tunables for the fixed-step loop. Every field has a default, so a TOML
//! file only needs the values it changes:
//!
//! ```toml
//! fixed_step = 0.016666668
//! max_steps_per_tick = 4
//! snapshot_interval = 0.1
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default step: 30 Hz.
pub const DEFAULT_FIXED_STEP: f32 = 1.0 / 30.0;
/// Default per-frame step cap.
pub const DEFAULT_MAX_STEPS_PER_TICK: u32 = 8;
/// Default sleep between loop iterations.
pub const DEFAULT_SLEEP_MS: u64 = 1;
/// Default bound on the stop join.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5_000;
/// Default ceiling on one frame's wall-clock delta.
pub const DEFAULT_MAX_FRAME_DELTA: f32 = 0.25;
/// Default capacity of the per-sample snapshot queue.
pub const DEFAULT_SNAPSHOT_QUEUE_CAPACITY: usize = 64;

/// Simulation host tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Seconds advanced per step. Coerced positive and finite.
    pub fixed_step: f32,
    /// Most steps run for one wall-clock frame. Coerced to at least 1.
    pub max_steps_per_tick: u32,
    /// Sleep after each loop iteration; zero yields instead.
    pub sleep_ms: u64,
    /// How long `stop_simulation` waits for the loop thread.
    pub stop_timeout_ms: u64,
    /// Seconds between snapshots; zero publishes every tick.
    pub snapshot_interval: f32,
    /// Ceiling on one frame's delta, bounding catch-up after a stall.
    pub max_frame_delta: f32,
    /// Samples kept for `drain_snapshots`; the oldest is dropped when full.
    /// Fixed when the host is created.
    pub snapshot_queue_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fixed_step: DEFAULT_FIXED_STEP,
            max_steps_per_tick: DEFAULT_MAX_STEPS_PER_TICK,
            sleep_ms: DEFAULT_SLEEP_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            snapshot_interval: 0.0,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            snapshot_queue_capacity: DEFAULT_SNAPSHOT_QUEUE_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Config stepping at `hz` with other fields default.
    #[must_use]
    pub fn with_tick_rate(hz: u32) -> Self {
        Self {
            fixed_step: 1.0 / hz.max(1) as f32,
            ..Self::default()
        }
    }

    /// Parses TOML; missing fields take defaults, then values are coerced.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on invalid TOML or wrongly typed fields.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Copy with every field coerced into its valid range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !(self.fixed_step.is_finite() && self.fixed_step > 0.0) {
            self.fixed_step = DEFAULT_FIXED_STEP;
        }
        self.max_steps_per_tick = self.max_steps_per_tick.max(1);
        if !(self.snapshot_interval.is_finite() && self.snapshot_interval > 0.0) {
            self.snapshot_interval = 0.0;
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            self.max_frame_delta = DEFAULT_MAX_FRAME_DELTA;
        }
        self.snapshot_queue_capacity = self.snapshot_queue_capacity.max(1);
        self
    }

    /// Stop join bound.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Fixed step as a duration.
    #[must_use]
    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f32(self.fixed_step)
    }
}
