//! Host counters and step timing.

use std::time::Duration;

/// Counters and timing of one host instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostStats {
    /// Steps advanced.
    pub ticks: u64,
    /// Commands handed to the simulation.
    pub commands_processed: u64,
    /// Commands whose handler returned an error or panicked.
    pub command_failures: u64,
    /// Ticks whose `on_tick` returned an error or panicked.
    pub tick_failures: u64,
    /// Results enqueued for dispatch.
    pub results_dispatched: u64,
    /// Events enqueued for dispatch.
    pub events_dispatched: u64,
    /// Snapshots published.
    pub snapshots_published: u64,
    /// Samples dropped from the full snapshot queue.
    pub snapshots_dropped: u64,
    /// Subscriber callbacks that panicked during `flush_events`.
    pub subscriber_panics: u64,
    /// Loop frames that hit the step cap.
    pub capped_frames: u64,
    /// Minimum step duration observed.
    pub min_step_us: u64,
    /// Maximum step duration observed.
    pub max_step_us: u64,
    /// Average step duration (rolling).
    pub avg_step_us: u64,
    /// Steps that took longer than the fixed step.
    pub late_steps: u64,
}

impl Default for HostStats {
    fn default() -> Self {
        Self {
            ticks: 0,
            commands_processed: 0,
            command_failures: 0,
            tick_failures: 0,
            results_dispatched: 0,
            events_dispatched: 0,
            snapshots_published: 0,
            snapshots_dropped: 0,
            subscriber_panics: 0,
            capped_frames: 0,
            min_step_us: u64::MAX,
            max_step_us: 0,
            avg_step_us: 0,
            late_steps: 0,
        }
    }
}

impl HostStats {
    /// Records how long one step took against its budget.
    pub fn record_step(&mut self, elapsed: Duration, budget: Duration) {
        let elapsed_us = elapsed.as_micros() as u64;

        self.ticks += 1;
        self.min_step_us = self.min_step_us.min(elapsed_us);
        self.max_step_us = self.max_step_us.max(elapsed_us);

        // Rolling average
        self.avg_step_us = if self.ticks == 1 {
            elapsed_us
        } else {
            (self.avg_step_us * 15 + elapsed_us) / 16
        };

        if elapsed > budget {
            self.late_steps += 1;
        }
    }

    /// Share of failed commands, 0.0 when none ran.
    #[must_use]
    pub fn command_failure_rate(&self) -> f64 {
        if self.commands_processed == 0 {
            0.0
        } else {
            self.command_failures as f64 / self.commands_processed as f64
        }
    }
}
