//! Fixed-timestep accumulator
//!
//! Decouples the simulation rate from the display refresh rate. Wall time is added every
//! frame; a tick is due once a full interval has built up.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    interval: Duration,
    accumulated: Duration,
}

impl FixedTimestep {
    /// # Panics
    ///
    /// Panics if `timesteps_per_second` is zero.
    pub fn new(timesteps_per_second: u32) -> Self {
        Self {
            interval: Self::interval_for(timesteps_per_second),
            accumulated: Duration::ZERO,
        }
    }

    fn interval_for(timesteps_per_second: u32) -> Duration {
        assert!(timesteps_per_second > 0, "timestep rate must be positive");
        Duration::from_secs(1) / timesteps_per_second
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Changes the rate, keeping any time already accumulated.
    pub fn set_rate(&mut self, timesteps_per_second: u32) {
        self.interval = Self::interval_for(timesteps_per_second);
    }

    pub fn accumulate(&mut self, elapsed: Duration) {
        self.accumulated = self.accumulated.saturating_add(elapsed);
    }

    pub fn is_due(&self) -> bool {
        self.accumulated >= self.interval
    }

    /// Takes one interval off the accumulator.
    ///
    /// The leftover is capped at one interval, so a long stall yields at most one
    /// catch-up tick instead of a burst.
    pub fn consume(&mut self) {
        self.accumulated = self
            .accumulated
            .saturating_sub(self.interval)
            .min(self.interval);
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}
