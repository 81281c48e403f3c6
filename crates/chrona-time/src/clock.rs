//! Clocks driving the simulation and presentation timelines

use std::time::{Duration, Instant};

use chrona_core::Time;

/// Presentation clock - wall-clock driven, smooth, never jumps
/// INVARIANT: presentation time is monotonically non-decreasing
pub struct PresentationClock {
    /// Current presentation time
    value: Time,
    /// Last update instant
    last_update: Instant,
    /// Largest step accepted per tick
    max_step: Duration,
}

impl PresentationClock {
    /// Create a presentation clock starting at zero
    pub fn new() -> Self {
        PresentationClock {
            value: Time::ZERO,
            last_update: Instant::now(),
            max_step: Duration::from_millis(100),
        }
    }

    /// Advance by elapsed wall-clock time and return the new time
    pub fn tick(&mut self) -> Time {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);

        // Clamp to prevent large jumps (e.g. after a debugger pause)
        self.value = self.value.saturating_add(elapsed.min(self.max_step));
        self.last_update = now;
        self.value
    }

    /// Current presentation time without advancing
    pub fn now(&self) -> Time {
        self.value
    }

    /// Time the renderer should sample curves at.
    ///
    /// Rendering trails the simulation by `lag` so that both bracketing
    /// keyframes of an interpolated curve usually exist.
    pub fn render_time(sim_now: Time, lag: Duration) -> Time {
        sim_now.saturating_sub(lag)
    }
}

impl Default for PresentationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation clock - authoritative, advanced by fixed steps
/// CAN be rewound for rollback, but never before the retention horizon
pub struct SimulationClock {
    /// Current simulation time
    value: Time,
    /// Clock rate multiplier (1.0 = real-time)
    rate: f64,
}

impl SimulationClock {
    /// Create a simulation clock starting at zero
    pub fn new() -> Self {
        Self::starting_at(Time::ZERO)
    }

    pub fn starting_at(start: Time) -> Self {
        SimulationClock {
            value: start,
            rate: 1.0,
        }
    }

    /// Advance by a step, applying the rate; returns the new time
    pub fn advance(&mut self, dt: Duration) -> Time {
        let scaled = Duration::from_secs_f64(dt.as_secs_f64() * self.rate);
        self.value = self.value.saturating_add(scaled);
        self.value
    }

    /// Current simulation time
    pub fn now(&self) -> Time {
        self.value
    }

    /// Set clock rate (for slow motion / fast forward)
    /// Rate must be between 0.25 and 4.0
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.clamp(0.25, 4.0);
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Move back to an earlier time for re-simulation
    pub fn rewind_to(&mut self, target: Time) {
        if target < self.value {
            self.value = target;
        }
    }

    /// Jump to a later time (for recovery)
    /// Only allowed to move forward
    pub fn sync_to(&mut self, target: Time) {
        if target > self.value {
            self.value = target;
        }
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_clock_monotonic() {
        let mut clock = PresentationClock::new();

        let t1 = clock.tick();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.tick();

        assert!(t2 > t1);
    }

    #[test]
    fn test_render_time_trails() {
        let now = Time::from_millis(500);
        assert_eq!(
            PresentationClock::render_time(now, Duration::from_millis(100)),
            Time::from_millis(400)
        );
    }

    #[test]
    fn test_simulation_clock_advance() {
        let mut clock = SimulationClock::new();
        clock.advance(Duration::from_millis(100));
        assert_eq!(clock.now(), Time::from_millis(100));
    }

    #[test]
    fn test_simulation_clock_rate() {
        let mut clock = SimulationClock::new();

        // Double speed
        clock.set_rate(2.0);
        clock.advance(Duration::from_millis(100));

        let value = clock.now().as_micros();
        assert!((199_000..=201_000).contains(&value));

        clock.set_rate(100.0);
        assert_eq!(clock.rate(), 4.0);
    }

    #[test]
    fn test_rewind_and_sync() {
        let mut clock = SimulationClock::starting_at(Time::from_millis(1000));

        clock.rewind_to(Time::from_millis(900));
        assert_eq!(clock.now(), Time::from_millis(900));
        clock.rewind_to(Time::from_millis(950));
        assert_eq!(clock.now(), Time::from_millis(900));

        clock.sync_to(Time::from_millis(800));
        assert_eq!(clock.now(), Time::from_millis(900));
        clock.sync_to(Time::from_millis(1200));
        assert_eq!(clock.now(), Time::from_millis(1200));
    }
}
