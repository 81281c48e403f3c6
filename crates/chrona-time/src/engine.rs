//! Timeline Engine - drives the simulation clock, rollback depth and retention horizon

use std::time::Duration;

use chrona_core::{CurveError, CurveResult, Time, TimeContext};
use chrona_curve::Prune;
use tracing::{debug, warn};

use crate::{LatenessModel, SimulationClock};

/// Timeline Engine configuration
#[derive(Clone, Debug)]
pub struct TimelineConfig {
    /// Simulation step per tick
    pub tick_interval: Duration,
    /// Minimum history kept behind `now`
    pub min_rollback: Duration,
    /// Maximum history kept behind `now`
    pub max_rollback: Duration,
    /// How strongly the lateness envelope widens the rollback depth
    pub lateness_sensitivity: f64,
    /// Ticks between pruning passes
    pub prune_interval_ticks: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            tick_interval: Duration::from_millis(10),
            min_rollback: Duration::from_millis(100),
            max_rollback: Duration::from_millis(1000),
            lateness_sensitivity: 2.0,
            prune_interval_ticks: 10,
        }
    }
}

impl TimelineConfig {
    /// Configuration for lockstep simulations where corrections are rare
    pub fn lockstep() -> Self {
        TimelineConfig {
            tick_interval: Duration::from_millis(50),
            min_rollback: Duration::from_millis(50),
            max_rollback: Duration::from_millis(200),
            lateness_sensitivity: 1.0,
            prune_interval_ticks: 1,
        }
    }

    /// Configuration for high-latency links (satellite, congested mobile)
    pub fn high_latency() -> Self {
        TimelineConfig {
            tick_interval: Duration::from_millis(16),
            min_rollback: Duration::from_millis(250),
            max_rollback: Duration::from_millis(3000),
            lateness_sensitivity: 3.0,
            prune_interval_ticks: 30,
        }
    }

    pub fn validate(&self) -> CurveResult<()> {
        if self.tick_interval.is_zero() {
            return Err(CurveError::InvalidConfig(
                "tick_interval must be non-zero".into(),
            ));
        }
        if self.min_rollback > self.max_rollback {
            return Err(CurveError::InvalidConfig(format!(
                "min_rollback {:?} exceeds max_rollback {:?}",
                self.min_rollback, self.max_rollback
            )));
        }
        if !self.lateness_sensitivity.is_finite() || self.lateness_sensitivity < 0.0 {
            return Err(CurveError::InvalidConfig(format!(
                "lateness_sensitivity must be a non-negative number, got {}",
                self.lateness_sensitivity
            )));
        }
        if self.prune_interval_ticks == 0 {
            return Err(CurveError::InvalidConfig(
                "prune_interval_ticks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where a corrective update lands relative to the timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectionClass {
    /// Behind the retention horizon, history is gone
    TooLate,
    /// In retained history, curves accept it as a corrective insert
    Rollback,
    /// At or after `now`
    OnTime,
}

/// Outcome of a maintenance pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Whether pruning ran on this call
    pub performed: bool,
    /// Horizon the curves were pruned to
    pub horizon: Time,
    /// Number of curves visited
    pub curves: usize,
    /// Total entries removed
    pub pruned: usize,
}

/// Timeline Engine - owns simulation time and the retention horizon
pub struct TimelineEngine {
    /// Simulation clock
    clock: SimulationClock,
    /// Lateness of corrective updates
    lateness: LatenessModel,
    /// Current rollback depth
    rollback_depth: Duration,
    /// Retention horizon, never moves backwards
    horizon: Time,
    /// Ticks since the last pruning pass
    ticks_since_prune: u32,
    /// Configuration
    config: TimelineConfig,
}

impl TimelineEngine {
    /// Create a new engine with default configuration
    pub fn new() -> Self {
        Self::build(TimelineConfig::default())
    }

    /// Create a new engine with custom configuration
    pub fn with_config(config: TimelineConfig) -> CurveResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TimelineConfig) -> Self {
        TimelineEngine {
            clock: SimulationClock::new(),
            lateness: LatenessModel::new(),
            rollback_depth: config.min_rollback,
            horizon: Time::NEG_INFINITY,
            ticks_since_prune: 0,
            config,
        }
    }

    /// Advance the simulation by one tick and return the new context
    pub fn tick(&mut self) -> TimeContext {
        self.clock.advance(self.config.tick_interval);
        self.adjust_rollback_depth();
        self.advance_horizon();
        self.ticks_since_prune = self.ticks_since_prune.saturating_add(1);
        self.context()
    }

    /// Current simulation time
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Current rollback depth
    pub fn rollback_depth(&self) -> Duration {
        self.rollback_depth
    }

    /// Current retention horizon
    pub fn horizon(&self) -> Time {
        self.horizon
    }

    /// Context handed to curves, queues and synchronizers
    pub fn context(&self) -> TimeContext {
        TimeContext::new(self.clock.now(), self.horizon)
    }

    /// Classify and record an authoritative update for `event_time`
    pub fn record_correction(&mut self, event_time: Time) -> CorrectionClass {
        let now = self.clock.now();
        if event_time < self.horizon {
            // Lateness still widens the depth so later updates fit
            self.lateness.record(now, event_time);
            self.lateness.record_too_late();
            self.adjust_rollback_depth();
            warn!(
                event = %event_time,
                horizon = %self.horizon,
                "correction behind retention horizon"
            );
            return CorrectionClass::TooLate;
        }
        if event_time < now {
            self.lateness.record(now, event_time);
            self.adjust_rollback_depth();
            return CorrectionClass::Rollback;
        }
        CorrectionClass::OnTime
    }

    /// Rewind the simulation clock for re-simulation, never past the horizon
    /// or the start of the timeline.
    ///
    /// Returns the time the clock was moved to.
    pub fn rewind_to(&mut self, target: Time) -> Time {
        let target = target.max(self.horizon).max(Time::ZERO);
        self.clock.rewind_to(target);
        self.clock.now()
    }

    /// Prune the given curves if a pruning pass is due
    pub fn maintain(&mut self, curves: &mut [&mut dyn Prune]) -> MaintenanceReport {
        if self.ticks_since_prune < self.config.prune_interval_ticks {
            return MaintenanceReport {
                performed: false,
                horizon: self.horizon,
                curves: 0,
                pruned: 0,
            };
        }
        self.force_maintain(curves)
    }

    /// Prune the given curves to the current horizon now
    pub fn force_maintain(&mut self, curves: &mut [&mut dyn Prune]) -> MaintenanceReport {
        let horizon = self.horizon;
        let pruned: usize = curves.iter_mut().map(|curve| curve.prune(horizon)).sum();
        self.ticks_since_prune = 0;

        debug!(%horizon, curves = curves.len(), pruned, "maintenance pass");
        MaintenanceReport {
            performed: true,
            horizon,
            curves: curves.len(),
            pruned,
        }
    }

    /// Get reference to the lateness model
    pub fn lateness(&self) -> &LatenessModel {
        &self.lateness
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Rollback depth widens with the lateness envelope
    fn adjust_rollback_depth(&mut self) {
        let cfg = &self.config;
        let raw = cfg.min_rollback.as_secs_f64()
            + cfg.lateness_sensitivity * self.lateness.envelope_secs;

        self.rollback_depth = Duration::from_secs_f64(
            raw.clamp(cfg.min_rollback.as_secs_f64(), cfg.max_rollback.as_secs_f64()),
        );
    }

    fn advance_horizon(&mut self) {
        let candidate = self.clock.now().saturating_sub(self.rollback_depth);
        if candidate > self.horizon {
            self.horizon = candidate;
        }
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new()
    }
}
