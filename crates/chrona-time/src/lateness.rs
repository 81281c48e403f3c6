//! Lateness model for corrective updates
//!
//! Tracks how far in the past authoritative corrections land relative to the
//! local simulation time. The envelope of recent lateness decides how much
//! history must stay queryable for rollback.

use std::collections::VecDeque;
use std::time::Duration;

use chrona_core::Time;

/// Rolling lateness statistics
#[derive(Clone, Debug)]
pub struct LatenessModel {
    /// Recent lateness samples (seconds)
    samples: VecDeque<f64>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Mean lateness (seconds)
    pub mean: f64,
    /// Largest recent lateness (seconds)
    pub envelope_secs: f64,
    /// Corrections that arrived behind the retention horizon
    pub too_late: u64,
}

impl LatenessModel {
    pub fn new() -> Self {
        Self::with_window(100)
    }

    pub fn with_window(max_samples: usize) -> Self {
        LatenessModel {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            mean: 0.0,
            envelope_secs: 0.0,
            too_late: 0,
        }
    }

    /// Record a correction for `event_time` observed at `now`
    pub fn record(&mut self, now: Time, event_time: Time) {
        let lateness = (now - event_time).as_secs_f64();
        self.samples.push_back(lateness);

        // Trim old samples
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }

        self.update_aggregates();
    }

    /// Record a correction that could no longer be applied
    pub fn record_too_late(&mut self) {
        self.too_late += 1;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Largest recent lateness as a duration
    pub fn envelope(&self) -> Duration {
        Duration::from_secs_f64(self.envelope_secs.max(0.0))
    }

    fn update_aggregates(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        self.mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.envelope_secs = self.samples.iter().copied().fold(0.0, f64::max);
    }
}

impl Default for LatenessModel {
    fn default() -> Self {
        Self::new()
    }
}
