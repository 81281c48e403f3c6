//! Chaos delivery for curve replication
//!
//! Simulates hostile delivery of keyframe updates:
//! - Latency and jitter
//! - Loss (random and burst)
//! - Reordering
//! - Duplication

use std::time::Duration;

use chrona_curve::{EventQueue, Time, TimeCurve};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Jitter distribution type
#[derive(Clone, Debug)]
pub enum JitterDistribution {
    /// Uniform distribution
    Uniform { min_ms: u32, max_ms: u32 },
    /// Pareto distribution (heavy tail)
    Pareto { scale_ms: f64, shape: f64 },
}

impl JitterDistribution {
    /// Sample a jitter value
    pub fn sample(&self, rng: &mut StdRng) -> Duration {
        match self {
            JitterDistribution::Uniform { min_ms, max_ms } => {
                let dist = Uniform::new_inclusive(*min_ms, *max_ms);
                Duration::from_millis(dist.sample(rng) as u64)
            }
            JitterDistribution::Pareto { scale_ms, shape } => {
                let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                let value = scale_ms / u.powf(1.0 / shape);
                Duration::from_millis(value.min(1000.0) as u64) // Cap at 1 second
            }
        }
    }
}

/// Delivery chaos configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Base latency
    pub base_latency: Duration,
    /// Jitter distribution
    pub jitter: JitterDistribution,
    /// Loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Burst loss probability
    pub burst_loss_prob: f64,
    /// Burst loss length range
    pub burst_length: (u32, u32),
    /// Reorder probability
    pub reorder_prob: f64,
    /// Longest extra hold applied to a reordered update
    pub reorder_hold: Duration,
    /// Duplicate probability
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(50),
            jitter: JitterDistribution::Uniform {
                min_ms: 0,
                max_ms: 50,
            },
            loss_rate: 0.01,
            burst_loss_prob: 0.01,
            burst_length: (2, 5),
            reorder_prob: 0.05,
            reorder_hold: Duration::from_millis(60),
            duplicate_prob: 0.01,
        }
    }
}

impl ChaosConfig {
    /// Good conditions
    pub fn good() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(20),
            jitter: JitterDistribution::Uniform {
                min_ms: 0,
                max_ms: 10,
            },
            loss_rate: 0.001,
            burst_loss_prob: 0.0,
            burst_length: (1, 2),
            reorder_prob: 0.01,
            reorder_hold: Duration::from_millis(20),
            duplicate_prob: 0.001,
        }
    }

    /// Poor conditions
    pub fn poor() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(100),
            jitter: JitterDistribution::Pareto {
                scale_ms: 20.0,
                shape: 1.5,
            },
            loss_rate: 0.05,
            burst_loss_prob: 0.02,
            burst_length: (3, 8),
            reorder_prob: 0.1,
            reorder_hold: Duration::from_millis(100),
            duplicate_prob: 0.02,
        }
    }

    /// Hostile conditions
    pub fn hostile() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(200),
            jitter: JitterDistribution::Pareto {
                scale_ms: 50.0,
                shape: 1.2,
            },
            loss_rate: 0.15,
            burst_loss_prob: 0.05,
            burst_length: (5, 15),
            reorder_prob: 0.2,
            reorder_hold: Duration::from_millis(300),
            duplicate_prob: 0.05,
        }
    }
}

/// Delivery statistics
#[derive(Clone, Debug, Default)]
pub struct ChaosStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub reordered: u64,
    pub duplicated: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl ChaosStats {
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.lost as f64 / self.sent as f64
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.delivered as f64
        }
    }
}

/// Update in flight
#[derive(Clone, Debug)]
struct InFlight<T> {
    payload: T,
    sent_at: Time,
}

/// Seeded chaos channel; deliveries are scheduled on an event queue
pub struct ChaosChannel<T> {
    config: ChaosConfig,
    rng: StdRng,
    in_flight: EventQueue<InFlight<T>>,
    burst_remaining: u32,
    stats: ChaosStats,
}

impl<T: Clone> ChaosChannel<T> {
    /// Create a new chaos channel with seed
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosChannel {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: EventQueue::new(),
            burst_remaining: 0,
            stats: ChaosStats::default(),
        }
    }

    /// Send a payload at `now`
    pub fn send(&mut self, now: Time, payload: T) {
        self.stats.sent += 1;

        if self.should_drop() {
            self.stats.lost += 1;
            return;
        }

        let mut latency = self.config.base_latency + self.config.jitter.sample(&mut self.rng);
        if self.rng.gen::<f64>() < self.config.reorder_prob {
            // Hold the update so later sends overtake it
            let hold_ms = self.config.reorder_hold.as_millis().max(1) as u64;
            latency += Duration::from_millis(self.rng.gen_range(1..=hold_ms));
            self.stats.reordered += 1;
        }

        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            let extra = self.config.jitter.sample(&mut self.rng);
            self.in_flight.insert(
                now + latency + extra,
                InFlight {
                    payload: payload.clone(),
                    sent_at: now,
                },
            );
            self.stats.duplicated += 1;
        }

        self.in_flight.insert(
            now + latency,
            InFlight {
                payload,
                sent_at: now,
            },
        );
    }

    /// Check if the next update should be dropped
    fn should_drop(&mut self) -> bool {
        // Burst loss
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }

        // Start new burst?
        if self.rng.gen::<f64>() < self.config.burst_loss_prob {
            let (min, max) = self.config.burst_length;
            self.burst_remaining = self.rng.gen_range(min..=max).saturating_sub(1);
            return true;
        }

        // Random loss
        self.rng.gen::<f64>() < self.config.loss_rate
    }

    /// Receive every update due at `now`, in delivery order
    pub fn poll(&mut self, now: Time) -> Vec<T> {
        let due = self.in_flight.drain_due(now);
        let mut delivered = Vec::with_capacity(due.len());

        for entry in due {
            let latency = (entry.time - entry.value.sent_at).as_millis() as u64;
            self.stats.delivered += 1;
            self.stats.total_latency_ms += latency;
            self.stats.max_latency_ms = self.stats.max_latency_ms.max(latency);
            delivered.push(entry.value.payload);
        }

        delivered
    }

    /// Updates still in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Get current statistics
    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = ChaosStats::default();
    }
}
