//! Replication Simulator - authoritative curve mirrored over a chaotic channel
//!
//! Simulates:
//! - An authoritative server writing one keyframe per tick
//! - Encoded keyframe updates crossing a lossy, reordering channel
//! - A client applying late updates as corrective inserts
//! - Periodic reconciliation through the synchronizer
//! - Retention pruning driven by the timeline engine

use bytes::Bytes;
use chrona_curve::codec::{decode_store, encode_store, DecodeOrder};
use chrona_curve::{
    CurveResult, InterpolatedCurve, Keyframe, Prune, SharedCurve, SteppedCurve, Synchronizer,
    Time, TimeCurve, TimeOrderedStore,
};
use chrona_time::{CorrectionClass, TimelineConfig, TimelineEngine};
use tracing::{debug, warn};

use crate::chaos::{ChaosChannel, ChaosConfig};

/// Replication scenario configuration
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Timeline settings shared by server and client
    pub timeline: TimelineConfig,
    /// Delivery conditions
    pub chaos: ChaosConfig,
    /// Ticks with the server producing keyframes
    pub ticks: u32,
    /// Ticks between reconciliations with the authority
    pub resync_interval_ticks: u32,
    /// Random seed
    pub seed: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        ReplicationConfig {
            timeline: TimelineConfig::default(),
            chaos: ChaosConfig::default(),
            ticks: 500,
            resync_interval_ticks: 25,
            seed: 42,
        }
    }
}

/// Outcome of a replication run
#[derive(Clone, Debug, Default)]
pub struct ReplicationReport {
    /// Ticks simulated, including the drain phase
    pub ticks: u64,
    /// Keyframes written by the server
    pub produced: u64,
    /// Updates applied by the client
    pub applied: u64,
    /// Updates that landed in retained history
    pub corrective_inserts: u64,
    /// Updates behind the retention horizon
    pub too_late: u64,
    /// Payloads the codec rejected
    pub decode_failures: u64,
    /// Reconciliations performed
    pub resyncs: u64,
    /// Entries removed by maintenance passes
    pub pruned: u64,
    /// Traversals that were not time-ordered
    pub ordering_violations: u64,
    /// Client keyframes disagreeing with the authority at the same time
    pub mismatched_keyframes: u64,
    /// Largest |client - server| sampled at `now`
    pub max_divergence: f64,
    /// Client and server agree at the final time
    pub converged: bool,
}

impl ReplicationReport {
    pub fn is_valid(&self) -> bool {
        self.ordering_violations == 0
            && self.decode_failures == 0
            && self.mismatched_keyframes == 0
            && self.converged
    }
}

/// Authoritative server feeding one client through a chaos channel
pub struct ReplicationSimulator {
    config: ReplicationConfig,
    engine: TimelineEngine,
    /// Authoritative position
    server: SharedCurve<InterpolatedCurve<f64>>,
    /// Client position, assembled from delivered updates
    client: InterpolatedCurve<f64>,
    /// Client display curve, quantized from the client position on resync
    display: SteppedCurve<i64>,
    channel: ChaosChannel<Bytes>,
    report: ReplicationReport,
}

impl ReplicationSimulator {
    pub fn new(config: ReplicationConfig) -> CurveResult<Self> {
        let engine = TimelineEngine::with_config(config.timeline.clone())?;
        let channel = ChaosChannel::new(config.chaos.clone(), config.seed);
        Ok(ReplicationSimulator {
            config,
            engine,
            server: SharedCurve::new(InterpolatedCurve::new(0.0)),
            client: InterpolatedCurve::new(0.0),
            display: SteppedCurve::new(0),
            channel,
            report: ReplicationReport::default(),
        })
    }

    /// Authoritative trajectory
    fn trajectory(tick: u64) -> f64 {
        let x = tick as f64 * 0.05;
        100.0 * x.sin() + 3.0 * x
    }

    /// Run the scenario, then drain the channel and reconcile
    pub fn run(&mut self) -> ReplicationReport {
        for _ in 0..self.config.ticks {
            self.step(true);
        }

        // Let every in-flight update land
        while self.channel.in_flight() > 0 {
            self.step(false);
        }

        let ctx = self.engine.context();
        self.resync(Synchronizer::new(ctx));

        let server_now = self.server.read().get(ctx.now);
        self.report.converged = self.client.get(ctx.now) == server_now;

        debug!(
            ticks = self.report.ticks,
            applied = self.report.applied,
            too_late = self.report.too_late,
            converged = self.report.converged,
            "replication finished"
        );
        self.report.clone()
    }

    fn step(&mut self, produce: bool) {
        let ctx = self.engine.tick();
        self.report.ticks += 1;

        if produce {
            let value = Self::trajectory(self.report.ticks);
            self.server.write().set(ctx.now, value);
            self.report.produced += 1;

            let mut update = TimeOrderedStore::with_capacity(1);
            update.insert(ctx.now, value);
            match encode_store(&update) {
                Ok(payload) => self.channel.send(ctx.now, payload),
                Err(err) => warn!(%err, "update not encoded"),
            }
        }

        for payload in self.channel.poll(ctx.now) {
            self.apply(&payload);
        }

        if self.report.ticks % u64::from(self.config.resync_interval_ticks.max(1)) == 0 {
            self.resync(Synchronizer::new(ctx));
        }

        // The authority keeps its history once it stops producing
        let mut curves: Vec<&mut dyn Prune> = Vec::with_capacity(3);
        curves.push(&mut self.client);
        curves.push(&mut self.display);
        if produce {
            curves.push(&mut self.server);
        }
        let maintenance = self.engine.maintain(&mut curves);
        self.report.pruned += maintenance.pruned as u64;

        self.audit(ctx.now);
    }

    fn resync(&mut self, sync: Synchronizer) {
        sync.sync(&mut self.client, &self.server);
        sync.sync_with(&mut self.display, &self.client, |v: f64| v.round() as i64);
        self.report.resyncs += 1;
    }

    fn apply(&mut self, payload: &[u8]) {
        let update = match decode_store::<f64>(payload, DecodeOrder::Strict) {
            Ok(update) => update,
            Err(_) => {
                self.report.decode_failures += 1;
                return;
            }
        };

        for keyframe in update.iter() {
            match self.engine.record_correction(keyframe.time) {
                CorrectionClass::TooLate => {
                    self.report.too_late += 1;
                    continue;
                }
                CorrectionClass::Rollback => {
                    let is_tail = self
                        .client
                        .store()
                        .last()
                        .map_or(true, |last| keyframe.time >= last.time);
                    if !is_tail {
                        self.report.corrective_inserts += 1;
                    }
                }
                CorrectionClass::OnTime => {}
            }
            self.client.set(keyframe.time, keyframe.value);
            self.report.applied += 1;
        }
    }

    fn audit(&mut self, now: Time) {
        if !is_time_ordered(self.client.iter()) {
            self.report.ordering_violations += 1;
        }
        if !is_time_ordered(self.display.iter()) {
            self.report.ordering_violations += 1;
        }

        let server = self.server.read();
        let horizon = self.engine.horizon();
        for keyframe in self.client.begin(horizon) {
            // Authoritative keyframes hold exact values at their own time
            if keyframe.time < now && server.get(keyframe.time) != keyframe.value {
                self.report.mismatched_keyframes += 1;
            }
        }

        let divergence = (self.client.get(now) - server.get(now)).abs();
        self.report.max_divergence = self.report.max_divergence.max(divergence);
    }

    pub fn client(&self) -> &InterpolatedCurve<f64> {
        &self.client
    }

    pub fn display(&self) -> &SteppedCurve<i64> {
        &self.display
    }

    pub fn server(&self) -> &SharedCurve<InterpolatedCurve<f64>> {
        &self.server
    }

    pub fn engine(&self) -> &TimelineEngine {
        &self.engine
    }
}

/// Check that a traversal never goes back in time
pub fn is_time_ordered<'a, T: 'a>(entries: impl Iterator<Item = &'a Keyframe<T>>) -> bool {
    let mut previous = Time::NEG_INFINITY;
    for entry in entries {
        if entry.time < previous {
            return false;
        }
        previous = entry.time;
    }
    true
}

/// Pre-built scenarios
pub mod scenarios {
    use super::*;

    /// Near-perfect delivery
    pub fn clean_link() -> CurveResult<ReplicationSimulator> {
        ReplicationSimulator::new(ReplicationConfig {
            chaos: ChaosConfig::good(),
            ..ReplicationConfig::default()
        })
    }

    /// Heavy loss, long holds, wide rollback window
    pub fn hostile_link() -> CurveResult<ReplicationSimulator> {
        ReplicationSimulator::new(ReplicationConfig {
            timeline: TimelineConfig::high_latency(),
            chaos: ChaosConfig::hostile(),
            ticks: 800,
            ..ReplicationConfig::default()
        })
    }
}
