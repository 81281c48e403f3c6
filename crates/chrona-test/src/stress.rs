//! Render stress - one simulation writer, many render readers
//!
//! The writer reconciles a shared curve every tick while readers sample it
//! slightly behind the simulation, the way a renderer does. Every sample must
//! observe a complete curve state.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrona_curve::{
    InterpolatedCurve, SharedCurve, Synchronizer, Time, TimeContext, TimeCurve,
};
use chrona_time::PresentationClock;

use crate::replication::is_time_ordered;

/// Stress configuration
#[derive(Clone, Debug)]
pub struct StressConfig {
    /// Reader threads
    pub readers: usize,
    /// Ticks written by the simulation thread
    pub writes: u32,
    /// Simulation step
    pub tick_interval: Duration,
    /// How far rendering trails the simulation
    pub render_lag: Duration,
    /// History kept by the writer's pruning
    pub retention: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            readers: 4,
            writes: 2000,
            tick_interval: Duration::from_millis(10),
            render_lag: Duration::from_millis(50),
            retention: Duration::from_millis(200),
        }
    }
}

/// Stress results
#[derive(Clone, Debug, Default)]
pub struct StressReport {
    pub writes: u64,
    pub reads: u64,
    /// Samples that saw a half-applied update
    pub torn: u64,
    /// Traversals that were not time-ordered
    pub ordering_violations: u64,
}

impl StressReport {
    pub fn is_clean(&self) -> bool {
        self.torn == 0 && self.ordering_violations == 0
    }
}

/// Single-writer / multi-reader harness over [`SharedCurve`]
pub struct RenderStress {
    config: StressConfig,
    curve: SharedCurve<InterpolatedCurve<[f64; 2]>>,
}

impl RenderStress {
    pub fn new(config: StressConfig) -> Self {
        RenderStress {
            config,
            curve: SharedCurve::new(InterpolatedCurve::new([0.0, 0.0])),
        }
    }

    pub fn run(&self) -> StressReport {
        // Latest fully written simulation time, in micros
        let published = AtomicI64::new(i64::MIN);
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let readers: Vec<_> = (0..self.config.readers)
                .map(|_| scope.spawn(|| self.read_loop(&published, &done)))
                .collect();

            let writes = self.write_loop(&published);
            done.store(true, Ordering::Release);

            let mut report = StressReport {
                writes,
                ..StressReport::default()
            };
            for reader in readers {
                // A panicking reader counts as a torn observation
                let partial = reader.join().unwrap_or(StressReport {
                    torn: 1,
                    ..StressReport::default()
                });
                report.reads += partial.reads;
                report.torn += partial.torn;
                report.ordering_violations += partial.ordering_violations;
            }
            report
        })
    }

    fn write_loop(&self, published: &AtomicI64) -> u64 {
        let mut now = Time::ZERO;
        for i in 0..self.config.writes {
            now = now + self.config.tick_interval;
            let x = f64::from(i);
            let ctx = TimeContext::new(now, now - self.config.retention);

            // Erase-then-insert happens under one write lock
            self.curve.with_write(|curve| {
                Synchronizer::new(ctx).sync(curve, &|_: Time| Some([x, -x]));
                curve.clean(ctx.horizon);
            });
            published.store(now.as_micros(), Ordering::Release);
        }
        u64::from(self.config.writes)
    }

    fn read_loop(&self, published: &AtomicI64, done: &AtomicBool) -> StressReport {
        let mut report = StressReport::default();
        while !done.load(Ordering::Acquire) {
            let latest = published.load(Ordering::Acquire);
            if latest == i64::MIN {
                std::thread::yield_now();
                continue;
            }
            let latest = Time::from_micros(latest);
            let render = PresentationClock::render_time(latest, self.config.render_lag);

            self.curve.with_read(|curve| {
                report.reads += 1;

                let [a, b] = curve.get(render);
                if a != -b {
                    report.torn += 1;
                }
                // The published keyframe must be visible
                if curve.store().last().map_or(true, |last| last.time < latest) {
                    report.torn += 1;
                }
                if !is_time_ordered(curve.iter()) {
                    report.ordering_violations += 1;
                }
            });
        }
        report
    }

    pub fn curve(&self) -> &SharedCurve<InterpolatedCurve<[f64; 2]>> {
        &self.curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stress_default() {
        let stress = RenderStress::new(StressConfig::default());
        let report = stress.run();

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.writes, 2000);
    }

    #[test]
    fn test_writer_prunes_history() {
        let stress = RenderStress::new(StressConfig {
            readers: 2,
            writes: 500,
            ..StressConfig::default()
        });
        let report = stress.run();
        assert!(report.is_clean(), "{report:?}");

        let curve = stress.curve().read();
        // 200ms retention at 10ms per tick
        assert!(curve.len() <= 21);
        assert_eq!(curve.get(Time::from_millis(5000)), [499.0, -499.0]);
    }
}
