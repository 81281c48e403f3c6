//! Curve Fuzzer - randomized operation sequences against a reference model
//!
//! Tests:
//! - Ordering under corrective inserts
//! - Stepped sampling against a linear scan
//! - Range iteration and erase-in-place
//! - Pruning and truncation
//! - Stale position detection

use chrona_curve::{
    CurveError, Keyframe, Position, SteppedCurve, Time, TimeCurve, TimeOrderedStore,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of operations to generate
    pub op_count: usize,
    /// Time span the operations draw from (ms)
    pub time_span_ms: i64,
    /// Probability that an operation removes entries
    pub removal_prob: f64,
    /// Probability that an operation queries instead of mutating
    pub query_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            op_count: 1000,
            time_span_ms: 500,
            removal_prob: 0.1,
            query_prob: 0.3,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            op_count: 200,
            time_span_ms: 100,
            removal_prob: 0.05,
            query_prob: 0.3,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            op_count: 20_000,
            time_span_ms: 2_000,
            removal_prob: 0.15,
            query_prob: 0.4,
            seed: 42,
        }
    }
}

/// Generated operation
#[derive(Clone, Debug, PartialEq)]
pub enum CurveOp {
    Insert { time: Time, value: u32 },
    Query { time: Time },
    Between { from: Time, to: Time },
    RemoveOdd { from: Time, to: Time },
    Clean { time: Time },
    EraseFrom { time: Time },
    EraseAfter { time: Time },
}

/// Fuzz run results
#[derive(Clone, Debug, Default)]
pub struct FuzzResult {
    pub ops: u64,
    pub inserts: u64,
    pub queries: u64,
    pub removed: u64,
    /// Observations that disagreed with the reference model
    pub mismatches: u64,
    /// Stale positions correctly rejected
    pub stale_detected: u64,
    /// Stale positions wrongly accepted
    pub stale_missed: u64,
}

impl FuzzResult {
    pub fn is_valid(&self) -> bool {
        self.mismatches == 0 && self.stale_missed == 0
    }
}

/// Curve fuzzer
pub struct CurveFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
    curve: SteppedCurve<u32>,
    /// Reference: insertion-stable sorted vector
    model: Vec<(Time, u32)>,
    /// Position captured before the latest mutation
    held: Option<Position>,
}

impl CurveFuzzer {
    /// Create a new fuzzer
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        CurveFuzzer {
            config,
            rng,
            curve: SteppedCurve::new(0),
            model: Vec::new(),
            held: None,
        }
    }

    fn random_time(&mut self) -> Time {
        Time::from_millis(self.rng.gen_range(0..=self.config.time_span_ms))
    }

    /// Generate a random operation
    pub fn generate_op(&mut self) -> CurveOp {
        let roll: f64 = self.rng.gen();
        let time = self.random_time();

        if roll < self.config.removal_prob {
            return match self.rng.gen_range(0..4) {
                0 => {
                    let to = self.random_time();
                    CurveOp::RemoveOdd {
                        from: time.min(to),
                        to: time.max(to),
                    }
                }
                1 => CurveOp::Clean { time },
                2 => CurveOp::EraseFrom { time },
                _ => CurveOp::EraseAfter { time },
            };
        }
        if roll < self.config.removal_prob + self.config.query_prob {
            return if self.rng.gen_bool(0.5) {
                CurveOp::Query { time }
            } else {
                let to = self.random_time();
                CurveOp::Between {
                    from: time.min(to),
                    to: time.max(to),
                }
            };
        }
        CurveOp::Insert {
            time,
            value: self.rng.gen(),
        }
    }

    /// Apply one operation to the curve and the model, checking agreement
    pub fn apply(&mut self, op: &CurveOp, result: &mut FuzzResult) {
        result.ops += 1;

        match *op {
            CurveOp::Insert { time, value } => {
                result.inserts += 1;
                self.curve.set(time, value);
                let at = self.model.partition_point(|&(t, _)| t <= time);
                self.model.insert(at, (time, value));
            }
            CurveOp::Query { time } => {
                result.queries += 1;
                let expected = self
                    .model
                    .iter()
                    .rev()
                    .find(|&&(t, _)| t <= time)
                    .map_or(0, |&(_, v)| v);
                if self.curve.get(time) != expected {
                    result.mismatches += 1;
                }
            }
            CurveOp::Between { from, to } => {
                result.queries += 1;
                let visited: Vec<_> = self
                    .curve
                    .between(from, to)
                    .map(|e| (e.time, e.value))
                    .collect();
                let expected: Vec<_> = self
                    .model
                    .iter()
                    .copied()
                    .filter(|&(t, _)| t >= from && t < to)
                    .collect();
                if visited != expected {
                    result.mismatches += 1;
                }
            }
            CurveOp::RemoveOdd { from, to } => {
                let removed = self
                    .curve
                    .store_mut()
                    .cursor_between(from, to)
                    .remove_where(|e| e.value % 2 == 1);
                let before = self.model.len();
                self.model
                    .retain(|&(t, v)| !(t >= from && t < to && v % 2 == 1));
                if removed != before - self.model.len() {
                    result.mismatches += 1;
                }
                result.removed += removed as u64;
            }
            CurveOp::Clean { time } => {
                result.removed += self.curve.clean(time) as u64;
                self.model.retain(|&(t, _)| t >= time);
            }
            CurveOp::EraseFrom { time } => {
                result.removed += self.curve.store_mut().erase_from(time) as u64;
                self.model.retain(|&(t, _)| t < time);
            }
            CurveOp::EraseAfter { time } => {
                result.removed += self.curve.store_mut().erase_after(time) as u64;
                self.model.retain(|&(t, _)| t <= time);
            }
        }

        self.check_positions(result);
    }

    /// A position taken before a mutation must be rejected afterwards
    fn check_positions(&mut self, result: &mut FuzzResult) {
        let store = self.curve.store();
        if let Some(held) = self.held.take() {
            let stale = held.generation() != store.generation();
            match (stale, store.get(held)) {
                (true, Err(CurveError::StalePosition { .. })) => result.stale_detected += 1,
                (false, Ok(_)) => {}
                _ => result.stale_missed += 1,
            }
        }
        if !store.is_empty() {
            self.held = Some(store.position_at(store.len() / 2));
        }
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzResult {
        let mut result = FuzzResult::default();

        for _ in 0..self.config.op_count {
            let op = self.generate_op();
            self.apply(&op, &mut result);
        }

        if !matches_model(self.curve.store(), &self.model) {
            result.mismatches += 1;
        }
        result
    }

    pub fn curve(&self) -> &SteppedCurve<u32> {
        &self.curve
    }
}

/// Compare a store against the reference entry list
pub fn matches_model(store: &TimeOrderedStore<u32>, model: &[(Time, u32)]) -> bool {
    store.len() == model.len()
        && store
            .iter()
            .zip(model)
            .all(|(entry, &(t, v))| entry.time == t && entry.value == v)
}

/// Replay a fixed operation sequence on a fresh curve
pub fn replay(ops: &[CurveOp]) -> (Vec<Keyframe<u32>>, FuzzResult) {
    let mut fuzzer = CurveFuzzer::new(FuzzerConfig::default());
    let mut result = FuzzResult::default();
    for op in ops {
        fuzzer.apply(op, &mut result);
    }
    (fuzzer.curve.iter().cloned().collect(), result)
}
