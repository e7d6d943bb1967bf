//! Wall-clock timing of pipeline stages.
//!
//! With the `profile` feature, [`Automaton::tick`] times every stage it runs
//! under the stage's name and counts ticks:
//!
//! ```bash
//! cargo run --release --features profile --example basic_demo
//! ```
//!
//! Stages are kept in the order they were first seen, which for an automaton
//! is pipeline order. Without the feature the profiler stays empty but can
//! still be fed by hand.
//!
//! [`Automaton::tick`]: crate::api::Automaton::tick

use std::fmt;
use std::time::{Duration, Instant};

/// Accumulated timings for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub name: &'static str,
    pub total: Duration,
    pub calls: u64,
    pub fastest: Duration,
    pub slowest: Duration,
}

impl StageTiming {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Duration::ZERO,
            calls: 0,
            fastest: Duration::MAX,
            slowest: Duration::ZERO,
        }
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
        }
    }

    fn add(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.calls += 1;
        self.fastest = self.fastest.min(elapsed);
        self.slowest = self.slowest.max(elapsed);
    }
}

#[derive(Debug, Default, Clone)]
pub struct Profiler {
    stages: Vec<StageTiming>,
    ticks: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one measured run of `name`.
    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        match self.stages.iter_mut().find(|s| s.name == name) {
            Some(stage) => stage.add(elapsed),
            None => {
                let mut stage = StageTiming::new(name);
                stage.add(elapsed);
                self.stages.push(stage);
            }
        }
    }

    /// Run `f`, recording how long it took under `name`.
    pub fn time<R>(&mut self, name: &'static str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn stage(&self, name: &str) -> Option<&StageTiming> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Stages in first-seen order.
    pub fn stages(&self) -> &[StageTiming] {
        &self.stages
    }

    /// Time spent in all stages together.
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.total).sum()
    }

    pub fn print_summary(&self) {
        println!("\n{self}");
    }

    pub fn reset(&mut self) {
        self.stages.clear();
        self.ticks = 0;
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        writeln!(f, "stage timings over {} ticks", self.ticks)?;
        writeln!(
            f,
            "{:<16} {:>8} {:>11} {:>11} {:>11} {:>6}",
            "stage", "calls", "mean", "fastest", "slowest", "share"
        )?;
        for s in &self.stages {
            let share = if total.is_zero() {
                0.0
            } else {
                s.total.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            let fastest = if s.calls == 0 { Duration::ZERO } else { s.fastest };
            writeln!(
                f,
                "{:<16} {:>8} {:>11.2?} {:>11.2?} {:>11.2?} {:>5.1}%",
                s.name,
                s.calls,
                s.mean(),
                fastest,
                s.slowest,
                share
            )?;
        }
        write!(f, "{:<16} {:>8} {:>11.2?}", "all", "", total)
    }
}
