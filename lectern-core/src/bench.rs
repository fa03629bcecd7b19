//! Wall-clock benchmarks for engine phases.
//!
//! A [`BenchmarkRegistry`] owns named [`BenchmarkGroup`]s; a group hands out
//! [`Benchmark`] timers by label. Timers nest: overlapping `before()` calls
//! (for example several pages waiting on the same engine init) measure the
//! outermost span once while still counting every call.

use lectern_log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Share of the run above which a benchmark is reported.
pub const DEFAULT_MIN_PERCENT: f64 = 8.0;

#[derive(Debug, Default)]
struct TimerState {
    depth: usize,
    started: Option<Instant>,
    total: Duration,
    calls: u64,
}

/// A named timer. Clones share the same measurements.
#[derive(Debug, Clone)]
pub struct Benchmark {
    label: Arc<str>,
    state: Arc<Mutex<TimerState>>,
}

impl Benchmark {
    fn new(label: &str) -> Self {
        Self {
            label: Arc::from(label),
            state: Arc::new(Mutex::new(TimerState::default())),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn before(&self) {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.depth == 0 {
            state.started = Some(Instant::now());
        }
        state.depth += 1;
    }

    pub fn after(&self) {
        let mut state = self.state.lock();
        if state.depth == 0 {
            warn!("Benchmark ({}) stopped without being started", self.label);
            return;
        }
        state.depth -= 1;
        if state.depth == 0 {
            if let Some(started) = state.started.take() {
                state.total += started.elapsed();
            }
        }
    }

    /// `before()` now, `after()` when the guard drops.
    pub fn start(&self) -> BenchmarkGuard {
        self.before();
        BenchmarkGuard {
            benchmark: self.clone(),
        }
    }

    pub fn is_timing(&self) -> bool {
        self.state.lock().depth > 0
    }

    pub fn total(&self) -> Duration {
        self.state.lock().total
    }

    pub fn calls(&self) -> u64 {
        self.state.lock().calls
    }
}

/// Stops its benchmark on drop, including on early returns.
#[must_use = "the benchmark stops as soon as the guard is dropped"]
pub struct BenchmarkGuard {
    benchmark: Benchmark,
}

impl Drop for BenchmarkGuard {
    fn drop(&mut self) {
        self.benchmark.after();
    }
}

/// One reported line of a finished group.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub label: String,
    pub total: Duration,
    pub calls: u64,
    pub percent: f64,
}

/// A set of benchmarks reported together.
#[derive(Debug, Clone)]
pub struct BenchmarkGroup {
    name: Arc<str>,
    min_percent: f64,
    benchmarks: Arc<Mutex<HashMap<String, Benchmark>>>,
}

impl BenchmarkGroup {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            min_percent: DEFAULT_MIN_PERCENT,
            benchmarks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_min_percent(mut self, min_percent: f64) -> Self {
        self.min_percent = min_percent;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The timer for `label`, created on first use.
    pub fn get(&self, label: &str) -> Benchmark {
        self.benchmarks
            .lock()
            .entry(label.to_string())
            .or_insert_with(|| Benchmark::new(label))
            .clone()
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.benchmarks.lock().keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Summaries of the benchmarks that took at least `min_percent` of `run`,
    /// slowest first. Each one is logged.
    pub fn finish(&self, run: Duration) -> Vec<BenchmarkSummary> {
        let run_secs = run.as_secs_f64();
        let mut summaries: Vec<BenchmarkSummary> = self
            .benchmarks
            .lock()
            .values()
            .filter(|bench| bench.calls() > 0)
            .map(|bench| {
                let total = bench.total();
                let percent = if run_secs > 0.0 {
                    total.as_secs_f64() / run_secs * 100.0
                } else {
                    0.0
                };
                BenchmarkSummary {
                    label: bench.label().to_string(),
                    total,
                    calls: bench.calls(),
                    percent,
                }
            })
            .filter(|summary| summary.percent >= self.min_percent)
            .collect();

        summaries.sort_by(|a, b| b.total.cmp(&a.total));

        for summary in &summaries {
            info!(
                "Benchmark {} ({}): {:.1}ms ({:.1}%, called {}x)",
                self.name,
                summary.label,
                summary.total.as_secs_f64() * 1000.0,
                summary.percent,
                summary.calls
            );
        }

        summaries
    }
}

/// All benchmark groups of one generator run.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRegistry {
    groups: Arc<Mutex<HashMap<String, BenchmarkGroup>>>,
}

impl BenchmarkRegistry {
    /// Group used for engine phases.
    pub const AGGREGATE: &'static str = "Aggregate";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, name: &str) -> BenchmarkGroup {
        self.groups
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating benchmark group {}", name);
                BenchmarkGroup::new(name)
            })
            .clone()
    }

    pub fn aggregate(&self) -> BenchmarkGroup {
        self.group(Self::AGGREGATE)
    }

    /// Finish every group against the run duration.
    pub fn finish(&self, run: Duration) -> Vec<BenchmarkSummary> {
        let groups: Vec<BenchmarkGroup> = self.groups.lock().values().cloned().collect();
        groups.iter().flat_map(|group| group.finish(run)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_timing_counts_every_call() {
        let bench = BenchmarkGroup::new("Aggregate").get("Engine (txt) Init");

        bench.before();
        bench.before();
        assert!(bench.is_timing());
        bench.after();
        assert!(bench.is_timing());
        bench.after();
        assert!(!bench.is_timing());

        assert_eq!(bench.calls(), 2);
    }

    #[test]
    fn test_after_without_before_is_ignored() {
        let bench = BenchmarkGroup::new("Aggregate").get("stray");
        bench.after();
        assert!(!bench.is_timing());
        assert_eq!(bench.total(), Duration::ZERO);
    }

    #[test]
    fn test_group_shares_timers_by_label() {
        let group = BenchmarkGroup::new("Aggregate");
        let a = group.get("render");
        let b = group.get("render");

        a.before();
        assert!(b.is_timing());
        b.after();
        assert!(!a.is_timing());
        assert_eq!(group.labels(), vec!["render".to_string()]);
    }

    #[test]
    fn test_guard_stops_on_drop() {
        let bench = BenchmarkGroup::new("Aggregate").get("guarded");
        {
            let _guard = bench.start();
            assert!(bench.is_timing());
        }
        assert!(!bench.is_timing());
        assert_eq!(bench.calls(), 1);
    }

    #[test]
    fn test_finish_filters_by_share() {
        let group = BenchmarkGroup::new("Aggregate").with_min_percent(0.0);
        let slow = group.get("slow");
        {
            let _guard = slow.start();
            std::thread::sleep(Duration::from_millis(5));
        }
        group.get("unused");

        let summaries = group.finish(Duration::from_millis(10));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].label, "slow");
        assert!(summaries[0].percent > 0.0);

        let strict = BenchmarkGroup::new("Aggregate").with_min_percent(101.0);
        drop(strict.get("x").start());
        assert!(strict.finish(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_registry_reuses_groups() {
        let registry = BenchmarkRegistry::new();
        registry.aggregate().get("a").before();
        assert!(registry.group("Aggregate").get("a").is_timing());
    }
}
