use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hdrhistogram::Histogram;
use nanoid::nanoid;
use serde::Serialize;

use crate::checks::{Check, CheckSet};
use crate::scenario::IterationOutcome;

/// Status-code bucket for requests that never got a response.
pub const TRANSPORT_ERROR: &str = "error";

#[derive(Debug, Default, Clone, Copy)]
struct CheckCounter {
    passes: u64,
    fails: u64,
}

/// Shared sink for every virtual user's results.
pub struct MetricsCollector {
    run_id: String,
    started_at: DateTime<Utc>,
    start: Instant,
    check_set: CheckSet,
    iterations: AtomicU64,
    checks: DashMap<Check, CheckCounter>,
    status_codes: DashMap<String, u64>,
    // microseconds
    durations: Mutex<Histogram<u64>>,
    active_vus: AtomicUsize,
    peak_vus: AtomicUsize,
}

impl MetricsCollector {
    pub fn new(check_set: CheckSet) -> Self {
        let checks = DashMap::new();
        for check in Check::ALL {
            checks.insert(check, CheckCounter::default());
        }
        Self {
            run_id: nanoid!(10),
            started_at: Utc::now(),
            start: Instant::now(),
            check_set,
            iterations: AtomicU64::new(0),
            checks,
            status_codes: DashMap::new(),
            durations: Mutex::new(new_histogram()),
            active_vus: AtomicUsize::new(0),
            peak_vus: AtomicUsize::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record(&self, outcome: &IterationOutcome) {
        self.iterations.fetch_add(1, Ordering::Relaxed);

        for (check, ok) in outcome.checks.iter() {
            let mut counter = self.checks.entry(check).or_default();
            if ok {
                counter.passes += 1;
            } else {
                counter.fails += 1;
            }
        }

        let status = outcome
            .sample
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| TRANSPORT_ERROR.to_string());
        *self.status_codes.entry(status).or_insert(0) += 1;

        let micros = outcome.sample.duration.as_micros() as u64;
        if let Ok(mut durations) = self.durations.lock() {
            if let Err(e) = durations.record(micros) {
                log::warn!("failed to record request duration {micros}us: {e}");
            }
        }
    }

    pub fn set_active_vus(&self, active: usize) {
        self.active_vus.store(active, Ordering::Relaxed);
        self.peak_vus.fetch_max(active, Ordering::Relaxed);
    }

    pub fn active_vus(&self) -> usize {
        self.active_vus.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> Summary {
        let checks = Check::ALL
            .into_iter()
            .map(|check| {
                let counter = self
                    .checks
                    .get(&check)
                    .map(|c| *c)
                    .unwrap_or_default();
                CheckSummary::new(self.check_set.label(check), check, counter)
            })
            .collect();

        let latency = self
            .durations
            .lock()
            .map(|d| LatencyStats::from_histogram(&d))
            .unwrap_or_default();

        let status_codes = self
            .status_codes
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        Summary {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            elapsed_ms: self.start.elapsed().as_millis() as u64,
            iterations: self.iterations(),
            peak_vus: self.peak_vus.load(Ordering::Relaxed),
            checks,
            latency,
            status_codes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub check: Check,
    pub passes: u64,
    pub fails: u64,
    pub rate: f64,
}

impl CheckSummary {
    fn new(name: String, check: Check, counter: CheckCounter) -> Self {
        let total = counter.passes + counter.fails;
        let rate = if total == 0 {
            0.0
        } else {
            counter.passes as f64 / total as f64
        };
        Self {
            name,
            check,
            passes: counter.passes,
            fails: counter.fails,
            rate,
        }
    }
}

/// Request duration distribution, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub med_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::default();
        }
        let to_ms = |us: u64| us as f64 / 1000.0;

        Self {
            count: hist.len() as usize,
            min_ms: to_ms(hist.min()),
            avg_ms: hist.mean() / 1000.0,
            med_ms: to_ms(hist.value_at_quantile(0.50)),
            p90_ms: to_ms(hist.value_at_quantile(0.90)),
            p95_ms: to_ms(hist.value_at_quantile(0.95)),
            max_ms: to_ms(hist.max()),
        }
    }
}

/// 1µs resolution, 3 significant digits, grows past 60s if it has to.
fn new_histogram() -> Histogram<u64> {
    let mut hist =
        Histogram::new_with_max(60_000_000, 3).expect("constant histogram bounds are valid");
    hist.auto(true);
    hist
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub iterations: u64,
    pub peak_vus: usize,
    pub checks: Vec<CheckSummary>,
    pub latency: LatencyStats,
    pub status_codes: BTreeMap<String, u64>,
}

impl Summary {
    pub fn check(&self, check: Check) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.check == check)
    }

    pub fn failed_checks(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_checks() > 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} started {} ({:.1}s, {} iterations, peak {} VUs)",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed_ms as f64 / 1000.0,
            self.iterations,
            self.peak_vus,
        )?;
        writeln!(f)?;

        let width = self.checks.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for c in &self.checks {
            let mark = if c.fails == 0 { "✓" } else { "✗" };
            writeln!(
                f,
                "  {mark} {:<width$}  {:>7.2}%  ✓ {}  ✗ {}",
                c.name,
                c.rate * 100.0,
                c.passes,
                c.fails,
            )?;
        }
        writeln!(f)?;

        let l = &self.latency;
        writeln!(
            f,
            "  http_req_duration: avg={:.2}ms min={:.2}ms med={:.2}ms p(90)={:.2}ms p(95)={:.2}ms max={:.2}ms",
            l.avg_ms, l.min_ms, l.med_ms, l.p90_ms, l.p95_ms, l.max_ms
        )?;

        let codes: Vec<String> = self
            .status_codes
            .iter()
            .map(|(code, n)| format!("{code}={n}"))
            .collect();
        write!(f, "  status codes: {}", codes.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::ResponseSample;
    use std::time::Duration;

    fn outcome(status: Option<u16>, ms: u64, flights: Option<usize>) -> IterationOutcome {
        IterationOutcome::evaluate(
            &CheckSet::default(),
            ResponseSample::new(status, Duration::from_millis(ms), flights),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        // hdr buckets at 3 significant digits
        let tolerance = expected * 0.002;
        assert!(
            (actual - expected).abs() <= tolerance,
            "{actual} is not within {tolerance} of {expected}"
        );
    }

    #[test]
    fn latency_stats() {
        let metrics = MetricsCollector::new(CheckSet::default());
        for ms in [40, 10, 30, 20] {
            metrics.record(&outcome(Some(200), ms, Some(1)));
        }

        let stats = metrics.summary().latency;
        assert_eq!(stats.count, 4);
        assert_close(stats.min_ms, 10.0);
        assert_close(stats.max_ms, 40.0);
        assert_close(stats.avg_ms, 25.0);
        assert_close(stats.med_ms, 20.0);
        assert_close(stats.p90_ms, 40.0);
        assert_close(stats.p95_ms, 40.0);
    }

    #[test]
    fn latency_memory_does_not_grow_with_samples() {
        let metrics = MetricsCollector::new(CheckSet::default());
        let footprint = |m: &MetricsCollector| m.durations.lock().unwrap().distinct_values();
        metrics.record(&outcome(Some(200), 12, Some(1)));
        let before = footprint(&metrics);
        for _ in 0..10_000 {
            metrics.record(&outcome(Some(200), 12, Some(1)));
        }
        assert_eq!(footprint(&metrics), before);
        assert_eq!(metrics.summary().latency.count, 10_001);
    }

    #[test]
    fn durations_past_a_minute_are_kept() {
        let metrics = MetricsCollector::new(CheckSet::default());
        metrics.record(&outcome(None, 90_000, None));
        assert_close(metrics.summary().latency.max_ms, 90_000.0);
    }

    #[test]
    fn records_checks_and_status_codes() {
        let metrics = MetricsCollector::new(CheckSet::default());
        metrics.record(&outcome(Some(200), 20, Some(2)));
        metrics.record(&outcome(Some(200), 700, Some(2)));
        metrics.record(&outcome(Some(500), 10, None));
        metrics.record(&outcome(None, 5, None));

        let summary = metrics.summary();
        assert_eq!(summary.iterations, 4);

        let status = summary.check(Check::Status).unwrap();
        assert_eq!((status.passes, status.fails), (2, 2));
        assert_eq!(status.rate, 0.5);

        let latency = summary.check(Check::Latency).unwrap();
        assert_eq!((latency.passes, latency.fails), (3, 1));

        let payload = summary.check(Check::Payload).unwrap();
        assert_eq!((payload.passes, payload.fails), (2, 2));

        assert_eq!(summary.status_codes.get("200"), Some(&2));
        assert_eq!(summary.status_codes.get("500"), Some(&1));
        assert_eq!(summary.status_codes.get(TRANSPORT_ERROR), Some(&1));
        assert_eq!(summary.failed_checks(), 5);
        assert!(summary.has_failures());
    }

    #[test]
    fn tracks_peak_vus() {
        let metrics = MetricsCollector::new(CheckSet::default());
        metrics.set_active_vus(3);
        metrics.set_active_vus(12);
        metrics.set_active_vus(0);
        assert_eq!(metrics.active_vus(), 0);
        assert_eq!(metrics.summary().peak_vus, 12);
    }

    #[test]
    fn empty_summary_renders() {
        let summary = MetricsCollector::new(CheckSet::default()).summary();
        assert!(!summary.has_failures());
        let text = summary.to_string();
        assert!(text.contains("status is 200"));
        assert!(text.contains("response time < 500ms"));
        assert!(text.contains("has flights in response"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["iterations"], 0);
        assert_eq!(json["checks"][1]["check"], "latency");
    }
}
