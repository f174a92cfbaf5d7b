use std::time::Duration;

use serde::Serialize;

use crate::data_models::ResponseSample;

pub const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(500);

/// The assertions made against every search response. None of them abort an
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Status,
    Latency,
    Payload,
}

impl Check {
    pub const ALL: [Check; 3] = [Check::Status, Check::Latency, Check::Payload];

    fn index(self) -> usize {
        match self {
            Check::Status => 0,
            Check::Latency => 1,
            Check::Payload => 2,
        }
    }
}

/// Evaluates the three checks. Only the latency threshold is tunable.
#[derive(Debug, Clone, Copy)]
pub struct CheckSet {
    latency_threshold: Duration,
}

impl Default for CheckSet {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_THRESHOLD)
    }
}

impl CheckSet {
    pub fn new(latency_threshold: Duration) -> CheckSet {
        CheckSet { latency_threshold }
    }

    /// Human readable name, as shown in the report.
    pub fn label(&self, check: Check) -> String {
        match check {
            Check::Status => "status is 200".to_string(),
            Check::Latency => format!(
                "response time < {}ms",
                self.latency_threshold.as_millis()
            ),
            Check::Payload => "has flights in response".to_string(),
        }
    }

    pub fn evaluate(&self, sample: &ResponseSample) -> CheckResults {
        let mut passed = [false; 3];
        for check in Check::ALL {
            passed[check.index()] = match check {
                Check::Status => sample.status == Some(200),
                Check::Latency => sample.duration < self.latency_threshold,
                Check::Payload => sample.flights.is_some_and(|n| n > 0),
            };
        }
        CheckResults { passed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResults {
    passed: [bool; 3],
}

impl CheckResults {
    pub fn passed(&self, check: Check) -> bool {
        self.passed[check.index()]
    }

    pub fn all_passed(&self) -> bool {
        self.passed.iter().all(|p| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Check, bool)> + '_ {
        Check::ALL.into_iter().map(move |c| (c, self.passed(c)))
    }

    pub fn failed(&self) -> impl Iterator<Item = Check> + '_ {
        self.iter().filter(|(_, ok)| !ok).map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: Option<u16>, ms: u64, flights: Option<usize>) -> ResponseSample {
        ResponseSample::new(status, Duration::from_millis(ms), flights)
    }

    #[test]
    fn all_checks_pass_on_fast_ok_response() {
        let results = CheckSet::default().evaluate(&sample(Some(200), 50, Some(3)));
        assert!(results.all_passed());
        assert_eq!(results.failed().count(), 0);
    }

    #[test]
    fn status_check_fails_alone() {
        let results = CheckSet::default().evaluate(&sample(Some(500), 50, Some(1)));
        assert!(!results.passed(Check::Status));
        assert!(results.passed(Check::Latency));
        assert!(results.passed(Check::Payload));
        assert_eq!(results.failed().collect::<Vec<_>>(), vec![Check::Status]);
    }

    #[test]
    fn latency_threshold_is_strict() {
        let checks = CheckSet::default();
        assert!(checks.evaluate(&sample(Some(200), 499, Some(1))).passed(Check::Latency));
        assert!(!checks.evaluate(&sample(Some(200), 500, Some(1))).passed(Check::Latency));

        let slow = checks.evaluate(&sample(Some(200), 900, Some(1)));
        assert!(slow.passed(Check::Status));
        assert!(slow.passed(Check::Payload));
    }

    #[test]
    fn payload_check_needs_non_empty_flights() {
        let checks = CheckSet::default();
        assert!(!checks.evaluate(&sample(Some(200), 10, Some(0))).passed(Check::Payload));
        assert!(!checks.evaluate(&sample(Some(200), 10, None)).passed(Check::Payload));
        assert!(checks.evaluate(&sample(Some(200), 10, None)).passed(Check::Status));
    }

    #[test]
    fn transport_error_fails_status_and_payload() {
        let results = CheckSet::default().evaluate(&ResponseSample::transport_error(
            Duration::from_millis(3),
        ));
        assert_eq!(
            results.failed().collect::<Vec<_>>(),
            vec![Check::Status, Check::Payload]
        );
    }

    #[test]
    fn labels() {
        let checks = CheckSet::new(Duration::from_millis(250));
        assert_eq!(checks.label(Check::Status), "status is 200");
        assert_eq!(checks.label(Check::Latency), "response time < 250ms");
        assert_eq!(checks.label(Check::Payload), "has flights in response");
    }
}
