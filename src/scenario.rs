use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::checks::{CheckResults, CheckSet, DEFAULT_LATENCY_THRESHOLD};
use crate::config::DEFAULT_TARGET_URL;
use crate::data_models::{ResponseSample, SearchRequest, SearchResponse};

pub const DEFAULT_THINK_TIME: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub url: String,
    pub request: SearchRequest,
    /// Pause between two iterations of the same virtual user.
    pub think_time: Duration,
    pub latency_threshold: Duration,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
            request: SearchRequest::default(),
            think_time: DEFAULT_THINK_TIME,
            latency_threshold: DEFAULT_LATENCY_THRESHOLD,
        }
    }
}

/// Result of one pass through the scenario.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub sample: ResponseSample,
    pub checks: CheckResults,
}

impl IterationOutcome {
    pub fn evaluate(check_set: &CheckSet, sample: ResponseSample) -> IterationOutcome {
        let checks = check_set.evaluate(&sample);
        IterationOutcome { sample, checks }
    }
}

/// What a virtual user runs: one iteration, then a pause of `think_time`.
pub trait Workload: Send + Sync + 'static {
    fn iterate(&self) -> impl Future<Output = IterationOutcome> + Send;

    fn think_time(&self) -> Duration;
}

/// Builds the client shared by every virtual user.
pub fn build_client(request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// One flight search per iteration, followed by the three checks.
pub struct FlightSearchScenario {
    client: reqwest::Client,
    options: ScenarioOptions,
    checks: CheckSet,
}

impl FlightSearchScenario {
    pub fn new(client: reqwest::Client, options: ScenarioOptions) -> Self {
        let checks = CheckSet::new(options.latency_threshold);
        Self {
            client,
            options,
            checks,
        }
    }

    pub fn check_set(&self) -> CheckSet {
        self.checks
    }

    /// Runs one iteration. Failures of any kind end up as failed checks.
    pub async fn iterate(&self) -> IterationOutcome {
        let sample = self.search().await;
        let outcome = IterationOutcome::evaluate(&self.checks, sample);
        if !outcome.checks.all_passed() {
            log::debug!(
                "checks failed: {:?} (status {:?}, {:?})",
                outcome.checks.failed().collect::<Vec<_>>(),
                outcome.sample.status,
                outcome.sample.duration,
            );
        }
        outcome
    }

    async fn search(&self) -> ResponseSample {
        let url = &self.options.url;
        let start = Instant::now();

        let res = match self
            .client
            .post(url)
            .json(&self.options.request)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                log::warn!("search request to {url} failed: {:#}", e);
                return ResponseSample::transport_error(start.elapsed());
            }
        };

        let status = res.status().as_u16();
        let body = res.bytes().await;
        let duration = start.elapsed();

        match body {
            Ok(body) => {
                ResponseSample::new(Some(status), duration, SearchResponse::count_flights(&body))
            }
            Err(e) => {
                log::warn!("error reading search response from {url}, error: {:#}", e);
                ResponseSample::new(Some(status), duration, None)
            }
        }
    }
}

impl Workload for FlightSearchScenario {
    fn iterate(&self) -> impl Future<Output = IterationOutcome> + Send {
        FlightSearchScenario::iterate(self)
    }

    fn think_time(&self) -> Duration {
        self.options.think_time
    }
}
