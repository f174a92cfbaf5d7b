use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::metrics::{MetricsCollector, Summary};
use crate::scenario::Workload;
use crate::stages::StageProfile;

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

struct VirtualUser {
    id: usize,
    cancel: CancellationToken,
    handle: JoinHandle<u64>,
}

/// Spawns and retires virtual users so that their number follows the stage
/// profile. Every virtual user runs the scenario in its own task.
pub struct Scheduler<W: Workload> {
    scenario: Arc<W>,
    profile: StageProfile,
    metrics: Arc<MetricsCollector>,
    tick: Duration,
}

impl<W: Workload> Scheduler<W> {
    pub fn new(
        scenario: Arc<W>,
        profile: StageProfile,
        metrics: Arc<MetricsCollector>,
    ) -> Scheduler<W> {
        Scheduler {
            scenario,
            profile,
            metrics,
            tick: DEFAULT_TICK,
        }
    }

    /// How often the virtual-user population is reconciled with the profile.
    pub fn with_tick(mut self, tick: Duration) -> Scheduler<W> {
        self.tick = tick;
        self
    }

    /// Runs the whole profile, or until `shutdown` is cancelled, then waits
    /// for in-flight iterations and returns the run summary.
    pub async fn run(self, shutdown: CancellationToken) -> Summary {
        log::info!(
            "starting run {}: {} stages over {:?}, up to {} VUs",
            self.metrics.run_id(),
            self.profile.stages().len(),
            self.profile.total_duration(),
            self.profile.peak_target(),
        );

        let start = Instant::now();
        let mut active: Vec<VirtualUser> = Vec::new();
        let mut retired: Vec<VirtualUser> = Vec::new();
        let mut next_id = 0usize;
        let mut last_target = None;

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("shutdown requested, stopping virtual users");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let Some(target) = self.profile.target_at(start.elapsed()) else {
                break;
            };
            // a VU that ended on its own died; its slot gets refilled below
            reap_finished(&mut active);
            reap_finished(&mut retired);
            if last_target != Some(target) {
                log::debug!("target VUs: {target}");
                last_target = Some(target);
            }

            while active.len() < target {
                active.push(self.spawn_virtual_user(next_id, &shutdown));
                next_id += 1;
            }
            if active.len() > target {
                // newest first
                for vu in active.drain(target..).rev() {
                    vu.cancel.cancel();
                    retired.push(vu);
                }
            }
            self.metrics.set_active_vus(active.len());
        }

        for vu in &active {
            vu.cancel.cancel();
        }
        retired.extend(active.drain(..));

        let (ids, handles): (Vec<usize>, Vec<JoinHandle<u64>>) =
            retired.into_iter().map(|vu| (vu.id, vu.handle)).unzip();
        for (id, res) in ids.into_iter().zip(join_all(handles).await) {
            if let Err(e) = res {
                log::error!("virtual user {id} ended abnormally: {e}");
            }
        }
        self.metrics.set_active_vus(0);

        let summary = self.metrics.summary();
        log::info!(
            "run {} finished: {} iterations, {} failed checks",
            summary.run_id,
            summary.iterations,
            summary.failed_checks(),
        );
        summary
    }

    fn spawn_virtual_user(&self, id: usize, shutdown: &CancellationToken) -> VirtualUser {
        let cancel = shutdown.child_token();
        let handle = tokio::spawn(run_virtual_user(
            id,
            self.scenario.clone(),
            self.metrics.clone(),
            cancel.clone(),
        ));
        VirtualUser { id, cancel, handle }
    }
}

/// Drops virtual users whose task has ended, logging the ones that panicked.
fn reap_finished(vus: &mut Vec<VirtualUser>) {
    vus.retain_mut(|vu| {
        if !vu.handle.is_finished() {
            return true;
        }
        match (&mut vu.handle).now_or_never() {
            Some(Ok(iterations)) => {
                log::debug!("virtual user {} done after {iterations} iterations", vu.id);
                false
            }
            Some(Err(e)) => {
                log::error!("virtual user {} ended abnormally: {e}", vu.id);
                false
            }
            None => true,
        }
    });
}

/// Iterate, record, pause; until cancelled. Cancellation is only observed
/// between iterations, so a started request is always recorded.
async fn run_virtual_user<W: Workload>(
    id: usize,
    scenario: Arc<W>,
    metrics: Arc<MetricsCollector>,
    cancel: CancellationToken,
) -> u64 {
    let mut iterations = 0u64;
    while !cancel.is_cancelled() {
        let outcome = scenario.iterate().await;
        metrics.record(&outcome);
        iterations += 1;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(scenario.think_time()) => {}
        }
    }
    log::debug!("virtual user {id} retired after {iterations} iterations");
    iterations
}
