//! Virtual-user execution engine
//!
//! VU-based executors spawn their maximum number of virtual users up front. A
//! controller publishes the interpolated target every tick and virtual users
//! at or above the target park between iterations. Arrival-rate executors
//! start iterations on a schedule instead. They begin with
//! `pre_allocated_vus` virtual users and grow the pool up to `max_vus`.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use volley_core::{Counter, Executor, MetricsRegistry, Trend, WorkloadProfile};

use crate::error::{RunnerError, RunnerResult};
use crate::report::RunReport;
use crate::shutdown::{StopHandle, StopListener, StopReason};
use crate::workload::{VuContext, Workload};

/// Runner settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// How long in-flight iterations may finish once the run stops
    pub graceful_stop: Duration,
    /// Controller tick
    pub tick: Duration,
    /// Stop the run on Ctrl+C
    pub handle_ctrl_c: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            graceful_stop: Duration::from_secs(30),
            tick: Duration::from_millis(100),
            handle_ctrl_c: true,
        }
    }
}

#[derive(Debug, Clone)]
struct RunnerMetrics {
    iterations: Counter,
    iteration_duration: Trend,
    iteration_errors: Counter,
    dropped_iterations: Counter,
    vus_max: Counter,
}

impl RunnerMetrics {
    fn new(registry: &MetricsRegistry) -> Self {
        Self {
            iterations: registry.counter("iterations"),
            iteration_duration: registry.trend("iteration_duration"),
            iteration_errors: registry.counter("iteration_errors"),
            dropped_iterations: registry.counter("dropped_iterations"),
            vus_max: registry.counter("vus_max"),
        }
    }
}

/// Drives one profile of one workload. A runner is good for a single run.
pub struct Runner {
    config: RunnerConfig,
    metrics: RunnerMetrics,
    stop: StopHandle,
}

impl Runner {
    pub fn new(registry: &MetricsRegistry, config: RunnerConfig) -> Self {
        Self {
            config,
            metrics: RunnerMetrics::new(registry),
            stop: StopHandle::new(),
        }
    }

    /// Handle that stops the run early, as Ctrl+C does
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Set up `workload` and run it with `profile` until the profile ends or
    /// the run is interrupted
    pub async fn run(
        &self,
        scenario: &str,
        profile: &WorkloadProfile,
        workload: Arc<dyn Workload>,
    ) -> RunnerResult<RunReport> {
        profile.validate(scenario)?;

        info!(
            "Setting up workload '{}' for scenario '{}'",
            workload.name(),
            scenario
        );
        workload.setup().await.map_err(RunnerError::Setup)?;

        let ctrl_c = self.config.handle_ctrl_c.then(|| self.stop.stop_on_ctrl_c());

        let started_at = Utc::now();
        let start = Instant::now();
        let max_vus = profile.max_vus();
        self.metrics.vus_max.add(u64::from(max_vus));

        info!(
            "Running scenario '{}' ({}, up to {} VUs, {})",
            scenario,
            profile.executor_name(),
            max_vus,
            humanize(profile.total_duration())
        );

        let scenario: Arc<str> = Arc::from(scenario);
        let mut tasks = JoinSet::new();

        match &profile.executor {
            Executor::ConstantVus { .. } | Executor::RampingVus { .. } => {
                self.drive_vus(profile, &workload, &scenario, start, &mut tasks)
                    .await;
            }
            Executor::RampingArrivalRate { time_unit, .. } => {
                self.drive_arrivals(profile, *time_unit, &workload, &scenario, start, &mut tasks)
                    .await;
            }
        }

        let abandoned = self.drain(&mut tasks).await;

        if let Some(task) = ctrl_c {
            task.abort();
        }

        if let Err(e) = workload.teardown().await {
            warn!("Teardown of workload '{}' failed: {:#}", workload.name(), e);
        }

        let interrupted = self.stop.reason() == Some(StopReason::Interrupted);
        let report = RunReport {
            scenario: scenario.to_string(),
            executor: profile.executor_name().to_string(),
            tags: profile.tags.clone(),
            started_at,
            elapsed: start.elapsed(),
            interrupted,
            iterations: self.metrics.iterations.value(),
            iteration_errors: self.metrics.iteration_errors.value(),
            dropped_iterations: self.metrics.dropped_iterations.value(),
            abandoned_iterations: abandoned,
        };

        info!(
            "Scenario '{}' {} after {}: {} iterations, {} failed",
            report.scenario,
            if interrupted { "interrupted" } else { "finished" },
            humanize(report.elapsed),
            report.iterations,
            report.iteration_errors
        );

        Ok(report)
    }

    async fn drive_vus(
        &self,
        profile: &WorkloadProfile,
        workload: &Arc<dyn Workload>,
        scenario: &Arc<str>,
        start: Instant,
        tasks: &mut JoinSet<()>,
    ) {
        let (target_tx, target_rx) = watch::channel(active_vus(profile, Duration::ZERO));

        for index in 0..profile.max_vus() {
            tasks.spawn(vu_loop(
                index,
                Arc::clone(workload),
                Arc::clone(scenario),
                target_rx.clone(),
                self.stop.subscribe(),
                self.metrics.clone(),
            ));
        }

        let deadline = start + profile.total_duration();
        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop = self.stop.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.stopped() => break,
            }

            let now = Instant::now();
            if now >= deadline {
                self.stop.stop(StopReason::Completed);
                break;
            }

            let target = active_vus(profile, now - start);
            target_tx.send_if_modified(|current| {
                if *current == target {
                    return false;
                }
                debug!("Active VUs {} -> {}", current, target);
                *current = target;
                true
            });
        }
    }

    async fn drive_arrivals(
        &self,
        profile: &WorkloadProfile,
        time_unit: Duration,
        workload: &Arc<dyn Workload>,
        scenario: &Arc<str>,
        start: Instant,
        tasks: &mut JoinSet<()>,
    ) {
        let pool = Arc::new(Mutex::new(VuPool::for_profile(profile)));
        let sequence = AtomicU64::new(0);

        let deadline = start + profile.total_duration();
        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop = self.stop.subscribe();

        let mut due = 0.0_f64;
        let mut last = start;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.stopped() => break,
            }

            let now = Instant::now();
            if now >= deadline {
                self.stop.stop(StopReason::Completed);
                break;
            }

            // Iterations due since the last tick at the interpolated rate
            let rate = profile.target_at(now - start) / time_unit.as_secs_f64();
            due += rate * (now - last).as_secs_f64();
            last = now;

            while due >= 1.0 {
                due -= 1.0;

                let Some(vu) = BusyVu::acquire(&pool) else {
                    self.metrics.dropped_iterations.increment();
                    continue;
                };

                let ctx = VuContext {
                    vu_id: vu.id,
                    iteration: sequence.fetch_add(1, Ordering::Relaxed),
                    scenario: Arc::clone(scenario),
                };
                let workload = Arc::clone(workload);
                let metrics = self.metrics.clone();

                tasks.spawn(async move {
                    let _vu = vu;
                    run_iteration(workload.as_ref(), &ctx, &metrics).await;
                });
            }

            // Reap finished iterations so the set stays small
            while let Some(result) = tasks.try_join_next() {
                self.reap(result);
            }
        }
    }

    /// Wait for in-flight iterations for up to the graceful stop window.
    /// Returns how many were abandoned.
    async fn drain(&self, tasks: &mut JoinSet<()>) -> u64 {
        if tasks.is_empty() {
            return 0;
        }

        debug!(
            "Waiting up to {} for {} tasks to finish",
            humanize(self.config.graceful_stop),
            tasks.len()
        );

        let drained = timeout(self.config.graceful_stop, async {
            while let Some(result) = tasks.join_next().await {
                self.reap(result);
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }

        let abandoned = tasks.len() as u64;
        warn!(
            "Graceful stop of {} elapsed, abandoning {} in-flight tasks",
            humanize(self.config.graceful_stop),
            abandoned
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        abandoned
    }

    /// A panicking iteration counts as a failed one
    fn reap(&self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            if e.is_panic() {
                self.metrics.iteration_errors.increment();
                warn!("Virtual user panicked: {}", e);
            }
        }
    }
}

/// Virtual users of an arrival-rate executor
#[derive(Debug)]
struct VuPool {
    idle: Vec<u32>,
    allocated: u32,
    max: u32,
}

impl VuPool {
    fn new(pre_allocated: u32, max: u32) -> Self {
        let allocated = pre_allocated.min(max);
        Self {
            idle: (1..=allocated).rev().collect(),
            allocated,
            max,
        }
    }

    fn for_profile(profile: &WorkloadProfile) -> Self {
        match profile.executor {
            Executor::RampingArrivalRate {
                pre_allocated_vus,
                max_vus,
                ..
            } => Self::new(pre_allocated_vus, max_vus),
            _ => Self::new(profile.max_vus(), profile.max_vus()),
        }
    }

    /// An idle virtual user, allocating a new one while under `max`
    fn acquire(&mut self) -> Option<u32> {
        if let Some(id) = self.idle.pop() {
            return Some(id);
        }
        if self.allocated >= self.max {
            return None;
        }
        self.allocated += 1;
        debug!("Allocated VU {} beyond the pre-allocated pool", self.allocated);
        Some(self.allocated)
    }

    fn release(&mut self, id: u32) {
        self.idle.push(id);
    }
}

/// A virtual user running one iteration. Goes back to the pool when dropped,
/// including when the iteration panics or is aborted.
struct BusyVu {
    id: u32,
    pool: Arc<Mutex<VuPool>>,
}

impl BusyVu {
    fn acquire(pool: &Arc<Mutex<VuPool>>) -> Option<Self> {
        let id = pool.lock().acquire()?;
        Some(Self {
            id,
            pool: Arc::clone(pool),
        })
    }
}

impl Drop for BusyVu {
    fn drop(&mut self) {
        self.pool.lock().release(self.id);
    }
}

/// Loop of one virtual user of a VU-based executor
async fn vu_loop(
    index: u32,
    workload: Arc<dyn Workload>,
    scenario: Arc<str>,
    mut target: watch::Receiver<u32>,
    mut stop: StopListener,
    metrics: RunnerMetrics,
) {
    let mut ctx = VuContext {
        vu_id: index + 1,
        iteration: 0,
        scenario,
    };

    loop {
        if stop.is_stopped() {
            return;
        }

        if index >= *target.borrow_and_update() {
            // Parked until the target grows or the run stops
            tokio::select! {
                changed = target.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = stop.stopped() => return,
            }
            continue;
        }

        run_iteration(workload.as_ref(), &ctx, &metrics).await;
        ctx.iteration += 1;
    }
}

async fn run_iteration(workload: &dyn Workload, ctx: &VuContext, metrics: &RunnerMetrics) {
    let start = Instant::now();

    if let Err(e) = workload.iteration(ctx).await {
        metrics.iteration_errors.increment();
        warn!(
            "Iteration {} of VU {} failed: {:#}",
            ctx.iteration, ctx.vu_id, e
        );
    }

    metrics.iterations.increment();
    metrics.iteration_duration.add_duration(start.elapsed());
}

/// Whole virtual users active at `elapsed`
fn active_vus(profile: &WorkloadProfile, elapsed: Duration) -> u32 {
    profile.target_at(elapsed).round().max(0.0) as u32
}

fn humanize(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::Stage;

    #[test]
    fn test_active_vus_rounds_interpolated_target() {
        let profile = WorkloadProfile::ramping_vus(
            0,
            vec![Stage::new(Duration::from_secs(10), 10)],
        );
        assert_eq!(active_vus(&profile, Duration::ZERO), 0);
        assert_eq!(active_vus(&profile, Duration::from_millis(2500)), 3);
        assert_eq!(active_vus(&profile, Duration::from_secs(5)), 5);
        assert_eq!(active_vus(&profile, Duration::from_secs(11)), 0);
    }

    #[test]
    fn test_pool_grows_from_pre_allocated_to_max() {
        let mut pool = VuPool::new(2, 3);
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), Some(3));
        assert_eq!(pool.allocated, 3);
        assert_eq!(pool.acquire(), None);

        pool.release(2);
        assert_eq!(pool.acquire(), Some(2));
    }

    #[test]
    fn test_pool_for_arrival_profile_uses_pre_allocated() {
        let profile = WorkloadProfile::ramping_arrival_rate(
            10,
            4,
            50,
            vec![Stage::new(Duration::from_secs(10), 10)],
        );
        let pool = VuPool::for_profile(&profile);
        assert_eq!(pool.allocated, 4);
        assert_eq!(pool.idle.len(), 4);
        assert_eq!(pool.max, 50);
    }

    #[test]
    fn test_busy_vu_returns_to_pool_on_panic() {
        let pool = Arc::new(Mutex::new(VuPool::new(1, 1)));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _vu = BusyVu::acquire(&pool).unwrap();
            panic!("iteration blew up");
        }));

        assert!(result.is_err());
        assert_eq!(pool.lock().acquire(), Some(1));
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.graceful_stop, Duration::from_secs(30));
        assert_eq!(config.tick, Duration::from_millis(100));
        assert!(config.handle_ctrl_c);
    }
}
