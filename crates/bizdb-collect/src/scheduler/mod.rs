//! The update-cycle scheduler.
//!
//! Jobs pair a [`CronTrigger`] with a [`CycleKind`]. A single background loop
//! fires due jobs one at a time. A cycle is claimed under the state lock before
//! it starts, so at most one is in flight whether it was started by the loop or
//! by [`Scheduler::trigger_now`].
//! A cycle that errors or panics is logged, recorded as the job's last outcome,
//! and the scheduler returns to idle.

mod clock;
mod trigger;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bizdb_core::CollectionPlan;
use bizdb_db::TriggerSource;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Serialize, Serializer};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use trigger::CronTrigger;

use crate::error::{CycleError, SchedulerError, TriggerError};
use crate::pipeline::{CycleKind, CycleReport};

pub const DAILY_JOB_ID: &str = "daily_update";
pub const DAILY_JOB_NAME: &str = "Daily data update";
pub const WEEKLY_JOB_ID: &str = "weekly_refresh";
pub const WEEKLY_JOB_NAME: &str = "Weekly full refresh";

const NEXT_RUN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_IDLE_WAIT: Duration = Duration::from_secs(60);

/// Executes one collection cycle.
pub trait CycleRunner: Send + Sync + 'static {
    fn run(
        &self,
        kind: CycleKind,
        trigger: TriggerSource,
    ) -> BoxFuture<'static, Result<CycleReport, CycleError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub id: String,
    pub name: String,
    pub trigger: CronTrigger,
    pub kind: CycleKind,
}

/// The two recurring jobs of a collection plan.
///
/// # Errors
///
/// Returns [`TriggerError`] if a planned hour is out of range.
pub fn plan_jobs(plan: &CollectionPlan) -> Result<Vec<JobSpec>, TriggerError> {
    Ok(vec![
        JobSpec {
            id: DAILY_JOB_ID.to_string(),
            name: DAILY_JOB_NAME.to_string(),
            trigger: CronTrigger::daily(plan.daily_update.hour)?,
            kind: CycleKind::Incremental,
        },
        JobSpec {
            id: WEEKLY_JOB_ID.to_string(),
            name: WEEKLY_JOB_NAME.to_string(),
            trigger: CronTrigger::weekly(plan.weekly_refresh.weekday, plan.weekly_refresh.hour)?,
            kind: CycleKind::FullRefresh,
        },
    ])
}

/// When a job will next fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRun {
    At(DateTime<Utc>),
    NotScheduled,
}

impl fmt::Display for NextRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextRun::At(at) => write!(f, "{}", at.format(NEXT_RUN_FORMAT)),
            NextRun::NotScheduled => f.write_str("Not scheduled"),
        }
    }
}

impl Serialize for NextRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    Running(CycleKind),
}

impl Serialize for CycleState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CycleState::Idle => serializer.serialize_str("idle"),
            CycleState::Running(kind) => serializer.serialize_str(kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub next_run: NextRun,
    pub last_run: Option<LastRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub cycle: CycleState,
    pub jobs: Vec<JobStatus>,
}

#[derive(Debug)]
struct JobEntry {
    spec: JobSpec,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<LastRun>,
}

#[derive(Debug, Default)]
struct Inner {
    running: bool,
    cycle: CycleState,
    jobs: Vec<JobEntry>,
    worker: Option<JoinHandle<()>>,
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    runner: Arc<dyn CycleRunner>,
    inner: Mutex<Inner>,
    cycle_done: Notify,
    shutdown: watch::Sender<bool>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, runner: Arc<dyn CycleRunner>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            clock,
            runner,
            inner: Mutex::new(Inner::default()),
            cycle_done: Notify::new(),
            shutdown,
        }
    }

    /// A scheduler with the plan's daily and weekly jobs registered.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] if a planned hour is out of range.
    pub fn for_plan(
        clock: Arc<dyn Clock>,
        runner: Arc<dyn CycleRunner>,
        plan: &CollectionPlan,
    ) -> Result<Self, TriggerError> {
        let scheduler = Self::new(clock, runner);
        for job in plan_jobs(plan)? {
            scheduler.add_job(job);
        }
        Ok(scheduler)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `spec`, replacing any job with the same id in place.
    pub fn add_job(&self, spec: JobSpec) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let next_run = inner
            .running
            .then(|| spec.trigger.next_fire_after(now));

        if let Some(existing) = inner.jobs.iter_mut().find(|j| j.spec.id == spec.id) {
            existing.spec = spec;
            existing.next_run = next_run;
        } else {
            inner.jobs.push(JobEntry {
                spec,
                next_run,
                last_run: None,
            });
        }
    }

    /// Returns whether a job with `id` was registered.
    pub fn remove_job(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner.jobs.retain(|j| j.spec.id != id);
        inner.jobs.len() != before
    }

    /// Schedules every registered job and spawns the background loop.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if already started.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        let mut inner = self.lock();
        if inner.running {
            return Err(SchedulerError::AlreadyRunning);
        }
        inner.running = true;
        for job in &mut inner.jobs {
            job.next_run = Some(job.spec.trigger.next_fire_after(now));
        }

        self.shutdown.send_replace(false);
        let scheduler = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        inner.worker = Some(tokio::spawn(async move {
            loop {
                scheduler.run_due().await;
                let wait = scheduler.time_until_next_fire();
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("scheduler loop stopped");
        }));

        tracing::info!(jobs = inner.jobs.len(), "scheduler started");
        Ok(())
    }

    /// Stops the background loop and waits for any in-flight cycle to finish.
    ///
    /// Jobs report `NotScheduled` as soon as this is called.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotRunning`] if not started.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let worker = {
            let mut inner = self.lock();
            if !inner.running {
                return Err(SchedulerError::NotRunning);
            }
            inner.running = false;
            for job in &mut inner.jobs {
                job.next_run = None;
            }
            inner.worker.take()
        };

        self.shutdown.send_replace(true);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "scheduler loop ended abnormally");
            }
        }

        // A cycle started outside the loop may still be running.
        loop {
            let finished = self.cycle_done.notified();
            if self.lock().cycle == CycleState::Idle {
                break;
            }
            finished.await;
        }
        tracing::info!("scheduler stopped");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    #[must_use]
    pub fn next_run_time(&self, id: &str) -> NextRun {
        self.lock()
            .jobs
            .iter()
            .find(|j| j.spec.id == id)
            .and_then(|j| j.next_run)
            .map_or(NextRun::NotScheduled, NextRun::At)
    }

    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        let inner = self.lock();
        SchedulerStatus {
            running: inner.running,
            cycle: inner.cycle,
            jobs: inner
                .jobs
                .iter()
                .map(|j| JobStatus {
                    id: j.spec.id.clone(),
                    name: j.spec.name.clone(),
                    schedule: j.spec.trigger.to_string(),
                    next_run: j.next_run.map_or(NextRun::NotScheduled, NextRun::At),
                    last_run: j.last_run.clone(),
                })
                .collect(),
        }
    }

    /// Runs every job whose fire time has arrived, one after another, and
    /// returns how many ran.
    ///
    /// A job due while another cycle is in flight waits for it and then fires
    /// late. Fire times missed while a cycle ran are coalesced into one.
    pub async fn run_due(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<String> = {
            let inner = self.lock();
            if !inner.running {
                return 0;
            }
            inner
                .jobs
                .iter()
                .filter(|j| j.next_run.is_some_and(|at| at <= now))
                .map(|j| j.spec.id.clone())
                .collect()
        };

        let mut ran = 0;
        for id in due {
            loop {
                // Registered before the claim so a cycle finishing in between still wakes us.
                let finished = self.cycle_done.notified();
                match self.claim_due(&id) {
                    DueClaim::Run(kind) => {
                        self.execute(&id, kind, TriggerSource::Scheduler).await;
                        ran += 1;
                        break;
                    }
                    DueClaim::Skip => break,
                    DueClaim::Wait => finished.await,
                }
            }
        }
        ran
    }

    /// Runs job `id` now, outside its schedule.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotScheduled`] for an unknown id,
    /// [`SchedulerError::Busy`] if a cycle is in flight, or
    /// [`SchedulerError::Cycle`] if the cycle failed.
    pub async fn trigger_now(&self, id: &str) -> Result<CycleReport, SchedulerError> {
        let kind = {
            let mut inner = self.lock();
            let kind = inner
                .jobs
                .iter()
                .find(|j| j.spec.id == id)
                .map(|j| j.spec.kind)
                .ok_or_else(|| SchedulerError::NotScheduled(id.to_string()))?;
            if matches!(inner.cycle, CycleState::Running(_)) {
                return Err(SchedulerError::Busy);
            }
            inner.cycle = CycleState::Running(kind);
            kind
        };
        self.execute(id, kind, TriggerSource::Manual)
            .await
            .map_err(SchedulerError::Cycle)
    }

    /// Claims the cycle for job `id` if it is still due and nothing is in flight.
    fn claim_due(&self, id: &str) -> DueClaim {
        let now = self.clock.now();
        let mut inner = self.lock();
        if !inner.running {
            return DueClaim::Skip;
        }
        let Some(kind) = inner
            .jobs
            .iter()
            .find(|j| j.spec.id == id && j.next_run.is_some_and(|at| at <= now))
            .map(|j| j.spec.kind)
        else {
            return DueClaim::Skip;
        };
        if matches!(inner.cycle, CycleState::Running(_)) {
            return DueClaim::Wait;
        }
        inner.cycle = CycleState::Running(kind);
        DueClaim::Run(kind)
    }

    // Caller has already set `inner.cycle` to `Running(kind)`.
    async fn execute(
        &self,
        id: &str,
        kind: CycleKind,
        trigger: TriggerSource,
    ) -> Result<CycleReport, CycleError> {
        tracing::info!(job = id, cycle = %kind, trigger = trigger.as_str(), "cycle started");

        let runner = Arc::clone(&self.runner);
        let result = match tokio::spawn(async move { runner.run(kind, trigger).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(CycleError::Panicked(panic_message(e.into_panic().as_ref()))),
            Err(e) => Err(CycleError::Aborted(e.to_string())),
        };

        match &result {
            Ok(report) => tracing::info!(
                job = id,
                cycle = %kind,
                collected = report.collected,
                saved = report.saved,
                "cycle finished"
            ),
            Err(e) => tracing::error!(job = id, cycle = %kind, error = %e, "cycle failed"),
        }

        let now = self.clock.now();
        let mut inner = self.lock();
        inner.cycle = CycleState::Idle;
        let running = inner.running;
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.spec.id == id) {
            job.last_run = Some(match &result {
                Ok(report) => LastRun {
                    finished_at: now,
                    outcome: RunOutcome::Succeeded,
                    saved: Some(report.saved),
                    error: None,
                },
                Err(e) => LastRun {
                    finished_at: now,
                    outcome: RunOutcome::Failed,
                    saved: None,
                    error: Some(e.to_string()),
                },
            });
            if running {
                job.next_run = Some(job.spec.trigger.next_fire_after(now));
            }
        }
        drop(inner);
        self.cycle_done.notify_waiters();
        result
    }

    fn time_until_next_fire(&self) -> Duration {
        let now = self.clock.now();
        self.lock()
            .jobs
            .iter()
            .filter_map(|j| j.next_run)
            .min()
            .map_or(MAX_IDLE_WAIT, |at| {
                (at - now).to_std().unwrap_or(Duration::ZERO).min(MAX_IDLE_WAIT)
            })
    }
}

enum DueClaim {
    Run(CycleKind),
    Wait,
    Skip,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
