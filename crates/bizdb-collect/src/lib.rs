pub mod collector;
pub mod error;
pub mod pipeline;
pub mod scheduler;

pub use collector::{
    collect, no_results_message, CategoryOutcome, Collection, CollectionRequest, ProviderFailure,
    MAX_CATEGORIES,
};
pub use error::{CycleError, RequestError, SchedulerError, TriggerError};
pub use pipeline::{collect_on_demand, CycleKind, CycleReport, OnDemandOutcome, Pipeline};
pub use scheduler::{
    plan_jobs, Clock, CronTrigger, CycleRunner, CycleState, JobSpec, JobStatus, LastRun,
    ManualClock, NextRun, RunOutcome, Scheduler, SchedulerStatus, SystemClock, DAILY_JOB_ID,
    DAILY_JOB_NAME, WEEKLY_JOB_ID, WEEKLY_JOB_NAME,
};
