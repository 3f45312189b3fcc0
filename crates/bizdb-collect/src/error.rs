use bizdb_db::DbError;
use thiserror::Error;

/// A collection cycle that could not finish.
///
/// Provider and per-record failures never surface here; they are absorbed at
/// category granularity. Only the store or the cycle task itself can fail a
/// cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("store error: {0}")]
    Store(#[from] DbError),
    #[error("cycle panicked: {0}")]
    Panicked(String),
    #[error("cycle aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("hour {0} is outside 0..=23")]
    InvalidHour(u32),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
    #[error("no job registered with id '{0}'")]
    NotScheduled(String),
    #[error("a collection cycle is already in progress")]
    Busy,
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Rejected on-demand collection parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("at least one category is required")]
    NoCategories,
    #[error("at most {max} categories may be collected at once, got {got}")]
    TooManyCategories { max: usize, got: usize },
    #[error("location must not be empty")]
    EmptyLocation,
    #[error("radius_miles must be between {min} and {max}, got {got}")]
    RadiusOutOfRange { min: u32, max: u32, got: u32 },
}
