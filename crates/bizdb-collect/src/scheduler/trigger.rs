//! Cron-style triggers: a fixed hour every day, or a fixed hour on one
//! weekday. All hours are UTC and fire on the hour.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use serde::Serialize;

use crate::error::TriggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum CronTrigger {
    Day { hour: u32 },
    Week { weekday: Weekday, hour: u32 },
}

impl CronTrigger {
    /// # Errors
    ///
    /// Returns [`TriggerError::InvalidHour`] when `hour` is not in `0..=23`.
    pub fn daily(hour: u32) -> Result<Self, TriggerError> {
        check_hour(hour)?;
        Ok(CronTrigger::Day { hour })
    }

    /// # Errors
    ///
    /// Returns [`TriggerError::InvalidHour`] when `hour` is not in `0..=23`.
    pub fn weekly(weekday: Weekday, hour: u32) -> Result<Self, TriggerError> {
        check_hour(hour)?;
        Ok(CronTrigger::Week { weekday, hour })
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        match *self {
            CronTrigger::Day { hour } | CronTrigger::Week { hour, .. } => hour,
        }
    }

    /// The first fire time strictly after `after`.
    #[must_use]
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(self.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
        let today = after.date_naive().and_time(at).and_utc();

        match *self {
            CronTrigger::Day { .. } => {
                if today > after {
                    today
                } else {
                    today + TimeDelta::days(1)
                }
            }
            CronTrigger::Week { weekday, .. } => {
                let current = after.weekday().num_days_from_monday();
                let target = weekday.num_days_from_monday();
                let ahead = (target + 7 - current) % 7;
                let candidate = today + TimeDelta::days(i64::from(ahead));
                if candidate > after {
                    candidate
                } else {
                    candidate + TimeDelta::weeks(1)
                }
            }
        }
    }
}

impl fmt::Display for CronTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronTrigger::Day { hour } => write!(f, "daily at {hour:02}:00 UTC"),
            CronTrigger::Week { weekday, hour } => {
                write!(f, "every {weekday} at {hour:02}:00 UTC")
            }
        }
    }
}

fn check_hour(hour: u32) -> Result<(), TriggerError> {
    if hour > 23 {
        return Err(TriggerError::InvalidHour(hour));
    }
    Ok(())
}
