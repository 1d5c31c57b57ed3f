use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Source of local wall-clock time. Reminders are stored in local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Splits a timestamp into the (date, minute) pair reminders are keyed on.
pub fn minute_of(now: NaiveDateTime) -> (NaiveDate, NaiveTime) {
    let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(NaiveTime::MIN);
    (now.date(), time)
}

#[cfg(test)]
pub use manual::ManualClock;
