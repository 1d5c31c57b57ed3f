//! Reminder data models.
//!
//! A reminder's identity is its (description, date, time) triple. Times are
//! kept at minute resolution, which is also the resolution of due polling.

use std::fmt;

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::db::helpers::{format_date, format_time, parse_date, parse_time};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl ReminderRecord {
    /// Builds a record, trimming the description and dropping sub-minute
    /// precision from `time`. Fails on an empty description.
    pub fn new(description: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Result<Self> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            bail!("reminder description must not be empty");
        }
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        Ok(Self {
            description,
            date,
            time,
        })
    }

    /// Builds a record from its stored text form (`YYYY-MM-DD`, `HH:MM`).
    pub fn parse(description: &str, date: &str, time: &str) -> Result<Self> {
        Self::new(
            description,
            parse_date(date, "date")?,
            parse_time(time, "time")?,
        )
    }

    pub fn date_text(&self) -> String {
        format_date(self.date)
    }

    pub fn time_text(&self) -> String {
        format_time(self.time)
    }

    pub fn due_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl fmt::Display for ReminderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.description,
            self.date_text(),
            self.time_text()
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ArchiveReason {
    /// Moved when its alert started.
    Fired,
    /// Moved by a sweep after its minute passed unserved.
    Expired,
}

impl ArchiveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveReason::Fired => "fired",
            ArchiveReason::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedReminder {
    pub record: ReminderRecord,
    pub archived_at: NaiveDateTime,
    pub reason: ArchiveReason,
}
