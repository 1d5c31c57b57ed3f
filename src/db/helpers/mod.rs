use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::models::ArchiveReason;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn parse_timestamp(value: &str, field: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn parse_reason(value: &str) -> Result<ArchiveReason> {
    match value {
        "fired" => Ok(ArchiveReason::Fired),
        "expired" => Ok(ArchiveReason::Expired),
        other => Err(anyhow!("unknown archive reason {other}")),
    }
}
