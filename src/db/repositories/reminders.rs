use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{
            format_date, format_time, format_timestamp, parse_reason, parse_timestamp,
        },
        models::{ArchiveReason, ArchivedReminder, ReminderRecord},
    },
    error::ReminderError,
};

fn row_to_record(row: &Row) -> Result<ReminderRecord> {
    let description: String = row.get("description")?;
    let date: String = row.get("date")?;
    let time: String = row.get("time")?;
    ReminderRecord::parse(&description, &date, &time)
}

fn row_to_archived(row: &Row) -> Result<ArchivedReminder> {
    let archived_at: String = row.get("archived_at")?;
    let reason: String = row.get("reason")?;
    Ok(ArchivedReminder {
        record: row_to_record(row)?,
        archived_at: parse_timestamp(&archived_at, "archived_at")?,
        reason: parse_reason(&reason)?,
    })
}

/// Append to the archive, then delete from the active table. Not wrapped in a
/// transaction: an interruption between the two leaves the record in both
/// tables, never in neither.
fn move_to_archive(
    conn: &Connection,
    record: &ReminderRecord,
    reason: ArchiveReason,
    archived_at: NaiveDateTime,
) -> Result<()> {
    let date = record.date_text();
    let time = record.time_text();

    conn.execute(
        "INSERT INTO archived_reminders (description, date, time, archived_at, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.description,
            date,
            time,
            format_timestamp(archived_at),
            reason.as_str(),
        ],
    )?;

    let removed = conn.execute(
        "DELETE FROM reminders WHERE description = ?1 AND date = ?2 AND time = ?3",
        params![record.description, date, time],
    )?;
    if removed == 0 {
        warn!("Archived {record} but it was not in the active table");
    }

    Ok(())
}

impl Database {
    /// Stores a new active reminder. Fails with [`ReminderError::DuplicateRecord`]
    /// when the same triple is already pending.
    pub async fn insert_reminder(&self, record: &ReminderRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let created_at = format_timestamp(chrono::Local::now().naive_local());
            let inserted = conn.execute(
                "INSERT INTO reminders (description, date, time, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.description,
                    record.date_text(),
                    record.time_text(),
                    created_at,
                ],
            );

            match inserted {
                Ok(_) => {
                    info!("Stored reminder {record}");
                    Ok(())
                }
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(ReminderError::DuplicateRecord(record).into())
                }
                Err(err) => Err(anyhow::Error::new(err).context("failed to insert reminder")),
            }
        })
        .await
    }

    /// Active reminders due exactly at (`date`, `time`), in insertion order.
    pub async fn due_reminders(&self, date: NaiveDate, time: NaiveTime) -> Result<Vec<ReminderRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT description, date, time
                 FROM reminders
                 WHERE date = ?1 AND time = ?2
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![format_date(date), format_time(time)])?;
            let mut due = Vec::new();
            while let Some(row) = rows.next()? {
                due.push(row_to_record(row)?);
            }

            Ok(due)
        })
        .await
    }

    pub async fn archive_reminder(
        &self,
        record: &ReminderRecord,
        reason: ArchiveReason,
        archived_at: NaiveDateTime,
    ) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| move_to_archive(conn, &record, reason, archived_at))
            .await
    }

    /// Moves every active reminder strictly before (`date`, `time`) to the
    /// archive and returns what was moved.
    pub async fn sweep_expired(&self, date: NaiveDate, time: NaiveTime) -> Result<Vec<ReminderRecord>> {
        self.execute(move |conn| {
            let date_text = format_date(date);
            let time_text = format_time(time);

            let stale = {
                let mut stmt = conn.prepare(
                    "SELECT description, date, time
                     FROM reminders
                     WHERE date < ?1 OR (date = ?1 AND time < ?2)
                     ORDER BY id ASC",
                )?;
                let mut rows = stmt.query(params![date_text, time_text])?;
                let mut stale = Vec::new();
                while let Some(row) = rows.next()? {
                    stale.push(row_to_record(row)?);
                }
                stale
            };

            let archived_at = date.and_time(time);
            for record in &stale {
                move_to_archive(conn, record, ArchiveReason::Expired, archived_at)?;
            }

            Ok(stale)
        })
        .await
    }

    pub async fn list_active(&self) -> Result<Vec<ReminderRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT description, date, time FROM reminders ORDER BY date, time, id",
            )?;
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn list_archived(&self) -> Result<Vec<ArchivedReminder>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT description, date, time, archived_at, reason
                 FROM archived_reminders
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut archived = Vec::new();
            while let Some(row) = rows.next()? {
                archived.push(row_to_archived(row)?);
            }
            Ok(archived)
        })
        .await
    }
}
