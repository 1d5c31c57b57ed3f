use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::db::ReminderRecord;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AlertStatus {
    #[default]
    Idle,
    /// Actuators are being started for a freshly due reminder.
    Firing,
    /// Buzzer, light, remote LED and display all active.
    Alerting,
    /// Buzzer, light and remote LED off; display still shows the reminder.
    Silenced,
    /// Ended by the second press. Transient: the machine is Idle right after.
    Dismissed,
    /// Ended by the alert duration running out. Transient like `Dismissed`.
    Expired,
}

impl AlertStatus {
    /// Whether a session is live, i.e. presses belong to the alert.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AlertStatus::Firing | AlertStatus::Alerting | AlertStatus::Silenced
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DismissalStage {
    #[default]
    None,
    BuzzerSilenced,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSession {
    pub id: String,
    pub record: ReminderRecord,
    pub started_at: NaiveDateTime,
    pub dismissal_stage: DismissalStage,
    pub press_count_since_start: u32,
}

impl AlertSession {
    pub fn elapsed(&self, now: NaiveDateTime) -> Duration {
        now - self.started_at
    }
}

/// The machine's status together with the session it owns. A session exists
/// exactly while the status is active.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    pub status: AlertStatus,
    pub session: Option<AlertSession>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(&mut self, record: ReminderRecord, started_at: NaiveDateTime) {
        *self = Self {
            status: AlertStatus::Firing,
            session: Some(AlertSession {
                id: Uuid::new_v4().to_string(),
                record,
                started_at,
                dismissal_stage: DismissalStage::None,
                press_count_since_start: 0,
            }),
        };
    }

    pub fn mark_alerting(&mut self) {
        self.status = AlertStatus::Alerting;
    }

    pub fn record_press(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.press_count_since_start += 1;
        }
    }

    pub fn silence(&mut self) {
        self.status = AlertStatus::Silenced;
        if let Some(session) = self.session.as_mut() {
            session.dismissal_stage = DismissalStage::BuzzerSilenced;
        }
    }

    /// Whether `now` is at least `limit` past the session start.
    pub fn is_expired(&self, now: NaiveDateTime, limit: Duration) -> bool {
        matches!(self.status, AlertStatus::Alerting | AlertStatus::Silenced)
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.elapsed(now) >= limit)
    }

    /// Drops the session and returns to Idle.
    pub fn finish(&mut self) -> Option<AlertSession> {
        let session = self.session.take();
        *self = Self::default();
        session
    }
}
