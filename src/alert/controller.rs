use chrono::{Duration, NaiveDateTime};
use log::{debug, error, info};

use crate::{
    actuators::ActuatorFacade,
    button::ButtonEvent,
    db::{ArchiveReason, Database, ReminderRecord},
};

use super::{AlertSession, AlertState, AlertStatus};

/// Owns the single alert session and every actuator driven on its behalf.
///
/// Transitions only happen through `&mut self` calls from the scheduler's tick,
/// so no two of them can interleave.
pub struct AlertController {
    state: AlertState,
    actuators: ActuatorFacade,
    db: Database,
    alert_duration: Duration,
    /// Last triple that fired. Guards against a re-fire in the same minute
    /// when the archive move failed and the record is still pending.
    last_fired: Option<ReminderRecord>,
}

impl AlertController {
    pub fn new(actuators: ActuatorFacade, db: Database, alert_duration: Duration) -> Self {
        Self {
            state: AlertState::new(),
            actuators,
            db,
            alert_duration,
            last_fired: None,
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.state.status
    }

    pub fn session(&self) -> Option<&AlertSession> {
        self.state.session.as_ref()
    }

    pub fn actuators(&self) -> &ActuatorFacade {
        &self.actuators
    }

    /// Starts an alert for `record`. Returns `false` without touching the
    /// record when a session is already live; it stays pending in the store.
    pub async fn fire(&mut self, record: ReminderRecord, now: NaiveDateTime) -> bool {
        if self.state.status != AlertStatus::Idle {
            debug!(
                "Deferring {record}: alert already {:?}",
                self.state.status
            );
            return false;
        }
        if self.last_fired.as_ref() == Some(&record) {
            debug!("{record} already fired; waiting for the sweep");
            return false;
        }

        self.state.begin_session(record.clone(), now);
        self.last_fired = Some(record.clone());
        info!("Alert firing for {record}");

        if let Err(err) = self
            .db
            .archive_reminder(&record, ArchiveReason::Fired, now)
            .await
        {
            error!("Failed to archive fired reminder {record}: {err:#}");
        }

        self.actuators.show_reminder(&record.description);
        self.actuators.start_pulse();
        self.actuators.start_remote_blink();

        self.state.mark_alerting();
        info!("Alert {}: Firing -> Alerting", self.session_id());
        true
    }

    /// Applies one debounced press to the live session: the first silences,
    /// the second dismisses. Returns the status the press produced.
    pub async fn handle_press(&mut self, event: ButtonEvent) -> AlertStatus {
        match self.state.status {
            AlertStatus::Alerting => {
                self.state.record_press();
                self.actuators.stop_pulse().await;
                self.actuators.stop_remote().await;
                self.actuators.confirmation_buzz().await;
                self.state.silence();
                info!(
                    "Alert {}: Alerting -> Silenced at {}",
                    self.session_id(),
                    event.observed_at.format("%H:%M:%S")
                );
                AlertStatus::Silenced
            }
            AlertStatus::Silenced => {
                self.state.record_press();
                self.teardown(event.observed_at, true).await;
                AlertStatus::Dismissed
            }
            status => {
                debug!("Press ignored by alert machine in {status:?}");
                status
            }
        }
    }

    /// Expiry watcher, evaluated once per tick regardless of the button.
    pub async fn check_expiry(&mut self, now: NaiveDateTime) -> Option<AlertStatus> {
        if !self.state.is_expired(now, self.alert_duration) {
            return None;
        }
        self.teardown(now, false).await;
        Some(AlertStatus::Expired)
    }

    /// Ends any live session and releases all actuators.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.state.finish() {
            info!("Alert {} abandoned at shutdown", session.id);
        }
        self.actuators.shutdown().await;
    }

    /// Stops every actuation task and waits for the outputs to settle before
    /// the session is dropped.
    async fn teardown(&mut self, now: NaiveDateTime, confirm: bool) {
        self.actuators.stop_pulse().await;
        self.actuators.stop_remote().await;
        if confirm {
            self.actuators.confirmation_buzz().await;
        }
        self.actuators.stop_display().await;
        self.actuators.clear_display();
        self.actuators.show_clock(now);

        let terminal = if confirm {
            AlertStatus::Dismissed
        } else {
            AlertStatus::Expired
        };
        if let Some(session) = self.state.finish() {
            info!(
                "Alert {}: {:?} -> {terminal:?} -> Idle after {}s, {} presses",
                session.id,
                session.dismissal_stage,
                session.elapsed(now).num_seconds(),
                session.press_count_since_start
            );
        }
    }

    fn session_id(&self) -> &str {
        self.state
            .session
            .as_ref()
            .map(|s| s.id.as_str())
            .unwrap_or("-")
    }
}
