//! The single control loop. Each tick samples the button, then the clock, and
//! is the only place alert transitions and store writes are driven from.

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    alert::{AlertController, AlertStatus},
    button::{ButtonEvent, Debouncer},
    capture::{CaptureOutcome, CapturePipeline},
    clock::{minute_of, Clock},
    db::Database,
    hardware::Gpio,
    settings::Settings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    gpio: Arc<dyn Gpio>,
    button_pin: u8,
    debouncer: Debouncer,
    alert: AlertController,
    pipeline: CapturePipeline,
    db: Database,
    tick_period: Duration,
    sweep_interval: chrono::Duration,
    last_sweep: Option<NaiveDateTime>,
    clock_minute: Option<(NaiveDate, NaiveTime)>,
}

impl Scheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        gpio: Arc<dyn Gpio>,
        alert: AlertController,
        pipeline: CapturePipeline,
        db: Database,
        settings: &Settings,
    ) -> Self {
        Self {
            clock,
            gpio,
            button_pin: settings.pins.button,
            debouncer: Debouncer::new(settings.debounce_window()),
            alert,
            pipeline,
            db,
            tick_period: settings.tick(),
            sweep_interval: settings.sweep_interval(),
            last_sweep: None,
            clock_minute: None,
        }
    }

    pub fn alert(&self) -> &AlertController {
        &self.alert
    }

    /// Ticks until `cancel_token` fires, then tears down any live alert and
    /// releases the outputs.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = cancel_token.cancelled() => {
                    log_info!("scheduler shutting down");
                    break;
                }
            }
        }

        self.alert.shutdown().await;
    }

    /// One evaluation: button, expiry, sweep, due poll, idle clock.
    pub async fn tick(&mut self) {
        let pressed = match self.gpio.is_pressed(self.button_pin) {
            Ok(pressed) => pressed,
            Err(err) => {
                log_warn!("button read failed: {err:#}");
                false
            }
        };
        if let Some(event) = self.debouncer.sample(pressed, self.clock.now()) {
            self.route_press(event).await;
        }

        let now = self.clock.now();
        if let Some(status) = self.alert.check_expiry(now).await {
            log_info!("alert ended: {:?}", status);
        }
        self.sweep_if_due(now).await;
        self.poll_due(now).await;
        self.refresh_idle_clock(now);
    }

    /// Presses belong to the alert while one is live, otherwise they start a
    /// capture.
    async fn route_press(&mut self, event: ButtonEvent) {
        if self.alert.status().is_active() {
            let status = self.alert.handle_press(event).await;
            log_debug!("press routed to alert: {:?}", status);
            return;
        }

        match self.pipeline.run(event.observed_at).await {
            CaptureOutcome::Stored(record) => log_info!("stored reminder {}", record),
            outcome => log_debug!("capture finished: {:?}", outcome),
        }
        // The pin went unsampled for the whole capture.
        self.debouncer.hold_off(self.clock.now());
    }

    async fn sweep_if_due(&mut self, now: NaiveDateTime) {
        let due = self
            .last_sweep
            .map_or(true, |last| now - last >= self.sweep_interval);
        if !due {
            return;
        }
        self.last_sweep = Some(now);

        let (date, time) = minute_of(now);
        match self.db.sweep_expired(date, time).await {
            Ok(swept) if swept.is_empty() => {}
            Ok(swept) => {
                for record in &swept {
                    log_info!("swept stale reminder {}", record);
                }
            }
            Err(err) => log_warn!("sweep failed: {err:#}"),
        }
    }

    /// Fires the first reminder due this minute. While an alert is live the
    /// record is left pending for a later tick.
    async fn poll_due(&mut self, now: NaiveDateTime) {
        let (date, time) = minute_of(now);
        let due = match self.db.due_reminders(date, time).await {
            Ok(due) => due,
            Err(err) => {
                log_warn!("due poll failed: {err:#}");
                return;
            }
        };
        let Some(first) = due.first() else {
            return;
        };

        if self.alert.status() != AlertStatus::Idle {
            log_debug!("{} due but alert is {:?}", first, self.alert.status());
            return;
        }
        // The first record normally fires; a later one only when the first
        // already fired but could not be archived.
        for record in due {
            if self.alert.fire(record, now).await {
                self.clock_minute = None;
                break;
            }
        }
    }

    fn refresh_idle_clock(&mut self, now: NaiveDateTime) {
        if self.alert.status() != AlertStatus::Idle {
            return;
        }
        let minute = minute_of(now);
        if self.clock_minute != Some(minute) {
            self.alert.actuators().show_clock(now);
            self.clock_minute = Some(minute);
        }
    }
}
