//! Time-based button debouncing.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonEventKind {
    Press,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonEvent {
    pub kind: ButtonEventKind,
    pub observed_at: NaiveDateTime,
}

/// Turns one raw sample per tick into press events.
///
/// A released-to-pressed edge emits one event, after which every sample is
/// ignored for `quiet_window` whatever the pin reads. The level is still
/// tracked during the window, so a button held through it does not fire again.
#[derive(Debug)]
pub struct Debouncer {
    quiet_window: Duration,
    was_pressed: bool,
    quiet_until: Option<NaiveDateTime>,
}

impl Debouncer {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            was_pressed: false,
            quiet_until: None,
        }
    }

    pub fn sample(&mut self, pressed: bool, now: NaiveDateTime) -> Option<ButtonEvent> {
        let rising = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        if self.quiet_until.is_some_and(|until| now < until) {
            return None;
        }
        if !rising {
            return None;
        }

        self.quiet_until = Some(now + self.quiet_window);
        Some(ButtonEvent {
            kind: ButtonEventKind::Press,
            observed_at: now,
        })
    }

    /// Starts a fresh quiet window from `now`, e.g. after a blocking step that
    /// could not sample the pin.
    pub fn hold_off(&mut self, now: NaiveDateTime) {
        self.quiet_until = Some(now + self.quiet_window);
    }
}
