//! Uniform start/stop control over buzzer, light, remote LED and display.

pub mod beeper;
pub mod pulse;
pub mod remote_led;
pub mod scroll;
pub mod task;

use std::{sync::Arc, time::Duration};

use chrono::NaiveDateTime;
use log::{debug, error, warn};

use crate::{
    error::ReminderError,
    hardware::{CharDisplay, Gpio, RemoteLink},
    settings::Settings,
};

pub use beeper::Beeper;
pub use remote_led::RemoteLed;
pub use task::ActuationTask;

use pulse::pulse_loop;
use scroll::scroll_loop;

pub const REMINDER_BANNER: &str = "Reminder:";

const BANNER_LINE: usize = 0;
const TEXT_LINE: usize = 1;

pub struct ActuatorFacade {
    gpio: Arc<dyn Gpio>,
    display: Arc<dyn CharDisplay>,
    beeper: Beeper,
    remote: RemoteLed,
    pulse: ActuationTask,
    scroll: ActuationTask,
    pulse_pins: Vec<u8>,
    pulse_half_period: Duration,
    confirmation_buzz: Duration,
    scroll_delay: Duration,
    scroll_pause: Duration,
}

impl ActuatorFacade {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        display: Arc<dyn CharDisplay>,
        link: Arc<dyn RemoteLink>,
        settings: &Settings,
    ) -> Self {
        Self {
            beeper: Beeper::new(gpio.clone(), settings.pins.buzzer),
            remote: RemoteLed::new(
                link,
                settings.remote_led.address.clone(),
                settings.remote_led.enabled,
            ),
            gpio,
            display,
            pulse: ActuationTask::new("pulse"),
            scroll: ActuationTask::new("scroll"),
            pulse_pins: vec![settings.pins.buzzer, settings.pins.light],
            pulse_half_period: settings.pulse_half_period(),
            confirmation_buzz: settings.confirmation_buzz(),
            scroll_delay: settings.scroll_delay(),
            scroll_pause: settings.scroll_pause(),
        }
    }

    /// A handle on the buzzer for one-shot beeps outside an alert.
    pub fn beeper(&self) -> Beeper {
        self.beeper.clone()
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_running()
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_running()
    }

    pub fn is_remote_engaged(&self) -> bool {
        self.remote.is_engaged()
    }

    pub fn start_pulse(&mut self) {
        let gpio = self.gpio.clone();
        let pins = self.pulse_pins.clone();
        let half_period = self.pulse_half_period;
        if let Err(err) = self
            .pulse
            .start(move |token| pulse_loop(gpio, pins, half_period, token))
        {
            warn!("buzzer/light pulse not started: {err:#}");
        }
    }

    /// Returns once buzzer and light are low.
    pub async fn stop_pulse(&mut self) {
        if let Err(err) = self.pulse.stop().await {
            error!("{err:#}");
        }
    }

    pub fn start_remote_blink(&mut self) {
        self.remote.start_blink();
    }

    pub async fn stop_remote(&mut self) {
        self.remote.stop().await;
    }

    /// Clears the display and shows the banner with `description` under it,
    /// scrolling when it is wider than one line.
    pub fn show_reminder(&mut self, description: &str) {
        self.clear_display();
        self.write(BANNER_LINE, REMINDER_BANNER);

        if description.chars().count() <= self.display.width() {
            self.write(TEXT_LINE, description);
            return;
        }

        let display = self.display.clone();
        let text = description.to_string();
        let delay = self.scroll_delay;
        let pause = self.scroll_pause;
        if let Err(err) = self
            .scroll
            .start(move |token| scroll_loop(display, TEXT_LINE, text, delay, pause, token))
        {
            warn!("display scroll not started: {err:#}");
        }
    }

    pub async fn stop_display(&mut self) {
        if let Err(err) = self.scroll.stop().await {
            error!("{err:#}");
        }
    }

    pub fn clear_display(&self) {
        if let Err(err) = self.display.clear() {
            warn!("{}", ReminderError::unavailable("display", format!("{err:#}")));
        }
    }

    /// Idle view: current time and date.
    pub fn show_clock(&self, now: NaiveDateTime) {
        self.write(BANNER_LINE, &format!("Time: {}", now.format("%H:%M")));
        self.write(TEXT_LINE, &format!("Date: {}", now.format("%Y-%m-%d")));
    }

    pub async fn confirmation_buzz(&self) {
        self.beeper.beep(self.confirmation_buzz).await;
    }

    /// Stops every actuator and hands the pins back. Used on process exit.
    pub async fn shutdown(&mut self) {
        self.stop_pulse().await;
        self.stop_remote().await;
        self.stop_display().await;
        self.clear_display();
        if let Err(err) = self.gpio.release() {
            error!("failed to release gpio: {err:#}");
        }
    }

    fn write(&self, line: usize, text: &str) {
        if line >= self.display.lines() {
            debug!("display has no line {line}, dropped: {text}");
            return;
        }
        if let Err(err) = self.display.write_line(line, text) {
            warn!("{}", ReminderError::unavailable("display", format!("{err:#}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{SimDisplay, SimGpio, SimRemoteLink};
    use crate::hardware::Level;

    fn facade() -> (ActuatorFacade, Arc<SimGpio>, Arc<SimDisplay>) {
        let gpio = Arc::new(SimGpio::new());
        let display = Arc::new(SimDisplay::new(16, 2));
        let link = Arc::new(SimRemoteLink::new());
        let settings = Settings {
            pulse_period_ms: 10,
            confirmation_buzz_ms: 1,
            ..Settings::default()
        };
        let facade = ActuatorFacade::new(gpio.clone(), display.clone(), link, &settings);
        (facade, gpio, display)
    }

    #[tokio::test]
    async fn short_description_renders_two_static_lines() {
        let (mut facade, _, display) = facade();
        facade.show_reminder("take pills");
        assert!(!facade.is_scrolling());
        assert_eq!(display.snapshot(), vec!["Reminder:", "take pills"]);
    }

    #[tokio::test]
    async fn long_description_scrolls_until_stopped() {
        let (mut facade, _, display) = facade();
        facade.show_reminder("renew the car insurance online");
        assert!(facade.is_scrolling());

        facade.stop_display().await;
        assert!(!facade.is_scrolling());
        assert_eq!(display.snapshot(), vec!["Reminder:", "renew the car in"]);
    }

    #[tokio::test]
    async fn display_failure_does_not_stop_the_buzzer() {
        let (mut facade, gpio, display) = facade();
        display.set_failing(true);

        facade.show_reminder("take pills");
        facade.start_pulse();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(facade.is_pulsing());

        facade.stop_pulse().await;
        assert!(gpio.writes(27).contains(&Level::High));
        assert_eq!(gpio.level(27), Level::Low);
    }

    #[tokio::test]
    async fn single_line_display_drops_the_second_line() {
        let gpio = Arc::new(SimGpio::new());
        let display = Arc::new(SimDisplay::new(16, 1));
        let link = Arc::new(SimRemoteLink::new());
        let facade = ActuatorFacade::new(gpio, display.clone(), link, &Settings::default());

        let now = chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        facade.show_clock(now);
        assert_eq!(display.snapshot(), vec!["Time: 09:15"]);
    }

    #[tokio::test]
    async fn shutdown_releases_gpio() {
        let (mut facade, gpio, _) = facade();
        facade.start_pulse();
        facade.shutdown().await;
        assert!(gpio.is_released());
        assert_eq!(gpio.level(22), Level::Low);
    }
}
