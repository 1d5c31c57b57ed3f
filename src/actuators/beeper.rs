use std::{sync::Arc, time::Duration};

use log::warn;

use crate::hardware::{Gpio, Level};

/// One-shot buzzer pulse. Runs to completion; callers sequence it after any
/// pulse task driving the same pin has been stopped.
#[derive(Clone)]
pub struct Beeper {
    gpio: Arc<dyn Gpio>,
    pin: u8,
}

impl Beeper {
    pub fn new(gpio: Arc<dyn Gpio>, pin: u8) -> Self {
        Self { gpio, pin }
    }

    pub async fn beep(&self, duration: Duration) {
        if let Err(err) = self.gpio.write(self.pin, Level::High) {
            warn!("buzzer pin {} failed to go high: {err:#}", self.pin);
            return;
        }
        tokio::time::sleep(duration).await;
        if let Err(err) = self.gpio.write(self.pin, Level::Low) {
            warn!("buzzer pin {} failed to go low: {err:#}", self.pin);
        }
    }
}
