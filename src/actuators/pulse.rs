use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::hardware::{Gpio, Level};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Toggles every pin in `pins` together, `half_period` high then
/// `half_period` low, until cancelled. All pins are low when this returns.
pub async fn pulse_loop(
    gpio: Arc<dyn Gpio>,
    pins: Vec<u8>,
    half_period: Duration,
    cancel_token: CancellationToken,
) {
    let mut level = Level::High;
    let mut cycles: u64 = 0;

    loop {
        drive(gpio.as_ref(), &pins, level);

        tokio::select! {
            _ = tokio::time::sleep(half_period) => {}
            _ = cancel_token.cancelled() => break,
        }

        level = match level {
            Level::High => Level::Low,
            Level::Low => {
                cycles += 1;
                Level::High
            }
        };
    }

    drive(gpio.as_ref(), &pins, Level::Low);
    log_debug!("pulse loop stopped after {} cycles on pins {:?}", cycles, pins);
}

fn drive(gpio: &dyn Gpio, pins: &[u8], level: Level) {
    for &pin in pins {
        if let Err(err) = gpio.write(pin, level) {
            log_warn!("pulse write to pin {} failed: {err:#}", pin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimGpio;

    #[tokio::test]
    async fn toggles_pins_together_and_ends_low() {
        let gpio = Arc::new(SimGpio::new());
        let token = CancellationToken::new();
        let handle = tokio::spawn(pulse_loop(
            gpio.clone(),
            vec![27, 22],
            Duration::from_millis(5),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(40)).await;
        token.cancel();
        handle.await.unwrap();

        let buzzer = gpio.writes(27);
        assert!(buzzer.len() >= 3);
        assert_eq!(buzzer, gpio.writes(22));
        assert_eq!(buzzer[0], Level::High);
        assert_eq!(gpio.level(27), Level::Low);
        assert_eq!(gpio.level(22), Level::Low);
    }
}
