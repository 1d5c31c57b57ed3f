use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinHandle;

use crate::{
    error::ReminderError,
    hardware::{RemoteCommand, RemoteLink},
};

/// Remote LED over the wireless link, connected for the span of one alert.
///
/// Link failures are logged and never propagate: the local actuators keep
/// running without the remote one.
pub struct RemoteLed {
    link: Arc<dyn RemoteLink>,
    address: String,
    enabled: bool,
    blink: Option<JoinHandle<()>>,
    engaged: bool,
}

impl RemoteLed {
    pub fn new(link: Arc<dyn RemoteLink>, address: String, enabled: bool) -> Self {
        Self {
            link,
            address,
            enabled,
            blink: None,
            engaged: false,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Connects if needed and sends the blink command in the background.
    pub fn start_blink(&mut self) {
        if !self.enabled || self.engaged {
            return;
        }
        self.engaged = true;

        let link = self.link.clone();
        let address = self.address.clone();
        self.blink = Some(tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                if !link.is_connected() {
                    link.connect(&address)?;
                }
                link.send(RemoteCommand::Blink)
            })
            .await;

            match result {
                Ok(Ok(())) => info!("Remote LED blinking"),
                Ok(Err(err)) => warn!("{}", ReminderError::unavailable("remote LED", format!("{err:#}"))),
                Err(err) => warn!("remote LED blink worker failed: {err}"),
            }
        }));
    }

    /// Waits for any pending blink, sends off, and closes the connection.
    /// Returns once the link has answered or failed.
    pub async fn stop(&mut self) {
        if !self.engaged {
            return;
        }
        self.engaged = false;

        if let Some(handle) = self.blink.take() {
            if let Err(err) = handle.await {
                warn!("remote LED blink task failed to join: {err}");
            }
        }

        let link = self.link.clone();
        let address = self.address.clone();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let outcome = if link.is_connected() {
                Ok(())
            } else {
                link.connect(&address)
            }
            .and_then(|()| link.send(RemoteCommand::Off));
            if let Err(err) = link.disconnect() {
                warn!("remote LED disconnect failed: {err:#}");
            }
            outcome
        })
        .await;

        match result {
            Ok(Ok(())) => info!("Remote LED off, link closed"),
            Ok(Err(err)) => warn!("{}", ReminderError::unavailable("remote LED", format!("{err:#}"))),
            Err(err) => warn!("remote LED off worker failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::SimRemoteLink;

    #[tokio::test]
    async fn blink_then_off_closes_the_link() {
        let link = Arc::new(SimRemoteLink::new());
        let mut led = RemoteLed::new(link.clone(), "AA:BB".into(), true);

        led.start_blink();
        led.start_blink();
        led.stop().await;
        led.stop().await;

        assert_eq!(link.sent(), vec![RemoteCommand::Blink, RemoteCommand::Off]);
        assert!(!link.is_connected());
        assert_eq!(link.connect_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_peripheral_is_tolerated() {
        let link = Arc::new(SimRemoteLink::new());
        link.set_unreachable(true);
        let mut led = RemoteLed::new(link.clone(), "AA:BB".into(), true);

        led.start_blink();
        led.stop().await;

        assert!(link.sent().is_empty());
        assert!(!led.is_engaged());
    }

    #[tokio::test]
    async fn disabled_led_never_touches_the_link() {
        let link = Arc::new(SimRemoteLink::new());
        let mut led = RemoteLed::new(link.clone(), "AA:BB".into(), false);

        led.start_blink();
        led.stop().await;

        assert_eq!(link.connect_count(), 0);
    }
}
