//! Simulated collaborators for the console backend.
//!
//! Every call is logged and the resulting state is kept so the scheduler can
//! run on a machine without the appliance's hardware attached.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::{fit_line, CharDisplay, Gpio, Level, RemoteCommand, RemoteLink};
use crate::capture::{AudioCapture, AudioClip, Transcriber};

#[derive(Default)]
pub struct SimGpio {
    levels: Mutex<HashMap<u8, Level>>,
    history: Mutex<Vec<(u8, Level)>>,
    pressed: Mutex<HashSet<u8>>,
    released: AtomicBool,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&self, pin: u8, pressed: bool) {
        let mut guard = self.pressed.lock().unwrap_or_else(|p| p.into_inner());
        if pressed {
            guard.insert(pin);
        } else {
            guard.remove(&pin);
        }
    }

    /// Current output level; pins never written read as low.
    pub fn level(&self, pin: u8) -> Level {
        self.levels
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&pin)
            .copied()
            .unwrap_or(Level::Low)
    }

    /// Every level written to `pin`, oldest first.
    pub fn writes(&self, pin: u8) -> Vec<Level> {
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Gpio for SimGpio {
    fn write(&self, pin: u8, level: Level) -> Result<()> {
        if self.is_released() {
            bail!("gpio pin {pin} written after release");
        }
        self.levels
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(pin, level);
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((pin, level));
        Ok(())
    }

    fn is_pressed(&self, pin: u8) -> Result<bool> {
        Ok(self
            .pressed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&pin))
    }

    fn release(&self) -> Result<()> {
        let pins: Vec<u8> = self
            .levels
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .copied()
            .collect();
        for pin in pins {
            self.write(pin, Level::Low)?;
        }
        self.released.store(true, Ordering::SeqCst);
        info!("[gpio] released");
        Ok(())
    }
}

pub struct SimDisplay {
    width: usize,
    rows: Mutex<Vec<String>>,
    clears: AtomicUsize,
    failing: AtomicBool,
}

impl SimDisplay {
    pub fn new(width: usize, lines: usize) -> Self {
        Self {
            width,
            rows: Mutex::new(vec![" ".repeat(width); lines]),
            clears: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Rows as currently shown, trailing padding removed.
    pub fn snapshot(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|row| row.trim_end().to_string())
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Makes every following call fail, as an unplugged bus would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_bus(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("display bus not responding"));
        }
        Ok(())
    }
}

impl CharDisplay for SimDisplay {
    fn width(&self) -> usize {
        self.width
    }

    fn lines(&self) -> usize {
        self.rows.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn write_line(&self, line: usize, text: &str) -> Result<()> {
        self.check_bus()?;
        let mut rows = self.rows.lock().unwrap_or_else(|p| p.into_inner());
        let row = rows
            .get_mut(line)
            .ok_or_else(|| anyhow!("display has no line {line}"))?;
        *row = fit_line(text, self.width);
        debug!("[display] {line}: |{row}|");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check_bus()?;
        let mut rows = self.rows.lock().unwrap_or_else(|p| p.into_inner());
        for row in rows.iter_mut() {
            *row = " ".repeat(self.width);
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
        debug!("[display] cleared");
        Ok(())
    }
}

#[derive(Default)]
pub struct SimRemoteLink {
    connected: AtomicBool,
    connects: AtomicUsize,
    sent: Mutex<Vec<RemoteCommand>>,
    unreachable: AtomicBool,
}

impl SimRemoteLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes connection attempts fail, as an out-of-range peripheral would.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<RemoteCommand> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RemoteLink for SimRemoteLink {
    fn connect(&self, address: &str) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            bail!("peripheral {address} did not answer");
        }
        self.connected.store(true, Ordering::SeqCst);
        info!("[remote] connected to {address}");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&self, command: RemoteCommand) -> Result<()> {
        if !self.is_connected() {
            bail!("not connected");
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(command);
        info!("[remote] sent '{}'", command.as_byte() as char);
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("[remote] disconnected");
        }
        Ok(())
    }
}

/// Speech typed on the console instead of spoken. Each queued line is one
/// capture; its text is what transcription returns.
#[derive(Default)]
pub struct ScriptedSpeech {
    utterances: Mutex<VecDeque<String>>,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, utterance: impl Into<String>) {
        self.utterances
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(utterance.into());
    }
}

impl AudioCapture for ScriptedSpeech {
    fn capture(&self) -> Result<Option<AudioClip>> {
        let pending = !self
            .utterances
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_empty();
        Ok(pending.then(|| AudioClip {
            samples: Vec::new(),
            sample_rate: AudioClip::DEFAULT_SAMPLE_RATE,
        }))
    }
}

impl Transcriber for ScriptedSpeech {
    fn transcribe(&self, _clip: &AudioClip) -> Result<String> {
        Ok(self
            .utterances
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Reads stdin: an empty line presses the button, any other line is queued
/// as an utterance and then presses the button.
pub async fn console_input(
    gpio: Arc<SimGpio>,
    speech: Arc<ScriptedSpeech>,
    button_pin: u8,
    hold: Duration,
    cancel_token: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Console ready: press Enter for the button, or type a reminder and press Enter");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel_token.cancelled() => break,
        };

        match line {
            Ok(Some(text)) => {
                let text = text.trim();
                if !text.is_empty() {
                    speech.push(text);
                }
                gpio.set_pressed(button_pin, true);
                tokio::time::sleep(hold).await;
                gpio.set_pressed(button_pin, false);
            }
            Ok(None) => break,
            Err(err) => {
                warn!("console input failed: {err}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_release_drives_outputs_low() {
        let gpio = SimGpio::new();
        gpio.write(27, Level::High).unwrap();
        gpio.release().unwrap();
        assert_eq!(gpio.level(27), Level::Low);
        assert!(gpio.write(27, Level::High).is_err());
    }

    #[test]
    fn remote_send_requires_connection() {
        let link = SimRemoteLink::new();
        assert!(link.send(RemoteCommand::Blink).is_err());
        link.connect("AA:BB").unwrap();
        link.send(RemoteCommand::Blink).unwrap();
        link.disconnect().unwrap();
        link.disconnect().unwrap();
        assert_eq!(link.sent(), vec![RemoteCommand::Blink]);
    }

    #[test]
    fn scripted_speech_yields_queued_text_once() {
        let speech = ScriptedSpeech::new();
        assert!(speech.capture().unwrap().is_none());

        speech.push("call mom tomorrow at nine");
        let clip = speech.capture().unwrap().unwrap();
        assert_eq!(speech.transcribe(&clip).unwrap(), "call mom tomorrow at nine");
        assert!(speech.capture().unwrap().is_none());
    }
}
