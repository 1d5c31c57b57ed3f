//! Narrow contracts for the physical and remote collaborators.
//!
//! The core only ever talks to these traits. Byte-level display protocol,
//! GPIO register access and wireless pairing live behind them.

pub mod sim;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

/// Digital outputs for buzzer and light, digital input for the button.
pub trait Gpio: Send + Sync {
    fn write(&self, pin: u8, level: Level) -> Result<()>;

    /// `true` while the button on `pin` is held down.
    fn is_pressed(&self, pin: u8) -> Result<bool>;

    /// Drives every output low and gives the pins back to the system.
    fn release(&self) -> Result<()>;
}

/// Fixed-width, line-addressable character display.
pub trait CharDisplay: Send + Sync {
    fn width(&self) -> usize;

    fn lines(&self) -> usize;

    /// Writes `text` to `line`, padded or cut to the display width.
    fn write_line(&self, line: usize, text: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// One-byte commands understood by the remote LED peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Blink,
    Off,
}

impl RemoteCommand {
    pub fn as_byte(&self) -> u8 {
        match self {
            RemoteCommand::Blink => b'2',
            RemoteCommand::Off => b'0',
        }
    }
}

/// Wireless link to the remote LED. Implementations block for the
/// duration of each call.
pub trait RemoteLink: Send + Sync {
    fn connect(&self, address: &str) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn send(&self, command: RemoteCommand) -> Result<()>;

    /// Must succeed when already disconnected.
    fn disconnect(&self) -> Result<()>;
}

/// Fits `text` to exactly `width` characters.
pub fn fit_line(text: &str, width: usize) -> String {
    let mut line: String = text.chars().take(width).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat(' ').take(width - len));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_line_pads_and_truncates() {
        assert_eq!(fit_line("abc", 5), "abc  ");
        assert_eq!(fit_line("abcdefgh", 5), "abcde");
        assert_eq!(fit_line("héllo wörld", 5), "héllo");
    }

    #[test]
    fn remote_commands_match_peripheral_protocol() {
        assert_eq!(RemoteCommand::Blink.as_byte(), b'2');
        assert_eq!(RemoteCommand::Off.as_byte(), b'0');
    }
}
