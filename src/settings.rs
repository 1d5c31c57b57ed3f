use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinSettings {
    pub buzzer: u8,
    pub light: u8,
    pub button: u8,
}

impl Default for PinSettings {
    fn default() -> Self {
        Self {
            buzzer: 27,
            light: 22,
            button: 17,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub width: usize,
    pub lines: usize,
    /// Delay between one-character shifts while scrolling.
    pub scroll_delay_ms: u64,
    /// Hold on the start of the text before each scroll pass.
    pub scroll_pause_ms: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 16,
            lines: 2,
            scroll_delay_ms: 1000,
            scroll_pause_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLedSettings {
    pub enabled: bool,
    pub address: String,
}

impl Default for RemoteLedSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "FA:91:CC:45:26:5B".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// `ollama run <model>` as a child process.
    Ollama,
    /// Hands the transcript back unchanged.
    Echo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub command: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            command: "ollama".into(),
            model: "deepseek-r1:1.5b".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub pins: PinSettings,
    pub display: DisplaySettings,
    pub remote_led: RemoteLedSettings,
    pub llm: LlmSettings,
    pub alert_duration_secs: u64,
    /// Full on+off cycle of the buzzer/light pulse.
    pub pulse_period_ms: u64,
    pub confirmation_buzz_ms: u64,
    pub capture_beep_ms: u64,
    pub debounce_ms: u64,
    pub tick_ms: u64,
    pub sweep_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("reminders.sqlite3"),
            pins: PinSettings::default(),
            display: DisplaySettings::default(),
            remote_led: RemoteLedSettings::default(),
            llm: LlmSettings::default(),
            alert_duration_secs: 60,
            pulse_period_ms: 400,
            confirmation_buzz_ms: 100,
            capture_beep_ms: 200,
            debounce_ms: 500,
            tick_ms: 100,
            sweep_interval_secs: 60,
        }
    }
}

impl Settings {
    /// Loads settings from `path`. A missing file is created with defaults; a
    /// malformed one is reported and replaced by defaults in memory only.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.persist(path)?;
            info!("Wrote default settings to {}", path.display());
            return Ok(settings);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn alert_duration(&self) -> chrono::Duration {
        checked_span(
            "alert_duration_secs",
            self.alert_duration_secs,
            chrono::Duration::try_seconds,
            Self::default().alert_duration_secs,
        )
    }

    pub fn debounce_window(&self) -> chrono::Duration {
        checked_span(
            "debounce_ms",
            self.debounce_ms,
            chrono::Duration::try_milliseconds,
            Self::default().debounce_ms,
        )
    }

    pub fn sweep_interval(&self) -> chrono::Duration {
        checked_span(
            "sweep_interval_secs",
            self.sweep_interval_secs,
            chrono::Duration::try_seconds,
            Self::default().sweep_interval_secs,
        )
    }

    pub fn pulse_half_period(&self) -> Duration {
        Duration::from_millis((self.pulse_period_ms / 2).max(1))
    }

    pub fn confirmation_buzz(&self) -> Duration {
        Duration::from_millis(self.confirmation_buzz_ms)
    }

    pub fn capture_beep(&self) -> Duration {
        Duration::from_millis(self.capture_beep_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.display.scroll_delay_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.display.scroll_pause_ms)
    }
}

/// `value` in the unit of `make`, or `default` when it does not fit.
fn checked_span(
    field: &str,
    value: u64,
    make: fn(i64) -> Option<chrono::Duration>,
    default: u64,
) -> chrono::Duration {
    let span = i64::try_from(value).ok().and_then(make);
    span.unwrap_or_else(|| {
        warn!("{field} = {value} is out of range; using {default}");
        i64::try_from(default)
            .ok()
            .and_then(make)
            .unwrap_or_else(chrono::Duration::zero)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_spans_fall_back_to_defaults() {
        let settings = Settings {
            alert_duration_secs: u64::MAX,
            sweep_interval_secs: 10_000_000_000_000_000,
            debounce_ms: u64::MAX,
            ..Settings::default()
        };
        assert_eq!(settings.alert_duration(), chrono::Duration::seconds(60));
        assert_eq!(settings.sweep_interval(), chrono::Duration::seconds(60));
        assert_eq!(settings.debounce_window(), chrono::Duration::milliseconds(500));
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remindme.json");

        let settings = Settings::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.alert_duration_secs, 60);
        assert_eq!(settings.pins.button, 17);
        assert_eq!(settings.pulse_half_period(), Duration::from_millis(200));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remindme.json");
        fs::write(
            &path,
            r#"{ "alert_duration_secs": 120, "llm": { "backend": "echo" } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.alert_duration_secs, 120);
        assert_eq!(settings.llm.backend, LlmBackend::Echo);
        assert_eq!(settings.llm.model, "deepseek-r1:1.5b");
        assert_eq!(settings.display.width, 16);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remindme.json");
        fs::write(&path, "{ not json").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.debounce_ms, 500);
    }
}
