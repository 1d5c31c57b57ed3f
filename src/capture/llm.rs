use std::{
    io::Write,
    process::{Command, Stdio},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::debug;

use crate::{
    error::ReminderError,
    settings::{LlmBackend, LlmSettings},
};

/// Text-in, text-out language model. Calls block until the model answers.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Runs `<command> run <model>` once per prompt, feeding the prompt on stdin.
pub struct OllamaCli {
    command: String,
    model: String,
}

impl OllamaCli {
    pub fn new(command: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: model.into(),
        }
    }
}

impl LanguageModel for OllamaCli {
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.command)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ReminderError::unavailable("language model", err))?;

        {
            let mut stdin = child
                .stdin
                .take()
                .context("language model stdin not captured")?;
            stdin
                .write_all(prompt.as_bytes())
                .and_then(|()| stdin.write_all(b"\n"))
                .map_err(|err| ReminderError::unavailable("language model", err))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| ReminderError::unavailable("language model", err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReminderError::unavailable(
                "language model",
                format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            )
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("{} answered: {}", self.model, stdout.trim());
        Ok(stdout)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Returns the prompt unchanged, so an utterance that already is a
/// `(description, date, time)` triple is extracted verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoModel;

impl LanguageModel for EchoModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub fn build_language_model(settings: &LlmSettings) -> Arc<dyn LanguageModel> {
    match settings.backend {
        LlmBackend::Ollama => Arc::new(OllamaCli::new(
            settings.command.clone(),
            settings.model.clone(),
        )),
        LlmBackend::Echo => Arc::new(EchoModel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_reported_as_unavailable() {
        let model = OllamaCli::new("remindme-no-such-binary", "tiny");
        let err = model.complete("hello").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReminderError>(),
            Some(ReminderError::CollaboratorUnavailable { collaborator: "language model", .. })
        ));
    }

    #[test]
    fn backend_selection_follows_settings() {
        let echo = build_language_model(&LlmSettings {
            backend: LlmBackend::Echo,
            ..LlmSettings::default()
        });
        assert_eq!(echo.name(), "echo");
        assert_eq!(echo.complete("(a, 2025-01-01, 1:00)").unwrap(), "(a, 2025-01-01, 1:00)");

        let ollama = build_language_model(&LlmSettings::default());
        assert_eq!(ollama.name(), "deepseek-r1:1.5b");
    }
}
